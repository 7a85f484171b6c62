// Library for tests to access modules

pub mod config;
pub mod counters;
pub mod error;
pub mod history;
pub mod models;
pub mod procfs_repo;
pub mod rate_engine;
pub mod routes;
pub mod version;
pub mod worker;
