// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::history::MetricHistory;
use crate::models::FullSnapshot;
use crate::procfs_repo::ProcfsRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) stats_tx: broadcast::Sender<FullSnapshot>,
    pub(crate) procfs_repo: Arc<ProcfsRepo>,
    pub(crate) history: Arc<MetricHistory>,
    pub(crate) ws_system_connections: Arc<AtomicUsize>,
}

pub fn app(
    stats_tx: broadcast::Sender<FullSnapshot>,
    procfs_repo: Arc<ProcfsRepo>,
    history: Arc<MetricHistory>,
    ws_system_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        stats_tx,
        procfs_repo,
        history,
        ws_system_connections,
    };
    Router::new()
        .route("/", get(|| async { "procpulse: counters are up" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/cpu", get(http::cpu_handler)) // GET /api/cpu
        .route("/api/memory", get(http::memory_handler)) // GET /api/memory
        .route("/api/processes", get(http::processes_handler)) // GET /api/processes
        .route("/api/processes/{pid}/kill", post(http::kill_handler)) // POST /api/processes/{pid}/kill
        .route("/api/summary", get(http::summary_handler)) // GET /api/summary
        .route("/api/disk", get(http::disk_handler)) // GET /api/disk
        .route("/api/history", get(http::history_handler)) // GET /api/history
        .route("/ws/system", get(ws::ws_system)) // WS /ws/system
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
