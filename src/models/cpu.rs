use serde::{Deserialize, Serialize};

/// Overall CPU busy percentage, rounded to 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CpuUsage {
    pub overall: f64,
}
