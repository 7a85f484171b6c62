// GET handlers for each metric stream, plus the kill action

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::error::SampleError;
use crate::models::{CpuUsage, DiskStats, MemoryInfo, ProcessList, SummaryInfo};
use crate::version::{NAME, VERSION};

/// JSON `{"error": ...}` with a status code.
pub(super) struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    /// A metric read failed this cycle; details go to the log, not the client.
    fn read_failed(message: &'static str, operation: &'static str, e: SampleError) -> Self {
        tracing::warn!(error = %e, operation, "{}", message);
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/cpu: two reads a short window apart.
pub(super) async fn cpu_handler(State(state): State<AppState>) -> Result<Json<CpuUsage>, ApiError> {
    state
        .procfs_repo
        .get_cpu_usage()
        .await
        .map(Json)
        .map_err(|e| ApiError::read_failed("CPU read failed", "get_cpu_usage", e))
}

pub(super) async fn memory_handler(
    State(state): State<AppState>,
) -> Result<Json<MemoryInfo>, ApiError> {
    state
        .procfs_repo
        .get_memory_info()
        .await
        .map(Json)
        .map_err(|e| ApiError::read_failed("Memory read failed", "get_memory_info", e))
}

pub(super) async fn processes_handler(
    State(state): State<AppState>,
) -> Result<Json<ProcessList>, ApiError> {
    state
        .procfs_repo
        .get_processes()
        .await
        .map(|processes| Json(ProcessList { processes }))
        .map_err(|e| ApiError::read_failed("Process read failed", "get_processes", e))
}

pub(super) async fn summary_handler(
    State(state): State<AppState>,
) -> Result<Json<SummaryInfo>, ApiError> {
    state
        .procfs_repo
        .get_summary()
        .await
        .map(Json)
        .map_err(|e| ApiError::read_failed("Summary read failed", "get_summary", e))
}

pub(super) async fn disk_handler(State(state): State<AppState>) -> Result<Json<DiskStats>, ApiError> {
    state
        .procfs_repo
        .get_disk_stats()
        .await
        .map(Json)
        .map_err(|e| ApiError::read_failed("Disk read failed", "get_disk_stats", e))
}

/// GET /api/history: recent CPU/memory points from the poller, oldest first.
pub(super) async fn history_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "points": state.history.points() }))
}

/// POST /api/processes/{pid}/kill: sends SIGTERM.
pub(super) async fn kill_handler(Path(pid): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let pid = parse_pid(&pid).ok_or(ApiError {
        status: StatusCode::BAD_REQUEST,
        message: "Invalid PID",
    })?;
    tracing::info!(pid, "kill requested");

    if let Err(e) = terminate(pid).await {
        tracing::warn!(error = %e, pid, operation = "kill", "kill failed");
        return Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Failed to kill process",
        });
    }
    Ok(Json(serde_json::json!({ "success": true, "pid": pid })))
}

/// Digits only, within 1..=pid_t max. 0 and wrapped values would address process groups.
fn parse_pid(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>()
        .ok()
        .filter(|pid| (1..=i32::MAX as u32).contains(pid))
}

async fn terminate(pid: u32) -> anyhow::Result<()> {
    let status = tokio::process::Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .kill_on_drop(true)
        .status()
        .await?;
    anyhow::ensure!(status.success(), "kill exited with {}", status);
    Ok(())
}
