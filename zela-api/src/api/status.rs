//! Health check and status endpoints.

use rocket::{Route, serde::json::Json};
use serde::Serialize;
use ts_rs::TS;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    status: &'static str,
    version: &'static str,
    built: &'static str,
    git_commit: Option<&'static str>,
}

/// Health Status endpoint.
///
/// - **URL:** `/api/1/status`
/// - **Method:** `GET`
/// - **Authentication:** None required
///
/// Always answers "running" while the process is responsive; used by
/// deployment probes.
#[rocket::get("/1/status")]
pub fn health_status() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        built: built_info::BUILT_TIME_UTC,
        git_commit: built_info::GIT_COMMIT_HASH,
    })
}

/// Returns all status routes.
pub fn routes() -> Vec<Route> {
    routes![health_status]
}
