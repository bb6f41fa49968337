//! Health Check API Handler
//!
//! Reports the service itself plus the reachability of its collaborators.

use axum::{Json, extract::State};
use relay_core::dto::health::HealthReport;

use crate::service::{Services, health_service};

/// GET /health
pub async fn health_check(State(services): State<Services>) -> Json<HealthReport> {
    Json(health_service::health_report(&services).await)
}
