//! Health report DTOs

use serde::{Deserialize, Serialize};

/// Overall service health, including external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub app: String,
    pub inference: ServiceHealth,
    pub browser: ServiceHealth,
    pub features: FeatureAvailability,
}

/// Status of one external collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// One of "connected", "configured but unreachable", "not configured"
    pub status: String,
    pub endpoint: String,
    pub configured: bool,
}

/// Which task kinds can be fully serviced right now
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAvailability {
    pub string_reversal: bool,
    pub ai_summarization: bool,
    pub screenshots: bool,
    pub website_synthesis: bool,
}
