//! Health reporting for the service and its collaborators

use relay_core::dto::health::{FeatureAvailability, HealthReport, ServiceHealth};

use crate::service::Services;

pub const CONNECTED: &str = "connected";
pub const UNREACHABLE: &str = "configured but unreachable";
pub const NOT_CONFIGURED: &str = "not configured";

/// Probes the inference service and reports configuration of the others
///
/// The browser service is billed per session, so it is never contacted here.
pub async fn health_report(services: &Services) -> HealthReport {
    let inference_client = services.summarizer.client();
    let inference_configured = inference_client.is_configured();
    let inference_status = if !inference_configured {
        NOT_CONFIGURED
    } else if inference_client.probe().await {
        CONNECTED
    } else {
        UNREACHABLE
    };

    let browser_configured = services.browser.is_configured();

    HealthReport {
        app: "healthy".to_string(),
        inference: ServiceHealth {
            status: inference_status.to_string(),
            endpoint: inference_client.endpoint(),
            configured: inference_configured,
        },
        browser: ServiceHealth {
            status: if browser_configured { "configured" } else { NOT_CONFIGURED }.to_string(),
            endpoint: services.browser.endpoint(),
            configured: browser_configured,
        },
        features: FeatureAvailability {
            string_reversal: true,
            ai_summarization: inference_status == CONNECTED,
            screenshots: browser_configured,
            website_synthesis: browser_configured,
        },
    }
}
