use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, Method};
use career_diagnostic::catalog::Catalog;
use career_diagnostic::config::{CorsConfig, SubmissionConfig};
use career_diagnostic::submission::SubmissionStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) submissions: Arc<dyn SubmissionStore>,
    pub(crate) submission_config: Arc<SubmissionConfig>,
}

/// Browser access policy. Origins come from config; credentials stay allowed
/// so the survey frontend can send cookies if it ever needs to.
pub(crate) fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Best-effort client address: proxy header first, then the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<&SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    forwarded.or_else(|| peer.map(|addr| addr.ip().to_string()))
}
