pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod notice;
pub mod readiness;
pub mod request;
pub mod store;
pub mod transport;

use crate::lifecycle::LifecycleService;
use crate::readiness::Readiness;

/// Per-event correlation id, attached to the request as an extension by the
/// signature middleware and carried on event-handling spans.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

/// Shared state behind every gateway handler.
pub struct AppState {
    pub service: LifecycleService,
    pub webhook_secret: String,
    pub readiness: Readiness,
}
