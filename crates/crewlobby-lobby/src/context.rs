//! Request-scoped context.

use crewlobby_protocol::CorrelationId;

/// Carries the correlation id of one request through every layer.
///
/// The id ends up on every log line (via [`RequestContext::span`]) and in
/// both messaging calls for every event the request publishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    correlation_id: CorrelationId,
}

impl RequestContext {
    /// A context with a fresh correlation id.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context with a known correlation id.
    pub fn with_correlation_id(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    /// A context from a client-supplied header value.
    ///
    /// Missing or malformed values get a fresh id.
    pub fn from_header(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        match CorrelationId::parse(raw) {
            Ok(correlation_id) => Self { correlation_id },
            Err(_) => {
                let correlation_id = CorrelationId::random();
                tracing::info!(raw, %correlation_id, "malformed correlation id replaced");
                Self { correlation_id }
            }
        }
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// A span for one lobby operation, tagged with the correlation id.
    pub fn span(&self, operation: &'static str) -> tracing::Span {
        tracing::info_span!("lobby_op", operation, correlation_id = %self.correlation_id)
    }
}
