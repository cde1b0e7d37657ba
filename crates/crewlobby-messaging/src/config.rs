//! Messaging configuration.

use std::time::Duration;

use crewlobby_protocol::PlayerId;

/// Settings for event emission.
#[derive(Debug, Clone)]
pub struct MessagingConfig {
    /// Sender used for events that have no acting player, such as
    /// scavenger evictions.
    ///
    /// Default: the nil id.
    pub system_player_id: PlayerId,

    /// Base URL of the messaging service.
    ///
    /// Default: `http://theredshirts-message:1203`.
    pub server_url: String,

    /// Upper bound on each HTTP call to the service.
    ///
    /// Default: 5 seconds.
    pub request_timeout: Duration,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            system_player_id: PlayerId::nil(),
            server_url: "http://theredshirts-message:1203".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl MessagingConfig {
    /// Overrides the system sender id.
    pub fn with_system_player_id(mut self, id: PlayerId) -> Self {
        self.system_player_id = id;
        self
    }

    /// Overrides the service URL. A trailing slash is dropped.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.server_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Overrides the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
