//! `LobbyServer` builder and background wiring.
//!
//! This is the entry point for embedding crewlobby in a process. It ties
//! together the layers: store → outbox → lifecycle, plus the presence
//! sweep running beside them.

use std::sync::Arc;

use crewlobby_lobby::{Clock, LobbyService, SystemClock};
use crewlobby_messaging::{EventEmitter, HttpMessenger, Messenger};
use crewlobby_scavenger::{Scavenger, ScavengerHandle, SweepMetrics, SweepReport};
use crewlobby_store::Store;

use crate::{CrewlobbyError, ServerConfig};

/// Builder for configuring a [`LobbyServer`].
///
/// # Example
///
/// ```rust,ignore
/// use crewlobby::prelude::*;
///
/// let mut server = LobbyServer::builder()
///     .config(ServerConfig::from_env()?)
///     .build(MemoryStore::new(), RecordingMessenger::new());
/// server.start();
/// server.lobbies().create_lobby(&ctx, lobby, owner).await?;
/// server.shutdown().await;
/// ```
pub struct LobbyServerBuilder {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl LobbyServerBuilder {
    /// Creates a new builder with default settings and the system clock.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the time source (tests use a `ManualClock`).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wires the server around a store and a messenger.
    pub fn build<S: Store, M: Messenger>(self, store: S, messenger: M) -> LobbyServer<S, M> {
        let emitter = EventEmitter::new(messenger, self.config.messaging.system_player_id);
        let service = LobbyService::new(store, emitter, self.clock);
        tracing::debug!(
            messaging_url = %self.config.messaging.server_url,
            system_player_id = %self.config.messaging.system_player_id,
            "lobby server built"
        );
        let scavenger = Scavenger::new(service.clone(), self.config.scavenger);
        LobbyServer {
            service,
            scavenger,
            sweeper: None,
        }
    }

    /// Wires the server around a store and the HTTP messaging adapter
    /// configured in [`ServerConfig::messaging`].
    ///
    /// # Errors
    /// Returns [`CrewlobbyError::Messaging`] if the service URL is invalid
    /// or the HTTP client cannot be built.
    pub fn build_http<S: Store>(
        self,
        store: S,
    ) -> Result<LobbyServer<S, HttpMessenger>, CrewlobbyError> {
        let messenger = HttpMessenger::new(&self.config.messaging)?;
        Ok(self.build(store, messenger))
    }
}

impl Default for LobbyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The lobby service plus its presence sweep.
///
/// Request handlers call into [`lobbies()`](Self::lobbies); the sweep runs
/// once [`start()`](Self::start) has been called.
pub struct LobbyServer<S, M> {
    service: LobbyService<S, M>,
    scavenger: Scavenger<S, M>,
    sweeper: Option<ScavengerHandle>,
}

// The store and messenger are chosen later, in `LobbyServerBuilder::build`.
impl LobbyServer<(), ()> {
    /// Creates a new builder.
    pub fn builder() -> LobbyServerBuilder {
        LobbyServerBuilder::new()
    }
}

impl<S: Store, M: Messenger> LobbyServer<S, M> {
    /// The lifecycle operations. Clone it to share with request handlers.
    pub fn lobbies(&self) -> &LobbyService<S, M> {
        &self.service
    }

    /// Starts the presence sweep. Calling it again while running does
    /// nothing.
    pub fn start(&mut self) {
        if self.sweeper.is_some() {
            return;
        }
        self.sweeper = Some(self.scavenger.clone().spawn());
        tracing::info!(
            interval_secs = self.scavenger.config().interval.as_secs(),
            "lobby server started"
        );
    }

    pub fn is_running(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Sweep totals, background and [`sweep_now`](Self::sweep_now) sweeps
    /// alike.
    pub fn sweep_metrics(&self) -> SweepMetrics {
        self.scavenger.metrics()
    }

    /// Runs one sweep immediately, independent of the background loop.
    pub async fn sweep_now(&self) -> Result<SweepReport, CrewlobbyError> {
        Ok(self.scavenger.sweep().await?)
    }

    /// Stops the presence sweep and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.shutdown().await;
        }
        tracing::info!("lobby server stopped");
    }
}
