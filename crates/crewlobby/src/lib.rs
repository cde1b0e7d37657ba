//! # crewlobby
//!
//! Lobby and player session engine for multiplayer games.
//!
//! Players create lobbies, join them with a password, heartbeat while they
//! are connected, and leave. Every change runs in one store transaction
//! and the events describing it are published to the messaging service
//! only after that transaction commits. A background sweep warns about
//! and evicts players whose heartbeats stop.
//!
//! ## Layers
//!
//! | Crate | Role |
//! |-------|------|
//! | `crewlobby-protocol` | ids, records, topics, JSON codec |
//! | `crewlobby-store` | persistence port and the in-memory adapter |
//! | `crewlobby-messaging` | event emission (HTTP and recording adapters) |
//! | `crewlobby-lobby` | outbox and the lobby/player lifecycle |
//! | `crewlobby-scavenger` | presence sweep |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crewlobby::prelude::*;
//!
//! # async fn run() -> Result<(), CrewlobbyError> {
//! let config = ServerConfig::from_env()?;
//! setup_logging(&config.log_filter);
//!
//! let mut server = LobbyServer::builder()
//!     .config(config)
//!     .build_http(MemoryStore::new())?;
//! server.start();
//!
//! let ctx = RequestContext::new();
//! let lobbies = server.lobbies().get_lobbies(&ctx).await?;
//! println!("{} lobbies", lobbies.len());
//!
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod logging;
mod server;

pub use config::{DEFAULT_LOG_FILTER, ServerConfig};
pub use error::CrewlobbyError;
pub use logging::setup_logging;
pub use server::{LobbyServer, LobbyServerBuilder};

pub use crewlobby_lobby as lobby;
pub use crewlobby_messaging as messaging;
pub use crewlobby_protocol as protocol;
pub use crewlobby_scavenger as scavenger;
pub use crewlobby_store as store;

/// The types most embedders need.
pub mod prelude {
    pub use crate::{CrewlobbyError, LobbyServer, LobbyServerBuilder, ServerConfig, setup_logging};
    pub use crewlobby_lobby::{
        Clock, ErrorKind, LeaveOutcome, LobbyError, LobbyService, ManualClock, RequestContext,
        SystemClock,
    };
    pub use crewlobby_messaging::{
        EventEmitter, HttpMessenger, MessagingConfig, Messenger, RecordingMessenger,
    };
    pub use crewlobby_protocol::{
        CorrelationId, Lobby, LobbyId, LobbyInfo, LobbyStatus, Player, PlayerId, PlayerJoin,
        PlayerUpdate, Topic,
    };
    pub use crewlobby_scavenger::{ScavengerConfig, SweepMetrics, SweepReport};
    pub use crewlobby_store::{MemoryStore, Store, Transaction};
}
