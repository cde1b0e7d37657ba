//! Lobby and player lifecycle for crewlobby.
//!
//! Every operation runs as one transaction against the persistence port
//! and stages the events it wants announced. Events are published only
//! after the transaction commits, so a rolled-back change is never
//! announced.
//!
//! # Key types
//!
//! - [`LobbyService`]: every lobby and player operation
//! - [`Outbox`] / [`UnitOfWork`]: transaction plus staged events
//! - [`Clock`]: time source ([`SystemClock`], [`ManualClock`])
//! - [`RequestContext`]: correlation id carried through a request
//! - [`LobbyError`] / [`ErrorKind`]: failure taxonomy
//! - [`events`]: builders for the published event payloads

mod clock;
mod context;
mod error;
pub mod events;
mod lobby;
mod outbox;
mod player;
mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::RequestContext;
pub use error::{ErrorKind, LobbyError};
pub use outbox::{Outbox, UnitOfWork};
pub use player::{LeaveOutcome, pick_successor};
pub use service::LobbyService;
