//! Event emission for crewlobby.
//!
//! The lobby lifecycle never talks to the messaging service directly. It
//! hands committed [`Event`](crewlobby_protocol::Event)s to an
//! [`EventEmitter`], which turns each one into the two calls the service
//! expects:
//!
//! 1. allocate an event id for the lobby,
//! 2. submit the topic and payload under that id.
//!
//! # Adapters
//!
//! - [`RecordingMessenger`] keeps every published event in memory. Used by
//!   tests and the demo.
//! - [`HttpMessenger`] talks to the real service over HTTP (feature `http`,
//!   enabled by default).
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby layer (above)  ← stages events, flushes them after commit
//!     ↕
//! Messaging layer (this crate)  ← sender substitution, two-step publish
//!     ↕
//! Protocol layer (below)  ← Event, Topic, EventId, codec
//! ```

mod config;
mod emitter;
mod error;
#[cfg(feature = "http")]
mod http;
mod messenger;
mod recording;

pub use config::MessagingConfig;
pub use emitter::EventEmitter;
pub use error::MessagingError;
#[cfg(feature = "http")]
pub use http::HttpMessenger;
pub use messenger::Messenger;
pub use recording::{PublishedEvent, RecordingMessenger};
