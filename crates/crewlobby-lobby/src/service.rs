//! The lobby service: shared state behind every lifecycle operation.
//!
//! The operations themselves live in `lobby.rs` and `player.rs`; this
//! module holds the wiring they share.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crewlobby_messaging::{EventEmitter, Messenger};
use crewlobby_store::Store;

use crate::{Clock, LobbyError, Outbox, RequestContext, UnitOfWork};

struct Inner<S, M> {
    outbox: Outbox<S, M>,
    clock: Arc<dyn Clock>,
}

/// Entry point for every lobby and player operation.
///
/// Cheap to clone; clones share the store, messenger, and clock. One
/// service is typically shared by the request handlers and the scavenger.
///
/// Each public operation opens exactly one transaction, runs to
/// completion inside it, and then either commits (publishing its staged
/// events) or rolls back.
pub struct LobbyService<S, M> {
    inner: Arc<Inner<S, M>>,
}

impl<S, M> Clone for LobbyService<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store, M: Messenger> LobbyService<S, M> {
    /// Wires a service from its collaborators.
    pub fn new(store: S, emitter: EventEmitter<M>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                outbox: Outbox::new(store, emitter),
                clock,
            }),
        }
    }

    pub fn outbox(&self) -> &Outbox<S, M> {
        &self.inner.outbox
    }

    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// The current time according to the service's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Opens a unit of work for callers that compose several steps in one
    /// transaction (the scavenger does).
    pub async fn begin(&self, ctx: &RequestContext) -> Result<UnitOfWork<S::Tx>, LobbyError> {
        self.inner.outbox.begin(ctx).await
    }

    /// Commits or rolls back a unit of work opened with [`begin`](Self::begin).
    pub async fn finish<R>(
        &self,
        uow: UnitOfWork<S::Tx>,
        result: Result<R, LobbyError>,
    ) -> Result<R, LobbyError> {
        self.inner.outbox.finish(uow, result).await
    }
}
