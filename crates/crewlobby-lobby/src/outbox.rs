//! Transaction coordinator with a staged-event outbox.
//!
//! ```text
//! begin ──→ stage(event)* ──→ commit ──→ publish each staged event
//!                       └──→ rollback ──→ staged events dropped
//! ```
//!
//! Publishing happens strictly after a successful commit. A publish
//! failure is logged and skipped; it never undoes the committed change and
//! never stops the remaining events from being sent.

use crewlobby_messaging::{EventEmitter, Messenger};
use crewlobby_protocol::{CorrelationId, Event};
use crewlobby_store::{Store, StoreError, Transaction};

use crate::error::store_err;
use crate::{LobbyError, RequestContext};

// ---------------------------------------------------------------------------
// UnitOfWork
// ---------------------------------------------------------------------------

/// An open transaction plus the events waiting for its commit.
pub struct UnitOfWork<T> {
    tx: T,
    staged: Vec<Event>,
    correlation_id: CorrelationId,
}

impl<T: Transaction> UnitOfWork<T> {
    /// The underlying transaction.
    pub fn tx(&mut self) -> &mut T {
        &mut self.tx
    }

    /// Queues an event to publish once this unit commits.
    pub fn stage(&mut self, event: Event) {
        self.staged.push(event);
    }

    /// Events queued so far, in staging order.
    pub fn staged(&self) -> &[Event] {
        &self.staged
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Rolls the transaction back and drops every staged event.
    pub async fn rollback(self) -> Result<(), StoreError> {
        if !self.staged.is_empty() {
            tracing::debug!(dropped = self.staged.len(), "discarding staged events");
        }
        self.tx.rollback().await
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Opens units of work and publishes their events after commit.
pub struct Outbox<S, M> {
    store: S,
    emitter: EventEmitter<M>,
}

impl<S: Store, M: Messenger> Outbox<S, M> {
    pub fn new(store: S, emitter: EventEmitter<M>) -> Self {
        Self { store, emitter }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn emitter(&self) -> &EventEmitter<M> {
        &self.emitter
    }

    /// Opens a new unit of work for `ctx`.
    pub async fn begin(&self, ctx: &RequestContext) -> Result<UnitOfWork<S::Tx>, LobbyError> {
        let tx = self
            .store
            .begin()
            .await
            .map_err(store_err("opening transaction"))?;
        Ok(UnitOfWork {
            tx,
            staged: Vec::new(),
            correlation_id: ctx.correlation_id(),
        })
    }

    /// Commits the unit, then publishes its staged events in order.
    ///
    /// Returns how many events were published. Only a failed commit is an
    /// error; in that case nothing is published.
    pub async fn commit(&self, uow: UnitOfWork<S::Tx>) -> Result<usize, LobbyError> {
        let UnitOfWork {
            tx,
            staged,
            correlation_id,
        } = uow;
        tx.commit()
            .await
            .map_err(store_err("committing transaction"))?;
        Ok(self.flush(&correlation_id, &staged).await)
    }

    /// Commits on `Ok`, rolls back on `Err`, and hands `result` back.
    pub async fn finish<R>(
        &self,
        uow: UnitOfWork<S::Tx>,
        result: Result<R, LobbyError>,
    ) -> Result<R, LobbyError> {
        match result {
            Ok(value) => {
                self.commit(uow).await?;
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(error = %err, "operation failed, rolling back");
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn flush(&self, correlation_id: &CorrelationId, events: &[Event]) -> usize {
        let mut published = 0;
        for event in events {
            match self.emitter.emit(correlation_id, event).await {
                Ok(_) => published += 1,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        topic = %event.topic,
                        lobby_id = %event.lobby_id,
                        "event publish failed after commit"
                    );
                }
            }
        }
        published
    }
}
