//! Turns domain events into messaging calls.

use crewlobby_protocol::{CorrelationId, Event, EventId, PlayerId};

use crate::{Messenger, MessagingError};

/// Publishes [`Event`]s through a [`Messenger`].
///
/// For each event the emitter:
/// 1. picks the sender, substituting the system player id when the event
///    has none,
/// 2. allocates an event id for the event's lobby,
/// 3. submits topic and payload under that id.
///
/// Both calls carry the request's correlation id.
#[derive(Debug, Clone)]
pub struct EventEmitter<M> {
    messenger: M,
    system_player_id: PlayerId,
}

impl<M: Messenger> EventEmitter<M> {
    /// Wraps a messenger. `system_player_id` is the sender for events
    /// without an acting player.
    pub fn new(messenger: M, system_player_id: PlayerId) -> Self {
        Self {
            messenger,
            system_player_id,
        }
    }

    /// The wrapped messenger.
    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    /// The id used for system-originated events.
    pub fn system_player_id(&self) -> PlayerId {
        self.system_player_id
    }

    /// The sender an event will be published under.
    pub fn sender_of(&self, event: &Event) -> PlayerId {
        event.sender.unwrap_or(self.system_player_id)
    }

    /// Publishes one event.
    ///
    /// # Errors
    /// Returns the first failing call's [`MessagingError`]. If allocation
    /// fails, nothing is submitted.
    pub async fn emit(
        &self,
        correlation: &CorrelationId,
        event: &Event,
    ) -> Result<EventId, MessagingError> {
        let sender = self.sender_of(event);
        let event_id = self
            .messenger
            .create_event_id(correlation, event.lobby_id, sender)
            .await?;
        self.messenger
            .publish_event(
                correlation,
                &event_id,
                event.lobby_id,
                sender,
                event.topic,
                &event.payload,
            )
            .await?;

        tracing::trace!(
            %event_id,
            lobby_id = %event.lobby_id,
            topic = %event.topic,
            %sender,
            "event published"
        );
        Ok(event_id)
    }
}
