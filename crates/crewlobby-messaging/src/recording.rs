//! In-memory [`Messenger`] that records what was published.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crewlobby_protocol::{CorrelationId, EventId, LobbyId, Payload, PlayerId, Topic};

use crate::{Messenger, MessagingError};

/// One event as the messaging service would have received it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub correlation_id: CorrelationId,
    pub event_id: EventId,
    pub lobby_id: LobbyId,
    pub sender: PlayerId,
    pub topic: Topic,
    pub payload: Payload,
}

#[derive(Debug, Default)]
struct Journal {
    next_id: u64,
    published: Vec<PublishedEvent>,
    fail_allocations: bool,
    fail_publishes: bool,
}

/// A [`Messenger`] that appends every submitted event to a shared journal.
///
/// Clones share the journal, so a test can keep one clone and hand the
/// other to the lobby service.
#[derive(Debug, Clone, Default)]
pub struct RecordingMessenger {
    journal: Arc<Mutex<Journal>>,
}

impl RecordingMessenger {
    /// Creates a messenger with an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event submitted so far, in submission order.
    pub fn published(&self) -> Vec<PublishedEvent> {
        self.journal().published.clone()
    }

    /// Topics of every event submitted so far, in submission order.
    pub fn topics(&self) -> Vec<Topic> {
        self.journal().published.iter().map(|e| e.topic).collect()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.journal().published.clear();
    }

    /// Makes id allocation fail (or succeed again).
    pub fn fail_allocations(&self, fail: bool) {
        self.journal().fail_allocations = fail;
    }

    /// Makes event submission fail (or succeed again).
    pub fn fail_publishes(&self, fail: bool) {
        self.journal().fail_publishes = fail;
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Messenger for RecordingMessenger {
    async fn create_event_id(
        &self,
        _correlation: &CorrelationId,
        _lobby_id: LobbyId,
        _sender: PlayerId,
    ) -> Result<EventId, MessagingError> {
        let mut journal = self.journal();
        if journal.fail_allocations {
            return Err(MessagingError::Unavailable("allocation disabled".into()));
        }
        journal.next_id += 1;
        Ok(EventId(format!("evt-{}", journal.next_id)))
    }

    async fn publish_event(
        &self,
        correlation: &CorrelationId,
        event_id: &EventId,
        lobby_id: LobbyId,
        sender: PlayerId,
        topic: Topic,
        payload: &Payload,
    ) -> Result<(), MessagingError> {
        let mut journal = self.journal();
        if journal.fail_publishes {
            return Err(MessagingError::Unavailable("publishing disabled".into()));
        }
        journal.published.push(PublishedEvent {
            correlation_id: *correlation,
            event_id: event_id.clone(),
            lobby_id,
            sender,
            topic,
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_event_id_is_unique_per_call() {
        let messenger = RecordingMessenger::new();
        let correlation = CorrelationId::random();
        let lobby = LobbyId::random();

        let a = messenger
            .create_event_id(&correlation, lobby, PlayerId::nil())
            .await
            .unwrap();
        let b = messenger
            .create_event_id(&correlation, lobby, PlayerId::nil())
            .await
            .unwrap();

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_fail_publishes_records_nothing() {
        let messenger = RecordingMessenger::new();
        messenger.fail_publishes(true);

        let result = messenger
            .publish_event(
                &CorrelationId::random(),
                &EventId("evt-1".into()),
                LobbyId::random(),
                PlayerId::nil(),
                Topic::PlayerUpdated,
                &Payload::Null,
            )
            .await;

        assert!(result.is_err());
        assert!(messenger.published().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_journal() {
        let messenger = RecordingMessenger::new();
        let observer = messenger.clone();

        messenger
            .publish_event(
                &CorrelationId::random(),
                &EventId("evt-1".into()),
                LobbyId::random(),
                PlayerId::nil(),
                Topic::PlayerLagging,
                &Payload::Null,
            )
            .await
            .unwrap();

        assert_eq!(observer.topics(), vec![Topic::PlayerLagging]);
    }
}
