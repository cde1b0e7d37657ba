//! The messaging collaborator seam.
//!
//! crewlobby doesn't deliver events to players itself. A separate
//! messaging service fans them out. [`Messenger`] is the two-call
//! interface that service offers, so production can talk HTTP while tests
//! record calls in memory.

use crewlobby_protocol::{CorrelationId, EventId, LobbyId, Payload, PlayerId, Topic};

use crate::MessagingError;

/// Allocates event ids and submits events to the messaging service.
///
/// # Trait bounds
///
/// - `Send + Sync` → one messenger is shared by every request and by the
///   background scavenger.
/// - `'static` → it lives as long as the server.
///
/// # Example
///
/// ```rust
/// use crewlobby_messaging::{Messenger, MessagingError};
/// use crewlobby_protocol::{CorrelationId, EventId, LobbyId, Payload, PlayerId, Topic};
///
/// /// Drops every event. Handy when no messaging service is running.
/// struct NullMessenger;
///
/// impl Messenger for NullMessenger {
///     async fn create_event_id(
///         &self,
///         _correlation: &CorrelationId,
///         _lobby_id: LobbyId,
///         _sender: PlayerId,
///     ) -> Result<EventId, MessagingError> {
///         Ok(EventId("null".into()))
///     }
///
///     async fn publish_event(
///         &self,
///         _correlation: &CorrelationId,
///         _event_id: &EventId,
///         _lobby_id: LobbyId,
///         _sender: PlayerId,
///         _topic: Topic,
///         _payload: &Payload,
///     ) -> Result<(), MessagingError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Messenger: Send + Sync + 'static {
    /// Allocates an id for a new event in `lobby_id`.
    ///
    /// # Returns
    /// - `Ok(EventId)`: the id to submit the event under
    /// - `Err(MessagingError)`: the service refused or was unreachable
    fn create_event_id(
        &self,
        correlation: &CorrelationId,
        lobby_id: LobbyId,
        sender: PlayerId,
    ) -> impl std::future::Future<Output = Result<EventId, MessagingError>> + Send;

    /// Submits an event under a previously allocated id.
    fn publish_event(
        &self,
        correlation: &CorrelationId,
        event_id: &EventId,
        lobby_id: LobbyId,
        sender: PlayerId,
        topic: Topic,
        payload: &Payload,
    ) -> impl std::future::Future<Output = Result<(), MessagingError>> + Send;
}
