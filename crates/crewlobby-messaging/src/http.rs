//! HTTP adapter for the lobby messaging service.
//!
//! The service exposes two endpoints per lobby:
//!
//! ```text
//! POST {url}/message/{lobby_id}/msg             → 201, body = new event id
//! PUT  {url}/message/{lobby_id}/msg/{event_id}  ← {"topic": ..., "message": ...} → 201
//! ```
//!
//! Every request carries the correlation id and the sending player.

use crewlobby_protocol::{
    Codec, CorrelationId, EventId, JsonCodec, LobbyId, Message, Payload, PlayerId, Topic,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};

use crate::{Messenger, MessagingConfig, MessagingError};

const CORRELATION_HEADER: &str = "X-Correlation-ID";
const PLAYER_HEADER: &str = "playerId";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A [`Messenger`] backed by the messaging service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpMessenger {
    client: reqwest::Client,
    base_url: Url,
    codec: JsonCodec,
}

impl HttpMessenger {
    /// Builds a client for the service at `config.server_url`.
    ///
    /// # Errors
    /// - [`MessagingError::InvalidUrl`] if `config.server_url` is not an
    ///   absolute URL
    /// - [`MessagingError::Request`] if the HTTP client cannot be
    ///   constructed (e.g. no TLS backend available)
    pub fn new(config: &MessagingConfig) -> Result<Self, MessagingError> {
        let base_url = Url::parse(&config.server_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| MessagingError::InvalidUrl(config.server_url.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            codec: JsonCodec,
        })
    }

    /// The service URL requests are sent to.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// `{base}/message/{lobby_id}/msg[/{event_id}]`, each segment
    /// percent-encoded.
    fn messages_url(
        &self,
        lobby_id: LobbyId,
        event_id: Option<&EventId>,
    ) -> Result<Url, MessagingError> {
        let lobby = lobby_id.to_string();
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| MessagingError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty().extend(["message", lobby.as_str(), "msg"]);
            if let Some(event_id) = event_id {
                segments.push(&event_id.0);
            }
        }
        Ok(url)
    }
}

impl Messenger for HttpMessenger {
    async fn create_event_id(
        &self,
        correlation: &CorrelationId,
        lobby_id: LobbyId,
        sender: PlayerId,
    ) -> Result<EventId, MessagingError> {
        let response = self
            .client
            .post(self.messages_url(lobby_id, None)?)
            .header(CORRELATION_HEADER, correlation.to_string())
            .header(PLAYER_HEADER, sender.to_string())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(MessagingError::UnexpectedStatus {
                call: "create event id",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let id = body.trim();
        if id.is_empty() {
            return Err(MessagingError::EmptyEventId);
        }
        Ok(EventId(id.to_string()))
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
        let body = self.codec.encode(&Message {
            topic,
            message: payload.clone(),
        })?;

        let response = self
            .client
            .put(self.messages_url(lobby_id, Some(event_id))?)
            .header(CORRELATION_HEADER, correlation.to_string())
            .header(PLAYER_HEADER, sender.to_string())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(MessagingError::UnexpectedStatus {
                call: "publish event",
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
