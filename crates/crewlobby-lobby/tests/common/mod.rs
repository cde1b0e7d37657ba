//! Shared fixtures for the lifecycle integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use crewlobby_lobby::{LobbyService, ManualClock, RequestContext};
use crewlobby_messaging::{EventEmitter, RecordingMessenger};
use crewlobby_protocol::{Lobby, LobbyId, LobbyStatus, PlayerId, PlayerJoin};
use crewlobby_store::{MemoryStore, Store, Transaction};

pub type Service = LobbyService<MemoryStore, RecordingMessenger>;

pub const SYSTEM: PlayerId = PlayerId::nil();

pub struct Harness {
    pub service: Service,
    pub store: MemoryStore,
    pub messenger: RecordingMessenger,
    pub clock: ManualClock,
    pub ctx: RequestContext,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    let store = MemoryStore::new();
    let messenger = RecordingMessenger::new();
    let clock = ManualClock::new(start_time());
    let service = LobbyService::new(
        store.clone(),
        EventEmitter::new(messenger.clone(), SYSTEM),
        Arc::new(clock.clone()),
    );
    Harness {
        service,
        store,
        messenger,
        clock,
        ctx: RequestContext::new(),
    }
}

pub fn lobby(max_players: u32, password: &str) -> Lobby {
    Lobby {
        id: LobbyId::random(),
        status: LobbyStatus::Open,
        name: "Bridge".into(),
        password: password.into(),
        owner: PlayerId::nil(),
        difficulty: "normal".into(),
        mission_length: 10,
        crew_size: 4,
        max_players,
        expansion_packs: BTreeSet::from(["tribbles".to_string()]),
        payload: serde_json::json!({ "region": "eu" }),
    }
}

pub fn join(id: PlayerId, lobby_id: LobbyId, name: &str, spectator: bool) -> PlayerJoin {
    PlayerJoin {
        id,
        lobby_id,
        name: name.into(),
        spectator,
        payload: serde_json::Value::Null,
    }
}

/// Creates a lobby owned by a fresh player. Returns `(lobby, owner)`.
pub async fn create_lobby(h: &Harness, max_players: u32, password: &str) -> (Lobby, PlayerId) {
    let lobby = lobby(max_players, password);
    let owner = PlayerId::random();
    h.service
        .create_lobby(&h.ctx, lobby.clone(), join(owner, lobby.id, "Kirk", false))
        .await
        .unwrap();
    (lobby, owner)
}

/// Joins a fresh non-spectator into `lobby`.
pub async fn add_member(h: &Harness, lobby: &Lobby, name: &str) -> PlayerId {
    let id = PlayerId::random();
    h.service
        .create_player(&h.ctx, join(id, lobby.id, name, false), &lobby.password)
        .await
        .unwrap();
    id
}

pub async fn lobby_exists(store: &MemoryStore, id: LobbyId) -> bool {
    let mut tx = store.begin().await.unwrap();
    tx.get_lobby_by_id(id).await.unwrap().is_some()
}
