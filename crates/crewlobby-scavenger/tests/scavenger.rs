//! Integration tests for the presence sweep.
//!
//! Wall-clock ages come from a `ManualClock`; the sweep loop's own timer
//! runs on Tokio's paused clock.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use crewlobby_lobby::{LobbyService, ManualClock, RequestContext};
use crewlobby_messaging::{EventEmitter, RecordingMessenger};
use crewlobby_protocol::{Lobby, LobbyId, LobbyStatus, PlayerId, PlayerJoin, Topic};
use crewlobby_scavenger::{Scavenger, ScavengerConfig, SweepMetrics};
use crewlobby_store::MemoryStore;

// =========================================================================
// Helpers
// =========================================================================

const SYSTEM: PlayerId = PlayerId::nil();

struct Fixture {
    service: LobbyService<MemoryStore, RecordingMessenger>,
    store: MemoryStore,
    messenger: RecordingMessenger,
    clock: ManualClock,
    ctx: RequestContext,
}

fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let messenger = RecordingMessenger::new();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    let service = LobbyService::new(
        store.clone(),
        EventEmitter::new(messenger.clone(), SYSTEM),
        Arc::new(clock.clone()),
    );
    Fixture {
        service,
        store,
        messenger,
        clock,
        ctx: RequestContext::new(),
    }
}

/// W = 5 s, D = 10 s, sweeps every 10 s with no jitter.
fn short_windows() -> ScavengerConfig {
    ScavengerConfig::default()
        .with_interval(Duration::from_secs(10))
        .with_warning_after(Duration::from_secs(5))
        .with_delete_after(Duration::from_secs(10))
        .with_initial_jitter(Duration::ZERO)
}

fn scavenger(f: &Fixture) -> Scavenger<MemoryStore, RecordingMessenger> {
    Scavenger::new(f.service.clone(), short_windows())
}

fn join(id: PlayerId, lobby_id: LobbyId, name: &str) -> PlayerJoin {
    PlayerJoin {
        id,
        lobby_id,
        name: name.into(),
        spectator: false,
        payload: serde_json::Value::Null,
    }
}

async fn open_lobby(f: &Fixture) -> (LobbyId, PlayerId) {
    let lobby = Lobby {
        id: LobbyId::random(),
        status: LobbyStatus::Open,
        name: "Bridge".into(),
        password: String::new(),
        owner: PlayerId::nil(),
        difficulty: "normal".into(),
        mission_length: 10,
        crew_size: 4,
        max_players: 4,
        expansion_packs: BTreeSet::new(),
        payload: serde_json::Value::Null,
    };
    let owner = PlayerId::random();
    f.service
        .create_lobby(&f.ctx, lobby.clone(), join(owner, lobby.id, "Kirk"))
        .await
        .unwrap();
    (lobby.id, owner)
}

async fn add_member(f: &Fixture, lobby_id: LobbyId, name: &str) -> PlayerId {
    let id = PlayerId::random();
    f.service
        .create_player(&f.ctx, join(id, lobby_id, name), "")
        .await
        .unwrap();
    id
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

// =========================================================================
// sweep()
// =========================================================================

#[tokio::test]
async fn test_sweep_fresh_players_untouched() {
    let f = fixture();
    open_lobby(&f).await;
    f.messenger.clear();
    f.clock.advance(secs(4));

    let report = scavenger(&f).sweep().await.unwrap();

    assert!(report.lagging.is_empty());
    assert!(report.evicted.is_empty());
    assert!(f.messenger.published().is_empty());
}

#[tokio::test]
async fn test_sweep_lagging_player_is_warned_and_kept() {
    let f = fixture();
    let (lobby_id, owner) = open_lobby(&f).await;
    let p4 = add_member(&f, lobby_id, "P4").await;
    f.clock.advance(secs(6));
    f.service.refresh_player(&f.ctx, owner).await.unwrap();
    f.messenger.clear();

    let report = scavenger(&f).sweep().await.unwrap();

    assert_eq!(report.lagging, vec![p4]);
    assert!(report.evicted.is_empty());
    let published = f.messenger.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, Topic::PlayerLagging);
    assert_eq!(published[0].lobby_id, lobby_id);
    assert_eq!(published[0].sender, SYSTEM);
    assert_eq!(published[0].payload["player_id"], p4.to_string());
    assert!(f.service.get_player(&f.ctx, p4).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sweep_lagging_player_is_warned_every_sweep() {
    let f = fixture();
    let (lobby_id, owner) = open_lobby(&f).await;
    add_member(&f, lobby_id, "P4").await;
    f.clock.advance(secs(6));
    f.service.refresh_player(&f.ctx, owner).await.unwrap();
    f.messenger.clear();
    let scavenger = scavenger(&f);

    scavenger.sweep().await.unwrap();
    f.clock.advance(secs(2));
    f.service.refresh_player(&f.ctx, owner).await.unwrap();
    scavenger.sweep().await.unwrap();

    assert_eq!(
        f.messenger.topics(),
        vec![Topic::PlayerLagging, Topic::PlayerLagging]
    );
}

#[tokio::test]
async fn test_sweep_silent_member_is_evicted() {
    let f = fixture();
    let (lobby_id, owner) = open_lobby(&f).await;
    let p4 = add_member(&f, lobby_id, "P4").await;
    f.clock.advance(secs(16));
    f.service.refresh_player(&f.ctx, owner).await.unwrap();
    f.messenger.clear();

    let report = scavenger(&f).sweep().await.unwrap();

    assert_eq!(report.evicted, vec![p4]);
    assert!(f.service.get_player(&f.ctx, p4).await.unwrap().is_none());
    let published = f.messenger.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, Topic::PlayerLeavesLobby);
    assert_eq!(published[0].sender, SYSTEM);
}

#[tokio::test]
async fn test_sweep_silent_owner_hands_lobby_to_member() {
    let f = fixture();
    let (lobby_id, owner) = open_lobby(&f).await;
    let spock = add_member(&f, lobby_id, "Spock").await;
    f.clock.advance(secs(16));
    f.service.refresh_player(&f.ctx, spock).await.unwrap();
    f.messenger.clear();

    let report = scavenger(&f).sweep().await.unwrap();

    assert_eq!(report.evicted, vec![owner]);
    let info = f.service.get_lobby(&f.ctx, lobby_id).await.unwrap();
    assert_eq!(info.owner.id, spock);
    assert_eq!(
        f.messenger.topics(),
        vec![Topic::PlayerLeavesLobby, Topic::PlayerUpdatesLobby]
    );
}

#[tokio::test]
async fn test_sweep_silent_sole_member_deletes_lobby() {
    let f = fixture();
    let (lobby_id, _owner) = open_lobby(&f).await;
    f.clock.advance(secs(16));

    scavenger(&f).sweep().await.unwrap();

    assert!(f.service.get_lobby(&f.ctx, lobby_id).await.is_err());
    assert_eq!(f.store.lobby_count().await, 0);
}

#[tokio::test]
async fn test_sweep_entirely_silent_lobby_is_removed_in_one_sweep() {
    let f = fixture();
    let (lobby_id, owner) = open_lobby(&f).await;
    f.clock.advance(secs(1));
    let spock = add_member(&f, lobby_id, "Spock").await;
    f.clock.advance(secs(30));
    f.messenger.clear();

    let report = scavenger(&f).sweep().await.unwrap();

    assert_eq!(report.evicted, vec![owner, spock]);
    assert_eq!(f.store.lobby_count().await, 0);
    assert_eq!(f.store.player_count().await, 0);
    assert_eq!(
        f.messenger.topics(),
        vec![
            Topic::PlayerLeavesLobby,
            Topic::PlayerUpdatesLobby,
            Topic::PlayerLeavesLobby,
        ]
    );
}

#[tokio::test]
async fn test_sweep_failed_commit_rolls_back_and_counts_failure() {
    let f = fixture();
    let (lobby_id, _owner) = open_lobby(&f).await;
    f.clock.advance(secs(16));
    f.messenger.clear();
    f.store.fail_commits(true);
    let scavenger = scavenger(&f);

    let result = scavenger.sweep().await;

    assert!(result.is_err());
    assert!(f.messenger.published().is_empty());
    assert_eq!(
        scavenger.metrics(),
        SweepMetrics {
            total_sweeps: 1,
            failed_sweeps: 1,
            total_lagging: 0,
            total_evicted: 0,
        }
    );
    f.store.fail_commits(false);
    assert!(f.service.get_lobby(&f.ctx, lobby_id).await.is_ok());
}

#[tokio::test]
async fn test_sweep_metrics_accumulate() {
    let f = fixture();
    let (lobby_id, owner) = open_lobby(&f).await;
    add_member(&f, lobby_id, "P4").await;
    let scavenger = scavenger(&f);
    f.clock.advance(secs(6));
    f.service.refresh_player(&f.ctx, owner).await.unwrap();

    scavenger.sweep().await.unwrap();
    f.clock.advance(secs(10));
    f.service.refresh_player(&f.ctx, owner).await.unwrap();
    scavenger.sweep().await.unwrap();

    let metrics = scavenger.metrics();
    assert_eq!(metrics.total_sweeps, 2);
    assert_eq!(metrics.total_lagging, 1);
    assert_eq!(metrics.total_evicted, 1);
    assert_eq!(metrics.failed_sweeps, 0);
}

// =========================================================================
// spawn() / run()
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_spawn_sweeps_after_first_interval() {
    let f = fixture();
    let (lobby_id, owner) = open_lobby(&f).await;
    add_member(&f, lobby_id, "P4").await;
    f.clock.advance(secs(6));
    f.service.refresh_player(&f.ctx, owner).await.unwrap();
    f.messenger.clear();

    let handle = scavenger(&f).spawn();
    tokio::time::sleep(secs(5)).await;
    assert_eq!(handle.metrics().total_sweeps, 0, "first sweep waits one interval");

    tokio::time::sleep(secs(6)).await;
    assert_eq!(handle.metrics().total_sweeps, 1);
    assert_eq!(f.messenger.topics(), vec![Topic::PlayerLagging]);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_spawn_keeps_sweeping_on_interval() {
    let f = fixture();
    let handle = scavenger(&f).spawn();

    tokio::time::sleep(secs(35)).await;

    assert_eq!(handle.metrics().total_sweeps, 3);
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_loop_before_first_sweep() {
    let f = fixture();
    let handle = scavenger(&f).spawn();

    tokio::time::sleep(secs(1)).await;
    let metrics = handle.metrics();
    handle.shutdown().await;

    assert_eq!(metrics.total_sweeps, 0);
}

#[tokio::test(start_paused = true)]
async fn test_spawn_survives_failed_sweep() {
    let f = fixture();
    open_lobby(&f).await;
    f.clock.advance(secs(16));
    f.store.fail_commits(true);
    let handle = scavenger(&f).spawn();

    tokio::time::sleep(secs(11)).await;
    f.store.fail_commits(false);
    tokio::time::sleep(secs(10)).await;

    let metrics = handle.metrics();
    assert_eq!(metrics.total_sweeps, 2);
    assert_eq!(metrics.failed_sweeps, 1);
    assert_eq!(metrics.total_evicted, 1);
    assert!(!handle.is_finished());
    handle.shutdown().await;
}
