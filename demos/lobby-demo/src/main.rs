//! Walks one lobby through its whole life against the in-memory adapters:
//! join, capacity rejection, a silent player being warned and evicted,
//! owner hand-over, and removal of the empty lobby.
//!
//! Run with `RUST_LOG=debug` to see every step of the leave algorithm.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crewlobby::prelude::*;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn bridge() -> Lobby {
    Lobby {
        id: LobbyId::random(),
        status: LobbyStatus::Open,
        name: "Bridge".into(),
        password: "pw".into(),
        owner: PlayerId::nil(),
        difficulty: "normal".into(),
        mission_length: 10,
        crew_size: 4,
        max_players: 2,
        expansion_packs: BTreeSet::from(["tribbles".to_string()]),
        payload: serde_json::json!({ "region": "eu" }),
    }
}

fn join(lobby: &Lobby, name: &str, spectator: bool) -> PlayerJoin {
    PlayerJoin {
        id: PlayerId::random(),
        lobby_id: lobby.id,
        name: name.into(),
        spectator,
        payload: serde_json::Value::Null,
    }
}

fn print_lobby(info: &LobbyInfo) {
    let members: Vec<&str> = info.players.iter().map(|p| p.name.as_str()).collect();
    println!(
        "  {} [{}] owner={} members={:?}",
        info.lobby.name, info.lobby.status, info.owner.name, members
    );
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), CrewlobbyError> {
    let mut config = ServerConfig::from_env()?;
    config.scavenger = config
        .scavenger
        .with_warning_after(Duration::from_secs(5))
        .with_delete_after(Duration::from_secs(10));
    setup_logging(&config.log_filter);

    let clock = ManualClock::new(SystemClock.now());
    let messenger = RecordingMessenger::new();
    let server = LobbyServer::builder()
        .config(config)
        .clock(Arc::new(clock.clone()))
        .build(MemoryStore::new(), messenger.clone());
    let lobbies = server.lobbies();
    let ctx = RequestContext::new();

    println!("== P1 creates a lobby for two");
    let lobby = bridge();
    let p1 = join(&lobby, "P1", false);
    lobbies.create_lobby(&ctx, lobby.clone(), p1.clone()).await?;
    print_lobby(&lobbies.get_lobby(&ctx, lobby.id).await?);

    println!("== P2 joins, P3 finds it full, Q watches");
    clock.advance(Duration::from_secs(1));
    let p2 = join(&lobby, "P2", false);
    lobbies.create_player(&ctx, p2.clone(), "pw").await?;
    match lobbies.create_player(&ctx, join(&lobby, "P3", false), "pw").await {
        Err(err) => println!("  P3 rejected: {err} (kind {:?})", err.kind()),
        Ok(()) => println!("  P3 unexpectedly admitted"),
    }
    let q = join(&lobby, "Q", true);
    lobbies.create_player(&ctx, q.clone(), "pw").await?;
    print_lobby(&lobbies.get_lobby(&ctx, lobby.id).await?);

    println!("== Q goes silent");
    clock.advance(Duration::from_secs(6));
    lobbies.refresh_player(&ctx, p1.id).await?;
    lobbies.refresh_player(&ctx, p2.id).await?;
    let report = server.sweep_now().await?;
    println!("  sweep: {} lagging, {} evicted", report.lagging.len(), report.evicted.len());
    clock.advance(Duration::from_secs(10));
    lobbies.refresh_player(&ctx, p1.id).await?;
    lobbies.refresh_player(&ctx, p2.id).await?;
    let report = server.sweep_now().await?;
    println!("  sweep: {} lagging, {} evicted", report.lagging.len(), report.evicted.len());
    print_lobby(&lobbies.get_lobby(&ctx, lobby.id).await?);

    println!("== P1 leaves");
    let outcome = lobbies.delete_player(&ctx, p1.id).await?;
    println!("  {outcome:?}");
    print_lobby(&lobbies.get_lobby(&ctx, lobby.id).await?);

    println!("== P2 leaves");
    let outcome = lobbies.delete_player(&ctx, p2.id).await?;
    println!("  {outcome:?}");
    println!("  lobbies left: {}", lobbies.get_lobbies(&ctx).await?.len());

    println!("== Published events");
    for event in messenger.published() {
        println!("  {:<22} {}", event.topic.as_str(), event.payload);
    }

    server.shutdown().await;
    Ok(())
}
