//! Integration tests for lobby operations against the in-memory adapters.

mod common;

use common::{add_member, create_lobby, harness, join, lobby, lobby_exists};
use crewlobby_lobby::{ErrorKind, LeaveOutcome, LobbyError};
use crewlobby_protocol::{LobbyStatus, PlayerId, Topic};

// =========================================================================
// create_lobby()
// =========================================================================

#[tokio::test]
async fn test_create_lobby_new_lobby_joins_owner() {
    let h = harness();
    let mut request = lobby(4, "warp");
    request.status = LobbyStatus::Playing;
    let owner = PlayerId::random();

    h.service
        .create_lobby(&h.ctx, request.clone(), join(owner, request.id, "Kirk", false))
        .await
        .unwrap();

    let info = h.service.get_lobby(&h.ctx, request.id).await.unwrap();
    assert_eq!(info.lobby.status, LobbyStatus::Open, "lobbies always start open");
    assert_eq!(info.lobby.owner, owner);
    assert_eq!(info.owner.id, owner);
    assert_eq!(info.players.len(), 1);
    assert_eq!(h.messenger.topics(), vec![Topic::PlayerJoinsLobby]);
}

#[tokio::test]
async fn test_create_lobby_identical_retry_is_idempotent() {
    let h = harness();
    let request = lobby(4, "warp");
    let owner = PlayerId::random();
    let owner_join = join(owner, request.id, "Kirk", false);

    h.service
        .create_lobby(&h.ctx, request.clone(), owner_join.clone())
        .await
        .unwrap();
    h.service
        .create_lobby(&h.ctx, request.clone(), owner_join)
        .await
        .unwrap();

    assert_eq!(h.store.lobby_count().await, 1);
    assert_eq!(h.store.player_count().await, 1, "owner must not be duplicated");
    assert_eq!(h.messenger.topics(), vec![Topic::PlayerJoinsLobby]);
}

#[tokio::test]
async fn test_create_lobby_same_id_different_password_returns_conflict() {
    let h = harness();
    let (existing, owner) = create_lobby(&h, 4, "warp").await;
    let mut retry = existing.clone();
    retry.password = "impulse".into();

    let result = h
        .service
        .create_lobby(&h.ctx, retry, join(owner, existing.id, "Kirk", false))
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.messenger.topics(), vec![Topic::PlayerJoinsLobby]);
}

#[tokio::test]
async fn test_create_lobby_same_id_different_name_returns_conflict() {
    let h = harness();
    let (existing, owner) = create_lobby(&h, 4, "warp").await;
    let mut retry = existing.clone();
    retry.name = "Sickbay".into();

    let result = h
        .service
        .create_lobby(&h.ctx, retry, join(owner, existing.id, "Kirk", false))
        .await;

    assert!(matches!(result, Err(LobbyError::Conflict(_))));
}

#[tokio::test]
async fn test_create_lobby_zero_capacity_rolls_back_lobby() {
    let h = harness();
    let request = lobby(0, "");

    let result = h
        .service
        .create_lobby(&h.ctx, request.clone(), join(PlayerId::random(), request.id, "Kirk", false))
        .await;

    assert!(matches!(result, Err(LobbyError::LobbyFull(_))));
    assert!(!lobby_exists(&h.store, request.id).await, "lobby insert must roll back");
    assert!(h.messenger.published().is_empty());
}

// =========================================================================
// update_lobby() / update_lobby_status()
// =========================================================================

#[tokio::test]
async fn test_update_lobby_by_owner_overwrites_fields_and_publishes() {
    let h = harness();
    let (original, owner) = create_lobby(&h, 4, "warp").await;
    h.messenger.clear();
    let mut changed = original.clone();
    changed.owner = owner;
    changed.name = "Engineering".into();
    changed.max_players = 6;
    changed.status = LobbyStatus::Playing;

    h.service
        .update_lobby(&h.ctx, changed.clone(), owner)
        .await
        .unwrap();

    let info = h.service.get_lobby(&h.ctx, original.id).await.unwrap();
    assert_eq!(info.lobby.name, "Engineering");
    assert_eq!(info.lobby.max_players, 6);
    assert_eq!(info.lobby.status, LobbyStatus::Playing);
    let published = h.messenger.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, Topic::PlayerUpdatesLobby);
    assert_eq!(published[0].sender, owner);
    assert_eq!(published[0].payload["name"], "Engineering");
}

#[tokio::test]
async fn test_update_lobby_by_non_owner_returns_not_owner_and_changes_nothing() {
    let h = harness();
    let (original, owner) = create_lobby(&h, 4, "warp").await;
    let intruder = add_member(&h, &original, "Khan").await;
    h.messenger.clear();
    let mut changed = original.clone();
    changed.owner = owner;
    changed.name = "Hijacked".into();

    let result = h.service.update_lobby(&h.ctx, changed, intruder).await;

    assert!(matches!(result, Err(LobbyError::NotOwner { player, .. }) if player == intruder));
    let info = h.service.get_lobby(&h.ctx, original.id).await.unwrap();
    assert_eq!(info.lobby.name, "Bridge");
    assert!(h.messenger.published().is_empty());
}

#[tokio::test]
async fn test_update_lobby_missing_returns_not_found() {
    let h = harness();

    let result = h
        .service
        .update_lobby(&h.ctx, lobby(4, ""), PlayerId::random())
        .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_update_lobby_owner_to_non_member_returns_not_member() {
    let h = harness();
    let (original, owner) = create_lobby(&h, 4, "warp").await;
    let mut changed = original.clone();
    changed.owner = PlayerId::random();

    let result = h.service.update_lobby(&h.ctx, changed, owner).await;

    assert!(matches!(result, Err(LobbyError::NotMember { .. })));
}

#[tokio::test]
async fn test_update_lobby_hands_ownership_to_member() {
    let h = harness();
    let (original, owner) = create_lobby(&h, 4, "warp").await;
    let spock = add_member(&h, &original, "Spock").await;
    let mut changed = original.clone();
    changed.owner = spock;

    h.service.update_lobby(&h.ctx, changed, owner).await.unwrap();

    let info = h.service.get_lobby(&h.ctx, original.id).await.unwrap();
    assert_eq!(info.owner.id, spock);
}

#[tokio::test]
async fn test_update_lobby_status_by_owner_changes_only_status() {
    let h = harness();
    let (original, owner) = create_lobby(&h, 4, "warp").await;
    h.messenger.clear();

    h.service
        .update_lobby_status(&h.ctx, original.id, LobbyStatus::Playing, owner)
        .await
        .unwrap();

    let info = h.service.get_lobby(&h.ctx, original.id).await.unwrap();
    assert_eq!(info.lobby.status, LobbyStatus::Playing);
    assert_eq!(info.lobby.name, original.name);
    assert_eq!(h.messenger.topics(), vec![Topic::PlayerUpdatesLobby]);
}

#[tokio::test]
async fn test_update_lobby_status_playing_back_to_open() {
    let h = harness();
    let (original, owner) = create_lobby(&h, 4, "warp").await;
    h.service
        .update_lobby_status(&h.ctx, original.id, LobbyStatus::Playing, owner)
        .await
        .unwrap();
    h.messenger.clear();

    h.service
        .update_lobby_status(&h.ctx, original.id, LobbyStatus::Open, owner)
        .await
        .unwrap();

    let info = h.service.get_lobby(&h.ctx, original.id).await.unwrap();
    assert_eq!(info.lobby.status, LobbyStatus::Open);
    assert_eq!(h.messenger.topics(), vec![Topic::PlayerUpdatesLobby]);
}

#[tokio::test]
async fn test_update_lobby_status_by_non_owner_returns_not_owner() {
    let h = harness();
    let (original, _owner) = create_lobby(&h, 4, "warp").await;
    let other = add_member(&h, &original, "Sulu").await;

    let result = h
        .service
        .update_lobby_status(&h.ctx, original.id, LobbyStatus::Playing, other)
        .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotOwner);
}

// =========================================================================
// delete_lobby()
// =========================================================================

#[tokio::test]
async fn test_delete_lobby_by_owner_removes_members_then_lobby() {
    let h = harness();
    let (original, owner) = create_lobby(&h, 4, "warp").await;
    add_member(&h, &original, "Uhura").await;
    h.messenger.clear();

    h.service
        .delete_lobby(&h.ctx, original.id, owner)
        .await
        .unwrap();

    assert_eq!(h.store.lobby_count().await, 0);
    assert_eq!(h.store.player_count().await, 0);
    assert_eq!(
        h.messenger.topics(),
        vec![Topic::PlayerLeavesLobby, Topic::PlayerLeavesLobby]
    );
}

#[tokio::test]
async fn test_delete_lobby_by_non_owner_returns_not_owner_and_keeps_lobby() {
    let h = harness();
    let (original, _owner) = create_lobby(&h, 4, "warp").await;
    let other = add_member(&h, &original, "Chekov").await;

    let result = h.service.delete_lobby(&h.ctx, original.id, other).await;

    assert!(matches!(result, Err(LobbyError::NotOwner { .. })));
    assert!(lobby_exists(&h.store, original.id).await);
    assert_eq!(h.store.player_count().await, 2);
}

#[tokio::test]
async fn test_delete_lobby_missing_is_noop() {
    let h = harness();

    let result = h
        .service
        .delete_lobby(&h.ctx, lobby(4, "").id, PlayerId::random())
        .await;

    assert!(result.is_ok());
    assert!(h.messenger.published().is_empty());
}

// =========================================================================
// get_lobby() / get_lobbies()
// =========================================================================

#[tokio::test]
async fn test_get_lobby_missing_returns_lobby_not_found() {
    let h = harness();
    let missing = lobby(4, "").id;

    let result = h.service.get_lobby(&h.ctx, missing).await;

    assert!(matches!(result, Err(LobbyError::LobbyNotFound(id)) if id == missing));
}

#[tokio::test]
async fn test_get_lobbies_empty_store_returns_empty_list() {
    let h = harness();

    let lobbies = h.service.get_lobbies(&h.ctx).await.unwrap();

    assert!(lobbies.is_empty());
}

#[tokio::test]
async fn test_get_lobbies_returns_each_lobby_with_members() {
    let h = harness();
    let (first, _) = create_lobby(&h, 4, "a").await;
    let (second, _) = create_lobby(&h, 4, "b").await;
    add_member(&h, &second, "McCoy").await;

    let lobbies = h.service.get_lobbies(&h.ctx).await.unwrap();

    assert_eq!(lobbies.len(), 2);
    let count_for = |id| {
        lobbies
            .iter()
            .find(|info| info.lobby.id == id)
            .map(|info| info.players.len())
    };
    assert_eq!(count_for(first.id), Some(1));
    assert_eq!(count_for(second.id), Some(2));
}

// =========================================================================
// Full scenario
// =========================================================================

#[tokio::test]
async fn test_scenario_capacity_then_owner_hand_over_then_lobby_removal() {
    let h = harness();
    let l1 = lobby(2, "pw");
    let p1 = PlayerId::random();
    let p2 = PlayerId::random();
    let p3 = PlayerId::random();

    // P1 creates L1.
    h.service
        .create_lobby(&h.ctx, l1.clone(), join(p1, l1.id, "P1", false))
        .await
        .unwrap();

    // P2 joins with the right password.
    h.clock.advance(std::time::Duration::from_secs(1));
    h.service
        .create_player(&h.ctx, join(p2, l1.id, "P2", false), "pw")
        .await
        .unwrap();
    let info = h.service.get_lobby(&h.ctx, l1.id).await.unwrap();
    assert_eq!(info.owner.id, p1);
    assert_eq!(info.players.len(), 2);

    // P3 finds the lobby full.
    let result = h
        .service
        .create_player(&h.ctx, join(p3, l1.id, "P3", false), "pw")
        .await;
    assert!(matches!(result, Err(LobbyError::LobbyFull(_))));

    // P1 leaves; P2 inherits.
    let outcome = h.service.delete_player(&h.ctx, p1).await.unwrap();
    assert_eq!(outcome, LeaveOutcome::OwnerTransferred { new_owner: p2 });
    let info = h.service.get_lobby(&h.ctx, l1.id).await.unwrap();
    assert_eq!(info.owner.id, p2);
    assert!(h.service.get_player(&h.ctx, p1).await.unwrap().is_none());

    // P2 leaves; L1 disappears.
    let outcome = h.service.delete_player(&h.ctx, p2).await.unwrap();
    assert_eq!(outcome, LeaveOutcome::LobbyDeleted);
    assert!(matches!(
        h.service.get_lobby(&h.ctx, l1.id).await,
        Err(LobbyError::LobbyNotFound(_))
    ));

    assert_eq!(
        h.messenger.topics(),
        vec![
            Topic::PlayerJoinsLobby,
            Topic::PlayerJoinsLobby,
            Topic::PlayerLeavesLobby,
            Topic::PlayerUpdatesLobby,
            Topic::PlayerLeavesLobby,
        ]
    );
}

#[tokio::test]
async fn test_new_lobby_id_is_fresh_each_call() {
    let h = harness();

    assert_ne!(h.service.new_lobby_id(), h.service.new_lobby_id());
}
