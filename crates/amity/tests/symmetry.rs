use std::collections::HashSet;
use std::path::Path;

use amity::{
    AmityError, AmityResult, AmityStore, CreateUserInput, Id, MatchManager, MatchReadApi,
    MatchWriteApi, Timestamp, UserId,
};
use tempfile::tempdir;

async fn open_manager(base: &Path) -> AmityResult<MatchManager> {
    let store = AmityStore::connect_sqlite(&base.join("amity.sqlite")).await?;
    Ok(MatchManager::new(store))
}

async fn new_user(manager: &MatchManager, handle: &str) -> AmityResult<UserId> {
    let user_id = UserId(Id::new());
    manager
        .store()
        .create_user(CreateUserInput {
            user_id,
            handle: handle.to_string(),
            created_at: Timestamp::now_micros(),
        })
        .await?;
    Ok(user_id)
}

async fn matched_ids(manager: &MatchManager, user: UserId) -> AmityResult<HashSet<UserId>> {
    Ok(manager
        .matched_users(user)
        .await?
        .into_iter()
        .map(|user| user.user_id)
        .collect())
}

#[tokio::test]
async fn add_creates_both_directions() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;

    assert!(manager.matched_users(alice).await?.is_empty());
    assert!(manager.matched_users(bob).await?.is_empty());

    manager.add_match(alice, bob, Timestamp::now_micros()).await?;

    assert_eq!(matched_ids(&manager, alice).await?, HashSet::from([bob]));
    assert_eq!(matched_ids(&manager, bob).await?, HashSet::from([alice]));
    assert!(manager.is_matched(alice, bob).await?);
    assert!(manager.is_matched(bob, alice).await?);
    Ok(())
}

#[tokio::test]
async fn add_is_idempotent_and_keeps_original_timestamp() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;

    let first = Timestamp::from_i64(1_000_000);
    let second = Timestamp::from_i64(2_000_000);
    manager.add_match(alice, bob, first).await?;
    manager.add_match(alice, bob, second).await?;

    assert_eq!(manager.matched_users(alice).await?.len(), 1);
    assert_eq!(manager.matched_users(bob).await?.len(), 1);
    let enriched = manager.matched_users_with_match_data(alice).await?;
    assert_eq!(enriched.len(), 1);
    assert_eq!(enriched[0].matched_at, first);
    Ok(())
}

#[tokio::test]
async fn remove_clears_both_directions_and_is_idempotent() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;

    manager.add_match(alice, bob, Timestamp::now_micros()).await?;
    manager.remove_match(alice, bob).await?;

    assert!(manager.matched_users(alice).await?.is_empty());
    assert!(manager.matched_users(bob).await?.is_empty());

    // Removing an absent edge is a no-op, not an error.
    manager.remove_match(alice, bob).await?;
    manager.remove_match(bob, alice).await?;
    Ok(())
}

#[tokio::test]
async fn reciprocal_is_not_duplicated_when_one_direction_exists() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;

    // Seed one direction through the store, then let the manager repair.
    let seeded = Timestamp::from_i64(42);
    manager.store().create_edge(bob, alice, seeded).await?;
    manager.add_match(alice, bob, Timestamp::from_i64(99)).await?;

    assert_eq!(manager.store().edges_from(alice).await?.len(), 1);
    assert_eq!(manager.store().edges_from(bob).await?.len(), 1);
    let enriched = manager.matched_users_with_match_data(bob).await?;
    assert_eq!(enriched[0].matched_at, seeded);
    Ok(())
}

#[tokio::test]
async fn self_match_is_a_single_row() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;

    manager.add_match(alice, alice, Timestamp::now_micros()).await?;
    assert_eq!(manager.store().edges_from(alice).await?.len(), 1);
    assert_eq!(matched_ids(&manager, alice).await?, HashSet::from([alice]));

    manager.remove_match(alice, alice).await?;
    assert!(manager.matched_users(alice).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn direct_duplicate_insert_is_a_constraint_violation() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;

    let store = manager.store();
    store.create_edge(alice, bob, Timestamp::now_micros()).await?;
    let err = store
        .create_edge(alice, bob, Timestamp::now_micros())
        .await
        .expect_err("duplicate insert must fail");
    assert!(matches!(err, AmityError::ConstraintViolation { .. }));
    Ok(())
}
