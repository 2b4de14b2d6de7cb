use std::collections::HashSet;
use std::path::Path;

use amity::{
    AmityResult, AmityStore, CreateUserInput, Id, MatchManager, MatchReadApi, MatchWriteApi,
    Timestamp, UserId,
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
async fn replace_converges_to_desired_set() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;
    let carol = new_user(&manager, "carol").await?;
    let dave = new_user(&manager, "dave").await?;

    manager
        .replace_matches(alice, &[bob, carol], Timestamp::now_micros())
        .await?;
    assert_eq!(matched_ids(&manager, alice).await?, HashSet::from([bob, carol]));
    assert_eq!(matched_ids(&manager, bob).await?, HashSet::from([alice]));
    assert_eq!(matched_ids(&manager, carol).await?, HashSet::from([alice]));

    manager
        .replace_matches(alice, &[carol, dave], Timestamp::now_micros())
        .await?;
    assert_eq!(matched_ids(&manager, alice).await?, HashSet::from([carol, dave]));
    assert!(manager.matched_users(bob).await?.is_empty());
    assert_eq!(matched_ids(&manager, dave).await?, HashSet::from([alice]));
    Ok(())
}

#[tokio::test]
async fn replace_leaves_surviving_edges_untouched() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;
    let carol = new_user(&manager, "carol").await?;

    let original = Timestamp::from_i64(1_000);
    let later = Timestamp::from_i64(2_000);
    manager.add_match(alice, bob, original).await?;
    manager.replace_matches(alice, &[bob, carol], later).await?;

    let by_id: std::collections::HashMap<UserId, Timestamp> = manager
        .matched_users_with_match_data(alice)
        .await?
        .into_iter()
        .map(|matched| (matched.user.user_id, matched.matched_at))
        .collect();
    assert_eq!(by_id[&bob], original, "kept edge must not be re-stamped");
    assert_eq!(by_id[&carol], later);
    Ok(())
}

#[tokio::test]
async fn replace_to_empty_clears_reciprocals() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;

    manager
        .replace_matches(alice, &[bob], Timestamp::now_micros())
        .await?;
    manager
        .replace_matches(alice, &[], Timestamp::now_micros())
        .await?;

    assert!(manager.matched_users(alice).await?.is_empty());
    assert!(manager.matched_users(bob).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn remove_all_clears_every_pair() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let alice = new_user(&manager, "alice").await?;
    let bob = new_user(&manager, "bob").await?;
    let carol = new_user(&manager, "carol").await?;

    manager.add_match(alice, bob, Timestamp::now_micros()).await?;
    manager.add_match(alice, carol, Timestamp::now_micros()).await?;
    manager.remove_all(alice).await?;

    assert!(manager.matched_users(alice).await?.is_empty());
    assert!(manager.matched_users(bob).await?.is_empty());
    assert!(manager.matched_users(carol).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn symmetry_holds_after_mixed_mutations() -> AmityResult<()> {
    let dir = tempdir().expect("tempdir");
    let manager = open_manager(dir.path()).await?;
    let users = [
        new_user(&manager, "a").await?,
        new_user(&manager, "b").await?,
        new_user(&manager, "c").await?,
        new_user(&manager, "d").await?,
    ];

    manager.add_match(users[0], users[1], Timestamp::now_micros()).await?;
    manager
        .replace_matches(users[0], &[users[1], users[2]], Timestamp::now_micros())
        .await?;
    manager.remove_match(users[1], users[0]).await?;
    manager.add_match(users[3], users[0], Timestamp::now_micros()).await?;

    for a in users {
        for b in users {
            assert_eq!(
                manager.is_matched(a, b).await?,
                manager.is_matched(b, a).await?,
                "symmetry broken between {a} and {b}"
            );
        }
    }
    Ok(())
}
