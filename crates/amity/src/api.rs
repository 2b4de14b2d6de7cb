use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AmityResult, Timestamp, UserId};

/// A user as returned by plain read paths. Carries no edge metadata; the
/// match timestamp only exists on [`MatchedUser`], so it cannot leak into
/// entities loaded by id or listed without the enriched query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub handle: String,
    pub created_at: Timestamp,
}

/// Directed relationship record. The reciprocal record with source and
/// target swapped is managed by [`crate::MatchManager`], never by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEdge {
    pub source_id: UserId,
    pub target_id: UserId,
    pub created_at: Timestamp,
}

/// Enriched projection result: a user plus the creation time of the edge
/// that links them to the queried user. Valid only for the query that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedUser {
    pub user: User,
    pub matched_at: Timestamp,
}

#[derive(Clone, Debug)]
pub struct CreateUserInput {
    pub user_id: UserId,
    pub handle: String,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait MatchReadApi {
    /// Users E such that the edge (user, E) exists, in edge-creation order.
    async fn matched_users(&self, user: UserId) -> AmityResult<Vec<User>>;

    /// Same set as [`MatchReadApi::matched_users`], with each user paired
    /// with the edge's creation timestamp.
    async fn matched_users_with_match_data(&self, user: UserId)
        -> AmityResult<Vec<MatchedUser>>;

    /// Cardinality of the matched set, counted over distinct user identity.
    /// Identical for the plain and enriched read modes.
    async fn matched_count(&self, user: UserId) -> AmityResult<u64>;

    async fn is_matched(&self, user: UserId, other: UserId) -> AmityResult<bool>;
}

#[async_trait]
pub trait MatchWriteApi {
    async fn add_match(
        &self,
        user: UserId,
        other: UserId,
        matched_at: Timestamp,
    ) -> AmityResult<()>;

    async fn remove_match(&self, user: UserId, other: UserId) -> AmityResult<()>;

    async fn replace_matches(
        &self,
        user: UserId,
        desired: &[UserId],
        matched_at: Timestamp,
    ) -> AmityResult<()>;

    async fn remove_all(&self, user: UserId) -> AmityResult<()>;
}
