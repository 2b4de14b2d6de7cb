use std::collections::HashSet;

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, ExprTrait, Order, Query};
use sea_orm::TransactionTrait;

use crate::api::{MatchReadApi, MatchWriteApi, MatchedUser, User};
use crate::db::{AmityMatchEdges, AmityUsers};
use crate::store::{id_value, query_all, read_user, AmityStore};
use crate::{AmityResult, Timestamp, UserId};

/// Presents each user's matches as a symmetric, set-like collection.
///
/// Every mutation keeps the reciprocal edge in step: creating (A, B) creates
/// (B, A) in the same transaction unless it already exists, and deleting
/// (A, B) deletes (B, A) with it. The existence check before each half is the
/// fixed-point guard that makes the operations idempotent and terminating;
/// a self-edge (A, A) is its own reciprocal and is written exactly once.
#[derive(Clone)]
pub struct MatchManager {
    store: AmityStore,
}

impl MatchManager {
    pub fn new(store: AmityStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &AmityStore {
        &self.store
    }
}

#[async_trait]
impl MatchReadApi for MatchManager {
    async fn matched_users(&self, user: UserId) -> AmityResult<Vec<User>> {
        // One row per target by the composite PK on the edge table.
        let select = Query::select()
            .from(AmityMatchEdges::Table)
            .inner_join(
                AmityUsers::Table,
                Expr::col((AmityUsers::Table, AmityUsers::UserId))
                    .equals((AmityMatchEdges::Table, AmityMatchEdges::TargetId)),
            )
            .column((AmityUsers::Table, AmityUsers::UserId))
            .column((AmityUsers::Table, AmityUsers::Handle))
            .column((AmityUsers::Table, AmityUsers::CreatedAt))
            .and_where(
                Expr::col((AmityMatchEdges::Table, AmityMatchEdges::SourceId))
                    .eq(id_value(self.store.backend(), user.0)),
            )
            .order_by(
                (AmityMatchEdges::Table, AmityMatchEdges::CreatedAt),
                Order::Asc,
            )
            .order_by(
                (AmityMatchEdges::Table, AmityMatchEdges::TargetId),
                Order::Asc,
            )
            .to_owned();
        let rows = query_all(self.store.connection(), &select).await?;
        rows.iter().map(read_user).collect()
    }

    async fn matched_users_with_match_data(
        &self,
        user: UserId,
    ) -> AmityResult<Vec<MatchedUser>> {
        let select = Query::select()
            .from(AmityMatchEdges::Table)
            .inner_join(
                AmityUsers::Table,
                Expr::col((AmityUsers::Table, AmityUsers::UserId))
                    .equals((AmityMatchEdges::Table, AmityMatchEdges::TargetId)),
            )
            .column((AmityUsers::Table, AmityUsers::UserId))
            .column((AmityUsers::Table, AmityUsers::Handle))
            .column((AmityUsers::Table, AmityUsers::CreatedAt))
            .expr_as(
                Expr::col((AmityMatchEdges::Table, AmityMatchEdges::CreatedAt)),
                Alias::new("matched_at"),
            )
            .and_where(
                Expr::col((AmityMatchEdges::Table, AmityMatchEdges::SourceId))
                    .eq(id_value(self.store.backend(), user.0)),
            )
            .order_by(
                (AmityMatchEdges::Table, AmityMatchEdges::CreatedAt),
                Order::Asc,
            )
            .order_by(
                (AmityMatchEdges::Table, AmityMatchEdges::TargetId),
                Order::Asc,
            )
            .to_owned();
        let rows = query_all(self.store.connection(), &select).await?;
        rows.iter()
            .map(|row| {
                let user = read_user(row)?;
                let matched_at: i64 = row.try_get("", "matched_at")?;
                Ok(MatchedUser {
                    user,
                    matched_at: Timestamp::from_i64(matched_at),
                })
            })
            .collect()
    }

    async fn matched_count(&self, user: UserId) -> AmityResult<u64> {
        self.store.related_count(user).await
    }

    async fn is_matched(&self, user: UserId, other: UserId) -> AmityResult<bool> {
        self.store.edge_exists(user, other).await
    }
}

#[async_trait]
impl MatchWriteApi for MatchManager {
    /// Create the pair of edges linking `user` and `other`, stamping both
    /// with `matched_at`. Idempotent: directions that already exist are left
    /// untouched, timestamps included. Both halves commit or roll back
    /// together.
    async fn add_match(
        &self,
        user: UserId,
        other: UserId,
        matched_at: Timestamp,
    ) -> AmityResult<()> {
        let tx = self.store.connection().begin().await?;
        if !self.store.edge_exists_on(&tx, user, other).await? {
            self.store
                .insert_edge_on(&tx, user, other, matched_at)
                .await?;
        }
        if user != other && !self.store.edge_exists_on(&tx, other, user).await? {
            self.store
                .insert_edge_on(&tx, other, user, matched_at)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete the edge (user, other) and, per removed record, its reciprocal.
    /// No-op when the edge does not exist. Both halves commit or roll back
    /// together.
    async fn remove_match(&self, user: UserId, other: UserId) -> AmityResult<()> {
        let tx = self.store.connection().begin().await?;
        if let Some(removed) = self.store.delete_edge_on(&tx, user, other).await? {
            if removed.source_id != removed.target_id {
                self.store.delete_edge_on(&tx, other, user).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Converge the matched set of `user` to exactly `desired`: add what is
    /// missing (stamped `matched_at`), remove what is stale, and leave the
    /// intersection untouched so surviving edges keep their original
    /// timestamps. Reciprocals follow each sub-operation.
    ///
    /// Atomicity is per edge pair, not per batch: each add or remove commits
    /// both directions together, but a failure mid-batch returns the error
    /// with earlier sub-operations already applied. The graph is symmetric
    /// after every sub-operation, so a partial batch never breaks the
    /// invariant; callers that need convergence retry the whole call.
    async fn replace_matches(
        &self,
        user: UserId,
        desired: &[UserId],
        matched_at: Timestamp,
    ) -> AmityResult<()> {
        let current: HashSet<UserId> = self
            .store
            .edges_from(user)
            .await?
            .iter()
            .map(|edge| edge.target_id)
            .collect();
        let desired_set: HashSet<UserId> = desired.iter().copied().collect();

        for &other in desired {
            if !current.contains(&other) {
                if let Err(err) = self.add_match(user, other, matched_at).await {
                    log::warn!(
                        "replace_matches for {user} aborted while adding {other}; earlier changes remain applied"
                    );
                    return Err(err);
                }
            }
        }
        for other in current {
            if !desired_set.contains(&other) {
                if let Err(err) = self.remove_match(user, other).await {
                    log::warn!(
                        "replace_matches for {user} aborted while removing {other}; earlier changes remain applied"
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Remove every match of `user`, reciprocals included. Equivalent to
    /// `replace_matches(user, &[], ..)`.
    async fn remove_all(&self, user: UserId) -> AmityResult<()> {
        for edge in self.store.edges_from(user).await? {
            self.remove_match(user, edge.target_id).await?;
        }
        Ok(())
    }
}
