//! Generic persistence for the three record kinds.
//!
//! Every record carries the same audit columns and follows one visibility
//! rule: a row whose `deleted_at` is set is absent from reads, lists, updates
//! and deletes. Each kind only declares its table, its columns and which of
//! them an update may touch.

pub mod memory;
pub mod pg;

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgArguments, query::QueryAs, FromRow, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type PgQueryAs<'q, O> = QueryAs<'q, Postgres, O, PgArguments>;

/// Timestamps shared by all records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Audit {
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl Audit {
    /// Placeholder for a record that has not reached the store yet.
    pub fn pending() -> Self {
        Self {
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A record kind the stores know how to persist.
pub trait Record:
    for<'r> FromRow<'r, sqlx::postgres::PgRow> + Clone + Send + Sync + Unpin + 'static
{
    /// Fields an update is allowed to write.
    type Patch: Clone + Send + Sync + 'static;

    const TABLE: &'static str;
    /// Kind-specific columns, in the order `bind_fields` binds them.
    const COLUMNS: &'static [&'static str];
    /// Subset of `COLUMNS`, in the order `bind_patch` binds them.
    const UPDATE_COLUMNS: &'static [&'static str];

    fn id(&self) -> Uuid;
    fn audit(&self) -> &Audit;
    fn audit_mut(&mut self) -> &mut Audit;

    fn bind_fields<'q, O>(&'q self, q: PgQueryAs<'q, O>) -> PgQueryAs<'q, O>;
    fn bind_patch<'q, O>(patch: &'q Self::Patch, q: PgQueryAs<'q, O>) -> PgQueryAs<'q, O>;

    /// Writes the patch into the record; `false` when every value was equal.
    fn apply_patch(&mut self, patch: &Self::Patch) -> bool;
}

/// Whether soft-deleted rows may still be targeted by `update_fields`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedRows {
    #[default]
    Hidden,
    Updatable,
}

impl DeletedRows {
    pub fn from_flag(updatable: bool) -> Self {
        if updatable {
            DeletedRows::Updatable
        } else {
            DeletedRows::Hidden
        }
    }
}

/// Result of `update_fields`: the affected-row count plus whether the target
/// row was visible at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub rows_affected: u64,
    pub found: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    NotFound,
    Unchanged,
    Updated,
}

impl UpdateResult {
    pub fn outcome(&self) -> UpdateOutcome {
        match (self.found, self.rows_affected) {
            (false, _) => UpdateOutcome::NotFound,
            (true, 0) => UpdateOutcome::Unchanged,
            (true, _) => UpdateOutcome::Updated,
        }
    }
}

#[async_trait]
pub trait EntityStore<R: Record>: Send + Sync {
    async fn list(&self) -> AppResult<Vec<R>>;
    async fn create(&self, record: R) -> AppResult<R>;
    async fn read(&self, id: Uuid) -> AppResult<R>;
    async fn update_fields(&self, id: Uuid, patch: &R::Patch) -> AppResult<UpdateResult>;
    async fn soft_delete(&self, id: Uuid) -> AppResult<u64>;
}

/// Bounds a storage call; on expiry the call is dropped and the caller gets
/// `DeadlineExceeded`.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AppError::DeadlineExceeded(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_distinguishes_missing_from_no_op() {
        let missing = UpdateResult { rows_affected: 0, found: false };
        let no_op = UpdateResult { rows_affected: 0, found: true };
        let written = UpdateResult { rows_affected: 1, found: true };
        assert_eq!(missing.outcome(), UpdateOutcome::NotFound);
        assert_eq!(no_op.outcome(), UpdateOutcome::Unchanged);
        assert_eq!(written.outcome(), UpdateOutcome::Updated);
    }

    #[tokio::test]
    async fn deadline_expires_slow_calls() {
        let limit = Duration::from_millis(10);
        let res: AppResult<()> = with_deadline(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(AppError::DeadlineExceeded(d)) if d == limit));
    }

    #[tokio::test]
    async fn deadline_passes_through_results() {
        let res = with_deadline(Duration::from_secs(1), async { Ok::<_, AppError>(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }
}
