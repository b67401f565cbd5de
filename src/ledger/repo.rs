use async_trait::async_trait;
use time::Date;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::repo_types::DailyLedger;
use crate::nutrition::Macros;
use crate::store::{with_deadline, EntityStore, MemoryStore, PgStore, Record};

/// What an accumulation did to the day's row.
#[derive(Debug, Clone)]
pub enum LedgerWrite {
    Created(DailyLedger),
    Updated(DailyLedger),
    /// Zero deltas against an existing row; nothing was written.
    Unchanged(DailyLedger),
}

impl LedgerWrite {
    pub fn row(&self) -> &DailyLedger {
        match self {
            LedgerWrite::Created(r) | LedgerWrite::Updated(r) | LedgerWrite::Unchanged(r) => r,
        }
    }

    pub fn into_row(self) -> DailyLedger {
        match self {
            LedgerWrite::Created(r) | LedgerWrite::Updated(r) | LedgerWrite::Unchanged(r) => r,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerWrite::Created(_) => "created",
            LedgerWrite::Updated(_) => "updated",
            LedgerWrite::Unchanged(_) => "unchanged",
        }
    }
}

#[derive(Debug)]
pub(crate) enum Plan {
    Create(DailyLedger),
    Update { row: DailyLedger, totals: Macros },
    Keep(DailyLedger),
}

/// Decides the single write for one consumption event given the day's
/// current row, if any.
pub(crate) fn plan_consumption(
    existing: Option<DailyLedger>,
    user_id: Uuid,
    date: Date,
    deltas: Macros,
) -> AppResult<Plan> {
    match existing {
        Some(row) if deltas.is_zero() => Ok(Plan::Keep(row)),
        Some(row) => {
            let totals = row.totals().checked_add(&deltas)?;
            Ok(Plan::Update { row, totals })
        }
        None => Ok(Plan::Create(DailyLedger::new(
            Uuid::new_v4(),
            user_id,
            date,
            deltas,
        ))),
    }
}

/// Ledger-specific queries on top of the generic store.
#[async_trait]
pub trait LedgerStore: EntityStore<DailyLedger> {
    /// Oldest visible row for exactly this user and day.
    async fn find_by_user_and_date(&self, user_id: Uuid, date: Date) -> AppResult<DailyLedger>;

    /// Folds `deltas` into the (user, date) row, creating it when missing.
    /// Runs as one atomic step per key so concurrent events all count.
    async fn accumulate(&self, user_id: Uuid, date: Date, deltas: Macros)
        -> AppResult<LedgerWrite>;
}

fn find_sql(columns: &str, for_update: bool) -> String {
    format!(
        "SELECT {columns} FROM user_days \
         WHERE user_id = $1 AND user_date = $2 AND deleted_at IS NULL \
         ORDER BY created_at LIMIT 1{lock}",
        lock = if for_update { " FOR UPDATE" } else { "" },
    )
}

fn accumulate_update_sql(columns: &str) -> String {
    format!(
        "UPDATE user_days SET daily_kcal = $2, daily_proteins = $3, daily_carbs = $4, \
         daily_fats = $5, updated_at = now() \
         WHERE id = $1 AND deleted_at IS NULL RETURNING {columns}"
    )
}

/// The row picked under the day lock must still be writable; an update that
/// reaches nothing is a conflict, never a silent success.
fn row_or_conflict<T>(written: Option<T>, id: Uuid) -> AppResult<T> {
    written.ok_or_else(|| {
        AppError::ConcurrencyConflict(format!("user_days row {id} changed during accumulation"))
    })
}

const DAY_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

fn day_lock_key(user_id: Uuid, date: Date) -> String {
    format!("user_days:{user_id}:{date}")
}

#[async_trait]
impl LedgerStore for PgStore<DailyLedger> {
    async fn find_by_user_and_date(&self, user_id: Uuid, date: Date) -> AppResult<DailyLedger> {
        let sql = find_sql(&self.sql.columns, false);
        with_deadline(self.deadline, async {
            sqlx::query_as::<_, DailyLedger>(&sql)
                .bind(user_id)
                .bind(date)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(AppError::NotFound)
        })
        .await
    }

    async fn accumulate(
        &self,
        user_id: Uuid,
        date: Date,
        deltas: Macros,
    ) -> AppResult<LedgerWrite> {
        let find = find_sql(&self.sql.columns, true);
        let update = accumulate_update_sql(&self.sql.columns);
        with_deadline(self.deadline, async {
            let mut tx = self.pool.begin().await?;

            // Serializes every writer of this (user, day), including the case
            // where no row exists yet and FOR UPDATE has nothing to lock.
            sqlx::query(DAY_LOCK_SQL)
                .bind(day_lock_key(user_id, date))
                .execute(&mut *tx)
                .await?;

            let existing = sqlx::query_as::<_, DailyLedger>(&find)
                .bind(user_id)
                .bind(date)
                .fetch_optional(&mut *tx)
                .await?;

            let write = match plan_consumption(existing, user_id, date, deltas)? {
                Plan::Keep(row) => LedgerWrite::Unchanged(row),
                Plan::Update { row, totals } => {
                    let updated = sqlx::query_as::<_, DailyLedger>(&update)
                        .bind(row.id)
                        .bind(totals.kcal)
                        .bind(totals.proteins)
                        .bind(totals.carbs)
                        .bind(totals.fats)
                        .fetch_optional(&mut *tx)
                        .await?;
                    LedgerWrite::Updated(row_or_conflict(updated, row.id)?)
                }
                Plan::Create(row) => {
                    let q = sqlx::query_as::<_, DailyLedger>(&self.sql.insert).bind(row.id);
                    let created = row.bind_fields(q).fetch_one(&mut *tx).await?;
                    LedgerWrite::Created(created)
                }
            };

            tx.commit().await?;
            debug!(%user_id, %date, outcome = write.kind(), "ledger accumulated");
            Ok::<_, AppError>(write)
        })
        .await
    }
}

#[async_trait]
impl LedgerStore for MemoryStore<DailyLedger> {
    async fn find_by_user_and_date(&self, user_id: Uuid, date: Date) -> AppResult<DailyLedger> {
        let rows = self.rows.read().await;
        rows.values()
            .filter(|r| r.user_id == user_id && r.user_date == date && !r.audit.is_deleted())
            .min_by_key(|r| r.audit.created_at)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn accumulate(
        &self,
        user_id: Uuid,
        date: Date,
        deltas: Macros,
    ) -> AppResult<LedgerWrite> {
        let mut rows = self.rows.write().await;
        let existing = rows
            .values()
            .filter(|r| r.user_id == user_id && r.user_date == date && !r.audit.is_deleted())
            .min_by_key(|r| r.audit.created_at)
            .cloned();

        let write = match plan_consumption(existing, user_id, date, deltas)? {
            Plan::Keep(row) => LedgerWrite::Unchanged(row),
            Plan::Update { row, totals } => {
                let target = rows.get_mut(&row.id).filter(|r| !r.audit.is_deleted());
                let stored = row_or_conflict(target, row.id)?;
                if stored.apply_patch(&totals) {
                    stored.audit.updated_at = time::OffsetDateTime::now_utc();
                }
                LedgerWrite::Updated(stored.clone())
            }
            Plan::Create(row) => LedgerWrite::Created(Self::insert_locked(&mut rows, row)?),
        };
        debug!(%user_id, %date, outcome = write.kind(), "ledger accumulated");
        Ok(write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn plan_creates_when_no_row() {
        let user = Uuid::new_v4();
        let d = date!(2024 - 03 - 15);
        match plan_consumption(None, user, d, Macros::new(1, 2, 3, 4)).unwrap() {
            Plan::Create(row) => {
                assert_eq!(row.user_id, user);
                assert_eq!(row.user_date, d);
                assert_eq!(row.totals(), Macros::new(1, 2, 3, 4));
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn plan_adds_to_existing_row() {
        let d = date!(2024 - 03 - 15);
        let row = DailyLedger::new(Uuid::new_v4(), Uuid::new_v4(), d, Macros::new(10, 10, 10, 10));
        let plan = plan_consumption(Some(row.clone()), row.user_id, d, Macros::new(1, 2, 3, 4));
        match plan.unwrap() {
            Plan::Update { row: target, totals } => {
                assert_eq!(target.id, row.id);
                assert_eq!(totals, Macros::new(11, 12, 13, 14));
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn plan_keeps_row_for_zero_deltas() {
        let d = date!(2024 - 03 - 15);
        let row = DailyLedger::new(Uuid::new_v4(), Uuid::new_v4(), d, Macros::new(5, 5, 5, 5));
        assert!(matches!(
            plan_consumption(Some(row.clone()), row.user_id, d, Macros::ZERO).unwrap(),
            Plan::Keep(_)
        ));
    }

    #[test]
    fn update_reaching_no_row_is_a_conflict() {
        let id = Uuid::new_v4();
        let err = row_or_conflict::<DailyLedger>(None, id).unwrap_err();
        match err {
            AppError::ConcurrencyConflict(msg) => assert!(msg.contains(&id.to_string())),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(row_or_conflict(Some(7), id).unwrap(), 7);
    }

    #[test]
    fn lookup_sql_matches_user_and_day_exactly() {
        let sql = find_sql("id", true);
        assert!(sql.contains("WHERE user_id = $1 AND user_date = $2 AND deleted_at IS NULL"));
        assert!(sql.ends_with("LIMIT 1 FOR UPDATE"));
        assert!(!find_sql("id", false).contains("FOR UPDATE"));
    }

    #[test]
    fn lock_key_is_scoped_to_user_and_day() {
        let user = Uuid::nil();
        assert_eq!(
            day_lock_key(user, date!(2024 - 03 - 15)),
            "user_days:00000000-0000-0000-0000-000000000000:2024-03-15"
        );
    }
}
