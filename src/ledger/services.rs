use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::repo::LedgerStore;
use crate::ledger::repo_types::DailyLedger;
use crate::nutrition::Macros;
use crate::store::UpdateOutcome;

pub use crate::ledger::repo::LedgerWrite;

/// Source of "today" for the ledger.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

/// Calendar day in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Date);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

/// Turns consumption events into additive writes on today's ledger row.
#[derive(Clone)]
pub struct Accumulator {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl Accumulator {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn accumulate(&self, user_id: Uuid, deltas: Macros) -> AppResult<LedgerWrite> {
        deltas.ensure_non_negative()?;
        let today = self.clock.today();
        let write = self.store.accumulate(user_id, today, deltas).await?;
        info!(
            %user_id,
            date = %today,
            ledger_id = %write.row().id,
            outcome = write.kind(),
            kcal = write.row().daily_kcal,
            "consumption logged"
        );
        Ok(write)
    }
}

pub async fn create_ledger(
    store: &dyn LedgerStore,
    user_id: Uuid,
    date: Date,
    totals: Macros,
) -> AppResult<DailyLedger> {
    totals.ensure_non_negative()?;
    let row = store
        .create(DailyLedger::new(Uuid::new_v4(), user_id, date, totals))
        .await?;
    info!(ledger_id = %row.id, %user_id, %date, "ledger row created");
    Ok(row)
}

/// Replaces the nutrition totals of a row; owner and date stay as created.
pub async fn update_ledger(
    store: &dyn LedgerStore,
    id: Uuid,
    totals: Macros,
) -> AppResult<DailyLedger> {
    totals.ensure_non_negative()?;
    match store.update_fields(id, &totals).await?.outcome() {
        UpdateOutcome::NotFound => Err(AppError::NotFound),
        UpdateOutcome::Unchanged | UpdateOutcome::Updated => store.read(id).await,
    }
}
