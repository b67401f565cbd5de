use serde::{Deserialize, Serialize};
use time::{macros::format_description, Date};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::repo_types::DailyLedger;
use crate::ledger::services::LedgerWrite;
use crate::nutrition::Macros;

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> AppResult<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid(format!("invalid date {raw:?}, expected YYYY-MM-DD")))
}

#[derive(Debug, Deserialize)]
pub struct CreateLedgerRequest {
    pub user_id: Uuid,
    pub user_date: String,
    pub daily_kcal: i32,
    pub daily_proteins: i32,
    pub daily_carbs: i32,
    pub daily_fats: i32,
}

impl CreateLedgerRequest {
    pub fn totals(&self) -> Macros {
        Macros::new(
            self.daily_kcal,
            self.daily_proteins,
            self.daily_carbs,
            self.daily_fats,
        )
    }
}

/// Only the nutrition totals are writable; any other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct UpdateLedgerRequest {
    pub daily_kcal: i32,
    pub daily_proteins: i32,
    pub daily_carbs: i32,
    pub daily_fats: i32,
}

impl From<UpdateLedgerRequest> for Macros {
    fn from(r: UpdateLedgerRequest) -> Self {
        Macros::new(r.daily_kcal, r.daily_proteins, r.daily_carbs, r.daily_fats)
    }
}

#[derive(Debug, Deserialize)]
pub struct AccumulateRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub deltas: Macros,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(alias = "userId")]
    pub user_id: Uuid,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_date: String,
    pub daily_kcal: i32,
    pub daily_proteins: i32,
    pub daily_carbs: i32,
    pub daily_fats: i32,
}

impl From<DailyLedger> for LedgerResponse {
    fn from(r: DailyLedger) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            user_date: r.user_date.to_string(),
            daily_kcal: r.daily_kcal,
            daily_proteins: r.daily_proteins,
            daily_carbs: r.daily_carbs,
            daily_fats: r.daily_fats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccumulateResponse {
    pub outcome: &'static str,
    pub user_day: LedgerResponse,
}

impl From<LedgerWrite> for AccumulateResponse {
    fn from(w: LedgerWrite) -> Self {
        Self {
            outcome: w.kind(),
            user_day: w.into_row().into(),
        }
    }
}
