use serde::Serialize;
use sqlx::FromRow;
use time::Date;
use uuid::Uuid;

use crate::nutrition::Macros;
use crate::store::{Audit, PgQueryAs, Record};

/// One user's nutrition totals for one calendar day.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyLedger {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub user_id: Uuid,
    pub user_date: Date,
    pub daily_kcal: i32,
    pub daily_proteins: i32,
    pub daily_carbs: i32,
    pub daily_fats: i32,
}

impl DailyLedger {
    pub fn new(id: Uuid, user_id: Uuid, user_date: Date, totals: Macros) -> Self {
        Self {
            id,
            audit: Audit::pending(),
            user_id,
            user_date,
            daily_kcal: totals.kcal,
            daily_proteins: totals.proteins,
            daily_carbs: totals.carbs,
            daily_fats: totals.fats,
        }
    }

    pub fn totals(&self) -> Macros {
        Macros::new(
            self.daily_kcal,
            self.daily_proteins,
            self.daily_carbs,
            self.daily_fats,
        )
    }

    pub(crate) fn set_totals(&mut self, totals: Macros) {
        self.daily_kcal = totals.kcal;
        self.daily_proteins = totals.proteins;
        self.daily_carbs = totals.carbs;
        self.daily_fats = totals.fats;
    }
}

impl Record for DailyLedger {
    /// user_id and user_date never change after creation.
    type Patch = Macros;

    const TABLE: &'static str = "user_days";
    const COLUMNS: &'static [&'static str] = &[
        "user_id",
        "user_date",
        "daily_kcal",
        "daily_proteins",
        "daily_carbs",
        "daily_fats",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] =
        &["daily_kcal", "daily_proteins", "daily_carbs", "daily_fats"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn bind_fields<'q, O>(&'q self, q: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        q.bind(self.user_id)
            .bind(self.user_date)
            .bind(self.daily_kcal)
            .bind(self.daily_proteins)
            .bind(self.daily_carbs)
            .bind(self.daily_fats)
    }

    fn bind_patch<'q, O>(patch: &'q Macros, q: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        q.bind(patch.kcal)
            .bind(patch.proteins)
            .bind(patch.carbs)
            .bind(patch.fats)
    }

    fn apply_patch(&mut self, patch: &Macros) -> bool {
        if self.totals() == *patch {
            return false;
        }
        self.set_totals(*patch);
        true
    }
}
