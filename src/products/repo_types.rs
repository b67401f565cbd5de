use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::nutrition::Macros;
use crate::store::{Audit, PgQueryAs, Record};

/// Catalog entry; macro columns are always per 100 g.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    #[sqlx(rename = "product_name")]
    pub name: String,
    pub kcal: i32,
    pub proteins: i32,
    pub carbs: i32,
    pub fats: i32,
}

impl Product {
    pub fn new(id: Uuid, name: String, per_100g: Macros) -> Self {
        Self {
            id,
            audit: Audit::pending(),
            name,
            kcal: per_100g.kcal,
            proteins: per_100g.proteins,
            carbs: per_100g.carbs,
            fats: per_100g.fats,
        }
    }

    pub fn per_100g(&self) -> Macros {
        Macros::new(self.kcal, self.proteins, self.carbs, self.fats)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: String,
    pub per_100g: Macros,
}

impl Record for Product {
    type Patch = ProductPatch;

    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &["product_name", "kcal", "proteins", "carbs", "fats"];
    const UPDATE_COLUMNS: &'static [&'static str] = Self::COLUMNS;

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
        q.bind(&self.name)
            .bind(self.kcal)
            .bind(self.proteins)
            .bind(self.carbs)
            .bind(self.fats)
    }

    fn bind_patch<'q, O>(patch: &'q ProductPatch, q: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        q.bind(&patch.name)
            .bind(patch.per_100g.kcal)
            .bind(patch.per_100g.proteins)
            .bind(patch.per_100g.carbs)
            .bind(patch.per_100g.fats)
    }

    fn apply_patch(&mut self, patch: &ProductPatch) -> bool {
        if self.name == patch.name && self.per_100g() == patch.per_100g {
            return false;
        }
        self.name = patch.name.clone();
        self.kcal = patch.per_100g.kcal;
        self.proteins = patch.per_100g.proteins;
        self.carbs = patch.per_100g.carbs;
        self.fats = patch.per_100g.fats;
        true
    }
}
