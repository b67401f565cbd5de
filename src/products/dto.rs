use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::dto::LedgerResponse;
use crate::ledger::services::LedgerWrite;
use crate::nutrition::Macros;
use crate::products::repo_types::Product;
use crate::products::services::{Portion, ProductEdit};

/// As-eaten portion: macros are absolute values for `grams` of the product.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub product_name: String,
    pub grams: i32,
    pub kcal: i32,
    pub proteins: i32,
    pub carbs: i32,
    pub fats: i32,
}

impl From<CreateProductRequest> for Portion {
    fn from(r: CreateProductRequest) -> Self {
        Portion {
            name: r.product_name,
            grams: r.grams,
            macros: Macros::new(r.kcal, r.proteins, r.carbs, r.fats),
        }
    }
}

/// Without `grams` the macros are taken as per-100g values.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub product_name: String,
    #[serde(default)]
    pub grams: Option<i32>,
    pub kcal: i32,
    pub proteins: i32,
    pub carbs: i32,
    pub fats: i32,
}

impl From<UpdateProductRequest> for ProductEdit {
    fn from(r: UpdateProductRequest) -> Self {
        ProductEdit {
            name: r.product_name,
            grams: r.grams,
            macros: Macros::new(r.kcal, r.proteins, r.carbs, r.fats),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub user_id: Uuid,
    pub grams: i32,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: Uuid,
    pub product_name: String,
    pub kcal: i32,
    pub proteins: i32,
    pub carbs: i32,
    pub fats: i32,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            product_name: p.name,
            kcal: p.kcal,
            proteins: p.proteins,
            carbs: p.carbs,
            fats: p.fats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    pub outcome: &'static str,
    pub user_day: LedgerResponse,
}

impl From<LedgerWrite> for ConsumeResponse {
    fn from(w: LedgerWrite) -> Self {
        Self {
            outcome: w.kind(),
            user_day: w.into_row().into(),
        }
    }
}
