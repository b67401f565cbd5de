use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::ledger::services::{Accumulator, LedgerWrite};
use crate::nutrition::Macros;
use crate::products::repo_types::{Product, ProductPatch};
use crate::store::{EntityStore, UpdateOutcome};

/// Converts the macros measured for a `grams` portion into per-100g values,
/// truncating toward zero.
pub fn normalize(grams: i32, portion: Macros) -> AppResult<Macros> {
    if grams <= 0 {
        return Err(AppError::invalid("grams must be greater than zero"));
    }
    portion.ensure_non_negative()?;
    portion.rescale(100, i64::from(grams))
}

/// Absolute macros eaten when consuming `grams` of a per-100g product.
pub fn scale_portion(per_100g: Macros, grams: i32) -> AppResult<Macros> {
    if grams <= 0 {
        return Err(AppError::invalid("grams must be greater than zero"));
    }
    per_100g.rescale(i64::from(grams), 100)
}

/// As-eaten portion as reported by the user.
#[derive(Debug, Clone)]
pub struct Portion {
    pub name: String,
    pub grams: i32,
    pub macros: Macros,
}

/// Product edit. With `grams` the macros describe a fresh portion and are
/// normalized; without it they are already per 100 g.
#[derive(Debug, Clone)]
pub struct ProductEdit {
    pub name: String,
    pub grams: Option<i32>,
    pub macros: Macros,
}

fn ensure_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::invalid("product_name is required"));
    }
    Ok(())
}

pub async fn create_product(
    store: &dyn EntityStore<Product>,
    portion: Portion,
) -> AppResult<Product> {
    ensure_name(&portion.name)?;
    let per_100g = normalize(portion.grams, portion.macros)?;
    let product = store
        .create(Product::new(Uuid::new_v4(), portion.name, per_100g))
        .await?;
    info!(product_id = %product.id, name = %product.name, "product created");
    Ok(product)
}

pub async fn update_product(
    store: &dyn EntityStore<Product>,
    id: Uuid,
    edit: ProductEdit,
) -> AppResult<Product> {
    ensure_name(&edit.name)?;
    let per_100g = match edit.grams {
        Some(grams) => normalize(grams, edit.macros)?,
        None => {
            edit.macros.ensure_non_negative()?;
            edit.macros
        }
    };
    let patch = ProductPatch {
        name: edit.name,
        per_100g,
    };
    match store.update_fields(id, &patch).await?.outcome() {
        UpdateOutcome::NotFound => Err(AppError::NotFound),
        UpdateOutcome::Unchanged | UpdateOutcome::Updated => store.read(id).await,
    }
}

/// Logs `grams` of a catalog product into the user's ledger for today.
pub async fn consume_product(
    products: &dyn EntityStore<Product>,
    accumulator: &Accumulator,
    product_id: Uuid,
    user_id: Uuid,
    grams: i32,
) -> AppResult<LedgerWrite> {
    let product = products.read(product_id).await?;
    let eaten = scale_portion(product.per_100g(), grams)?;
    accumulator.accumulate(user_id, eaten).await
}
