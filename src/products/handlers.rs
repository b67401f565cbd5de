use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    products::{
        dto::{
            ConsumeRequest, ConsumeResponse, CreateProductRequest, ProductResponse,
            UpdateProductRequest,
        },
        services,
    },
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(read_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/consume", post(consume_product))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProductResponse>>> {
    let rows = state.products.list().await?;
    Ok(Json(rows.into_iter().map(ProductResponse::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_product(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ProductResponse>)> {
    let product = services::create_product(state.products.as_ref(), body.into()).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state))]
pub async fn read_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ProductResponse>> {
    Ok(Json(state.products.read(id).await?.into()))
}

#[instrument(skip(state, body))]
pub async fn update_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateProductRequest>,
) -> AppResult<Json<ProductResponse>> {
    let product = services::update_product(state.products.as_ref(), id, body.into()).await?;
    Ok(Json(product.into()))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    if state.products.soft_delete(id).await? == 0 {
        return Err(AppError::NotFound);
    }
    info!(product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn consume_product(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<ConsumeRequest>,
) -> AppResult<Json<ConsumeResponse>> {
    let write = services::consume_product(
        state.products.as_ref(),
        &state.accumulator,
        id,
        body.user_id,
        body.grams,
    )
    .await?;
    Ok(Json(write.into()))
}
