use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    ledger::{
        dto::{
            parse_date, AccumulateRequest, AccumulateResponse, CreateLedgerRequest,
            LedgerResponse, SearchQuery, UpdateLedgerRequest,
        },
        services,
    },
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/user-days", get(list_days))
        .route("/user-days/search", get(find_by_user_and_date))
        .route("/user-days/:id", get(read_day))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/user-days", post(create_day))
        .route("/user-days/accumulate", post(accumulate))
        .route("/user-days/:id", put(update_day).delete(delete_day))
}

#[instrument(skip(state))]
pub async fn list_days(State(state): State<AppState>) -> AppResult<Json<Vec<LedgerResponse>>> {
    let rows = state.ledger.list().await?;
    Ok(Json(rows.into_iter().map(LedgerResponse::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn create_day(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateLedgerRequest>,
) -> AppResult<(StatusCode, Json<LedgerResponse>)> {
    let date = parse_date(&body.user_date)?;
    let row =
        services::create_ledger(state.ledger.as_ref(), body.user_id, date, body.totals()).await?;
    Ok((StatusCode::CREATED, Json(row.into())))
}

#[instrument(skip(state))]
pub async fn read_day(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<LedgerResponse>> {
    Ok(Json(state.ledger.read(id).await?.into()))
}

#[instrument(skip(state))]
pub async fn find_by_user_and_date(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<SearchQuery>,
) -> AppResult<Json<LedgerResponse>> {
    let date = parse_date(&q.date)?;
    let row = state.ledger.find_by_user_and_date(q.user_id, date).await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, body))]
pub async fn update_day(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<UpdateLedgerRequest>,
) -> AppResult<Json<LedgerResponse>> {
    let row = services::update_ledger(state.ledger.as_ref(), id, body.into()).await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_day(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    if state.ledger.soft_delete(id).await? == 0 {
        return Err(AppError::NotFound);
    }
    info!(ledger_id = %id, "ledger row deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn accumulate(
    State(state): State<AppState>,
    AppJson(body): AppJson<AccumulateRequest>,
) -> AppResult<Json<AccumulateResponse>> {
    let write = state.accumulator.accumulate(body.user_id, body.deltas).await?;
    Ok(Json(write.into()))
}
