use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    profiles::{
        dto::{ProfileForm, ProfileResponse},
        services,
    },
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_profiles).post(create_profile))
        .route(
            "/users/:id",
            get(read_profile).put(update_profile).delete(delete_profile),
        )
}

#[instrument(skip(state))]
pub async fn list_profiles(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProfileResponse>>> {
    let rows = state.profiles.list().await?;
    Ok(Json(rows.into_iter().map(ProfileResponse::from).collect()))
}

#[instrument(skip(state, form))]
pub async fn create_profile(
    State(state): State<AppState>,
    AppJson(form): AppJson<ProfileForm>,
) -> AppResult<(StatusCode, Json<ProfileResponse>)> {
    let profile = services::create_profile(state.profiles.as_ref(), form.into_patch()?).await?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

#[instrument(skip(state))]
pub async fn read_profile(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = state.profiles.read(id).await?;
    Ok(Json(profile.into()))
}

#[instrument(skip(state, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(form): AppJson<ProfileForm>,
) -> AppResult<Json<ProfileResponse>> {
    let profile =
        services::update_profile(state.profiles.as_ref(), id, form.into_patch()?).await?;
    Ok(Json(profile.into()))
}

#[instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    if state.profiles.soft_delete(id).await? == 0 {
        // never existed or already deleted
        return Err(AppError::NotFound);
    }
    info!(profile_id = %id, "profile deleted");
    Ok(StatusCode::NO_CONTENT)
}
