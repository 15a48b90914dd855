use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::{
    dto::{Credentials, PublicUser},
    services,
};
use crate::{error::MarketError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", post(register))
        .route("/users", post(register))
        .route("/users/login", post(login))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<PublicUser>, MarketError> {
    let user = services::register(&state, &payload.username, &payload.password).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<PublicUser>, MarketError> {
    let user = services::login(&state, &payload.username, &payload.password).await?;
    Ok(Json(user.into()))
}
