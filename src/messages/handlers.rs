use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{MessageResponse, SendMessageRequest},
    services,
};
use crate::{error::MarketError, state::AppState, store::Message};

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages/", post(send_message))
        .route("/messages", post(send_message))
        .route("/messages/:user_id", get(inbox))
        .route("/messages/:user_id/:other_user_id", get(thread))
}

fn respond(rows: Vec<Message>) -> Json<Vec<MessageResponse>> {
    Json(rows.into_iter().map(MessageResponse::from).collect())
}

#[instrument(skip(state, payload), fields(sender_id = payload.sender_id, receiver_id = payload.receiver_id))]
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, MarketError> {
    let message =
        services::send_message(&state, payload.sender_id, payload.receiver_id, &payload.content)
            .await?;
    Ok(Json(message.into()))
}

#[instrument(skip(state))]
pub async fn thread(
    State(state): State<AppState>,
    Path((user_id, other_user_id)): Path<(i32, i32)>,
) -> Result<Json<Vec<MessageResponse>>, MarketError> {
    Ok(respond(services::thread(&state, user_id, other_user_id).await?))
}

#[instrument(skip(state))]
pub async fn inbox(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<MessageResponse>>, MarketError> {
    Ok(respond(services::inbox(&state, user_id).await?))
}
