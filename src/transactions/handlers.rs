use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{HistoryQuery, TransactionResponse},
    services,
};
use crate::{error::MarketError, state::AppState};

pub fn transaction_routes() -> Router<AppState> {
    // POST with a query string is the established contract; GET is the read-only alias.
    Router::new().route("/transactions/history", post(history).get(history))
}

#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<TransactionResponse>>, MarketError> {
    let rows = services::history(&state, &q.username).await?;
    Ok(Json(rows.into_iter().map(TransactionResponse::from).collect()))
}
