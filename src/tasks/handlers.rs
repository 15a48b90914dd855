use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{ChooseTaskRequest, CompleteTaskRequest, CreateTaskRequest, TaskResponse},
    services,
};
use crate::{error::MarketError, state::AppState};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks/", post(create_task))
        .route("/tasks", post(create_task))
        .route("/tasks/choose", post(choose_task))
        .route("/tasks/complete", post(complete_task))
        .route("/tasks/all", get(list_tasks))
}

#[instrument(skip(state, payload), fields(username = %payload.username, karma_cost = payload.karma_cost))]
pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>, MarketError> {
    let task = services::create_task(
        &state,
        &payload.description,
        payload.karma_cost,
        &payload.username,
        &payload.password,
    )
    .await?;
    Ok(Json(task.into()))
}

#[instrument(skip(state, payload), fields(username = %payload.username, task_id = payload.task_id))]
pub async fn choose_task(
    State(state): State<AppState>,
    Json(payload): Json<ChooseTaskRequest>,
) -> Result<Json<TaskResponse>, MarketError> {
    let task =
        services::choose_task(&state, payload.task_id, &payload.username, &payload.password)
            .await?;
    Ok(Json(task.into()))
}

#[instrument(skip(state, payload), fields(username = %payload.username, task_id = payload.task_id))]
pub async fn complete_task(
    State(state): State<AppState>,
    Json(payload): Json<CompleteTaskRequest>,
) -> Result<Json<TaskResponse>, MarketError> {
    let task = services::complete_task(
        &state,
        payload.task_id,
        &payload.username,
        &payload.password,
        payload.reputation_rating,
    )
    .await?;
    Ok(Json(task.into()))
}

#[instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskResponse>>, MarketError> {
    let tasks = services::list_tasks(&state).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_is_optional() {
        let req: CompleteTaskRequest = serde_json::from_str(
            r#"{"task_id": 3, "username": "a", "password": "pw"}"#,
        )
        .unwrap();
        assert_eq!(req.task_id, 3);
        assert_eq!(req.reputation_rating, None);

        let req: CompleteTaskRequest = serde_json::from_str(
            r#"{"task_id": 3, "username": "a", "password": "pw", "reputation_rating": null}"#,
        )
        .unwrap();
        assert_eq!(req.reputation_rating, None);
    }

    #[test]
    fn open_task_serializes_null_claimant() {
        let json = serde_json::to_value(TaskResponse {
            id: 1,
            description: "fix bike".into(),
            karma_cost: 100,
            owner_id: 2,
            chosen_by_id: None,
        })
        .unwrap();
        assert!(json["chosen_by_id"].is_null());
        assert_eq!(json["karma_cost"], 100);
    }
}
