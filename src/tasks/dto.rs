use serde::{Deserialize, Serialize};

use crate::store::Task;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub description: String,
    pub karma_cost: i32,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChooseTaskRequest {
    pub task_id: i32,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteTaskRequest {
    pub task_id: i32,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub reputation_rating: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i32,
    pub description: String,
    pub karma_cost: i32,
    pub owner_id: i32,
    pub chosen_by_id: Option<i32>,
}

impl From<Task> for TaskResponse {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            description: t.description,
            karma_cost: t.karma_cost,
            owner_id: t.owner_id,
            chosen_by_id: t.chosen_by_id,
        }
    }
}
