use sqlx::FromRow;
use time::OffsetDateTime;

/// User row. `password_hash` is an argon2 PHC string.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub karma_points: i32,
    pub reputation: Option<f64>, // mean of received ratings, null until rated
}

/// Task row. Open while `chosen_by_id` is null, claimed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Task {
    pub id: i32,
    pub description: String,
    pub karma_cost: i32,
    pub owner_id: i32,
    pub chosen_by_id: Option<i32>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.chosen_by_id.is_none()
    }
}

/// Ledger row written once when a task settles.
#[derive(Debug, Clone, FromRow)]
pub struct Transaction {
    pub id: i32,
    pub timestamp: OffsetDateTime,
    pub user_id: i32,
    pub chosen_by_id: i32,
    pub task_id: i32,
    pub karma_points: i32,
    pub description: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Reputation {
    pub id: i32,
    pub user_id: i32,
    pub task_id: i32,
    pub rating: Option<i32>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
}

/// Input for settling a claimed task.
#[derive(Debug)]
pub struct NewSettlement<'a> {
    pub task: &'a Task,
    pub chosen_by_id: i32,
    pub rating: Option<i32>,
    pub timestamp: OffsetDateTime,
}

/// Rows produced by a settlement, with the claimant as it reads afterwards.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub transaction: Transaction,
    pub reputation: Reputation,
    pub claimant: User,
}

/// Mean of the non-null ratings, `None` when there are none.
pub fn average_rating(ratings: &[Option<i32>]) -> Option<f64> {
    let rated: Vec<i64> = ratings.iter().flatten().map(|&r| i64::from(r)).collect();
    if rated.is_empty() {
        return None;
    }
    Some(rated.iter().sum::<i64>() as f64 / rated.len() as f64)
}
