use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::services::LEDGER_OFFSET;
use crate::store::Transaction;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_id: i32,
    pub chosen_by_id: i32,
    pub task_id: i32,
    pub karma_points: i32,
    pub description: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            // postgres hands TIMESTAMPTZ back in UTC
            timestamp: t.timestamp.to_offset(LEDGER_OFFSET),
            user_id: t.user_id,
            chosen_by_id: t.chosen_by_id,
            task_id: t.task_id,
            karma_points: t.karma_points,
            description: t.description,
        }
    }
}
