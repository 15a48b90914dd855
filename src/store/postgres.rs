use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

use super::records::{
    average_rating, Message, NewSettlement, Reputation, Settlement, Task, Transaction, User,
};
use super::MarketStore;
use crate::config::DbConfig;

const USER_COLUMNS: &str = "id, username, password_hash, karma_points, reputation";
const TASK_COLUMNS: &str = "id, description, karma_cost, owner_id, chosen_by_id";
const TRANSACTION_COLUMNS: &str =
    "id, timestamp, user_id, chosen_by_id, task_id, karma_points, description";
const REPUTATION_COLUMNS: &str = "id, user_id, task_id, rating, created_at";
const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(cfg: &DbConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.url)
            .await
            .context("connect to database")?;
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!(max_connections = cfg.max_connections, "postgres store ready");
        Ok(Self { db })
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn find_user(&self, id: i32) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(user)
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        karma_points: i32,
    ) -> anyhow::Result<Option<User>> {
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, karma_points)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(password_hash)
        .bind(karma_points)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(user) => Ok(Some(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).context("insert user")),
        }
    }

    async fn post_task(
        &self,
        owner_id: i32,
        description: &str,
        karma_cost: i32,
    ) -> anyhow::Result<Option<Task>> {
        let mut tx = self.db.begin().await.context("begin post_task")?;

        let debited = sqlx::query(
            r#"
            UPDATE users
               SET karma_points = karma_points - $1
             WHERE id = $2 AND karma_points >= $1
            "#,
        )
        .bind(karma_cost)
        .bind(owner_id)
        .execute(&mut *tx)
        .await
        .context("debit owner")?;

        if debited.rows_affected() == 0 {
            debug!(owner_id, karma_cost, "debit guard rejected task");
            return Ok(None);
        }

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (description, karma_cost, owner_id)
            VALUES ($1, $2, $3)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(description)
        .bind(karma_cost)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .context("insert task")?;

        tx.commit().await.context("commit post_task")?;
        Ok(Some(task))
    }

    async fn find_task(&self, id: i32) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find task")?;
        Ok(task)
    }

    async fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list tasks")?;
        Ok(rows)
    }

    async fn claim_task(&self, task_id: i32, user_id: i32) -> anyhow::Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
               SET chosen_by_id = $1
             WHERE id = $2 AND chosen_by_id IS NULL
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(task_id)
        .fetch_optional(&self.db)
        .await
        .context("claim task")?;
        Ok(task)
    }

    async fn settle_task(
        &self,
        settlement: NewSettlement<'_>,
    ) -> anyhow::Result<Option<Settlement>> {
        let NewSettlement {
            task,
            chosen_by_id,
            rating,
            timestamp,
        } = settlement;

        let mut tx = self.db.begin().await.context("begin settle_task")?;

        // Deleting first makes a second settlement of the same task a no-op.
        let deleted = sqlx::query("DELETE FROM tasks WHERE id = $1 AND chosen_by_id = $2")
            .bind(task.id)
            .bind(chosen_by_id)
            .execute(&mut *tx)
            .await
            .context("delete task")?;
        if deleted.rows_affected() == 0 {
            return Ok(None);
        }

        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (timestamp, user_id, chosen_by_id, task_id, karma_points, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(timestamp)
        .bind(task.owner_id)
        .bind(chosen_by_id)
        .bind(task.id)
        .bind(task.karma_cost)
        .bind(&task.description)
        .fetch_one(&mut *tx)
        .await
        .context("insert transaction")?;

        let reputation = sqlx::query_as::<_, Reputation>(&format!(
            r#"
            INSERT INTO reputations (user_id, task_id, rating)
            VALUES ($1, $2, $3)
            RETURNING {REPUTATION_COLUMNS}
            "#
        ))
        .bind(chosen_by_id)
        .bind(task.id)
        .bind(rating)
        .fetch_one(&mut *tx)
        .await
        .context("insert reputation")?;

        let ratings = sqlx::query_scalar::<_, Option<i32>>(
            "SELECT rating FROM reputations WHERE user_id = $1",
        )
        .bind(chosen_by_id)
        .fetch_all(&mut *tx)
        .await
        .context("load claimant ratings")?;

        let claimant = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET reputation = $1,
                   karma_points = karma_points + $2
             WHERE id = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(average_rating(&ratings))
        .bind(task.karma_cost)
        .bind(chosen_by_id)
        .fetch_one(&mut *tx)
        .await
        .context("credit claimant")?;

        tx.commit().await.context("commit settle_task")?;
        Ok(Some(Settlement {
            transaction,
            reputation,
            claimant,
        }))
    }

    async fn transactions_for_user(&self, user_id: i32) -> anyhow::Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
              FROM transactions
             WHERE user_id = $1 OR chosen_by_id = $1
             ORDER BY id ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list transactions")?;
        Ok(rows)
    }

    async fn insert_message(
        &self,
        sender_id: i32,
        receiver_id: i32,
        content: &str,
    ) -> anyhow::Result<Message> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (sender_id, receiver_id, content)
            VALUES ($1, $2, $3)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(&self.db)
        .await
        .context("insert message")?;
        Ok(message)
    }

    async fn messages_between(
        &self,
        user_id: i32,
        other_user_id: i32,
    ) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
              FROM messages
             WHERE (sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1)
             ORDER BY id ASC
            "#
        ))
        .bind(user_id)
        .bind(other_user_id)
        .fetch_all(&self.db)
        .await
        .context("list thread")?;
        Ok(rows)
    }

    async fn messages_for_user(&self, user_id: i32) -> anyhow::Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
              FROM messages
             WHERE sender_id = $1 OR receiver_id = $1
             ORDER BY id ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list messages for user")?;
        Ok(rows)
    }
}
