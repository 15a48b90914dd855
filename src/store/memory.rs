use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::records::{
    average_rating, Message, NewSettlement, Reputation, Settlement, Task, Transaction, User,
};
use super::MarketStore;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: Vec<Task>,
    transactions: Vec<Transaction>,
    reputations: Vec<Reputation>,
    messages: Vec<Message>,
    next_user_id: i32,
    next_task_id: i32,
    next_transaction_id: i32,
    next_reputation_id: i32,
    next_message_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Process-local store. One lock covers all tables, so every method is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn reputations_for_user(&self, user_id: i32) -> Vec<Reputation> {
        let t = self.tables.lock().await;
        t.reputations
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn find_user(&self, id: i32) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        karma_points: i32,
    ) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.username == username) {
            return Ok(None);
        }
        let user = User {
            id: next_id(&mut t.next_user_id),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            karma_points,
            reputation: None,
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn post_task(
        &self,
        owner_id: i32,
        description: &str,
        karma_cost: i32,
    ) -> anyhow::Result<Option<Task>> {
        let mut t = self.tables.lock().await;
        let Some(owner) = t.users.iter_mut().find(|u| u.id == owner_id) else {
            return Ok(None);
        };
        if owner.karma_points < karma_cost {
            return Ok(None);
        }
        owner.karma_points = owner
            .karma_points
            .checked_sub(karma_cost)
            .with_context(|| format!("debit of {karma_cost} overflows user {owner_id}"))?;

        let task = Task {
            id: next_id(&mut t.next_task_id),
            description: description.to_string(),
            karma_cost,
            owner_id,
            chosen_by_id: None,
        };
        t.tasks.push(task.clone());
        Ok(Some(task))
    }

    async fn find_task(&self, id: i32) -> anyhow::Result<Option<Task>> {
        let t = self.tables.lock().await;
        Ok(t.tasks.iter().find(|task| task.id == id).cloned())
    }

    async fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let t = self.tables.lock().await;
        Ok(t.tasks.clone())
    }

    async fn claim_task(&self, task_id: i32, user_id: i32) -> anyhow::Result<Option<Task>> {
        let mut t = self.tables.lock().await;
        let claimed = t
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id && task.is_open())
            .map(|task| {
                task.chosen_by_id = Some(user_id);
                task.clone()
            });
        Ok(claimed)
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

        let mut t = self.tables.lock().await;
        let Some(pos) = t
            .tasks
            .iter()
            .position(|row| row.id == task.id && row.chosen_by_id == Some(chosen_by_id))
        else {
            return Ok(None);
        };
        let Some(claimant_idx) = t.users.iter().position(|u| u.id == chosen_by_id) else {
            anyhow::bail!("claimant {chosen_by_id} of task {} does not exist", task.id);
        };
        // Nothing is written until the credit is known to fit.
        let credited = t.users[claimant_idx]
            .karma_points
            .checked_add(task.karma_cost)
            .with_context(|| format!("credit of {} overflows user {chosen_by_id}", task.karma_cost))?;
        t.tasks.remove(pos);

        let transaction = Transaction {
            id: next_id(&mut t.next_transaction_id),
            timestamp,
            user_id: task.owner_id,
            chosen_by_id,
            task_id: task.id,
            karma_points: task.karma_cost,
            description: task.description.clone(),
        };
        t.transactions.push(transaction.clone());

        let reputation = Reputation {
            id: next_id(&mut t.next_reputation_id),
            user_id: chosen_by_id,
            task_id: task.id,
            rating,
            created_at: OffsetDateTime::now_utc(),
        };
        t.reputations.push(reputation.clone());

        let ratings: Vec<Option<i32>> = t
            .reputations
            .iter()
            .filter(|r| r.user_id == chosen_by_id)
            .map(|r| r.rating)
            .collect();
        let claimant = &mut t.users[claimant_idx];
        claimant.reputation = average_rating(&ratings);
        claimant.karma_points = credited;
        let claimant = claimant.clone();

        Ok(Some(Settlement {
            transaction,
            reputation,
            claimant,
        }))
    }

    async fn transactions_for_user(&self, user_id: i32) -> anyhow::Result<Vec<Transaction>> {
        let t = self.tables.lock().await;
        Ok(t.transactions
            .iter()
            .filter(|tx| tx.user_id == user_id || tx.chosen_by_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_message(
        &self,
        sender_id: i32,
        receiver_id: i32,
        content: &str,
    ) -> anyhow::Result<Message> {
        let mut t = self.tables.lock().await;
        let message = Message {
            id: next_id(&mut t.next_message_id),
            sender_id,
            receiver_id,
            content: content.to_string(),
        };
        t.messages.push(message.clone());
        Ok(message)
    }

    async fn messages_between(
        &self,
        user_id: i32,
        other_user_id: i32,
    ) -> anyhow::Result<Vec<Message>> {
        let t = self.tables.lock().await;
        Ok(t.messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_id && m.receiver_id == other_user_id)
                    || (m.sender_id == other_user_id && m.receiver_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn messages_for_user(&self, user_id: i32) -> anyhow::Result<Vec<Message>> {
        let t = self.tables.lock().await;
        Ok(t.messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
            .cloned()
            .collect())
    }
}
