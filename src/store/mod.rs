mod memory;
mod postgres;
pub mod records;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use records::{Message, NewSettlement, Reputation, Settlement, Task, Transaction, User};

/// Persistence seam for the marketplace. Each method is one atomic unit;
/// business rules live in the feature services.
#[async_trait]
pub trait MarketStore: Send + Sync {
    async fn find_user(&self, id: i32) -> anyhow::Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    /// Returns `None` when the username is already taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        karma_points: i32,
    ) -> anyhow::Result<Option<User>>;

    /// Debits the owner by `karma_cost` and inserts an open task.
    /// Returns `None` (and changes nothing) if the balance no longer covers the cost.
    async fn post_task(
        &self,
        owner_id: i32,
        description: &str,
        karma_cost: i32,
    ) -> anyhow::Result<Option<Task>>;

    async fn find_task(&self, id: i32) -> anyhow::Result<Option<Task>>;

    async fn list_tasks(&self) -> anyhow::Result<Vec<Task>>;

    /// Sets the claimant only while the task is still open.
    /// Returns `None` if the task is gone or already claimed.
    async fn claim_task(&self, task_id: i32, user_id: i32) -> anyhow::Result<Option<Task>>;

    /// Writes the ledger and reputation rows, recomputes the claimant's
    /// average, credits the claimant and deletes the task.
    /// Returns `None` if the task was already settled by someone else.
    async fn settle_task(&self, settlement: NewSettlement<'_>)
        -> anyhow::Result<Option<Settlement>>;

    /// Ledger rows where the user is owner or claimant.
    async fn transactions_for_user(&self, user_id: i32) -> anyhow::Result<Vec<Transaction>>;

    async fn insert_message(
        &self,
        sender_id: i32,
        receiver_id: i32,
        content: &str,
    ) -> anyhow::Result<Message>;

    /// Messages exchanged in either direction between two users.
    async fn messages_between(&self, user_id: i32, other_user_id: i32)
        -> anyhow::Result<Vec<Message>>;

    /// Messages the user sent or received.
    async fn messages_for_user(&self, user_id: i32) -> anyhow::Result<Vec<Message>>;
}
