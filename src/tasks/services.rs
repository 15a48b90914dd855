use tracing::{info, warn};

use crate::{
    error::MarketError,
    state::AppState,
    store::{NewSettlement, Task},
    transactions::services::ledger_now,
    users::services::authenticate,
};

/// Posts a task, escrowing `karma_cost` from the poster's balance.
pub async fn create_task(
    state: &AppState,
    description: &str,
    karma_cost: i32,
    username: &str,
    password: &str,
) -> Result<Task, MarketError> {
    let owner = authenticate(state, username, password).await?;

    if owner.karma_points < karma_cost {
        warn!(user_id = owner.id, balance = owner.karma_points, karma_cost, "insufficient karma");
        return Err(MarketError::InsufficientKarma);
    }
    if owner.karma_points.checked_sub(karma_cost).is_none() {
        warn!(user_id = owner.id, balance = owner.karma_points, karma_cost, "debit out of range");
        return Err(MarketError::KarmaOutOfRange);
    }

    let task = state
        .store
        .post_task(owner.id, description, karma_cost)
        .await?
        .ok_or(MarketError::InsufficientKarma)?;

    info!(task_id = task.id, owner_id = owner.id, karma_cost, "task posted");
    Ok(task)
}

/// Claims an open task for the requester. No karma moves here.
pub async fn choose_task(
    state: &AppState,
    task_id: i32,
    username: &str,
    password: &str,
) -> Result<Task, MarketError> {
    let user = authenticate(state, username, password).await?;

    let task = state
        .store
        .find_task(task_id)
        .await?
        .ok_or(MarketError::TaskNotFound)?;
    if !task.is_open() {
        warn!(task_id, chosen_by_id = ?task.chosen_by_id, "task already chosen");
        return Err(MarketError::TaskAlreadyChosen);
    }

    // A task that vanished between the lookup and the claim was claimed and settled.
    let task = state
        .store
        .claim_task(task_id, user.id)
        .await?
        .ok_or(MarketError::TaskAlreadyChosen)?;

    info!(task_id, user_id = user.id, "task chosen");
    Ok(task)
}

/// Settles a claimed task: pays the claimant, records the rating and the
/// ledger row, and deletes the task. Returns the task as it was.
pub async fn complete_task(
    state: &AppState,
    task_id: i32,
    username: &str,
    password: &str,
    reputation_rating: Option<i32>,
) -> Result<Task, MarketError> {
    let user = authenticate(state, username, password).await?;

    let task = state
        .store
        .find_task(task_id)
        .await?
        .ok_or(MarketError::TaskNotFound)?;
    if task.owner_id != user.id {
        warn!(task_id, owner_id = task.owner_id, user_id = user.id, "completion by non-owner");
        return Err(MarketError::NotTaskOwner);
    }
    let Some(chosen_by_id) = task.chosen_by_id else {
        warn!(task_id, "completion of unchosen task");
        return Err(MarketError::TaskNotChosen);
    };

    let claimant = state
        .store
        .find_user(chosen_by_id)
        .await?
        .ok_or(MarketError::UserNotFound)?;
    if claimant.karma_points.checked_add(task.karma_cost).is_none() {
        warn!(task_id, chosen_by_id, balance = claimant.karma_points, karma = task.karma_cost, "credit out of range");
        return Err(MarketError::KarmaOutOfRange);
    }

    let settlement = state
        .store
        .settle_task(NewSettlement {
            task: &task,
            chosen_by_id,
            rating: reputation_rating,
            timestamp: ledger_now(),
        })
        .await?
        .ok_or(MarketError::TaskNotFound)?;

    info!(
        task_id,
        transaction_id = settlement.transaction.id,
        reputation_id = settlement.reputation.id,
        chosen_by_id,
        karma = task.karma_cost,
        reputation = ?settlement.claimant.reputation,
        "task completed"
    );
    Ok(task)
}

pub async fn list_tasks(state: &AppState) -> Result<Vec<Task>, MarketError> {
    Ok(state.store.list_tasks().await?)
}
