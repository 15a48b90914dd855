use time::{macros::offset, OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use crate::{error::MarketError, state::AppState, store::Transaction};

/// Ledger rows are stamped in India Standard Time.
pub const LEDGER_OFFSET: UtcOffset = offset!(+5:30);

pub fn ledger_now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(LEDGER_OFFSET)
}

/// Every ledger row where `username` was the owner or the claimant.
pub async fn history(state: &AppState, username: &str) -> Result<Vec<Transaction>, MarketError> {
    let Some(user) = state.store.find_user_by_username(username).await? else {
        warn!(%username, "history for unknown user");
        return Err(MarketError::UserNotFound);
    };
    let rows = state.store.transactions_for_user(user.id).await?;
    debug!(user_id = user.id, count = rows.len(), "transaction history");
    Ok(rows)
}
