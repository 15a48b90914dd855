use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use crate::{error::MarketError, state::AppState, store::User};

/// Balance every account opens with.
pub const STARTING_KARMA: i32 = 500;

pub async fn register(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<User, MarketError> {
    if state.store.find_user_by_username(username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(MarketError::DuplicateUsername);
    }

    let hash = hash_password(password)?;
    let user = state
        .store
        .create_user(username, &hash, STARTING_KARMA)
        .await?
        .ok_or_else(|| {
            warn!(%username, "username registered concurrently");
            MarketError::DuplicateUsername
        })?;

    info!(user_id = user.id, %username, "user registered");
    Ok(user)
}

/// Re-checks a username/password pair. Every privileged operation calls this.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<User, MarketError> {
    let Some(user) = state.store.find_user_by_username(username).await? else {
        warn!(%username, "unknown username");
        return Err(MarketError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(%username, user_id = user.id, "invalid password");
        return Err(MarketError::InvalidCredentials);
    }
    Ok(user)
}

pub async fn login(state: &AppState, username: &str, password: &str) -> Result<User, MarketError> {
    let user = authenticate(state, username, password).await?;
    info!(user_id = user.id, %username, "user logged in");
    Ok(user)
}
