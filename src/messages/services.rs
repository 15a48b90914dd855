use tracing::{info, warn};

use crate::{error::MarketError, state::AppState, store::Message};

pub async fn send_message(
    state: &AppState,
    sender_id: i32,
    receiver_id: i32,
    content: &str,
) -> Result<Message, MarketError> {
    let sender = state.store.find_user(sender_id).await?;
    let receiver = state.store.find_user(receiver_id).await?;
    if sender.is_none() || receiver.is_none() {
        warn!(sender_id, receiver_id, "message between unknown users");
        return Err(MarketError::UserNotFound);
    }

    let message = state
        .store
        .insert_message(sender_id, receiver_id, content)
        .await?;
    info!(message_id = message.id, sender_id, receiver_id, "message sent");
    Ok(message)
}

/// Both directions of the conversation between two users.
pub async fn thread(
    state: &AppState,
    user_id: i32,
    other_user_id: i32,
) -> Result<Vec<Message>, MarketError> {
    Ok(state.store.messages_between(user_id, other_user_id).await?)
}

pub async fn inbox(state: &AppState, user_id: i32) -> Result<Vec<Message>, MarketError> {
    Ok(state.store.messages_for_user(user_id).await?)
}
