use serde::{Deserialize, Serialize};

use crate::store::Message;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            sender_id: m.sender_id,
            receiver_id: m.receiver_id,
            content: m.content,
        }
    }
}
