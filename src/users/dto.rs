use serde::{Deserialize, Serialize};

use crate::store::User;

/// Body for registration and login alike.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// User as returned to clients; the credential never leaves the server.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub karma_points: i32,
    pub reputation: Option<f64>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            karma_points: u.karma_points,
            reputation: u.reputation,
        }
    }
}
