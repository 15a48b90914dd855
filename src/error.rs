use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

/// Every failure a marketplace operation can surface to the caller.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Username already registered")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Insufficient karma points")]
    InsufficientKarma,

    #[error("Karma balance out of range")]
    KarmaOutOfRange,

    #[error("User not found")]
    UserNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Task already chosen")]
    TaskAlreadyChosen,

    #[error("Only the task owner can mark it as complete")]
    NotTaskOwner,

    #[error("Task has not been chosen yet")]
    TaskNotChosen,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl MarketError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UserNotFound | Self::TaskNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DuplicateUsername
            | Self::InvalidCredentials
            | Self::InsufficientKarma
            | Self::KarmaOutOfRange
            | Self::TaskAlreadyChosen
            | Self::NotTaskOwner
            | Self::TaskNotChosen => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!(error = ?e, "storage failure");
        }
        (self.status_code(), self.to_string()).into_response()
    }
}
