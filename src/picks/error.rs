use sea_orm::DbErr;

use crate::domain::PickValidationError;

#[derive(Debug, thiserror::Error)]
pub enum PicksError {
    #[error("authentication required")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl PicksError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl From<PickValidationError> for PicksError {
    fn from(err: PickValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
