use thiserror::Error;

use crate::ids::UserId;

#[derive(Debug, Error)]
pub enum AmityError {
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("duplicate match edge: source={source_id} target={target_id}")]
    ConstraintViolation {
        source_id: UserId,
        target_id: UserId,
    },
    #[error("malformed aggregate: {message}")]
    MalformedAggregate { message: String },
}

impl AmityError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn constraint_violation(source_id: UserId, target_id: UserId) -> Self {
        Self::ConstraintViolation {
            source_id,
            target_id,
        }
    }

    pub fn malformed_aggregate(message: impl Into<String>) -> Self {
        Self::MalformedAggregate {
            message: message.into(),
        }
    }
}

pub type AmityResult<T> = Result<T, AmityError>;

impl From<sea_orm::DbErr> for AmityError {
    fn from(value: sea_orm::DbErr) -> Self {
        AmityError::storage(value.to_string())
    }
}
