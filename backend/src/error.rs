//! Error handling for the Food Cost Management engine

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Application error types.
///
/// Alerting failures are deliberately absent: the notification collaborator
/// is best-effort and its errors are logged and swallowed at the call site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing required input; aborts the pipeline immediately
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist or belongs to another establishment
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// The recipe graph contains a cycle through SUBRECIPE edges
    #[error("Cycle detected in recipe graph at recipe {recipe_id}")]
    CycleDetected { recipe_id: Uuid },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }
}

/// Result type alias for engine operations
pub type AppResult<T> = Result<T, AppError>;
