use thiserror::Error;

use crate::db::types::SubmissionStatus;
use crate::repositories::StoreError;
use crate::services::catalog::CatalogError;

#[derive(Debug, Error)]
pub(crate) enum ServiceError {
    #[error("invalid identifier for {field}")]
    InvalidIdentifier { field: &'static str },
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("cannot {action} a submission that is {status}")]
    InvalidState { action: &'static str, status: SubmissionStatus },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("access denied")]
    Unauthorized,
    #[error("submission changed during {action}")]
    Stale { action: &'static str },
    #[error("{action} already in progress for this submission")]
    InFlight { action: &'static str },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ServiceError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }
}
