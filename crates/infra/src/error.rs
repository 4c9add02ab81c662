use thiserror::Error;

use wrenchbook_core::DomainError;

use crate::store::StoreError;

/// Failure of an application service call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::Domain(DomainError::not_found(what))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Domain(DomainError::validation(msg))
    }
}
