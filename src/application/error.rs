// Errors surfaced by application services
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) fn not_found(entity: &str) -> ServiceError {
    ServiceError::NotFound(format!("{} not found", entity))
}

pub(crate) fn invalid(entity: &str) -> ServiceError {
    ServiceError::Invalid(format!("Invalid {} data", entity))
}
