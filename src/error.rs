//! Errors shared by the entity services

use sea_orm::DbErr;
use thiserror::Error;

use crate::services::cache::CacheError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    /// The write committed but cached reads of `entity` may be stale until
    /// their TTL runs out. Not an aborted write.
    #[error("{entity} was saved but cache invalidation failed: {source}")]
    CacheInvalidation {
        entity: &'static str,
        #[source]
        source: CacheError,
    },
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }

    /// True when the underlying write is durable despite the error
    pub fn write_committed(&self) -> bool {
        matches!(self, ServiceError::CacheInvalidation { .. })
    }
}
