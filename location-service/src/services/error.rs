use crate::models::InvalidLocationId;
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("No matching location documents")]
    NotFound,

    #[error(transparent)]
    InvalidId(#[from] InvalidLocationId),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LocationError> for AppError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::InvalidId(e) => AppError::BadRequest(anyhow::Error::new(e)),
            LocationError::Database(e) => AppError::from(e),
            // Not-found is reported like any other store failure.
            LocationError::NotFound => {
                AppError::DatabaseError(anyhow::anyhow!("no matching location documents"))
            }
            LocationError::Timeout(d) => {
                AppError::DatabaseError(anyhow::anyhow!("store call timed out after {:?}", d))
            }
            LocationError::Serialization(e) => AppError::InternalError(anyhow::Error::new(e)),
            LocationError::Internal(e) => AppError::InternalError(e),
        }
    }
}
