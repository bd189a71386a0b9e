use thiserror::Error;
use tonic::Status;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Failures of the store or object storage, as opposed to caller mistakes.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Migration(_)
                | AppError::Storage(_)
                | AppError::Internal(_)
        )
    }

    /// Converts to a status, replacing persistence failures with a single
    /// user-facing message. The detailed error is logged.
    pub fn into_status_with(self, message: &str) -> Status {
        if self.is_persistence() {
            tracing::error!("{}: {}", message, self);
            Status::internal(message)
        } else {
            self.into()
        }
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Database(e) => Status::internal(format!("Database error: {}", e)),
            AppError::Migration(e) => Status::internal(format!("Migration error: {}", e)),
            AppError::NotFound(msg) => Status::not_found(msg),
            AppError::InvalidInput(msg) => Status::invalid_argument(msg),
            AppError::AlreadyExists(msg) => Status::already_exists(msg),
            AppError::Unauthenticated(msg) => Status::unauthenticated(msg),
            AppError::PermissionDenied(msg) => Status::permission_denied(msg),
            AppError::FailedPrecondition(msg) => Status::failed_precondition(msg),
            AppError::Storage(msg) => Status::internal(format!("Storage error: {}", msg)),
            AppError::Internal(msg) => Status::internal(msg),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_persistence_errors_use_generic_message() {
        let status = AppError::Storage("bucket unreachable".into())
            .into_status_with("Failed to submit report. Please try again.");
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "Failed to submit report. Please try again.");
    }

    #[test]
    fn test_validation_errors_keep_their_message() {
        let status = AppError::InvalidInput("title is required".into())
            .into_status_with("Failed to submit report. Please try again.");
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "title is required");
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let status: Status = AppError::NotFound("Item not found".into()).into();
        assert_eq!(status.code(), Code::NotFound);
    }
}
