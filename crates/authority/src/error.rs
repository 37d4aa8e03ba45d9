use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthorityError {
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    #[error("Transfer code not found: {0}")]
    CodeNotFound(String),

    #[error("Not permitted to revoke code: {0}")]
    RevokeNotPermitted(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, AuthorityError>;

impl AuthorityError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AuthorityError::OwnerNotFound(_) => {
                "Your account could not be found. Please sign in again.".to_string()
            }
            AuthorityError::CodeNotFound(_) => {
                "The transfer code could not be found. Please ask the recipient to generate a new one.".to_string()
            }
            AuthorityError::RevokeNotPermitted(_) => {
                "You do not have permission to revoke this transfer code.".to_string()
            }
            AuthorityError::StorageError(details) => {
                format!("A storage error occurred: {}. Please try again later.", details)
            }
            AuthorityError::InternalError(details) => {
                format!("An internal error occurred: {}. Please try again or contact support.", details)
            }
        }
    }
}
