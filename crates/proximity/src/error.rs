use crate::radio::{BroadcastFailure, ScanFailure};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProximityError {
    #[error("Broadcast failed: {0}")]
    BroadcastFailed(BroadcastFailure),

    #[error("Scan failed: {0}")]
    ScanFailed(ScanFailure),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, ProximityError>;

impl From<BroadcastFailure> for ProximityError {
    fn from(reason: BroadcastFailure) -> Self {
        ProximityError::BroadcastFailed(reason)
    }
}

impl From<ScanFailure> for ProximityError {
    fn from(reason: ScanFailure) -> Self {
        ProximityError::ScanFailed(reason)
    }
}

impl ProximityError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ProximityError::BroadcastFailed(reason) => match reason {
                BroadcastFailure::Unsupported => {
                    "This device does not support beacon broadcasting.".to_string()
                }
                BroadcastFailure::PayloadTooLarge => {
                    "The broadcast data is too large for this radio.".to_string()
                }
                _ => "Could not start broadcasting. Please try again.".to_string(),
            },
            ProximityError::ScanFailed(reason) => match reason {
                ScanFailure::Unsupported => {
                    "This device does not support scanning for nearby peers.".to_string()
                }
                _ => "Could not scan for nearby peers. Please try again.".to_string(),
            },
            ProximityError::InternalError(details) => {
                format!("An internal error occurred: {}. Please try again.", details)
            }
        }
    }
}
