use serde::{Deserialize, Serialize};

/// Wire shape handed to a broadcaster when a transfer code is issued, and
/// echoed back to validators for a valid code. Carries only what may leave
/// the authority: the code itself, a masked display name, the issuer prefix
/// and the expiry. Never the owner id or signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCodeGrant {
    pub transfer_code: String,
    pub masked_user_name: String,
    pub issuer_code: String,
    /// ISO-8601 expiry timestamp.
    pub expires_at: String,
}

/// Outcome of validating a scanned transfer code.
///
/// Invalid codes populate only `error_message`; the message text does not
/// distinguish an unknown code from an expired or consumed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeValidation {
    pub is_valid: bool,
    pub masked_user_name: Option<String>,
    pub issuer_name: Option<String>,
    pub expires_at: Option<String>,
    pub error_message: Option<String>,
}

impl CodeValidation {
    pub fn valid(masked_user_name: String, issuer_name: String, expires_at: String) -> Self {
        Self {
            is_valid: true,
            masked_user_name: Some(masked_user_name),
            issuer_name: Some(issuer_name),
            expires_at: Some(expires_at),
            error_message: None,
        }
    }

    pub fn invalid(error_message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            masked_user_name: None,
            issuer_name: None,
            expires_at: None,
            error_message: Some(error_message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedemptionStatus {
    Success,
    Failed,
}

impl std::fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedemptionStatus::Success => write!(f, "SUCCESS"),
            RedemptionStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Result of a validate-then-consume flow against a scanned code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub code_id: String,
    pub status: RedemptionStatus,
    pub memo: String,
    pub completed_at: Option<String>,
}
