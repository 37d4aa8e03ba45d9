use crate::models::TransferCodeGrant;
use async_trait::async_trait;

/// Source of freshly issued transfer codes.
///
/// The scan session consults this when it implicitly starts a broadcast;
/// the authority crate provides the real implementation.
#[async_trait]
pub trait TransferCodeProvider: Send + Sync {
    async fn fresh_code(&self) -> anyhow::Result<TransferCodeGrant>;
}
