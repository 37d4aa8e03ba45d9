// Transfer code authority - issues, validates, consumes and retires codes

use crate::code::TransferCode;
use crate::directory::{OwnerDirectory, OwnerProfile};
use crate::error::{AuthorityError, Result};
use crate::store::CodeStore;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use shared::code_format::is_plausible_code;
use shared::config::AuthorityConfig;
use shared::models::{CodeValidation, RedemptionReceipt, RedemptionStatus, TransferCodeGrant};
use shared::provider::TransferCodeProvider;
use std::sync::Arc;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Why a code failed validation. Outward-facing messages deliberately do
/// not distinguish `NotFound` from `ExpiredOrUsed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    NotFound,
    ExpiredOrUsed,
    OwnerUnavailable,
}

impl InvalidReason {
    fn user_message(&self) -> &'static str {
        match self {
            // One message for both: revealing which code strings exist
            // would let a scanner probe the code space.
            InvalidReason::NotFound | InvalidReason::ExpiredOrUsed => {
                "This transfer code is no longer valid. Ask the recipient to generate a new one."
            }
            InvalidReason::OwnerUnavailable => {
                "The recipient's account is currently unavailable."
            }
        }
    }
}

/// Detailed lookup outcome, consumed by `validate` and `redeem`.
pub enum CodeStatus {
    Valid {
        code: TransferCode,
        owner: OwnerProfile,
    },
    Invalid(InvalidReason),
}

/// Owns the transfer-code lifecycle: generation, the single-active-code
/// invariant, validity windows and single-use consumption.
pub struct TransferCodeAuthority {
    store: Arc<dyn CodeStore>,
    directory: Arc<dyn OwnerDirectory>,
    config: AuthorityConfig,
}

impl TransferCodeAuthority {
    pub fn new(
        store: Arc<dyn CodeStore>,
        directory: Arc<dyn OwnerDirectory>,
        config: AuthorityConfig,
    ) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Issue a fresh code for the owner, revoking any prior active one.
    pub async fn issue(&self, owner_id: &str) -> Result<TransferCodeGrant> {
        let owner = self
            .directory
            .find(owner_id)
            .await
            .ok_or_else(|| AuthorityError::OwnerNotFound(owner_id.to_string()))?;

        let code = TransferCode::generate(
            owner_id,
            &owner.secret,
            &self.config.issuer_code,
            self.config.code_ttl_minutes,
        );

        // The store makes revocation happen-before the insert, so the
        // single-active invariant holds even under concurrent issuance.
        self.store.revoke_then_insert(owner_id, code.clone()).await?;

        info!("Issued transfer code {} for owner {}", code.code, owner_id);
        Ok(self.grant(&code, &owner.display_name))
    }

    /// Classify a scanned code: valid, or invalid for one of the closed set
    /// of reasons.
    pub async fn inspect(&self, code: &str) -> Result<CodeStatus> {
        if !is_plausible_code(code, &self.config.issuer_code) {
            debug!("Code failed the format pre-filter: {}", code);
            return Ok(CodeStatus::Invalid(InvalidReason::NotFound));
        }

        let record = match self.store.find_by_code(code).await? {
            Some(record) => record,
            None => return Ok(CodeStatus::Invalid(InvalidReason::NotFound)),
        };

        if !record.is_valid(Utc::now()) {
            return Ok(CodeStatus::Invalid(InvalidReason::ExpiredOrUsed));
        }

        match self.directory.find(&record.owner_id).await {
            Some(owner) if owner.active => Ok(CodeStatus::Valid { code: record, owner }),
            _ => Ok(CodeStatus::Invalid(InvalidReason::OwnerUnavailable)),
        }
    }

    /// Validate a scanned code, returning the wire-shaped result. A failed
    /// validation is a normal outcome, not an error.
    pub async fn validate(&self, code: &str) -> Result<CodeValidation> {
        match self.inspect(code).await? {
            CodeStatus::Valid { code, owner } => Ok(CodeValidation::valid(
                mask_display_name(&owner.display_name),
                self.config.issuer_name.clone(),
                code.expires_at.to_rfc3339(),
            )),
            CodeStatus::Invalid(reason) => {
                debug!("Validation rejected a code: {:?}", reason);
                Ok(CodeValidation::invalid(reason.user_message()))
            }
        }
    }

    /// Consume a code exactly once. Returns whether this call performed the
    /// transition; callers must treat `false` as invalid.
    pub async fn consume(&self, code: &str) -> Result<bool> {
        let consumed = self.store.consume_if_unused(code, Utc::now()).await?;
        if consumed {
            info!("Transfer code consumed: {}", code);
        } else {
            warn!("Attempt to consume an already-used or unknown code: {}", code);
        }
        Ok(consumed)
    }

    /// Validate-then-consume composite for a scanned code.
    pub async fn redeem(&self, code: &str) -> Result<RedemptionReceipt> {
        let status = self.inspect(code).await?;

        let record = match status {
            CodeStatus::Valid { code, .. } => code,
            CodeStatus::Invalid(reason) => {
                return Ok(RedemptionReceipt {
                    code_id: String::new(),
                    status: RedemptionStatus::Failed,
                    memo: reason.user_message().to_string(),
                    completed_at: None,
                });
            }
        };

        // A concurrent redeemer may win between inspect and consume; the
        // conditional update decides.
        if !self.store.consume_if_unused(code, Utc::now()).await? {
            return Ok(RedemptionReceipt {
                code_id: String::new(),
                status: RedemptionStatus::Failed,
                memo: InvalidReason::ExpiredOrUsed.user_message().to_string(),
                completed_at: None,
            });
        }

        info!("Transfer code redeemed: {}", record.code);
        Ok(RedemptionReceipt {
            code_id: record.code_id.to_string(),
            status: RedemptionStatus::Success,
            memo: "Transfer code accepted".to_string(),
            completed_at: Some(Utc::now().to_rfc3339()),
        })
    }

    /// Soft-disable one code after an ownership check.
    pub async fn revoke(&self, code_id: Uuid, owner_id: &str) -> Result<()> {
        let record = self
            .store
            .find_by_id(code_id)
            .await?
            .ok_or_else(|| AuthorityError::CodeNotFound(code_id.to_string()))?;

        if record.owner_id != owner_id {
            return Err(AuthorityError::RevokeNotPermitted(code_id.to_string()));
        }

        self.store.revoke(code_id).await?;
        info!("Transfer code revoked: {}", record.code);
        Ok(())
    }

    /// The owner's currently valid code, as a wire grant.
    pub async fn active_grant(&self, owner_id: &str) -> Result<Option<TransferCodeGrant>> {
        let record = match self.store.find_active_for_owner(owner_id, Utc::now()).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        let display_name = self
            .directory
            .find(owner_id)
            .await
            .map(|owner| owner.display_name)
            .unwrap_or_default();

        Ok(Some(self.grant(&record, &display_name)))
    }

    pub async fn active_code_count(&self, owner_id: &str) -> Result<u64> {
        self.store.count_active_for_owner(owner_id, Utc::now()).await
    }

    /// Deactivate expired rows for storage hygiene. Validity never depends
    /// on this running; expiry is evaluated at read time.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let count = self.store.deactivate_expired(Utc::now()).await?;
        if count > 0 {
            info!("Deactivated {} expired transfer code(s)", count);
        }
        Ok(count)
    }

    /// Drop codes issued more than `days_old` days ago.
    pub async fn purge_issued_before(&self, days_old: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days_old);
        self.store.delete_issued_before(cutoff).await
    }

    /// Spawn the periodic expiry sweep. Abort the handle to stop it.
    pub fn spawn_cleanup_task(&self, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            let mut sweep_interval = interval(TokioDuration::from_secs(interval_secs));

            loop {
                sweep_interval.tick().await;
                match store.deactivate_expired(Utc::now()).await {
                    Ok(0) => {}
                    Ok(count) => debug!("Cleanup sweep deactivated {} code(s)", count),
                    Err(e) => warn!("Cleanup sweep failed: {}", e),
                }
            }
        })
    }

    fn grant(&self, code: &TransferCode, display_name: &str) -> TransferCodeGrant {
        TransferCodeGrant {
            transfer_code: code.code.clone(),
            masked_user_name: mask_display_name(display_name),
            issuer_code: self.config.issuer_code.clone(),
            expires_at: code.expires_at.to_rfc3339(),
        }
    }
}

/// Mask a display name for broadcast: names of three or fewer characters
/// keep their ends, longer names keep only the first and last character.
pub fn mask_display_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    match chars.len() {
        0..=2 => name.to_string(),
        3 => format!("{}*{}", chars[0], chars[2]),
        n => {
            let first = chars[0];
            let last = chars[n - 1];
            format!("{}{}{}", first, "*".repeat(n - 2), last)
        }
    }
}

/// Adapter that issues codes for one fixed owner, used by the scan
/// session's implicit-broadcast coupling.
pub struct BoundCodeProvider {
    authority: Arc<TransferCodeAuthority>,
    owner_id: String,
}

impl BoundCodeProvider {
    pub fn new(authority: Arc<TransferCodeAuthority>, owner_id: String) -> Self {
        Self { authority, owner_id }
    }
}

#[async_trait]
impl TransferCodeProvider for BoundCodeProvider {
    async fn fresh_code(&self) -> anyhow::Result<TransferCodeGrant> {
        Ok(self.authority.issue(&self.owner_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_stay_unmasked() {
        assert_eq!(mask_display_name(""), "");
        assert_eq!(mask_display_name("Jo"), "Jo");
    }

    #[test]
    fn three_char_names_mask_the_middle() {
        assert_eq!(mask_display_name("Kim"), "K*m");
    }

    #[test]
    fn longer_names_keep_only_the_ends() {
        assert_eq!(mask_display_name("Kim Cheolsu"), "K*********u");
        assert_eq!(mask_display_name("Hong"), "H**g");
    }

    #[test]
    fn masking_counts_characters_not_bytes() {
        // Hangul names are multi-byte per character.
        assert_eq!(mask_display_name("김철수"), "김*수");
    }
}
