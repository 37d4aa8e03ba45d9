// Code storage contract - the two transactional operations the authority
// relies on, plus reads, implementable by any persistence backend

use crate::code::TransferCode;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Keyed store for transfer codes.
///
/// Implementations must make `revoke_then_insert` and `consume_if_unused`
/// atomic: the first is the issue path's invalidate-then-insert unit of
/// work, the second a single conditional update. Everything else is a plain
/// read or bulk hygiene write.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Deactivate every active code for the owner, then insert the new one,
    /// inside one atomic unit. Concurrent calls for the same owner must
    /// serialize so a lost race never leaves two active codes.
    async fn revoke_then_insert(&self, owner_id: &str, code: TransferCode) -> Result<()>;

    /// Mark the code used at `now` iff it is currently unused. Returns
    /// whether this call performed the transition.
    async fn consume_if_unused(&self, code: &str, now: DateTime<Utc>) -> Result<bool>;

    async fn find_by_code(&self, code: &str) -> Result<Option<TransferCode>>;

    async fn find_by_id(&self, code_id: Uuid) -> Result<Option<TransferCode>>;

    /// The owner's currently valid code, if any.
    async fn find_active_for_owner(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TransferCode>>;

    async fn count_active_for_owner(&self, owner_id: &str, now: DateTime<Utc>) -> Result<u64>;

    /// Soft-disable one code.
    async fn revoke(&self, code_id: Uuid) -> Result<()>;

    /// Deactivate rows whose expiry has passed; returns how many changed.
    /// Storage hygiene only - expiry is always evaluated at read time.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Drop rows issued before the cutoff; returns how many were removed.
    async fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// In-memory store. One map behind one lock, so both transactional
/// operations hold the critical section for their full read-modify-write.
pub struct MemoryCodeStore {
    codes: Arc<RwLock<HashMap<String, TransferCode>>>,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self {
            codes: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn revoke_then_insert(&self, owner_id: &str, code: TransferCode) -> Result<()> {
        let mut codes = self.codes.write().await;

        let mut revoked = 0;
        for existing in codes.values_mut() {
            if existing.owner_id == owner_id && existing.active {
                existing.active = false;
                revoked += 1;
            }
        }
        if revoked > 0 {
            debug!("Revoked {} prior code(s) for owner {}", revoked, owner_id);
        }

        codes.insert(code.code.clone(), code);
        Ok(())
    }

    async fn consume_if_unused(&self, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut codes = self.codes.write().await;

        match codes.get_mut(code) {
            Some(record) if record.used_at.is_none() => {
                record.used_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<TransferCode>> {
        let codes = self.codes.read().await;
        Ok(codes.get(code).cloned())
    }

    async fn find_by_id(&self, code_id: Uuid) -> Result<Option<TransferCode>> {
        let codes = self.codes.read().await;
        Ok(codes.values().find(|c| c.code_id == code_id).cloned())
    }

    async fn find_active_for_owner(
        &self,
        owner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TransferCode>> {
        let codes = self.codes.read().await;
        Ok(codes
            .values()
            .find(|c| c.owner_id == owner_id && c.is_valid(now))
            .cloned())
    }

    async fn count_active_for_owner(&self, owner_id: &str, now: DateTime<Utc>) -> Result<u64> {
        let codes = self.codes.read().await;
        Ok(codes
            .values()
            .filter(|c| c.owner_id == owner_id && c.is_valid(now))
            .count() as u64)
    }

    async fn revoke(&self, code_id: Uuid) -> Result<()> {
        let mut codes = self.codes.write().await;
        for record in codes.values_mut() {
            if record.code_id == code_id {
                record.active = false;
            }
        }
        Ok(())
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut codes = self.codes.write().await;
        let mut changed = 0;
        for record in codes.values_mut() {
            if record.active && record.is_expired(now) {
                record.active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_issued_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut codes = self.codes.write().await;
        let initial = codes.len();
        codes.retain(|_, record| record.issued_at >= cutoff);
        Ok((initial - codes.len()) as u64)
    }
}
