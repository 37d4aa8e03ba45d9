// Transfer code entity - short-lived, single-use tokens broadcast over the radio

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A short-lived, single-use transfer code owned by one identity.
///
/// At most one `(active, unused, unexpired)` code exists per owner at any
/// time; issuing a new code deactivates every prior one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCode {
    pub code_id: Uuid,
    pub owner_id: String,
    /// Opaque identifier broadcast over the radio, e.g. "088SH1A2B3CF4G".
    pub code: String,
    /// Random per-issuance value folded into the signature input so two
    /// issuances never share a signature.
    pub nonce: String,
    /// Hex digest over the owner secret, issuance time and nonce. Opaque to
    /// the wire format; verified only by the authority.
    pub signature: String,
    pub active: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set exactly once when the code is consumed.
    pub used_at: Option<DateTime<Utc>>,
}

impl TransferCode {
    /// Build a fresh code for an owner. `owner_secret` is the account-holder
    /// value the code and signature are derived from; it never appears in
    /// the code itself except as a truncated digest.
    pub fn generate(
        owner_id: &str,
        owner_secret: &str,
        issuer_code: &str,
        ttl_minutes: i64,
    ) -> Self {
        let issued_at = Utc::now();
        let nonce = generate_nonce();
        let code = compose_code(issuer_code, owner_secret, &nonce);
        let signature = compute_signature(owner_secret, issued_at, &nonce);

        Self {
            code_id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            code,
            nonce,
            signature,
            active: true,
            issued_at,
            expires_at: issued_at + Duration::minutes(ttl_minutes),
            used_at: None,
        }
    }

    /// A code is valid iff it is active, unused and not yet expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.active && self.used_at.is_none() && now < self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Code layout: issuer prefix, "SH" tag, six digest chars of the owner
/// secret, three nonce chars.
fn compose_code(issuer_code: &str, owner_secret: &str, nonce: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(owner_secret.as_bytes());
    let digest = hex::encode(hasher.finalize()).to_uppercase();

    format!("{}SH{}{}", issuer_code, &digest[..6], &nonce[..3])
}

/// Signature format: SHA-256(secret|issued_at_millis|nonce), truncated to
/// 16 hex chars.
fn compute_signature(owner_secret: &str, issued_at: DateTime<Utc>, nonce: &str) -> String {
    use sha2::{Digest, Sha256};

    let input = format!("{}|{}|{}", owner_secret, issued_at.timestamp_millis(), nonce);
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_passes_the_format_prefilter() {
        let code = TransferCode::generate("owner-1", "CUST0001", "088", 10);
        assert!(shared::code_format::is_plausible_code(&code.code, "088"));
        assert!(code.code.starts_with("088SH"));
        assert_eq!(code.code.len(), 14);
    }

    #[test]
    fn fresh_code_is_valid_and_expires_after_ttl() {
        let code = TransferCode::generate("owner-1", "CUST0001", "088", 10);
        let now = Utc::now();
        assert!(code.is_valid(now));
        assert!(!code.is_used());
        let ttl = (code.expires_at - code.issued_at).num_minutes();
        assert_eq!(ttl, 10);
    }

    #[test]
    fn signatures_differ_across_issuances() {
        let first = TransferCode::generate("owner-1", "CUST0001", "088", 10);
        let second = TransferCode::generate("owner-1", "CUST0001", "088", 10);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.signature, second.signature);
    }

    #[test]
    fn used_code_is_invalid() {
        let mut code = TransferCode::generate("owner-1", "CUST0001", "088", 10);
        code.used_at = Some(Utc::now());
        assert!(!code.is_valid(Utc::now()));
        assert!(code.is_used());
    }

    #[test]
    fn expired_code_is_invalid() {
        let code = TransferCode::generate("owner-1", "CUST0001", "088", 10);
        let later = code.expires_at + Duration::seconds(1);
        assert!(!code.is_valid(later));
        assert!(code.is_expired(later));
    }
}
