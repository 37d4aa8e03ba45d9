// Beacon payload codec - packs a transfer code and display name into the
// advertisement byte budget

use crate::types::BeaconPayload;
use shared::code_format::is_plausible_code;
use shared::config::BeaconConfig;
use tracing::{debug, warn};

/// ASCII delimiter between the code and the display name on the wire.
const DELIMITER: u8 = b'|';

/// Encodes `code|name` into a bounded byte buffer and decodes it back.
///
/// The budget is the radio frame ceiling minus its fixed header overhead
/// and comes from configuration. Degradation under the ceiling is always
/// at the name's expense: the code is never truncated.
#[derive(Debug, Clone)]
pub struct BeaconCodec {
    payload_budget: usize,
    issuer_code: String,
}

impl BeaconCodec {
    pub fn new(payload_budget: usize, issuer_code: impl Into<String>) -> Self {
        Self {
            payload_budget,
            issuer_code: issuer_code.into(),
        }
    }

    pub fn from_config(beacon: &BeaconConfig, issuer_code: impl Into<String>) -> Self {
        Self::new(beacon.payload_budget, issuer_code)
    }

    pub fn payload_budget(&self) -> usize {
        self.payload_budget
    }

    /// Serialize the payload, fitting as much of the display name as the
    /// remaining budget allows without splitting a multi-byte character.
    /// When nothing fits, the name degrades to zero bytes; encoding itself
    /// never fails.
    pub fn encode(&self, payload: &BeaconPayload) -> Vec<u8> {
        let code_bytes = payload.transfer_code.as_bytes();
        let remaining = self
            .payload_budget
            .saturating_sub(code_bytes.len() + 1);

        let mut out = Vec::with_capacity(self.payload_budget);
        out.extend_from_slice(code_bytes);
        out.push(DELIMITER);

        let mut used = 0;
        for ch in payload.display_name.chars() {
            let ch_len = ch.len_utf8();
            if used + ch_len > remaining {
                break;
            }
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            used += ch_len;
        }

        if used < payload.display_name.len() {
            warn!(
                "Display name truncated to fit the advertising budget (orig={}, used={})",
                payload.display_name.len(),
                used
            );
        }
        out
    }

    /// Parse raw advertisement bytes. Anything that is not exactly
    /// `code|name` with a plausibly-ours code yields `None`; foreign
    /// payloads sharing the spectrum are a normal occurrence, never an
    /// error.
    pub fn decode(&self, bytes: &[u8]) -> Option<BeaconPayload> {
        let text = std::str::from_utf8(bytes).ok()?;

        let parts: Vec<&str> = text.split(DELIMITER as char).collect();
        if parts.len() != 2 {
            debug!("Payload is not a code|name pair: {:?}", text);
            return None;
        }

        let (code, name) = (parts[0], parts[1]);
        if !is_plausible_code(code, &self.issuer_code) {
            debug!("Payload code failed the format pre-filter: {:?}", code);
            return None;
        }

        Some(BeaconPayload::new(code, name))
    }
}

impl Default for BeaconCodec {
    fn default() -> Self {
        let beacon = BeaconConfig::default();
        Self::new(beacon.payload_budget, "088")
    }
}
