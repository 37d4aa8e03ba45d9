use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable address-like identifier for a nearby device.
pub type PeerId = String;

/// The wire-level tuple a beacon carries. Constructed fresh per broadcast;
/// immutable once encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconPayload {
    pub transfer_code: String,
    pub display_name: String,
}

impl BeaconPayload {
    pub fn new(transfer_code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            transfer_code: transfer_code.into(),
            display_name: display_name.into(),
        }
    }
}

/// One raw radio event, before any protocol decoding. `service_data` is
/// absent when the advertisement carried no service-data field at all.
#[derive(Debug, Clone)]
pub struct RawAdvertisement {
    pub peer_id: PeerId,
    /// Signal power in dBm; more negative is weaker.
    pub signal_strength: i32,
    pub service_data: Option<Vec<u8>>,
}

/// A radio event after decoding. `payload` is `None` when the observed
/// peer is not speaking this protocol or its payload failed to decode.
#[derive(Debug, Clone)]
pub struct PeerObservation {
    pub peer_id: PeerId,
    pub signal_strength: i32,
    pub payload: Option<BeaconPayload>,
}

/// Last-known state of one discovered peer, keyed by `peer_id` in the
/// aggregator. Updated in place on repeat observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    pub peer_id: PeerId,
    pub display_name: String,
    pub signal_strength: i32,
    pub payload: BeaconPayload,
    pub last_seen_at: DateTime<Utc>,
}
