// Discovery aggregator - merges the raw observation stream into a live,
// deduplicated peer registry

use crate::types::{PeerId, PeerObservation, PeerRecord};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Session-scoped registry of nearby protocol peers, keyed by `peer_id`.
///
/// Safe for one concurrent writer (the observation stream) and any number
/// of snapshot readers: the map lives behind one lock and `snapshot` copies
/// under it, so readers never see later mutations through an old snapshot.
pub struct DiscoveryAggregator {
    peers: Arc<RwLock<HashMap<PeerId, PeerRecord>>>,
}

impl DiscoveryAggregator {
    pub fn new() -> Self {
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fold one observation into the registry. Peers without a protocol
    /// payload are not tracked. Repeat observations update the existing
    /// record in place; identity is the peer id, not the payload, so a
    /// peer that re-broadcasts with a reissued code keeps one entry.
    pub async fn on_observation(&self, obs: PeerObservation) {
        let payload = match obs.payload {
            Some(payload) => payload,
            None => {
                debug!("Ignoring observation without protocol payload: {}", obs.peer_id);
                return;
            }
        };

        let mut peers = self.peers.write().await;
        match peers.get_mut(&obs.peer_id) {
            Some(existing) => {
                existing.display_name = payload.display_name.clone();
                existing.signal_strength = obs.signal_strength;
                existing.payload = payload;
                existing.last_seen_at = Utc::now();
                debug!("Updated peer: {}", obs.peer_id);
            }
            None => {
                info!(
                    "Discovered new peer: {} ({})",
                    payload.display_name, obs.peer_id
                );
                peers.insert(
                    obs.peer_id.clone(),
                    PeerRecord {
                        peer_id: obs.peer_id,
                        display_name: payload.display_name.clone(),
                        signal_strength: obs.signal_strength,
                        payload,
                        last_seen_at: Utc::now(),
                    },
                );
            }
        }
    }

    /// An independent copy of the registry. No cross-peer ordering is
    /// guaranteed; sort explicitly when order matters.
    pub async fn snapshot(&self) -> Vec<PeerRecord> {
        let peers = self.peers.read().await;
        peers.values().cloned().collect()
    }

    /// Empty the registry. Called at the start of each discovery session,
    /// never mid-session.
    pub async fn clear(&self) {
        let mut peers = self.peers.write().await;
        if !peers.is_empty() {
            debug!("Clearing {} peer(s) from the registry", peers.len());
        }
        peers.clear();
    }

    /// Drop records not seen within `max_age`; returns how many were
    /// removed.
    pub async fn prune_stale(&self, max_age: Duration) -> usize {
        let threshold = Utc::now() - max_age;
        let mut peers = self.peers.write().await;
        let initial = peers.len();

        peers.retain(|peer_id, record| {
            let fresh = record.last_seen_at > threshold;
            if !fresh {
                debug!("Removing stale peer: {} (last seen: {})", peer_id, record.last_seen_at);
            }
            fresh
        });

        let removed = initial - peers.len();
        if removed > 0 {
            info!("Removed {} stale peer(s) from the registry", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}

impl Default for DiscoveryAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BeaconPayload;

    fn obs(peer_id: &str, rssi: i32, payload: Option<BeaconPayload>) -> PeerObservation {
        PeerObservation {
            peer_id: peer_id.to_string(),
            signal_strength: rssi,
            payload,
        }
    }

    fn payload(code: &str, name: &str) -> BeaconPayload {
        BeaconPayload::new(code, name)
    }

    #[tokio::test]
    async fn payloadless_observations_are_ignored() {
        let aggregator = DiscoveryAggregator::new();
        aggregator.on_observation(obs("P1", -50, None)).await;
        assert!(aggregator.is_empty().await);
    }

    #[tokio::test]
    async fn repeat_observations_update_in_place() {
        let aggregator = DiscoveryAggregator::new();

        aggregator
            .on_observation(obs("P1", -45, Some(payload("088SH1A2B3CF4G", "K*m"))))
            .await;
        let first_seen = aggregator.snapshot().await[0].last_seen_at;

        aggregator
            .on_observation(obs("P1", -50, Some(payload("088SH1A2B3CF4G", "K*m"))))
            .await;

        let records = aggregator.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].signal_strength, -50);
        assert!(records[0].last_seen_at >= first_seen);
    }

    #[tokio::test]
    async fn a_reissued_code_keeps_one_entry_per_peer() {
        let aggregator = DiscoveryAggregator::new();

        aggregator
            .on_observation(obs("P1", -45, Some(payload("088SH1A2B3CF4G", "K*m"))))
            .await;
        aggregator
            .on_observation(obs("P1", -45, Some(payload("088SH1A2B3XYZ9", "K*m"))))
            .await;

        let records = aggregator.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload.transfer_code, "088SH1A2B3XYZ9");
    }

    #[tokio::test]
    async fn snapshots_are_independent_of_later_updates() {
        let aggregator = DiscoveryAggregator::new();
        aggregator
            .on_observation(obs("P1", -45, Some(payload("088SH1A2B3CF4G", "K*m"))))
            .await;

        let before = aggregator.snapshot().await;
        aggregator
            .on_observation(obs("P1", -90, Some(payload("088SH1A2B3CF4G", "K*m"))))
            .await;

        assert_eq!(before[0].signal_strength, -45);
        assert_eq!(aggregator.snapshot().await[0].signal_strength, -90);
    }

    #[tokio::test]
    async fn clear_empties_the_registry() {
        let aggregator = DiscoveryAggregator::new();
        aggregator
            .on_observation(obs("P1", -45, Some(payload("088SH1A2B3CF4G", "K*m"))))
            .await;
        aggregator
            .on_observation(obs("P2", -60, Some(payload("088SH9Z8Y7XW2Q", "H**g"))))
            .await;
        assert_eq!(aggregator.len().await, 2);

        aggregator.clear().await;
        assert!(aggregator.is_empty().await);
    }

    #[tokio::test]
    async fn prune_removes_only_stale_records() {
        let aggregator = DiscoveryAggregator::new();
        aggregator
            .on_observation(obs("P1", -45, Some(payload("088SH1A2B3CF4G", "K*m"))))
            .await;

        // Nothing is older than a minute yet.
        assert_eq!(aggregator.prune_stale(Duration::minutes(1)).await, 0);
        assert_eq!(aggregator.len().await, 1);

        // Everything is older than zero seconds.
        assert_eq!(aggregator.prune_stale(Duration::seconds(0)).await, 1);
        assert!(aggregator.is_empty().await);
    }
}
