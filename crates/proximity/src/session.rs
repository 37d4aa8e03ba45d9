// Broadcast and scan session state machines - start/stop/timeout
// orchestration over the radio capabilities

use crate::codec::BeaconCodec;
use crate::discovery::DiscoveryAggregator;
use crate::error::Result;
use crate::radio::{BeaconBroadcaster, BeaconScanner, ScanEvent};
use crate::types::{BeaconPayload, PeerObservation};
use shared::config::BeaconConfig;
use shared::provider::TransferCodeProvider;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::{debug, info, warn};

/// Lifecycle of a broadcast or scan session. All transitions are validated
/// here rather than at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Stopping,
    /// Terminal for this attempt; a fresh `start()` retries.
    Failed,
}

impl SessionState {
    fn can_start(self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Failed)
    }

    fn is_running(self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Active)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Active => write!(f, "Active"),
            SessionState::Stopping => write!(f, "Stopping"),
            SessionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Drives the broadcast capability: encodes a payload and keeps it on the
/// air until stopped.
pub struct BroadcastSession {
    broadcaster: Arc<dyn BeaconBroadcaster>,
    codec: BeaconCodec,
    service_uuid: String,
    state: Arc<RwLock<SessionState>>,
    current: Arc<RwLock<Option<BeaconPayload>>>,
}

impl BroadcastSession {
    pub fn new(
        broadcaster: Arc<dyn BeaconBroadcaster>,
        codec: BeaconCodec,
        beacon: &BeaconConfig,
    ) -> Self {
        Self {
            broadcaster,
            codec,
            service_uuid: beacon.service_uuid.clone(),
            state: Arc::new(RwLock::new(SessionState::Idle)),
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Start broadcasting the payload. On capability failure the session
    /// lands in `Failed` with the reason surfaced to the caller.
    pub async fn start(&self, payload: BeaconPayload) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.can_start() {
            return Err(crate::radio::BroadcastFailure::AlreadyStarted.into());
        }
        *state = SessionState::Starting;

        let bytes = self.codec.encode(&payload);
        info!(
            "Starting broadcast of {} ({} bytes)",
            payload.transfer_code,
            bytes.len()
        );

        match self.broadcaster.start(&self.service_uuid, &bytes).await {
            Ok(()) => {
                *state = SessionState::Active;
                *self.current.write().await = Some(payload);
                Ok(())
            }
            Err(reason) => {
                warn!("Broadcast start failed: {}", reason);
                *state = SessionState::Failed;
                Err(reason.into())
            }
        }
    }

    /// Stop broadcasting. A no-op unless the session is running.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if !state.is_running() {
                debug!("Broadcast stop ignored in state {}", *state);
                return;
            }
            *state = SessionState::Stopping;
        }

        self.broadcaster.stop().await;

        *self.current.write().await = None;
        *self.state.write().await = SessionState::Idle;
        info!("Broadcast stopped");
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn is_active(&self) -> bool {
        *self.state.read().await == SessionState::Active
    }

    /// The payload currently on the air, if any.
    pub async fn current_payload(&self) -> Option<BeaconPayload> {
        self.current.read().await.clone()
    }
}

/// Drives the scan capability: feeds decoded observations into the
/// aggregator and auto-stops after the configured timeout.
///
/// Starting a scan clears the aggregator and, when a broadcast session is
/// attached and not already on the air, starts it with a freshly issued
/// code. Stopping is independent: the broadcast keeps running.
#[derive(Clone)]
pub struct ScanSession {
    scanner: Arc<dyn BeaconScanner>,
    aggregator: Arc<DiscoveryAggregator>,
    codec: BeaconCodec,
    service_uuid: String,
    timeout: TokioDuration,
    state: Arc<RwLock<SessionState>>,
    stop_notify: Arc<Notify>,
    timeout_handle: Arc<RwLock<Option<tokio::task::JoinHandle<()>>>>,
    broadcast: Option<Arc<BroadcastSession>>,
    code_provider: Option<Arc<dyn TransferCodeProvider>>,
}

impl ScanSession {
    pub fn new(
        scanner: Arc<dyn BeaconScanner>,
        aggregator: Arc<DiscoveryAggregator>,
        codec: BeaconCodec,
        beacon: &BeaconConfig,
    ) -> Self {
        Self {
            scanner,
            aggregator,
            codec,
            service_uuid: beacon.service_uuid.clone(),
            timeout: TokioDuration::from_secs(beacon.scan_timeout_secs),
            state: Arc::new(RwLock::new(SessionState::Idle)),
            stop_notify: Arc::new(Notify::new()),
            timeout_handle: Arc::new(RwLock::new(None)),
            broadcast: None,
            code_provider: None,
        }
    }

    /// Attach the broadcast session this scan should implicitly start.
    pub fn with_broadcast(
        mut self,
        broadcast: Arc<BroadcastSession>,
        provider: Arc<dyn TransferCodeProvider>,
    ) -> Self {
        self.broadcast = Some(broadcast);
        self.code_provider = Some(provider);
        self
    }

    pub async fn start(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if !state.can_start() {
                return Err(crate::radio::ScanFailure::AlreadyStarted.into());
            }
            *state = SessionState::Starting;
        }

        // The registry is session-scoped.
        self.aggregator.clear().await;

        self.ensure_broadcasting().await;

        let rx = match self.scanner.start(&self.service_uuid).await {
            Ok(rx) => rx,
            Err(reason) => {
                warn!("Scan start failed: {}", reason);
                *self.state.write().await = SessionState::Failed;
                return Err(reason.into());
            }
        };

        *self.state.write().await = SessionState::Active;
        info!("Scan started ({}s timeout)", self.timeout.as_secs());

        self.spawn_pump(rx);
        self.arm_timeout().await;
        Ok(())
    }

    /// Stop the scan. Idempotent: the timeout's auto-stop and a manual stop
    /// race through the same `Stopping` gate, so the transition to `Idle`
    /// happens exactly once.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if !state.is_running() {
                debug!("Scan stop ignored in state {}", *state);
                return;
            }
            *state = SessionState::Stopping;
        }

        // Cancel the pending timeout and wind down the pump.
        if let Some(handle) = self.timeout_handle.write().await.take() {
            handle.abort();
        }
        self.stop_notify.notify_waiters();
        self.scanner.stop().await;

        *self.state.write().await = SessionState::Idle;
        info!("Scan stopped");
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn is_active(&self) -> bool {
        *self.state.read().await == SessionState::Active
    }

    /// Start the attached broadcast with a fresh code unless it is already
    /// on the air. Broadcast trouble never blocks the scan.
    async fn ensure_broadcasting(&self) {
        let (broadcast, provider) = match (&self.broadcast, &self.code_provider) {
            (Some(broadcast), Some(provider)) => (broadcast, provider),
            _ => return,
        };

        if broadcast.state().await.is_running() {
            debug!("Broadcast already running, not reissuing");
            return;
        }

        match provider.fresh_code().await {
            Ok(grant) => {
                let payload = BeaconPayload::new(grant.transfer_code, grant.masked_user_name);
                if let Err(e) = broadcast.start(payload).await {
                    warn!("Implicit broadcast start failed: {}", e);
                }
            }
            Err(e) => warn!("Could not obtain a fresh transfer code: {}", e),
        }
    }

    fn spawn_pump(&self, mut rx: mpsc::Receiver<ScanEvent>) {
        let aggregator = Arc::clone(&self.aggregator);
        let codec = self.codec.clone();
        let state = Arc::clone(&self.state);
        let scanner = Arc::clone(&self.scanner);
        let shutdown = Arc::clone(&self.stop_notify);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(ScanEvent::Advertisement(raw)) => {
                            let payload = raw
                                .service_data
                                .as_deref()
                                .and_then(|data| codec.decode(data));
                            aggregator
                                .on_observation(PeerObservation {
                                    peer_id: raw.peer_id,
                                    signal_strength: raw.signal_strength,
                                    payload,
                                })
                                .await;
                        }
                        Some(ScanEvent::Failed(reason)) => {
                            warn!("Scan failed mid-session: {}", reason);
                            scanner.stop().await;
                            *state.write().await = SessionState::Failed;
                            break;
                        }
                        None => break,
                    },
                    _ = shutdown.notified() => break,
                }
            }
            debug!("Observation pump terminated");
        });
    }

    async fn arm_timeout(&self) {
        let session = self.clone();

        let handle = tokio::spawn(async move {
            sleep(session.timeout).await;
            // Disarm before stopping so stop() never aborts the task that
            // is running it.
            session.timeout_handle.write().await.take();
            debug!("Scan timeout reached, stopping scan session");
            session.stop().await;
        });

        let mut slot = self.timeout_handle.write().await;
        if let Some(stale) = slot.take() {
            // Left over from an attempt that ended in Failed.
            stale.abort();
        }
        *slot = Some(handle);
    }
}
