// Radio capability seams - the broadcast and scan collaborators the
// sessions drive, plus in-process mocks for tests and demos

use crate::types::RawAdvertisement;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Duration as TokioDuration;
use tracing::{debug, info};

/// Why a broadcast failed to start. Closed taxonomy; sessions surface these
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastFailure {
    AlreadyStarted,
    PayloadTooLarge,
    Unsupported,
    TooManyBroadcasters,
    InternalError,
}

impl std::fmt::Display for BroadcastFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcastFailure::AlreadyStarted => write!(f, "already started"),
            BroadcastFailure::PayloadTooLarge => write!(f, "payload too large"),
            BroadcastFailure::Unsupported => write!(f, "unsupported"),
            BroadcastFailure::TooManyBroadcasters => write!(f, "too many broadcasters"),
            BroadcastFailure::InternalError => write!(f, "internal error"),
        }
    }
}

/// Why a scan failed to start, or died mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFailure {
    AlreadyStarted,
    RegistrationFailed,
    Unsupported,
    InternalError,
}

impl std::fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanFailure::AlreadyStarted => write!(f, "already started"),
            ScanFailure::RegistrationFailed => write!(f, "registration failed"),
            ScanFailure::Unsupported => write!(f, "unsupported"),
            ScanFailure::InternalError => write!(f, "internal error"),
        }
    }
}

/// Event emitted by a running scan.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Advertisement(RawAdvertisement),
    /// Terminal; no further events follow.
    Failed(ScanFailure),
}

/// Broadcast capability: carries protocol bytes under a service identifier
/// until stopped.
#[async_trait]
pub trait BeaconBroadcaster: Send + Sync {
    async fn start(
        &self,
        service_uuid: &str,
        payload: &[u8],
    ) -> std::result::Result<(), BroadcastFailure>;

    async fn stop(&self);
}

/// Scan capability: filters on a service identifier and pushes raw
/// observations on its own schedule.
#[async_trait]
pub trait BeaconScanner: Send + Sync {
    async fn start(
        &self,
        service_uuid: &str,
    ) -> std::result::Result<mpsc::Receiver<ScanEvent>, ScanFailure>;

    async fn stop(&self);
}

/// In-process broadcaster for tests and demos. Optionally enforces a frame
/// limit and can be primed to fail the next start.
pub struct MockBroadcaster {
    active: Arc<RwLock<bool>>,
    fail_next: Arc<RwLock<Option<BroadcastFailure>>>,
    frame_limit: Option<usize>,
    last_payload: Arc<RwLock<Option<Vec<u8>>>>,
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self {
            active: Arc::new(RwLock::new(false)),
            fail_next: Arc::new(RwLock::new(None)),
            frame_limit: None,
            last_payload: Arc::new(RwLock::new(None)),
        }
    }

    /// Reject payloads longer than `limit` bytes, like a real radio frame.
    pub fn with_frame_limit(limit: usize) -> Self {
        Self {
            frame_limit: Some(limit),
            ..Self::new()
        }
    }

    pub async fn fail_next_start(&self, reason: BroadcastFailure) {
        *self.fail_next.write().await = Some(reason);
    }

    pub async fn is_broadcasting(&self) -> bool {
        *self.active.read().await
    }

    pub async fn last_payload(&self) -> Option<Vec<u8>> {
        self.last_payload.read().await.clone()
    }
}

impl Default for MockBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BeaconBroadcaster for MockBroadcaster {
    async fn start(
        &self,
        service_uuid: &str,
        payload: &[u8],
    ) -> std::result::Result<(), BroadcastFailure> {
        if let Some(reason) = self.fail_next.write().await.take() {
            return Err(reason);
        }

        if let Some(limit) = self.frame_limit {
            if payload.len() > limit {
                return Err(BroadcastFailure::PayloadTooLarge);
            }
        }

        let mut active = self.active.write().await;
        if *active {
            return Err(BroadcastFailure::AlreadyStarted);
        }
        *active = true;

        *self.last_payload.write().await = Some(payload.to_vec());
        info!(
            "Mock broadcast started under {} ({} bytes)",
            service_uuid,
            payload.len()
        );
        Ok(())
    }

    async fn stop(&self) {
        *self.active.write().await = false;
        debug!("Mock broadcast stopped");
    }
}

/// In-process scanner for tests and demos. Replays a scripted sequence of
/// advertisements on an interval after `start`, and accepts live pushes.
pub struct MockScanner {
    script: Arc<RwLock<Vec<RawAdvertisement>>>,
    replay_interval: TokioDuration,
    active: Arc<RwLock<bool>>,
    fail_next: Arc<RwLock<Option<ScanFailure>>>,
    live: Arc<RwLock<Option<mpsc::Sender<ScanEvent>>>>,
}

impl MockScanner {
    pub fn new() -> Self {
        Self {
            script: Arc::new(RwLock::new(Vec::new())),
            replay_interval: TokioDuration::from_millis(5),
            active: Arc::new(RwLock::new(false)),
            fail_next: Arc::new(RwLock::new(None)),
            live: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn script(&self, advertisements: Vec<RawAdvertisement>) {
        *self.script.write().await = advertisements;
    }

    pub async fn fail_next_start(&self, reason: ScanFailure) {
        *self.fail_next.write().await = Some(reason);
    }

    pub async fn is_scanning(&self) -> bool {
        *self.active.read().await
    }

    /// Push one event into a running scan; returns false when no scan is
    /// active or the receiver is gone.
    pub async fn push(&self, event: ScanEvent) -> bool {
        let live = self.live.read().await;
        match live.as_ref() {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BeaconScanner for MockScanner {
    async fn start(
        &self,
        service_uuid: &str,
    ) -> std::result::Result<mpsc::Receiver<ScanEvent>, ScanFailure> {
        if let Some(reason) = self.fail_next.write().await.take() {
            return Err(reason);
        }

        let mut active = self.active.write().await;
        if *active {
            return Err(ScanFailure::AlreadyStarted);
        }
        *active = true;

        let (tx, rx) = mpsc::channel(64);
        *self.live.write().await = Some(tx.clone());

        let script = self.script.read().await.clone();
        let active_flag = Arc::clone(&self.active);
        let interval = self.replay_interval;
        tokio::spawn(async move {
            for advertisement in script {
                if !*active_flag.read().await {
                    break;
                }
                if tx.send(ScanEvent::Advertisement(advertisement)).await.is_err() {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        });

        info!("Mock scan started under {}", service_uuid);
        Ok(rx)
    }

    async fn stop(&self) {
        *self.active.write().await = false;
        *self.live.write().await = None;
        debug!("Mock scan stopped");
    }
}
