pub mod codec;
pub mod discovery;
pub mod error;
pub mod radio;
pub mod session;
pub mod signal;
pub mod types;

pub use codec::BeaconCodec;
pub use discovery::DiscoveryAggregator;
pub use error::{ProximityError, Result};
pub use radio::{
    BeaconBroadcaster, BeaconScanner, BroadcastFailure, MockBroadcaster, MockScanner, ScanEvent,
    ScanFailure,
};
pub use session::{BroadcastSession, ScanSession, SessionState};
pub use types::*;
