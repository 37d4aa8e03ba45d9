pub mod code_format;
pub mod config;
pub mod logging;
pub mod models;
pub mod provider;

pub use config::{AuthorityConfig, BeaconConfig, Config};
pub use models::{CodeValidation, RedemptionReceipt, RedemptionStatus, TransferCodeGrant};
pub use provider::TransferCodeProvider;
