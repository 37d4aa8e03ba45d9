pub mod code;
pub mod directory;
pub mod error;
pub mod service;
pub mod store;

pub use code::TransferCode;
pub use directory::{MemoryOwnerDirectory, OwnerDirectory, OwnerProfile};
pub use error::{AuthorityError, Result};
pub use service::{
    mask_display_name, BoundCodeProvider, CodeStatus, InvalidReason, TransferCodeAuthority,
};
pub use store::{CodeStore, MemoryCodeStore};
