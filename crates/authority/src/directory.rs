// Owner directory - identity lookups the authority needs for issuing and
// for the owner-availability validation branch

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Account-holder data the authority consults. `secret` is the value codes
/// and signatures are derived from; it never leaves the authority.
#[derive(Debug, Clone)]
pub struct OwnerProfile {
    pub owner_id: String,
    pub display_name: String,
    pub secret: String,
    pub active: bool,
}

#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn find(&self, owner_id: &str) -> Option<OwnerProfile>;
}

/// In-memory directory for tests and demos.
pub struct MemoryOwnerDirectory {
    owners: Arc<RwLock<HashMap<String, OwnerProfile>>>,
}

impl MemoryOwnerDirectory {
    pub fn new() -> Self {
        Self {
            owners: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, profile: OwnerProfile) {
        let mut owners = self.owners.write().await;
        owners.insert(profile.owner_id.clone(), profile);
    }

    pub async fn set_active(&self, owner_id: &str, active: bool) {
        let mut owners = self.owners.write().await;
        if let Some(profile) = owners.get_mut(owner_id) {
            profile.active = active;
        }
    }
}

impl Default for MemoryOwnerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OwnerDirectory for MemoryOwnerDirectory {
    async fn find(&self, owner_id: &str) -> Option<OwnerProfile> {
        let owners = self.owners.read().await;
        owners.get(owner_id).cloned()
    }
}
