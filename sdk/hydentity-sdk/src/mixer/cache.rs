use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::error::{HydentitySdkError, Result};
use crate::mixer::bridge::MixerBridge;
use crate::mixer::identity::PoolIdentity;
use crate::types::{Amount, DepositReceipt, WithdrawReceipt};

/// Shared bridge for one identity. Deposits through it are serialized, so
/// concurrent claims for the same wallet never interleave balance checks.
pub struct IdentityBridge {
    bridge: Arc<dyn MixerBridge>,
    deposit_lock: Mutex<()>,
}

impl IdentityBridge {
    pub fn new(bridge: Arc<dyn MixerBridge>) -> Self {
        Self {
            bridge,
            deposit_lock: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &Arc<dyn MixerBridge> {
        &self.bridge
    }
}

#[async_trait]
impl MixerBridge for IdentityBridge {
    fn identity(&self) -> PoolIdentity {
        self.bridge.identity()
    }

    async fn deposit_into_mixer(&self, amount: Amount) -> Result<DepositReceipt> {
        let _guard = self.deposit_lock.lock().await;
        self.bridge.deposit_into_mixer(amount).await
    }

    async fn withdraw(&self, amount: Amount, recipient: Option<Pubkey>) -> Result<WithdrawReceipt> {
        self.bridge.withdraw(amount, recipient).await
    }

    async fn get_balance(&self) -> Result<Amount> {
        self.bridge.get_balance().await
    }
}

/// At most one live bridge per pool identity.
///
/// Owned by the caller's session. Entries live until evicted; there is no
/// expiry.
#[derive(Default)]
pub struct MixerBridgeCache {
    entries: Mutex<HashMap<PoolIdentity, Slot>>,
}

type Slot = Arc<OnceCell<Arc<IdentityBridge>>>;

impl MixerBridgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached bridge for `identity`, or build one with `init`.
    ///
    /// Setup is serialized per identity: concurrent callers for the same
    /// identity share one `init`, while other identities never wait on it.
    /// A failed `init` caches nothing.
    pub async fn get_or_try_init<F, Fut>(
        &self,
        identity: PoolIdentity,
        init: F,
    ) -> Result<Arc<IdentityBridge>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn MixerBridge>>>,
    {
        let slot = self.slot(identity).await;
        if let Some(existing) = slot.get() {
            debug!(identity = %identity, "mixer bridge cache hit");
            return Ok(existing.clone());
        }

        let outcome = slot
            .get_or_try_init(|| async move {
                let bridge = init().await?;
                Ok::<_, HydentitySdkError>(Arc::new(IdentityBridge::new(bridge)))
            })
            .await
            .cloned();
        match outcome {
            Ok(bridge) => {
                info!(identity = %identity, "mixer bridge cached");
                Ok(bridge)
            },
            Err(err) => {
                self.discard_empty(identity, &slot).await;
                Err(err)
            },
        }
    }

    async fn slot(&self, identity: PoolIdentity) -> Slot {
        self.entries
            .lock()
            .await
            .entry(identity)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Forget `slot` if setup failed and nobody has filled it since.
    async fn discard_empty(&self, identity: PoolIdentity, slot: &Slot) {
        let mut entries = self.entries.lock().await;
        let unfilled = entries
            .get(&identity)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if unfilled {
            entries.remove(&identity);
        }
    }

    pub async fn get(&self, identity: &PoolIdentity) -> Option<Arc<IdentityBridge>> {
        self.entries
            .lock()
            .await
            .get(identity)
            .and_then(|slot| slot.get().cloned())
    }

    /// Drop the entry for `identity`. Claims already holding it keep working.
    pub async fn evict(&self, identity: &PoolIdentity) -> bool {
        let removed = self
            .entries
            .lock()
            .await
            .remove(identity)
            .is_some_and(|slot| slot.initialized());
        if removed {
            info!(identity = %identity, "mixer bridge evicted");
        }
        removed
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let count = entries.values().filter(|slot| slot.initialized()).count();
        entries.clear();
        info!(evicted = count, "mixer bridge cache cleared");
    }

    /// Number of live bridges; sessions still being set up are not counted.
    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
