pub mod bridge;
pub mod cache;
pub mod fees;
pub mod identity;

pub use bridge::{HttpMixerBridge, MixerBridge};
pub use cache::{IdentityBridge, MixerBridgeCache};
pub use fees::{FeeBreakdown, FeeSchedule};
pub use identity::PoolIdentity;
