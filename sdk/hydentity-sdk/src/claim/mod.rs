pub mod orchestrator;

pub use orchestrator::{ClaimOptions, ClaimOrchestrator};
