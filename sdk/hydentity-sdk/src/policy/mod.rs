pub mod engine;
pub mod seed;
pub mod stream;

pub use engine::generate_execution_plan;
pub use seed::SeedMaterial;
