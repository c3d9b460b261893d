pub mod actions;
pub mod pipeline;
pub mod vault;
