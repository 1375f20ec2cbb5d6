pub mod commands;
pub mod engine;
pub mod grid;
pub mod quantizer;
pub mod sampler;
pub mod scheduler;
pub mod transport;

// Re-exports
pub use commands::EngineCommand;
pub use engine::{EngineHandle, GenerativeEngine};
pub use sampler::{SampleIndexProvider, SampleSelector};

#[cfg(test)]
mod tests_scheduling;
