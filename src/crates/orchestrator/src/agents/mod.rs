//! Agent construction and execution.

pub mod factory;

pub use factory::{AgentExecutor, AgentFactory, AgentOutcome};
