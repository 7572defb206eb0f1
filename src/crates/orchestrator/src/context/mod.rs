//! Identity plane: process-wide context stores and the ambient turn carrier.

pub mod ambient;
pub mod manager;

pub use ambient::TurnContext;
pub use manager::{ContextManager, FlowInfo, SessionContext, TokenContext};
