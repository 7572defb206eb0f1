//! Domain tools and the tool registry.
//!
//! Every tool obeys the same contract: the caller's identity comes from the
//! ambient [`TurnContext`](crate::context::TurnContext) (never from tool
//! arguments), all reads and writes are scoped to that token, and failures of
//! any kind come back as strings starting with `error:` so the model can
//! recover mid-turn.

pub mod blood_pressure;
pub mod datetime;
pub mod health_event;
pub mod medication;
pub mod registry;
pub mod symptom;

pub use registry::{Tool, ToolRegistry};

use crate::repository::Repositories;

/// Register every domain tool against the given repositories.
pub fn register_domain_tools(registry: &ToolRegistry, repos: &Repositories) {
    blood_pressure::register(registry, repos.blood_pressure.clone());
    medication::register(registry, repos.medication.clone());
    symptom::register(registry, repos.symptom.clone());
    health_event::register(registry, repos.health_event.clone());
    tracing::info!(count = registry.len(), "Tool registry initialized");
}

/// The error string returned when a tool runs outside a bound turn context.
pub(crate) const MISSING_TOKEN_ERROR: &str =
    "error: unable to resolve the calling user; the tool was invoked outside a turn context.";

/// Read the ambient token id or produce the standard error string.
pub(crate) fn require_token_id() -> Result<String, String> {
    crate::context::TurnContext::current_token_id().ok_or_else(|| MISSING_TOKEN_ERROR.to_string())
}
