//! Ambient per-turn identity carrier.
//!
//! The chat service binds a [`TurnContext`] around graph execution; every
//! tool invoked anywhere inside that logical turn reads the caller's identity
//! with [`TurnContext::current`] instead of receiving it as an argument. The
//! carrier is a tokio task-local, so it propagates across await points inside
//! the scoped future and is restored automatically when the scope ends.
//! Futures spawned onto other tasks must be wrapped in a fresh
//! [`TurnContext::scope`] to inherit it.

use std::future::Future;

/// Identity of the logical turn currently executing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnContext {
    /// Caller's token id; tools scope every read and write to it.
    pub token_id: Option<String>,

    /// Session the turn belongs to.
    pub session_id: Option<String>,

    /// Trace id for log correlation.
    pub trace_id: Option<String>,
}

tokio::task_local! {
    static CURRENT_TURN: TurnContext;
}

impl TurnContext {
    /// Create a fully-populated context.
    pub fn new(
        token_id: impl Into<String>,
        session_id: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            token_id: Some(token_id.into()),
            session_id: Some(session_id.into()),
            trace_id: Some(trace_id.into()),
        }
    }

    /// Run `fut` with this context bound as the ambient turn context.
    ///
    /// Nesting is allowed; the inner scope shadows the outer one and the
    /// outer context is visible again once the inner future completes.
    pub async fn scope<F>(self, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TURN.scope(self, fut).await
    }

    /// The ambient turn context, if one is bound on this task.
    pub fn current() -> Option<TurnContext> {
        CURRENT_TURN.try_with(|ctx| ctx.clone()).ok()
    }

    /// The ambient token id, if any.
    pub fn current_token_id() -> Option<String> {
        Self::current().and_then(|ctx| ctx.token_id)
    }
}
