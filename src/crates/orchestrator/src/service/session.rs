//! Token and session lifecycle.

use crate::context::{ContextManager, FlowInfo, SessionContext, TokenContext};
use crate::error::{OrchestratorError, Result};
use crate::flows::FlowManager;
use crate::repository::UserStore;
use serde_json::json;
use std::sync::Arc;

/// Creates and reads token/session contexts.
pub struct SessionService {
    contexts: Arc<ContextManager>,
    flows: Arc<FlowManager>,
    users: Arc<dyn UserStore>,
    default_counterparty: String,
}

impl SessionService {
    /// Wire the service.
    pub fn new(
        contexts: Arc<ContextManager>,
        flows: Arc<FlowManager>,
        users: Arc<dyn UserStore>,
        default_counterparty: impl Into<String>,
    ) -> Self {
        Self {
            contexts,
            flows,
            users,
            default_counterparty: default_counterparty.into(),
        }
    }

    /// Create a token for `user_id`, loading the profile from the user store.
    ///
    /// The issued `token_id` equals `user_id`; the context still records both
    /// fields separately.
    pub async fn create_token(&self, user_id: &str) -> Result<String> {
        let user = self
            .users
            .get_by_id(user_id)
            .await
            .map_err(|e| OrchestratorError::Store(e.to_string()))?
            .ok_or_else(|| {
                OrchestratorError::ContextNotFound(format!("user '{user_id}' does not exist"))
            })?;

        self.contexts.create_token(TokenContext {
            token_id: user_id.to_string(),
            user_id: user_id.to_string(),
            user_info: user.user_info,
        });

        Ok(user_id.to_string())
    }

    /// Create a session binding `user_id` to `flow_name`.
    ///
    /// The session id is `{user_id}_{counterparty_id}_{flow_name}`; the
    /// counterparty defaults to the configured doctor id.
    pub async fn create_session(
        &self,
        user_id: &str,
        flow_name: &str,
        counterparty_id: Option<&str>,
    ) -> Result<String> {
        if !self.flows.has_definition(flow_name) {
            self.flows.scan_flows();
        }
        let definition = self
            .flows
            .get_definition(flow_name)
            .ok_or_else(|| OrchestratorError::FlowNotFound(flow_name.to_string()))?;

        let counterparty = counterparty_id.unwrap_or(&self.default_counterparty);
        let session_id = format!("{user_id}_{counterparty}_{flow_name}");

        let display_name = definition
            .description
            .clone()
            .unwrap_or_else(|| definition.name.clone());

        self.contexts.create_session(SessionContext {
            session_id: session_id.clone(),
            user_id: user_id.to_string(),
            flow_info: FlowInfo {
                flow_key: flow_name.to_string(),
                display_name,
            },
            participant_info: Some(json!({ "counterparty_id": counterparty })),
        });

        Ok(session_id)
    }

    /// Read a token context.
    pub fn get_token_info(&self, token_id: &str) -> Result<TokenContext> {
        self.contexts.get_token(token_id).ok_or_else(|| {
            OrchestratorError::ContextNotFound(format!("token '{token_id}' does not exist"))
        })
    }

    /// Read a session context.
    pub fn get_session_info(&self, session_id: &str) -> Result<SessionContext> {
        self.contexts.get_session(session_id).ok_or_else(|| {
            OrchestratorError::ContextNotFound(format!("session '{session_id}' does not exist"))
        })
    }
}
