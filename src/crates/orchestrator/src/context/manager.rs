//! Process-wide token and session context stores.
//!
//! Two independent maps: `token_id` → [`TokenContext`] (authenticated
//! principal plus profile) and `session_id` → [`SessionContext`]
//! (conversation bound to a flow). Each map sits behind its own
//! `parking_lot::RwLock`; no lock is ever held across an await point.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Flow binding of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowInfo {
    /// Key of the flow this session runs.
    pub flow_key: String,

    /// Human-readable flow name for UIs.
    pub display_name: String,
}

/// An authenticated principal and their profile.
///
/// `token_id` and `user_id` are distinct fields even though token creation
/// currently issues `token_id == user_id`; nothing outside token creation may
/// assume they match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenContext {
    /// Token key.
    pub token_id: String,

    /// The person this token authenticates.
    pub user_id: String,

    /// Free-form profile map injected into prompts as `user_info`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Value>,
}

/// An ongoing conversation bound to a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Session key, canonically `{user_id}_{counterparty_id}_{flow_key}`.
    pub session_id: String,

    /// Owning user.
    pub user_id: String,

    /// Flow binding.
    pub flow_info: FlowInfo,

    /// Other participants (e.g. the doctor side of the conversation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_info: Option<Value>,
}

/// Owner of the token and session maps.
#[derive(Default)]
pub struct ContextManager {
    tokens: RwLock<HashMap<String, TokenContext>>,
    sessions: RwLock<HashMap<String, SessionContext>>,
}

impl ContextManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a token context. An existing entry is overwritten with a warning.
    pub fn create_token(&self, context: TokenContext) -> TokenContext {
        let mut tokens = self.tokens.write();
        if tokens.contains_key(&context.token_id) {
            tracing::warn!(token_id = %context.token_id, "TokenContext already exists, overwriting");
        } else {
            tracing::info!(token_id = %context.token_id, "Created TokenContext");
        }
        tokens.insert(context.token_id.clone(), context.clone());
        context
    }

    /// Look up a token context.
    pub fn get_token(&self, token_id: &str) -> Option<TokenContext> {
        self.tokens.read().get(token_id).cloned()
    }

    /// Return the existing token context or create a minimal one.
    pub fn get_or_create_token(&self, token_id: &str, user_id: &str) -> TokenContext {
        if let Some(existing) = self.get_token(token_id) {
            return existing;
        }
        self.create_token(TokenContext {
            token_id: token_id.to_string(),
            user_id: user_id.to_string(),
            user_info: None,
        })
    }

    /// Remove a token context.
    pub fn clear_token(&self, token_id: &str) {
        if self.tokens.write().remove(token_id).is_some() {
            tracing::info!(token_id, "Cleared TokenContext");
        }
    }

    /// Number of stored token contexts.
    pub fn token_count(&self) -> usize {
        self.tokens.read().len()
    }

    /// Store a session context. An existing entry is overwritten with a warning.
    pub fn create_session(&self, context: SessionContext) -> SessionContext {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&context.session_id) {
            tracing::warn!(session_id = %context.session_id, "SessionContext already exists, overwriting");
        } else {
            tracing::info!(session_id = %context.session_id, flow = %context.flow_info.flow_key, "Created SessionContext");
        }
        sessions.insert(context.session_id.clone(), context.clone());
        context
    }

    /// Look up a session context.
    pub fn get_session(&self, session_id: &str) -> Option<SessionContext> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Remove a session context.
    pub fn clear_session(&self, session_id: &str) {
        if self.sessions.write().remove(session_id).is_some() {
            tracing::info!(session_id, "Cleared SessionContext");
        }
    }

    /// Number of stored session contexts.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop every stored context.
    pub fn clear_all(&self) {
        let tokens = {
            let mut map = self.tokens.write();
            let n = map.len();
            map.clear();
            n
        };
        let sessions = {
            let mut map = self.sessions.write();
            let n = map.len();
            map.clear();
            n
        };
        tracing::info!(tokens, sessions, "Cleared all contexts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(id: &str) -> TokenContext {
        TokenContext {
            token_id: id.to_string(),
            user_id: id.to_string(),
            user_info: Some(json!({"name": "test"})),
        }
    }

    fn session(id: &str, flow: &str) -> SessionContext {
        SessionContext {
            session_id: id.to_string(),
            user_id: "u1".to_string(),
            flow_info: FlowInfo {
                flow_key: flow.to_string(),
                display_name: flow.to_string(),
            },
            participant_info: None,
        }
    }

    #[test]
    fn token_create_and_get() {
        let manager = ContextManager::new();
        manager.create_token(token("u1"));
        assert_eq!(manager.get_token("u1").unwrap().user_id, "u1");
        assert!(manager.get_token("u2").is_none());
        assert_eq!(manager.token_count(), 1);
    }

    #[test]
    fn create_token_overwrites_existing() {
        let manager = ContextManager::new();
        manager.create_token(token("u1"));
        let mut updated = token("u1");
        updated.user_info = Some(json!({"name": "changed"}));
        manager.create_token(updated);

        let stored = manager.get_token("u1").unwrap();
        assert_eq!(stored.user_info.unwrap()["name"], json!("changed"));
        assert_eq!(manager.token_count(), 1);
    }

    #[test]
    fn get_or_create_token_returns_same_context() {
        let manager = ContextManager::new();
        let first = manager.get_or_create_token("u1", "u1");
        let second = manager.get_or_create_token("u1", "ignored");
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(manager.token_count(), 1);
    }

    #[test]
    fn sessions_are_independent_of_tokens() {
        let manager = ContextManager::new();
        manager.create_token(token("u1"));
        manager.create_session(session("u1_doc_flow", "medical_agent"));

        assert_eq!(manager.session_count(), 1);
        manager.clear_session("u1_doc_flow");
        assert_eq!(manager.session_count(), 0);
        assert_eq!(manager.token_count(), 1);
    }

    #[test]
    fn clear_all_empties_both_maps() {
        let manager = ContextManager::new();
        manager.create_token(token("u1"));
        manager.create_session(session("s1", "f"));
        manager.clear_all();
        assert_eq!(manager.token_count(), 0);
        assert_eq!(manager.session_count(), 0);
    }
}
