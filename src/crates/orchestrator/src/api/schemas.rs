//! Request/response DTOs of the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub user_id: String,
    pub flow_name: String,
    #[serde(default)]
    pub counterparty_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct FlowSummary {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub entry_node: String,
    pub node_count: usize,
    pub is_compiled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PreviewParams {
    /// `dot`, `mermaid` (default), or `ascii`.
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TokenInfoResponse {
    pub token_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SessionInfoResponse {
    pub session_id: String,
    pub user_id: String,
    pub flow_key: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_info: Option<Value>,
}
