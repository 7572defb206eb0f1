//! HTTP routes.

use crate::api::schemas::{
    CreateSessionRequest, CreateSessionResponse, CreateTokenRequest, CreateTokenResponse,
    ErrorBody, FlowSummary, PreviewParams, SessionInfoResponse, TokenInfoResponse,
};
use crate::app::AppContext;
use crate::error::OrchestratorError;
use crate::service::{ChatTurnRequest, ChatTurnResponse};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use flowgraph::{visualize, VisualizationFormat, VisualizationOptions};
use std::sync::Arc;

/// Build the application router.
pub fn router(app: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/login/token", post(create_token))
        .route("/api/v1/login/session", post(create_session))
        .route("/api/v1/login/token/:token_id", get(get_token_info))
        .route("/api/v1/login/session/:session_id", get(get_session_info))
        .route("/api/v1/flows", get(list_flows))
        .route("/api/v1/flows/:flow_name/preview", get(preview_flow))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(app)
}

/// HTTP-facing error wrapper.
pub struct ApiError(OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            OrchestratorError::FlowNotFound(_) => (StatusCode::NOT_FOUND, "FLOW_NOT_FOUND"),
            OrchestratorError::ContextNotFound(_) => (StatusCode::NOT_FOUND, "CONTEXT_NOT_FOUND"),
            OrchestratorError::FlowParse { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "FLOW_PARSE_ERROR")
            }
            OrchestratorError::FlowCompile { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "FLOW_COMPILE_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        tracing::error!(code, error = %self.0, "Request failed");
        let body = ErrorBody {
            code: code.to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn chat(
    State(app): State<Arc<AppContext>>,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
    Ok(Json(app.chat.chat(request).await?))
}

async fn create_token(
    State(app): State<Arc<AppContext>>,
    Json(request): Json<CreateTokenRequest>,
) -> Result<Json<CreateTokenResponse>, ApiError> {
    let token_id = app.sessions.create_token(&request.user_id).await?;
    Ok(Json(CreateTokenResponse { token_id }))
}

async fn create_session(
    State(app): State<Arc<AppContext>>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let session_id = app
        .sessions
        .create_session(
            &request.user_id,
            &request.flow_name,
            request.counterparty_id.as_deref(),
        )
        .await?;
    Ok(Json(CreateSessionResponse { session_id }))
}

async fn get_token_info(
    State(app): State<Arc<AppContext>>,
    Path(token_id): Path<String>,
) -> Result<Json<TokenInfoResponse>, ApiError> {
    let token = app.sessions.get_token_info(&token_id)?;
    Ok(Json(TokenInfoResponse {
        token_id: token.token_id,
        user_id: token.user_id,
        user_info: token.user_info,
    }))
}

async fn get_session_info(
    State(app): State<Arc<AppContext>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfoResponse>, ApiError> {
    let session = app.sessions.get_session_info(&session_id)?;
    Ok(Json(SessionInfoResponse {
        session_id: session.session_id,
        user_id: session.user_id,
        flow_key: session.flow_info.flow_key,
        display_name: session.flow_info.display_name,
        participant_info: session.participant_info,
    }))
}

async fn list_flows(State(app): State<Arc<AppContext>>) -> Json<Vec<FlowSummary>> {
    let mut flows: Vec<FlowSummary> = app
        .flows
        .definitions()
        .iter()
        .map(|d| FlowSummary {
            name: d.name.clone(),
            version: d.version.clone(),
            description: d.description.clone(),
            entry_node: d.entry_node.clone(),
            node_count: d.nodes.len(),
            is_compiled: app.flows.is_compiled(&d.name),
        })
        .collect();
    flows.sort_by(|a, b| a.name.cmp(&b.name));
    Json(flows)
}

/// Render a flow's graph structure as DOT, Mermaid, or ASCII text.
///
/// Compiles the flow on first use, like any other access through the flow
/// manager, so previews always reflect the executable graph.
async fn preview_flow(
    State(app): State<Arc<AppContext>>,
    Path(flow_name): Path<String>,
    Query(params): Query<PreviewParams>,
) -> Result<Response, ApiError> {
    let format_name = params.format.as_deref().unwrap_or("mermaid");
    let Some(format) = VisualizationFormat::parse(format_name) else {
        let body = ErrorBody {
            code: "INVALID_FORMAT".to_string(),
            message: format!(
                "unknown preview format '{format_name}'; use dot, mermaid, or ascii"
            ),
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    };

    let graph = app.flows.get_flow(&flow_name).await?;
    let rendered = visualize(
        graph.graph(),
        &VisualizationOptions::new(format).with_title(flow_name.as_str()),
    );
    Ok(rendered.into_response())
}
