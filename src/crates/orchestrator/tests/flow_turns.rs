//! End-to-end flow turns against scripted models and in-memory backends.

use async_trait::async_trait;
use flowgraph::{Message, MessageRole, ToolCall};
use flowgraph_checkpoint::CheckpointConfig;
use llm::{ChatModel, ChatModelFactory, ChatRequest, ChatResponse, LlmError, ModelConfig};
use orchestrator::context::TurnContext;
use orchestrator::rag::{
    Embedder, ExampleRow, MemoryVectorIndex, RetrievalError, VectorIndex, NO_EXAMPLES,
};
use orchestrator::repository::{
    BloodPressureRecord, MemoryRecordStore, MemoryUserStore, RecordStore, Repositories, UserRecord,
};
use orchestrator::service::{ChatMessage, ChatTurnRequest};
use orchestrator::{AppContext, OrchestratorError, Settings};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

// ---- scripted model plumbing ----

type ReplyFn = Box<dyn Fn(&ChatRequest) -> Message + Send + Sync>;

struct ScriptedModel {
    reply: ReplyFn,
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> llm::error::Result<ChatResponse> {
        Ok(ChatResponse {
            message: (self.reply)(&request),
            usage: None,
        })
    }
}

struct TestModelFactory {
    models: HashMap<String, Arc<dyn ChatModel>>,
}

impl ChatModelFactory for TestModelFactory {
    fn build_model(&self, config: &ModelConfig) -> llm::error::Result<Arc<dyn ChatModel>> {
        self.models
            .get(&config.name)
            .cloned()
            .ok_or_else(|| LlmError::Provider(format!("no scripted model '{}'", config.name)))
    }
}

struct FixedEmbedder;

#[async_trait]
impl Embedder for FixedEmbedder {
    fn dimension(&self) -> usize {
        3
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}

struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn search(
        &self,
        _table: &str,
        _query: &[f32],
        _top_k: usize,
        _threshold: f32,
    ) -> Result<Vec<orchestrator::rag::RetrievedExample>, RetrievalError> {
        Err(RetrievalError::Backend("connection refused".to_string()))
    }
}

// ---- fixture ----

fn last_human(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Human)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

fn system_content(request: &ChatRequest) -> String {
    request
        .messages
        .first()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.clone())
        .unwrap_or_default()
}

fn has_tool_reply(request: &ChatRequest) -> Option<String> {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::Tool)
        .map(|m| m.content.clone())
}

fn scripted_models() -> TestModelFactory {
    let mut models: HashMap<String, Arc<dyn ChatModel>> = HashMap::new();

    models.insert(
        "intent-model".to_string(),
        Arc::new(ScriptedModel {
            reply: Box::new(|request| {
                let text = last_human(request);
                if text.contains("systolic") {
                    Message::ai(
                        r#"{"intent": "record_blood_pressure", "confidence": 0.92, "need_clarification": false, "query_text": "record blood pressure", "keywords": ["blood pressure"]}"#,
                    )
                } else {
                    Message::ai(
                        r#"{"intent": "unclear", "confidence": 0.1, "need_clarification": true}"#,
                    )
                }
            }),
        }),
    );

    models.insert(
        "record-model".to_string(),
        Arc::new(ScriptedModel {
            reply: Box::new(|request| match has_tool_reply(request) {
                Some(tool_output) => Message::ai(format!("Done. {tool_output}")),
                None => Message::ai("").with_tool_calls(vec![ToolCall::new(
                    "record_blood_pressure",
                    json!({"systolic": 120, "diastolic": 80}),
                )]),
            }),
        }),
    );

    models.insert(
        "chat-model".to_string(),
        Arc::new(ScriptedModel {
            reply: Box::new(|request| {
                let sys = system_content(request);
                if sys.contains(NO_EXAMPLES) {
                    Message::ai("Could you tell me what you would like to record or look up? [no examples]")
                } else {
                    Message::ai("Could you tell me what you would like to record or look up?")
                }
            }),
        }),
    );

    TestModelFactory { models }
}

const FLOW_YAML: &str = r#"
name: medical_agent
version: "1.0"
entry_node: intent_recognition
nodes:
  - name: intent_recognition
    type: agent
    config:
      prompt: prompts/intent.md
      model:
        provider: test
        name: intent-model
  - name: record_agent
    type: agent
    config:
      prompt: prompts/record.md
      model:
        provider: test
        name: record-model
      tools:
        - record_blood_pressure
        - update_blood_pressure
  - name: retrieve_examples
    type: retrieval
    config:
      top_k: 15
      min_results: 1
  - name: chat_agent
    type: agent
    config:
      prompt: prompts/chat.md
      model:
        provider: test
        name: chat-model
edges:
  - from: intent_recognition
    to: record_agent
    condition: "intent == 'record_blood_pressure' && confidence >= 0.8"
  - from: intent_recognition
    to: retrieve_examples
    condition: "confidence >= 0.0"
  - from: retrieve_examples
    to: chat_agent
    condition: always
  - from: record_agent
    to: END
    condition: always
  - from: chat_agent
    to: END
    condition: always
"#;

fn write_config(root: &Path) {
    let flow_dir = root.join("flows").join("medical_agent");
    std::fs::create_dir_all(flow_dir.join("prompts")).unwrap();
    std::fs::create_dir_all(root.join("flows").join("flow_rule")).unwrap();

    std::fs::write(
        root.join("flows").join("flow_rule").join("safety_rules.md"),
        "Never diagnose.",
    )
    .unwrap();

    std::fs::write(flow_dir.join("flow.yaml"), FLOW_YAML).unwrap();
    std::fs::write(
        flow_dir.join("prompts").join("intent.md"),
        "Classify the intent. Date: {current_date}",
    )
    .unwrap();
    std::fs::write(
        flow_dir.join("prompts").join("record.md"),
        "{safety_rules}\nSave what the user reported. User: {user_info}",
    )
    .unwrap();
    std::fs::write(
        flow_dir.join("prompts").join("chat.md"),
        "{safety_rules}\nExamples:\n{retrieved_examples}",
    )
    .unwrap();
}

struct Fixture {
    app: Arc<AppContext>,
    bp_store: Arc<MemoryRecordStore<BloodPressureRecord>>,
    _config: tempfile::TempDir,
}

fn fixture_with_index(index: Arc<dyn VectorIndex>) -> Fixture {
    let config = tempfile::tempdir().unwrap();
    write_config(config.path());

    let bp_store = Arc::new(MemoryRecordStore::new());
    let user_store = Arc::new(MemoryUserStore::new());
    user_store.insert(UserRecord {
        user_id: "patient001".to_string(),
        user_info: Some(json!({"name": "Pat", "age": 63})),
    });

    let repos = Repositories {
        blood_pressure: bp_store.clone(),
        medication: Arc::new(MemoryRecordStore::new()),
        symptom: Arc::new(MemoryRecordStore::new()),
        health_event: Arc::new(MemoryRecordStore::new()),
        users: user_store,
    };

    let settings = Settings {
        config_dir: config.path().to_path_buf(),
        ..Settings::default()
    };

    let app = AppContext::new(
        settings,
        Arc::new(scripted_models()),
        Arc::new(FixedEmbedder),
        index,
        repos,
    );
    app.flows.scan_flows();

    Fixture {
        app,
        bp_store,
        _config: config,
    }
}

fn fixture() -> Fixture {
    let index = MemoryVectorIndex::new();
    index.insert(
        "qa_examples",
        ExampleRow {
            user_input: "how do I log my blood pressure".to_string(),
            agent_response: "ask for both numbers, then confirm".to_string(),
            tags: vec!["bp".to_string()],
            quality_grade: Some("a".to_string()),
            embedding: vec![1.0, 0.0, 0.0],
        },
    );
    fixture_with_index(Arc::new(index))
}

async fn establish_session(fx: &Fixture) -> (String, String) {
    let token_id = fx.app.sessions.create_token("patient001").await.unwrap();
    let session_id = fx
        .app
        .sessions
        .create_session("patient001", "medical_agent", None)
        .await
        .unwrap();
    (token_id, session_id)
}

fn turn(message: &str, session_id: &str, token_id: &str) -> ChatTurnRequest {
    ChatTurnRequest {
        message: message.to_string(),
        session_id: session_id.to_string(),
        token_id: token_id.to_string(),
        trace_id: None,
        flow_name: None,
        conversation_history: None,
        user_info: None,
        current_date: None,
    }
}

// ---- scenarios ----

#[tokio::test]
async fn session_ids_follow_the_canonical_shape() {
    let fx = fixture();
    let (token_id, session_id) = establish_session(&fx).await;
    assert_eq!(token_id, "patient001");
    assert_eq!(session_id, "patient001_doctorId001_medical_agent");
}

#[tokio::test]
async fn intent_routes_to_recording_and_the_tool_is_scoped() {
    let fx = fixture();
    let (token_id, session_id) = establish_session(&fx).await;

    let response = fx
        .app
        .chat
        .chat(turn(
            "I want to record: systolic 120, diastolic 80.",
            &session_id,
            &token_id,
        ))
        .await
        .unwrap();

    assert!(response.response.contains("120"));
    assert!(response.response.contains("80"));

    let saved = fx.bp_store.latest("patient001").await.unwrap().unwrap();
    assert_eq!(saved.systolic, 120);
    assert_eq!(saved.diastolic, 80);
    assert_eq!(saved.user_id, token_id);
}

#[tokio::test]
async fn unclear_intent_falls_back_to_clarification_without_tools() {
    let fx = fixture();
    let (token_id, session_id) = establish_session(&fx).await;

    let response = fx
        .app
        .chat
        .chat(turn("hi", &session_id, &token_id))
        .await
        .unwrap();

    assert!(response.response.contains("record or look up"));
    // The retrieval path found examples, so the degraded marker is absent.
    assert!(!response.response.contains("[no examples]"));
    assert!(fx.bp_store.latest("patient001").await.unwrap().is_none());
}

#[tokio::test]
async fn retrieval_failure_degrades_but_the_agent_still_replies() {
    let fx = fixture_with_index(Arc::new(FailingIndex));
    let (token_id, session_id) = establish_session(&fx).await;

    let response = fx
        .app
        .chat
        .chat(turn("hi", &session_id, &token_id))
        .await
        .unwrap();

    // The chat agent ran with the fallback literal injected in its prompt.
    assert!(response.response.contains("[no examples]"));
}

#[tokio::test]
async fn history_grows_by_two_per_turn() {
    let fx = fixture();
    let (token_id, session_id) = establish_session(&fx).await;
    let graph = fx.app.flows.get_flow("medical_agent").await.unwrap();
    let checkpoint = CheckpointConfig::new(session_id.clone());

    fx.app
        .chat
        .chat(turn("hi", &session_id, &token_id))
        .await
        .unwrap();
    let after_first = graph.get_state(&checkpoint).await.unwrap().unwrap();
    assert_eq!(after_first.history_messages.len(), 2);
    assert_eq!(after_first.history_messages[0].content, "hi");
    assert!(after_first.flow_msgs.is_empty());

    fx.app
        .chat
        .chat(turn("hello again", &session_id, &token_id))
        .await
        .unwrap();
    let after_second = graph.get_state(&checkpoint).await.unwrap().unwrap();
    assert_eq!(after_second.history_messages.len(), 4);
}

#[tokio::test]
async fn caller_provided_history_overrides_persisted_state() {
    let fx = fixture();
    let (token_id, session_id) = establish_session(&fx).await;

    let mut request = turn("hi", &session_id, &token_id);
    request.conversation_history = Some(vec![
        ChatMessage {
            role: "user".to_string(),
            content: "earlier question".to_string(),
        },
        ChatMessage {
            role: "assistant".to_string(),
            content: "earlier answer".to_string(),
        },
    ]);
    fx.app.chat.chat(request).await.unwrap();

    let graph = fx.app.flows.get_flow("medical_agent").await.unwrap();
    let state = graph
        .get_state(&CheckpointConfig::new(session_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.history_messages.len(), 4);
    assert_eq!(state.history_messages[0].content, "earlier question");
}

#[tokio::test]
async fn missing_session_or_token_is_context_not_found() {
    let fx = fixture();
    let (token_id, session_id) = establish_session(&fx).await;

    let err = fx
        .app
        .chat
        .chat(turn("hi", "no_such_session", &token_id))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::ContextNotFound(_)));

    let err = fx
        .app
        .chat
        .chat(turn("hi", &session_id, "no_such_token"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::ContextNotFound(_)));
}

#[tokio::test]
async fn unknown_user_cannot_get_a_token() {
    let fx = fixture();
    let err = fx.app.sessions.create_token("stranger").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::ContextNotFound(_)));
}

#[tokio::test]
async fn unknown_flow_cannot_back_a_session() {
    let fx = fixture();
    fx.app.sessions.create_token("patient001").await.unwrap();
    let err = fx
        .app
        .sessions
        .create_session("patient001", "no_such_flow", None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::FlowNotFound(_)));
}

#[tokio::test]
async fn flow_preview_shows_nodes_and_guard_conditions() {
    use flowgraph::{visualize, VisualizationOptions};

    let fx = fixture();
    let graph = fx.app.flows.get_flow("medical_agent").await.unwrap();

    let mermaid = visualize(
        graph.graph(),
        &VisualizationOptions::mermaid().with_title("medical_agent"),
    );
    assert!(mermaid.contains("intent_recognition"));
    assert!(mermaid.contains("record_agent"));
    assert!(mermaid.contains("retrieve_examples"));
    // Guard conditions label the dashed branches.
    assert!(mermaid.contains("confidence &gt;= 0.8"));

    let ascii = visualize(graph.graph(), &VisualizationOptions::ascii());
    assert!(ascii.contains("START (intent_recognition) ->"));

    assert!(fx.app.flows.is_compiled("medical_agent"));
    assert!(!fx.app.flows.is_compiled("some_other_flow"));
}

#[tokio::test]
async fn ambient_context_is_clear_after_the_turn() {
    let fx = fixture();
    let (token_id, session_id) = establish_session(&fx).await;

    fx.app
        .chat
        .chat(turn("hi", &session_id, &token_id))
        .await
        .unwrap();
    assert!(TurnContext::current().is_none());
}
