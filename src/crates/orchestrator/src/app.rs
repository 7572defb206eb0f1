//! Application wiring.
//!
//! [`AppContext`] assembles the process-wide services once and shares them
//! behind `Arc`s. Production wiring ([`AppContext::from_env`]) uses the
//! env-backed provider registry and the HTTP embedder; tests inject fakes
//! through [`AppContext::new`].

use crate::config::Settings;
use crate::context::ContextManager;
use crate::flows::{FlowManager, GraphBuilder};
use crate::prompts::PromptManager;
use crate::rag::{Embedder, HttpEmbedder, MemoryVectorIndex, Retriever, VectorIndex};
use crate::repository::Repositories;
use crate::service::{ChatService, SessionService};
use crate::tools::{register_domain_tools, ToolRegistry};
use flowgraph_checkpoint::InMemoryCheckpointSaver;
use llm::{ChatModelFactory, ProviderChatModelFactory, ProviderManager};
use std::sync::Arc;
use std::time::Duration;

/// The assembled application.
pub struct AppContext {
    pub settings: Settings,
    pub contexts: Arc<ContextManager>,
    pub prompts: Arc<PromptManager>,
    pub tools: Arc<ToolRegistry>,
    pub repos: Repositories,
    pub flows: Arc<FlowManager>,
    pub chat: ChatService,
    pub sessions: SessionService,
}

impl AppContext {
    /// Wire the application with explicit collaborators.
    pub fn new(
        settings: Settings,
        models: Arc<dyn ChatModelFactory>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        repos: Repositories,
    ) -> Arc<Self> {
        let contexts = Arc::new(ContextManager::new());
        let prompts = Arc::new(PromptManager::new(settings.flow_rule_dir()));

        let tools = Arc::new(ToolRegistry::new());
        register_domain_tools(&tools, &repos);

        let retriever = Arc::new(Retriever::new(embedder, index));
        let builder = GraphBuilder::new(prompts.clone(), tools.clone(), models, retriever);
        let flows = Arc::new(FlowManager::new(
            settings.flows_dir(),
            builder,
            Arc::new(InMemoryCheckpointSaver::new()),
        ));

        let chat = ChatService::new(
            flows.clone(),
            contexts.clone(),
            Duration::from_secs(settings.turn_timeout_secs),
        );
        let sessions = SessionService::new(
            contexts.clone(),
            flows.clone(),
            repos.users.clone(),
            settings.default_counterparty_id.clone(),
        );

        Arc::new(Self {
            settings,
            contexts,
            prompts,
            tools,
            repos,
            flows,
            chat,
            sessions,
        })
    }

    /// Production wiring from the environment.
    pub fn from_env(settings: Settings) -> Arc<Self> {
        let providers = Arc::new(ProviderManager::new());
        let models = Arc::new(ProviderChatModelFactory::new(providers));

        let embedder = Arc::new(HttpEmbedder::new(
            std::env::var("EMBEDDINGS_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            std::env::var("EMBEDDINGS_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            std::env::var("EMBEDDINGS_API_KEY").unwrap_or_default(),
        ));

        Self::new(
            settings,
            models,
            embedder,
            Arc::new(MemoryVectorIndex::new()),
            Repositories::in_memory(),
        )
    }
}
