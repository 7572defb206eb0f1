//! [`FlowManager`] - definition and compiled-graph caches.
//!
//! Definitions are parsed once from disk; compiled graphs are built lazily on
//! first use and cached for the process lifetime. A per-flow async mutex
//! collapses concurrent first-use compiles of the same flow into one; the
//! compiled-map read path takes no lock beyond dashmap's shard read.

use crate::error::{OrchestratorError, Result};
use crate::flows::builder::GraphBuilder;
use crate::flows::definition::FlowDefinition;
use crate::flows::parser::FlowParser;
use crate::state::FlowState;
use dashmap::DashMap;
use flowgraph::CompiledGraph;
use flowgraph_checkpoint::CheckpointSaver;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `flow_loader.yaml`: which flows compile at startup vs on first use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowLoaderConfig {
    #[serde(default)]
    pub flows: FlowLoaderLists,
}

/// The preload / lazy-load name lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowLoaderLists {
    #[serde(default)]
    pub preload: Vec<String>,
    #[serde(default)]
    pub lazy_load: Vec<String>,
}

impl FlowLoaderConfig {
    /// Read the loader file; a missing or malformed file yields the empty
    /// default with a warning.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_yaml::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Bad flow loader config, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                tracing::warn!(path = %path.display(), "Flow loader config missing, using defaults");
                Self::default()
            }
        }
    }
}

/// Owner of the flow-definition and compiled-graph maps.
pub struct FlowManager {
    flows_dir: PathBuf,
    builder: GraphBuilder,
    checkpointer: Arc<dyn CheckpointSaver>,
    definitions: RwLock<HashMap<String, Arc<FlowDefinition>>>,
    compiled: DashMap<String, Arc<CompiledGraph<FlowState>>>,
    compile_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FlowManager {
    /// Create a manager over `flows_dir`.
    pub fn new(
        flows_dir: impl Into<PathBuf>,
        builder: GraphBuilder,
        checkpointer: Arc<dyn CheckpointSaver>,
    ) -> Self {
        Self {
            flows_dir: flows_dir.into(),
            builder,
            checkpointer,
            definitions: RwLock::new(HashMap::new()),
            compiled: DashMap::new(),
            compile_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Scan the flows directory, merging parsed definitions into the cache.
    /// Returns the number of definitions found by this scan.
    pub fn scan_flows(&self) -> usize {
        let flows = FlowParser::scan_flows_directory(&self.flows_dir);
        let count = flows.len();
        let mut definitions = self.definitions.write();
        for (name, definition) in flows {
            definitions.insert(name, Arc::new(definition));
        }
        count
    }

    /// Whether a definition for `name` is loaded.
    pub fn has_definition(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// Loaded definitions, for listing surfaces.
    pub fn definitions(&self) -> Vec<Arc<FlowDefinition>> {
        self.definitions.read().values().cloned().collect()
    }

    /// Look up one loaded definition by name.
    pub fn get_definition(&self, name: &str) -> Option<Arc<FlowDefinition>> {
        self.definitions.read().get(name).cloned()
    }

    /// Whether a compiled graph for `name` is already cached.
    pub fn is_compiled(&self, name: &str) -> bool {
        self.compiled.contains_key(name)
    }

    /// Compile the named flows now. Failures are logged per flow and do not
    /// stop the rest of the list.
    pub async fn preload_flows(&self, names: &[String]) {
        for name in names {
            match self.get_flow(name).await {
                Ok(_) => tracing::info!(flow = %name, "Preloaded flow"),
                Err(e) => tracing::error!(flow = %name, error = %e, "Failed to preload flow"),
            }
        }
    }

    /// Get the compiled graph for `name`, compiling on first use.
    ///
    /// A missing definition triggers one rescan of the flows directory
    /// before giving up with [`OrchestratorError::FlowNotFound`].
    pub async fn get_flow(&self, name: &str) -> Result<Arc<CompiledGraph<FlowState>>> {
        if let Some(compiled) = self.compiled.get(name) {
            return Ok(compiled.value().clone());
        }

        let lock = {
            let mut locks = self.compile_locks.lock();
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        // Someone else may have compiled while we waited.
        if let Some(compiled) = self.compiled.get(name) {
            return Ok(compiled.value().clone());
        }

        let definition = match self.get_definition(name) {
            Some(definition) => definition,
            None => {
                self.scan_flows();
                self.get_definition(name)
                    .ok_or_else(|| OrchestratorError::FlowNotFound(name.to_string()))?
            }
        };

        let graph = self.builder.build(&definition)?;
        let compiled = graph
            .compile()
            .map_err(|e| OrchestratorError::FlowCompile {
                flow: name.to_string(),
                error: e.to_string(),
            })?
            .with_checkpointer(self.checkpointer.clone());

        let compiled = Arc::new(compiled);
        self.compiled.insert(name.to_string(), compiled.clone());
        tracing::info!(flow = %name, "Compiled flow");
        Ok(compiled)
    }
}
