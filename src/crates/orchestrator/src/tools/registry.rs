//! Tool descriptors and the process-wide registry.

use llm::ToolDefinition;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a tool executor.
pub type ToolFuture = Pin<Box<dyn Future<Output = String> + Send>>;

/// Tool executor: JSON arguments in, human/model-readable string out.
/// Executors never fail; failures are error strings.
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A callable tool.
#[derive(Clone)]
pub struct Tool {
    /// Registry name.
    pub name: String,

    /// Description shown to the model.
    pub description: String,

    /// JSON Schema of the arguments.
    pub parameters: Value,

    executor: ToolExecutor,
}

impl Tool {
    /// Create a tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            executor,
        }
    }

    /// Invoke the tool. Identity comes from the ambient turn context.
    pub async fn invoke(&self, args: Value) -> String {
        (self.executor)(args).await
    }

    /// The schema handed to the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Process-wide name → tool map.
///
/// Populated during application startup and treated as immutable afterwards.
/// Duplicate registrations are ignored with a warning.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<Tool>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A second registration under the same name is ignored.
    pub fn register(&self, tool: Tool) {
        let mut tools = self.tools.write();
        if tools.contains_key(&tool.name) {
            tracing::warn!(tool = %tool.name, "Tool already registered, ignoring duplicate");
            return;
        }
        tracing::debug!(tool = %tool.name, "Registered tool");
        tools.insert(tool.name.clone(), Arc::new(tool));
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// All registered tool names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool(name: &str) -> Tool {
        Tool::new(
            name,
            "echoes its input",
            json!({"type": "object", "properties": {}}),
            Arc::new(|args| Box::pin(async move { format!("echo: {args}") })),
        )
    }

    #[tokio::test]
    async fn register_and_invoke() {
        let registry = ToolRegistry::new();
        registry.register(echo_tool("echo"));

        let tool = registry.get("echo").unwrap();
        let out = tool.invoke(json!({"x": 1})).await;
        assert_eq!(out, r#"echo: {"x":1}"#);
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let registry = ToolRegistry::new();
        registry.register(echo_tool("echo"));
        registry.register(Tool::new(
            "echo",
            "a different tool",
            json!({}),
            Arc::new(|_| Box::pin(async { "other".to_string() })),
        ));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().description, "echoes its input");
    }

    #[test]
    fn unknown_tool_is_none() {
        let registry = ToolRegistry::new();
        assert!(registry.get("missing").is_none());
    }
}
