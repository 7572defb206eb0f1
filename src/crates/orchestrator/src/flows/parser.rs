//! Flow YAML parsing and directory scanning.

use crate::error::{OrchestratorError, Result};
use crate::flows::definition::FlowDefinition;
use std::collections::HashMap;
use std::path::Path;

/// Parses `flow.yaml` files into validated [`FlowDefinition`]s.
pub struct FlowParser;

impl FlowParser {
    /// Parse and validate one flow file.
    ///
    /// The flow's directory is recorded on the definition so relative
    /// template references resolve later.
    pub fn parse_yaml(yaml_path: &Path) -> Result<FlowDefinition> {
        let flow_label = yaml_path.display().to_string();

        let raw = std::fs::read_to_string(yaml_path).map_err(|e| {
            OrchestratorError::FlowParse {
                flow: flow_label.clone(),
                error: format!("cannot read file: {e}"),
            }
        })?;

        let mut definition: FlowDefinition =
            serde_yaml::from_str(&raw).map_err(|e| OrchestratorError::FlowParse {
                flow: flow_label.clone(),
                error: e.to_string(),
            })?;

        definition.flow_dir = yaml_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        definition
            .validate()
            .map_err(|error| OrchestratorError::FlowParse {
                flow: definition.name.clone(),
                error,
            })?;

        tracing::info!(flow = %definition.name, version = %definition.version, "Parsed flow definition");
        Ok(definition)
    }

    /// Scan every subdirectory of `flows_dir` containing a `flow.yaml`.
    ///
    /// Individual flow failures are logged and skipped so one bad flow does
    /// not take down the rest of the catalogue.
    pub fn scan_flows_directory(flows_dir: &Path) -> HashMap<String, FlowDefinition> {
        let mut flows = HashMap::new();

        let entries = match std::fs::read_dir(flows_dir) {
            Ok(entries) => entries,
            Err(_) => {
                tracing::warn!(dir = %flows_dir.display(), "Flows directory does not exist");
                return flows;
            }
        };

        for entry in entries.flatten() {
            let flow_dir = entry.path();
            if !flow_dir.is_dir() {
                continue;
            }
            let flow_yaml = flow_dir.join("flow.yaml");
            if !flow_yaml.exists() {
                continue;
            }

            match Self::parse_yaml(&flow_yaml) {
                Ok(definition) => {
                    flows.insert(definition.name.clone(), definition);
                }
                Err(e) => {
                    tracing::error!(dir = %flow_dir.display(), error = %e, "Failed to parse flow, skipping");
                }
            }
        }

        tracing::info!(count = flows.len(), "Scanned flows directory");
        flows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_FLOW: &str = r#"
name: test_flow
version: "1.0"
entry_node: intent_recognition
nodes:
  - name: intent_recognition
    type: agent
    config:
      prompt: prompts/intent.md
      model:
        provider: doubao
        name: doubao-seed-1-6
  - name: chat
    type: agent
    config:
      prompt: prompts/chat.md
      model:
        provider: doubao
        name: doubao-seed-1-6
edges:
  - from: intent_recognition
    to: chat
    condition: "intent == 'chat'"
  - from: intent_recognition
    to: END
    condition: "confidence < 0.5"
  - from: chat
    to: END
    condition: always
"#;

    #[test]
    fn parses_valid_flow_and_records_flow_dir() {
        let dir = tempfile::tempdir().unwrap();
        let flow_dir = dir.path().join("test_flow");
        std::fs::create_dir_all(&flow_dir).unwrap();
        std::fs::write(flow_dir.join("flow.yaml"), VALID_FLOW).unwrap();

        let definition = FlowParser::parse_yaml(&flow_dir.join("flow.yaml")).unwrap();
        assert_eq!(definition.name, "test_flow");
        assert_eq!(definition.flow_dir, flow_dir);
        assert_eq!(definition.edges.len(), 3);
    }

    #[test]
    fn structural_violation_names_the_flow() {
        let broken = VALID_FLOW.replace("entry_node: intent_recognition", "entry_node: ghost");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.yaml");
        std::fs::write(&path, broken).unwrap();

        let err = FlowParser::parse_yaml(&path).unwrap_err();
        match err {
            OrchestratorError::FlowParse { flow, error } => {
                assert_eq!(flow, "test_flow");
                assert!(error.contains("entry_node"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.yaml");
        std::fs::write(&path, "nodes: [not really").unwrap();
        assert!(matches!(
            FlowParser::parse_yaml(&path),
            Err(OrchestratorError::FlowParse { .. })
        ));
    }

    #[test]
    fn scan_skips_broken_flows_and_keeps_good_ones() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("good");
        std::fs::create_dir_all(&good).unwrap();
        std::fs::write(good.join("flow.yaml"), VALID_FLOW).unwrap();

        let bad = dir.path().join("bad");
        std::fs::create_dir_all(&bad).unwrap();
        std::fs::write(bad.join("flow.yaml"), "::::").unwrap();

        let ignored = dir.path().join("no_yaml");
        std::fs::create_dir_all(&ignored).unwrap();

        let flows = FlowParser::scan_flows_directory(dir.path());
        assert_eq!(flows.len(), 1);
        assert!(flows.contains_key("test_flow"));
    }

    #[test]
    fn scan_of_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let flows = FlowParser::scan_flows_directory(&dir.path().join("missing"));
        assert!(flows.is_empty());
    }
}
