//! Graph visualization - multi-format rendering of graph structure.
//!
//! Renders a [`Graph`] in three text formats:
//!
//! - **DOT** - for Graphviz (`dot -Tpng graph.dot -o graph.png`)
//! - **Mermaid** - renders natively in GitHub/GitLab markdown and browsers
//! - **ASCII** - quick console output for debugging
//!
//! All renderers are plain string builders over the graph structure; no
//! external tool is needed to produce the text. Output is deterministic:
//! nodes render in name order regardless of insertion order.
//!
//! ```rust,ignore
//! use flowgraph::{visualize, VisualizationOptions};
//!
//! let compiled = graph.compile()?;
//! let mermaid = visualize(
//!     compiled.graph(),
//!     &VisualizationOptions::mermaid().with_title("medical_agent"),
//! );
//! println!("{mermaid}");
//! ```
//!
//! Conditional edges render dashed with their branch labels, so guarded
//! routing is visible in the diagram; direct edges render solid.

use crate::graph::{Edge, Graph, END};

/// Output format for graph visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizationFormat {
    /// DOT format for Graphviz.
    Dot,
    /// Mermaid diagram format.
    Mermaid,
    /// Simple ASCII art.
    Ascii,
}

impl VisualizationFormat {
    /// Parse the wire form used by preview surfaces.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dot" => Some(Self::Dot),
            "mermaid" => Some(Self::Mermaid),
            "ascii" => Some(Self::Ascii),
            _ => None,
        }
    }
}

/// Visualization options.
#[derive(Debug, Clone)]
pub struct VisualizationOptions {
    /// Output format.
    pub format: VisualizationFormat,
    /// Optional graph title/label.
    pub title: Option<String>,
}

impl Default for VisualizationOptions {
    fn default() -> Self {
        Self {
            format: VisualizationFormat::Dot,
            title: None,
        }
    }
}

impl VisualizationOptions {
    /// Options for the given format.
    pub fn new(format: VisualizationFormat) -> Self {
        Self {
            format,
            title: None,
        }
    }

    /// DOT format options.
    pub fn dot() -> Self {
        Self::new(VisualizationFormat::Dot)
    }

    /// Mermaid format options.
    pub fn mermaid() -> Self {
        Self::new(VisualizationFormat::Mermaid)
    }

    /// ASCII format options.
    pub fn ascii() -> Self {
        Self::new(VisualizationFormat::Ascii)
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Render a graph as a string in the configured format.
pub fn visualize<S>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    match options.format {
        VisualizationFormat::Dot => visualize_dot(graph, options),
        VisualizationFormat::Mermaid => visualize_mermaid(graph, options),
        VisualizationFormat::Ascii => visualize_ascii(graph, options),
    }
}

/// Node names in stable order.
fn sorted_nodes<S>(graph: &Graph<S>) -> Vec<&String> {
    let mut names: Vec<&String> = graph.nodes.keys().collect();
    names.sort();
    names
}

fn visualize_dot<S>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("digraph G {\n");
    output.push_str("    rankdir=TB;\n");
    output.push_str("    node [shape=box, style=rounded];\n");

    if let Some(title) = &options.title {
        output.push_str("    labelloc=\"t\";\n");
        output.push_str(&format!("    label=\"{}\";\n", escape_dot(title)));
    }

    output.push_str(&format!(
        "    \"{}\" [shape=circle, style=filled, fillcolor=palegreen];\n",
        END
    ));

    for name in sorted_nodes(graph) {
        let marker = if *name == graph.entry { " (entry)" } else { "" };
        output.push_str(&format!(
            "    \"{}\" [label=\"{}{}\"];\n",
            escape_dot(name),
            escape_dot(name),
            marker
        ));
    }

    for name in sorted_nodes(graph) {
        let Some(edge) = graph.edges.get(name) else {
            continue;
        };
        match edge {
            Edge::Direct(to) => {
                output.push_str(&format!(
                    "    \"{}\" -> \"{}\";\n",
                    escape_dot(name),
                    escape_dot(to)
                ));
            }
            Edge::Conditional { branches, .. } => {
                for (label, to) in branches {
                    output.push_str(&format!(
                        "    \"{}\" -> \"{}\" [label=\"{}\", style=dashed];\n",
                        escape_dot(name),
                        escape_dot(to),
                        escape_dot(label)
                    ));
                }
            }
        }
    }

    output.push_str("}\n");
    output
}

fn visualize_mermaid<S>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("graph TD\n");

    if let Some(title) = &options.title {
        output.push_str(&format!("    title[\"{}\"]\n", escape_mermaid(title)));
    }

    output.push_str(&format!("    {}((END))\n", sanitize_id(END)));
    output.push_str(&format!(
        "    style {} fill:#FFB6C1,stroke:#DC143C,stroke-width:2px\n",
        sanitize_id(END)
    ));

    for name in sorted_nodes(graph) {
        // Routers render as diamonds, plain nodes as rectangles.
        let conditional = matches!(graph.edges.get(name), Some(Edge::Conditional { .. }));
        let (open, close) = if conditional { ("{", "}") } else { ("[", "]") };
        output.push_str(&format!(
            "    {}{}\"{}\"{}\n",
            sanitize_id(name),
            open,
            escape_mermaid(name),
            close
        ));
        if conditional {
            output.push_str(&format!(
                "    style {} fill:#FFE4B5,stroke:#FF8C00,stroke-width:2px\n",
                sanitize_id(name)
            ));
        }
        if *name == graph.entry {
            output.push_str(&format!(
                "    style {} fill:#90EE90,stroke:#228B22,stroke-width:2px\n",
                sanitize_id(name)
            ));
        }
    }

    for name in sorted_nodes(graph) {
        let Some(edge) = graph.edges.get(name) else {
            continue;
        };
        match edge {
            Edge::Direct(to) => {
                output.push_str(&format!(
                    "    {} --> {}\n",
                    sanitize_id(name),
                    sanitize_id(to)
                ));
            }
            Edge::Conditional { branches, .. } => {
                for (label, to) in branches {
                    output.push_str(&format!(
                        "    {} -. \"{}\" .-> {}\n",
                        sanitize_id(name),
                        escape_mermaid(label),
                        sanitize_id(to)
                    ));
                }
            }
        }
    }

    output
}

fn visualize_ascii<S>(graph: &Graph<S>, options: &VisualizationOptions) -> String {
    let mut output = String::new();

    output.push_str("Graph Structure:\n");
    output.push_str("================\n\n");
    if let Some(title) = &options.title {
        output.push_str(&format!("{title}\n\n"));
    }

    output.push_str(&format!("START ({}) ->\n", graph.entry));

    for name in sorted_nodes(graph) {
        output.push_str(&format!("\n[{}]\n", name));
        match graph.edges.get(name) {
            Some(Edge::Direct(to)) => {
                output.push_str(&format!("  -> {}\n", to));
            }
            Some(Edge::Conditional { branches, .. }) => {
                output.push_str("  -> (conditional)\n");
                for (label, to) in branches {
                    output.push_str(&format!("     [{}] -> {}\n", label, to));
                }
            }
            None => {
                output.push_str(&format!("  -> {}\n", END));
            }
        }
    }

    output.push_str("\nEND\n");
    output
}

/// Escape special characters for DOT.
fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Escape special characters for Mermaid labels.
fn escape_mermaid(s: &str) -> String {
    s.replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Sanitize node ids for Mermaid (alphanumeric + underscore).
fn sanitize_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use crate::graph::NodeFuture;
    use std::sync::Arc;

    fn noop(state: i64) -> NodeFuture<i64> {
        Box::pin(async move { Ok(state) })
    }

    fn sample_graph() -> crate::CompiledGraph<i64> {
        let mut builder = StateGraph::new();
        builder.add_node("router", noop);
        builder.add_node("record", noop);
        builder.add_node("chat", noop);
        builder.add_conditional_edge(
            "router",
            Arc::new(|_: &i64| "chat".to_string()),
            vec![
                ("intent == 'record'".to_string(), "record".to_string()),
                ("otherwise".to_string(), "chat".to_string()),
            ],
        );
        builder.add_edge("record", END);
        builder.add_edge("chat", END);
        builder.set_entry("router");
        builder.compile().unwrap()
    }

    #[test]
    fn dot_renders_nodes_and_labeled_branches() {
        let compiled = sample_graph();
        let dot = visualize(compiled.graph(), &VisualizationOptions::dot());
        assert!(dot.contains("digraph G"));
        assert!(dot.contains("\"router\""));
        assert!(dot.contains("\"record\""));
        assert!(dot.contains("label=\"intent == 'record'\", style=dashed"));
        assert!(dot.contains(&format!("\"chat\" -> \"{}\";", END)));
    }

    #[test]
    fn mermaid_marks_routers_as_diamonds() {
        let compiled = sample_graph();
        let mermaid = visualize(
            compiled.graph(),
            &VisualizationOptions::mermaid().with_title("demo"),
        );
        assert!(mermaid.starts_with("graph TD"));
        assert!(mermaid.contains("title[\"demo\"]"));
        assert!(mermaid.contains("router{\"router\"}"));
        assert!(mermaid.contains("record[\"record\"]"));
        assert!(mermaid.contains("-. \"intent == 'record'\" .-> record"));
    }

    #[test]
    fn ascii_lists_conditional_branches() {
        let compiled = sample_graph();
        let ascii = visualize(compiled.graph(), &VisualizationOptions::ascii());
        assert!(ascii.contains("Graph Structure"));
        assert!(ascii.contains("START (router) ->"));
        assert!(ascii.contains("[intent == 'record'] -> record"));
        assert!(ascii.ends_with("END\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let compiled = sample_graph();
        let first = visualize(compiled.graph(), &VisualizationOptions::dot());
        let second = visualize(compiled.graph(), &VisualizationOptions::dot());
        assert_eq!(first, second);
    }

    #[test]
    fn format_parsing_covers_all_variants() {
        assert_eq!(
            VisualizationFormat::parse("dot"),
            Some(VisualizationFormat::Dot)
        );
        assert_eq!(
            VisualizationFormat::parse("mermaid"),
            Some(VisualizationFormat::Mermaid)
        );
        assert_eq!(
            VisualizationFormat::parse("ascii"),
            Some(VisualizationFormat::Ascii)
        );
        assert_eq!(VisualizationFormat::parse("png"), None);
    }

    #[test]
    fn labels_are_escaped_per_format() {
        let mut builder: StateGraph<i64> = StateGraph::new();
        builder.add_node("a", noop);
        builder.add_conditional_edge(
            "a",
            Arc::new(|_: &i64| END.to_string()),
            vec![("x > \"quoted\"".to_string(), END.to_string())],
        );
        builder.set_entry("a");
        let compiled = builder.compile().unwrap();

        let dot = visualize(compiled.graph(), &VisualizationOptions::dot());
        assert!(dot.contains("x > \\\"quoted\\\""));

        let mermaid = visualize(compiled.graph(), &VisualizationOptions::mermaid());
        assert!(mermaid.contains("x &gt; &quot;quoted&quot;"));
    }
}
