use serde::{Deserialize, Serialize};

/// Declarative node/edge description attached to a token record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl GraphModel {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Visual attributes are pass-through hints; coordinates may be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_node_size")]
    pub size: f64,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

fn default_node_size() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}
