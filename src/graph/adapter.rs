use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::Serialize;
use thiserror::Error;

use crate::model::GraphModel;

use super::layout::circular_layout;

/// Identifies where a graph instance is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountTarget(String);

impl MountTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allowed zoom range for a rendered instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraBounds {
    pub min_ratio: f64,
    pub max_ratio: f64,
}

impl CameraBounds {
    pub fn clamp(&self, ratio: f64) -> f64 {
        if ratio.is_nan() {
            return self.min_ratio.max(1.0_f64.min(self.max_ratio));
        }
        ratio.clamp(self.min_ratio, self.max_ratio)
    }
}

impl Default for CameraBounds {
    fn default() -> Self {
        Self {
            min_ratio: 0.5,
            max_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub camera: CameraBounds,
    /// Radius of the default layout used for nodes without coordinates.
    pub layout_radius: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            camera: CameraBounds::default(),
            layout_radius: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttrs {
    pub id: String,
    pub label: String,
    pub size: f64,
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeAttrs {
    pub id: Option<String>,
}

/// A graph after idempotent insertion, with every node positioned.
#[derive(Debug, Clone, Default)]
pub struct InteractiveGraph {
    graph: StableDiGraph<NodeAttrs, EdgeAttrs>,
    index: HashMap<String, NodeIndex>,
}

impl InteractiveGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&NodeAttrs> {
        self.index.get(id).and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(s), Some(t)) => self.graph.contains_edge(*s, *t),
            _ => false,
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeAttrs> {
        self.graph.node_indices().filter_map(|idx| self.graph.node_weight(idx))
    }

    /// `(source id, target id, attrs)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &EdgeAttrs)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
                e.weight(),
            )
        })
    }
}

/// What was skipped while building. These are recovered locally, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BuildReport {
    pub nodes: usize,
    pub edges: usize,
    pub duplicate_nodes: usize,
    pub dangling_edges: usize,
    pub duplicate_edges: usize,
    pub laid_out: usize,
}

impl BuildReport {
    pub fn skipped(&self) -> usize {
        self.duplicate_nodes + self.dangling_edges + self.duplicate_edges
    }
}

/// Insert nodes (first id wins), then edges (skipping dangling references
/// and repeated source/target pairs), then position nodes that arrived
/// without coordinates.
pub fn build_graph(model: &GraphModel, layout_radius: f64) -> (InteractiveGraph, BuildReport) {
    let mut out = InteractiveGraph::default();
    let mut report = BuildReport::default();
    let mut needs_layout: Vec<NodeIndex> = Vec::new();

    for node in &model.nodes {
        if out.index.contains_key(&node.id) {
            report.duplicate_nodes += 1;
            continue;
        }
        let placed = match (node.x, node.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((x, y)),
            _ => None,
        };
        let (x, y) = placed.unwrap_or((0.0, 0.0));
        let idx = out.graph.add_node(NodeAttrs {
            id: node.id.clone(),
            label: node.label.clone(),
            size: node.size.max(0.0),
            color: node.color.clone(),
            x,
            y,
        });
        if placed.is_none() {
            needs_layout.push(idx);
        }
        out.index.insert(node.id.clone(), idx);
    }

    let mut seen_pairs: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    for edge in &model.edges {
        let (Some(&source), Some(&target)) =
            (out.index.get(&edge.source), out.index.get(&edge.target))
        else {
            tracing::debug!(
                source = %edge.source,
                target = %edge.target,
                "Skipping edge with unknown endpoint"
            );
            report.dangling_edges += 1;
            continue;
        };
        if !seen_pairs.insert((source, target)) {
            report.duplicate_edges += 1;
            continue;
        }
        out.graph.add_edge(source, target, EdgeAttrs { id: edge.id.clone() });
    }

    if !needs_layout.is_empty() {
        let order: Vec<NodeIndex> = out.graph.node_indices().collect();
        let dense: HashMap<NodeIndex, usize> =
            order.iter().enumerate().map(|(pos, idx)| (*idx, pos)).collect();
        let pairs: Vec<(usize, usize)> = out
            .graph
            .edge_references()
            .map(|e| (dense[&e.source()], dense[&e.target()]))
            .collect();
        let positions = circular_layout(order.len(), &pairs, layout_radius);
        for idx in &needs_layout {
            let (x, y) = positions[dense[idx]];
            if let Some(node) = out.graph.node_weight_mut(*idx) {
                node.x = x;
                node.y = y;
            }
        }
        report.laid_out = needs_layout.len();
    }

    report.nodes = out.node_count();
    report.edges = out.edge_count();
    (out, report)
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("renderer failed to build instance on '{mount}': {reason}")]
    Renderer { mount: String, reason: String },
}

/// A concrete visualization backend.
pub trait GraphRenderer {
    type Handle: RenderHandle;

    fn build_instance(
        &self,
        graph: InteractiveGraph,
        mount: &MountTarget,
        options: &RenderOptions,
    ) -> Result<Self::Handle, GraphError>;
}

/// A live rendering instance. `dispose` releases it and its interaction state.
pub trait RenderHandle {
    fn dispose(&mut self);
    fn is_live(&self) -> bool;
}

struct Mounted<H> {
    handle: H,
    report: BuildReport,
}

/// Owns at most one live instance per mount target and always tears the
/// previous one down before building its replacement.
pub struct GraphAdapter<R: GraphRenderer> {
    renderer: R,
    options: RenderOptions,
    mounts: HashMap<MountTarget, Mounted<R::Handle>>,
}

impl<R: GraphRenderer> GraphAdapter<R> {
    pub fn new(renderer: R, options: RenderOptions) -> Self {
        Self {
            renderer,
            options,
            mounts: HashMap::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Build `model` onto `mount`. An absent or node-less model leaves the
    /// mount empty and returns `Ok(None)`.
    pub fn build(
        &mut self,
        model: Option<&GraphModel>,
        mount: &MountTarget,
    ) -> Result<Option<&mut R::Handle>, GraphError> {
        self.release(mount);

        let Some(model) = model.filter(|m| !m.is_empty()) else {
            tracing::debug!(%mount, "No graph to render, mount left empty");
            return Ok(None);
        };

        let (graph, report) = build_graph(model, self.options.layout_radius);
        if report.skipped() > 0 {
            tracing::warn!(
                %mount,
                duplicate_nodes = report.duplicate_nodes,
                dangling_edges = report.dangling_edges,
                duplicate_edges = report.duplicate_edges,
                "Skipped invalid graph elements"
            );
        }

        let handle = self.renderer.build_instance(graph, mount, &self.options)?;
        tracing::debug!(%mount, nodes = report.nodes, edges = report.edges, "Graph instance built");

        let mounted = self
            .mounts
            .entry(mount.clone())
            .or_insert(Mounted { handle, report });
        Ok(Some(&mut mounted.handle))
    }

    /// Tear down whatever is mounted on `mount`. Returns whether anything was.
    pub fn release(&mut self, mount: &MountTarget) -> bool {
        match self.mounts.remove(mount) {
            Some(mut mounted) => {
                mounted.handle.dispose();
                tracing::debug!(%mount, "Graph instance torn down");
                true
            }
            None => false,
        }
    }

    pub fn release_all(&mut self) {
        for (mount, mut mounted) in self.mounts.drain() {
            mounted.handle.dispose();
            tracing::debug!(%mount, "Graph instance torn down");
        }
    }

    pub fn handle(&self, mount: &MountTarget) -> Option<&R::Handle> {
        self.mounts.get(mount).map(|m| &m.handle)
    }

    pub fn handle_mut(&mut self, mount: &MountTarget) -> Option<&mut R::Handle> {
        self.mounts.get_mut(mount).map(|m| &mut m.handle)
    }

    pub fn report(&self, mount: &MountTarget) -> Option<BuildReport> {
        self.mounts.get(mount).map(|m| m.report)
    }

    pub fn mounted_count(&self) -> usize {
        self.mounts.len()
    }
}

impl<R: GraphRenderer> Drop for GraphAdapter<R> {
    fn drop(&mut self) {
        self.release_all();
    }
}
