use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::adapter::{
    CameraBounds, GraphError, GraphRenderer, InteractiveGraph, MountTarget, RenderHandle,
    RenderOptions,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub size: f64,
    pub color: Option<String>,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEdge {
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraState {
    pub ratio: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
}

/// Serializable frame of a live instance, handed to whatever draws it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphScene {
    pub mount: String,
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub camera: CameraState,
}

/// Renders graphs into serializable scenes with a bounded zoom camera.
#[derive(Debug, Clone, Default)]
pub struct SceneRenderer {
    live: Arc<AtomicUsize>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances built by this renderer and not yet disposed.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl GraphRenderer for SceneRenderer {
    type Handle = SceneHandle;

    fn build_instance(
        &self,
        graph: InteractiveGraph,
        mount: &MountTarget,
        options: &RenderOptions,
    ) -> Result<SceneHandle, GraphError> {
        let bounds = options.camera;
        if bounds.min_ratio > bounds.max_ratio {
            return Err(GraphError::Renderer {
                mount: mount.to_string(),
                reason: format!(
                    "camera min ratio {} exceeds max ratio {}",
                    bounds.min_ratio, bounds.max_ratio
                ),
            });
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(SceneHandle {
            mount: mount.clone(),
            graph: Some(graph),
            bounds,
            ratio: bounds.clamp(1.0),
            live: Arc::clone(&self.live),
        })
    }
}

/// A live scene. Dropping it disposes it.
#[derive(Debug)]
pub struct SceneHandle {
    mount: MountTarget,
    graph: Option<InteractiveGraph>,
    bounds: CameraBounds,
    ratio: f64,
    live: Arc<AtomicUsize>,
}

impl SceneHandle {
    pub fn mount(&self) -> &MountTarget {
        &self.mount
    }

    pub fn graph(&self) -> Option<&InteractiveGraph> {
        self.graph.as_ref()
    }

    pub fn camera(&self) -> CameraState {
        CameraState {
            ratio: self.ratio,
            min_ratio: self.bounds.min_ratio,
            max_ratio: self.bounds.max_ratio,
        }
    }

    /// Multiply the camera ratio by `factor`, staying within bounds.
    pub fn zoom(&mut self, factor: f64) -> f64 {
        if self.is_live() {
            self.ratio = self.bounds.clamp(self.ratio * factor);
        }
        self.ratio
    }

    pub fn reset_camera(&mut self) {
        self.ratio = self.bounds.clamp(1.0);
    }

    /// Current frame; `None` once disposed.
    pub fn scene(&self) -> Option<GraphScene> {
        let graph = self.graph.as_ref()?;
        Some(GraphScene {
            mount: self.mount.to_string(),
            nodes: graph
                .nodes()
                .map(|n| SceneNode {
                    id: n.id.clone(),
                    label: n.label.clone(),
                    size: n.size,
                    color: n.color.clone(),
                    x: n.x,
                    y: n.y,
                })
                .collect(),
            edges: graph
                .edges()
                .map(|(source, target, attrs)| SceneEdge {
                    id: attrs.id.clone(),
                    source: source.to_string(),
                    target: target.to_string(),
                })
                .collect(),
            camera: self.camera(),
        })
    }
}

impl RenderHandle for SceneHandle {
    fn dispose(&mut self) {
        if self.graph.take().is_some() {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        self.graph.is_some()
    }
}

impl Drop for SceneHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}
