pub mod adapter;
pub mod layout;
pub mod scene;

pub use adapter::{
    build_graph, BuildReport, CameraBounds, GraphAdapter, GraphError, GraphRenderer,
    InteractiveGraph, MountTarget, RenderHandle, RenderOptions,
};
pub use scene::{GraphScene, SceneHandle, SceneRenderer};
