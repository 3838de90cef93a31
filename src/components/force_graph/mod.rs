//! Force-directed insight graph: model, physics, encodings and canvas view.

mod component;
mod render;
pub mod scene;
pub mod simulation;
mod state;
mod types;

pub use component::ForceGraphCanvas;
pub use scene::{RadiusConfig, RadiusPolicy, RenderTarget};
pub use simulation::SimulationParameters;
pub use state::{DragRelease, GraphEngine, GraphEvent, Interaction, ViewTransform};
pub use types::{GraphSnapshot, InsightNode, LinkEdge};
