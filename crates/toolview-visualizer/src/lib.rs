//! # toolview visualizer
//!
//! Turns a layered movement stream into a GPU-ready toolpath mesh, plans
//! layer-ordered draws for each projection mode, and resolves picked
//! pixels back to source lines.

pub mod visualizer;

pub use visualizer::{
    classify, generate_cylinder, model_matrix, plan, DrawMode, DrawPlanner, DrawRange, FramePlan,
    GcodeModel, GlRenderer, LightingParams, MeshBuffers, MeshBuilder, MovementClass,
    OverlayTemplates, ProgressCallback, RenderError, RenderResult, RenderView, ViewState,
};
pub use visualizer::picking;
