//! Toolpath visualization
//!
//! - Segment geometry (cylinders around each movement)
//! - Movement classification and coloring
//! - Mesh building with per-layer index tables
//! - Draw planning per projection mode
//! - Color picking, overlays and selection
//! - OpenGL rendering of the built mesh

pub mod classify;
pub mod draw_planner;
pub mod geometry;
pub mod mesh_builder;
pub mod mesh_renderer;
pub mod mesh_shaders;
pub mod model;
pub mod overlay;
pub mod picking;

pub use classify::{classify, MovementClass};
pub use draw_planner::{plan, DrawMode, DrawPlanner, DrawRange, ViewState};
pub use geometry::{generate_cylinder, perpendicular_basis, CylinderGeometry};
pub use mesh_builder::{MeshBuffers, MeshBuilder, ProgressCallback};
pub use mesh_renderer::{GlRenderer, LightingParams, RenderError, RenderResult, RenderView};
pub use model::{model_matrix, FramePlan, GcodeModel};
pub use overlay::{
    arrow_range, marker_range, selection_ranges, OverlayTemplates, ARROW_VERTICES,
    ENTRY_MARKER_VERTICES, EXIT_MARKER_VERTICES,
};
