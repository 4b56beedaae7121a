//! # Toolpath Model
//!
//! Holds a built mesh together with the viewer-controlled state that
//! decides what a frame shows: how many layers, which source lines are
//! selected, and whether overlays are on.

use glam::{Mat4, Vec3};
use std::collections::HashSet;
use toolview_core::{PickError, Rgba};
use tracing::debug;

use super::draw_planner::{DrawMode, DrawRange, ViewState};
use super::mesh_builder::MeshBuffers;
use super::overlay::{arrow_range, marker_range, selection_ranges};
use super::picking;

/// Ordered draw passes for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    /// Lit movement ranges, in submission order
    pub movements: Vec<DrawRange>,
    /// Selected movement runs within the drawn ranges
    pub selection: Vec<DrawRange>,
    /// Arrows of the topmost drawn layer
    pub arrows: Option<DrawRange>,
    /// Entry/exit markers of the topmost drawn layer
    pub markers: Option<DrawRange>,
}

impl FramePlan {
    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Vertices submitted by the movement passes.
    pub fn movement_vertex_count(&self) -> usize {
        self.movements.iter().map(|r| r.count).sum()
    }
}

/// A loaded toolpath and its view state.
#[derive(Debug, Clone)]
pub struct GcodeModel {
    buffers: MeshBuffers,
    num_layers_to_draw: usize,
    selected_lines: HashSet<u32>,
    arrows_enabled: bool,
}

impl GcodeModel {
    /// Wrap `buffers` with every layer visible and nothing selected.
    pub fn new(buffers: MeshBuffers) -> Self {
        let num_layers_to_draw = buffers.layer_count();
        Self {
            buffers,
            num_layers_to_draw,
            selected_lines: HashSet::new(),
            arrows_enabled: true,
        }
    }

    pub fn buffers(&self) -> &MeshBuffers {
        &self.buffers
    }

    pub fn max_layers(&self) -> usize {
        self.buffers.layer_count()
    }

    pub fn num_layers_to_draw(&self) -> usize {
        self.num_layers_to_draw
    }

    /// Clamped to `1..=max_layers`, or 0 for a mesh without layers.
    pub fn set_num_layers_to_draw(&mut self, num_layers: usize) {
        let max_layers = self.max_layers();
        self.num_layers_to_draw = num_layers.clamp(max_layers.min(1), max_layers);
    }

    pub fn selected_lines(&self) -> &HashSet<u32> {
        &self.selected_lines
    }

    /// Replace the highlighted source lines.
    pub fn set_selected_lines(&mut self, lines: impl IntoIterator<Item = u32>) {
        self.selected_lines = lines.into_iter().collect();
        debug!("Selected {} source lines", self.selected_lines.len());
    }

    pub fn arrows_enabled(&self) -> bool {
        self.arrows_enabled
    }

    pub fn set_arrows_enabled(&mut self, enabled: bool) {
        self.arrows_enabled = enabled;
    }

    /// Draw passes for one frame from `view`.
    pub fn frame_plan(&self, view: &ViewState) -> FramePlan {
        let movements = self
            .buffers
            .planner()
            .plan(view, self.num_layers_to_draw);
        if movements.is_empty() {
            return FramePlan::default();
        }

        let selection = selection_ranges(
            self.buffers.movement_line_numbers(),
            &self.selected_lines,
            self.buffers.vertices_per_movement(),
        )
        .into_iter()
        .flat_map(|selected| {
            movements
                .iter()
                .filter_map(move |drawn| intersect(selected, *drawn))
        })
        .collect();

        let (arrows, markers) = if self.arrows_enabled {
            (
                arrow_range(
                    self.buffers.layer_movement_stops(),
                    self.num_layers_to_draw,
                ),
                marker_range(self.buffers.layer_marker_stops(), self.num_layers_to_draw),
            )
        } else {
            (None, None)
        };

        FramePlan {
            movements,
            selection,
            arrows,
            markers,
        }
    }

    /// Per-vertex picking colors matching the vertex buffer.
    pub fn pick_colors(&self) -> Result<Vec<Rgba>, PickError> {
        picking::vertex_pick_colors(
            self.buffers.movement_count(),
            self.buffers.vertices_per_movement(),
        )
    }

    /// Source line under a pixel sampled from a picking frame.
    pub fn pick_line(&self, rgb: [u8; 3]) -> Option<u32> {
        picking::decode(rgb, self.buffers.movement_line_numbers())
    }
}

fn intersect(a: DrawRange, b: DrawRange) -> Option<DrawRange> {
    let range = DrawRange::between(a.start.max(b.start), a.end().min(b.end()));
    (!range.is_empty()).then_some(range)
}

/// Model transform placing the toolpath on the platform.
///
/// Flat2D ignores the Z offset and flattens Z.
pub fn model_matrix(mode: DrawMode, offsets: [f32; 3]) -> Mat4 {
    let [x, y, z] = offsets;
    match mode {
        DrawMode::Flat2D => {
            Mat4::from_translation(Vec3::new(x, y, 0.0)) * Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0))
        }
        DrawMode::Orthographic | DrawMode::Perspective => {
            Mat4::from_translation(Vec3::new(x, y, z))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::mesh_builder::MeshBuilder;
    use crate::visualizer::overlay::ARROW_VERTICES;
    use toolview_core::{Layer, Movement, MovementFlags};
    use toolview_settings::RenderConfig;

    fn layered_model(layers: usize) -> GcodeModel {
        let layers: Vec<Layer> = (0..layers)
            .map(|i| {
                let z = 0.2 * (i + 1) as f32;
                let line = (i * 10) as u32;
                Layer::new(vec![
                    Movement::new(Vec3::new(5.0, 0.0, z), MovementFlags::EXTRUDER_ON, 0.1, line + 1),
                    Movement::new(Vec3::new(5.0, 5.0, z), MovementFlags::EXTRUDER_ON, 0.1, line + 2),
                ])
            })
            .collect();
        let buffers = MeshBuilder::new(&RenderConfig::default())
            .build(&layers, Vec3::ZERO, None)
            .unwrap();
        GcodeModel::new(buffers)
    }

    fn view(mode: DrawMode, elevation: f32) -> ViewState {
        ViewState {
            mode,
            elevation,
            eye_height: 100.0,
            offset_z: 0.0,
        }
    }

    #[test]
    fn test_new_model_shows_everything() {
        let model = layered_model(4);
        assert_eq!(model.num_layers_to_draw(), 4);
        assert!(model.arrows_enabled());
        assert!(model.selected_lines().is_empty());

        let plan = model.frame_plan(&view(DrawMode::Orthographic, 10.0));
        assert_eq!(plan.movements, vec![DrawRange::new(0, 8 * 48)]);
        assert_eq!(plan.movement_vertex_count(), model.buffers().vertex_count());
    }

    #[test]
    fn test_layer_count_clamps() {
        let mut model = layered_model(4);
        model.set_num_layers_to_draw(0);
        assert_eq!(model.num_layers_to_draw(), 1);
        model.set_num_layers_to_draw(40);
        assert_eq!(model.num_layers_to_draw(), 4);
        model.set_num_layers_to_draw(2);
        assert_eq!(model.num_layers_to_draw(), 2);
    }

    #[test]
    fn test_overlays_cover_top_drawn_layer() {
        let mut model = layered_model(4);
        model.set_num_layers_to_draw(2);

        let plan = model.frame_plan(&view(DrawMode::Perspective, 10.0));
        assert_eq!(
            plan.arrows,
            Some(DrawRange::new(2 * ARROW_VERTICES, 2 * ARROW_VERTICES))
        );
        // layer 1: entry (3) + exit (6), after layer 0's 9
        assert_eq!(plan.markers, Some(DrawRange::new(9, 9)));

        model.set_arrows_enabled(false);
        let plan = model.frame_plan(&view(DrawMode::Perspective, 10.0));
        assert_eq!(plan.arrows, None);
        assert_eq!(plan.markers, None);
    }

    #[test]
    fn test_selection_is_clipped_to_drawn_layers() {
        let mut model = layered_model(3);
        // line 2 is in layer 0, line 22 in layer 2
        model.set_selected_lines([2, 22]);

        let plan = model.frame_plan(&view(DrawMode::Orthographic, 10.0));
        assert_eq!(
            plan.selection,
            vec![DrawRange::new(48, 48), DrawRange::new(5 * 48, 48)]
        );

        model.set_num_layers_to_draw(2);
        let plan = model.frame_plan(&view(DrawMode::Orthographic, 10.0));
        assert_eq!(plan.selection, vec![DrawRange::new(48, 48)]);

        let plan = model.frame_plan(&view(DrawMode::Flat2D, 0.0));
        assert!(plan.selection.is_empty());
    }

    #[test]
    fn test_pick_line_maps_through_line_numbers() {
        let model = layered_model(2);
        let colors = model.pick_colors().unwrap();
        assert_eq!(colors.len(), model.buffers().vertex_count());

        let third_run = colors[2 * 48];
        assert_eq!(model.pick_line(picking::color_to_rgb(third_run)), Some(11));
        assert_eq!(model.pick_line(picking::BACKGROUND), None);
    }

    #[test]
    fn test_model_matrix() {
        let m = model_matrix(DrawMode::Perspective, [1.0, 2.0, 3.0]);
        assert_eq!(m.transform_point3(Vec3::new(1.0, 1.0, 1.0)), Vec3::new(2.0, 3.0, 4.0));

        let m = model_matrix(DrawMode::Flat2D, [1.0, 2.0, 3.0]);
        assert_eq!(m.transform_point3(Vec3::new(1.0, 1.0, 5.0)), Vec3::new(2.0, 3.0, 0.0));
    }
}
