//! Overlay geometry: direction arrows, layer entry/exit markers and the
//! selection highlight.
//!
//! Overlays are indexed by the same per-layer tables as the main mesh so
//! that showing a prefix of layers applies to them identically.

use glam::{Quat, Vec3};
use std::collections::HashSet;
use std::f32::consts::PI;

use super::draw_planner::DrawRange;

/// Vertices per direction arrow.
pub const ARROW_VERTICES: usize = 3;
/// Vertices per layer entry marker.
pub const ENTRY_MARKER_VERTICES: usize = 3;
/// Vertices per layer exit marker.
pub const EXIT_MARKER_VERTICES: usize = 6;

/// Flat triangle templates for overlays, in model units, lying in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayTemplates {
    /// Arrow with its tip at the origin and its base along +X
    pub arrow: [Vec3; ARROW_VERTICES],
    /// Triangle marking where a layer starts
    pub entry_marker: [Vec3; ENTRY_MARKER_VERTICES],
    /// Square marking where a layer ends
    pub exit_marker: [Vec3; EXIT_MARKER_VERTICES],
}

impl Default for OverlayTemplates {
    fn default() -> Self {
        Self {
            arrow: [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.4, -0.1, 0.0),
                Vec3::new(0.4, 0.1, 0.0),
            ],
            entry_marker: [
                Vec3::new(0.23, -0.14, 0.0),
                Vec3::new(0.0, 0.26, 0.0),
                Vec3::new(-0.23, -0.14, 0.0),
            ],
            exit_marker: [
                Vec3::new(-0.23, -0.23, 0.0),
                Vec3::new(0.23, -0.23, 0.0),
                Vec3::new(0.23, 0.23, 0.0),
                Vec3::new(0.23, 0.23, 0.0),
                Vec3::new(-0.23, 0.23, 0.0),
                Vec3::new(-0.23, -0.23, 0.0),
            ],
        }
    }
}

impl OverlayTemplates {
    /// Arrow with its tip at `tip` pointing along `heading` (radians in the
    /// XY plane), its base trailing behind.
    pub fn place_arrow(&self, heading: f32, tip: Vec3) -> [Vec3; ARROW_VERTICES] {
        let rotation = Quat::from_rotation_z(heading + PI);
        self.arrow.map(|v| rotation * v + tip)
    }

    pub fn place_entry_marker(&self, at: Vec3) -> [Vec3; ENTRY_MARKER_VERTICES] {
        self.entry_marker.map(|v| v + at)
    }

    pub fn place_exit_marker(&self, at: Vec3) -> [Vec3; EXIT_MARKER_VERTICES] {
        self.exit_marker.map(|v| v + at)
    }
}

/// Arrow vertices of the movements in layer `num_layers - 1`.
///
/// `layer_movement_stops` holds the cumulative movement count after each
/// layer, with a leading zero.
pub fn arrow_range(layer_movement_stops: &[usize], num_layers: usize) -> Option<DrawRange> {
    top_layer_range(layer_movement_stops, num_layers).map(|range| {
        DrawRange::new(range.start * ARROW_VERTICES, range.count * ARROW_VERTICES)
    })
}

/// Marker vertices of layer `num_layers - 1`.
pub fn marker_range(layer_marker_stops: &[usize], num_layers: usize) -> Option<DrawRange> {
    top_layer_range(layer_marker_stops, num_layers)
}

fn top_layer_range(stops: &[usize], num_layers: usize) -> Option<DrawRange> {
    if num_layers == 0 || num_layers >= stops.len() {
        return None;
    }
    let range = DrawRange::between(stops[num_layers - 1], stops[num_layers]);
    (!range.is_empty()).then_some(range)
}

/// Vertex ranges of movements whose source line is selected, adjacent
/// runs merged into one range.
pub fn selection_ranges(
    movement_line_numbers: &[u32],
    selected_lines: &HashSet<u32>,
    vertices_per_movement: usize,
) -> Vec<DrawRange> {
    let mut ranges: Vec<DrawRange> = Vec::new();
    if selected_lines.is_empty() || vertices_per_movement == 0 {
        return ranges;
    }

    for (index, line) in movement_line_numbers.iter().enumerate() {
        if !selected_lines.contains(line) {
            continue;
        }

        let start = index * vertices_per_movement;
        match ranges.last_mut() {
            Some(last) if last.end() == start => last.count += vertices_per_movement,
            _ => ranges.push(DrawRange::new(start, vertices_per_movement)),
        }
    }

    ranges
}
