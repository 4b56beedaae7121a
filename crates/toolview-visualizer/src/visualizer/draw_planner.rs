//! Draw planning
//!
//! The toolpath mesh is drawn with translucent colors and no per-triangle
//! depth sort. Layers are the coarse depth partition instead: the planner
//! decides which vertex ranges to submit and in which order so that layers
//! farther from the eye are drawn first.

use tracing::trace;

/// Projection mode of the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    /// Single layer slab, Z flattened
    Flat2D,
    Orthographic,
    #[default]
    Perspective,
}

/// A contiguous run of vertices to submit in one draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawRange {
    pub start: usize,
    pub count: usize,
}

impl DrawRange {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// Range covering `start..end`.
    pub fn between(start: usize, end: usize) -> Self {
        Self {
            start,
            count: end.saturating_sub(start),
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Camera-dependent inputs to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewState {
    pub mode: DrawMode,
    /// Camera elevation; negative when looking from below
    pub elevation: f32,
    /// World Z of the eye
    pub eye_height: f32,
    /// Z offset applied to the model
    pub offset_z: f32,
}

/// Plans per-layer draw ranges over the layer index tables of a mesh.
#[derive(Debug, Clone, Copy)]
pub struct DrawPlanner<'a> {
    layer_heights: &'a [f32],
    layer_stops: &'a [usize],
}

impl<'a> DrawPlanner<'a> {
    /// `layer_stops` must hold one more entry than `layer_heights`.
    pub fn new(layer_heights: &'a [f32], layer_stops: &'a [usize]) -> Self {
        debug_assert_eq!(layer_stops.len(), layer_heights.len() + 1);
        Self {
            layer_heights,
            layer_stops,
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layer_stops.len().saturating_sub(1)
    }

    fn layer_range(&self, layer: usize) -> DrawRange {
        DrawRange::between(self.layer_stops[layer], self.layer_stops[layer + 1])
    }

    fn layers_ascending(&self, upto: usize) -> DrawRange {
        DrawRange::between(0, self.layer_stops[upto])
    }

    /// Ranges for the first `num_layers_to_draw` layers, in submission order.
    pub fn plan(&self, view: &ViewState, num_layers_to_draw: usize) -> Vec<DrawRange> {
        let num_layers = num_layers_to_draw.min(self.layer_count());
        if num_layers == 0 {
            return Vec::new();
        }

        let mut ranges = match view.mode {
            DrawMode::Flat2D => vec![self.layer_range(num_layers - 1)],
            DrawMode::Orthographic if view.elevation >= 0.0 => {
                vec![self.layers_ascending(num_layers)]
            }
            DrawMode::Orthographic => (0..num_layers)
                .rev()
                .map(|layer| self.layer_range(layer))
                .collect(),
            DrawMode::Perspective => {
                let threshold = self.layer_below_height(view.eye_height - view.offset_z);
                let ascending = num_layers.min(threshold + 1);

                let mut ranges = vec![self.layers_ascending(ascending)];
                ranges.extend(
                    (threshold + 1..num_layers)
                        .rev()
                        .map(|layer| self.layer_range(layer)),
                );
                ranges
            }
        };
        // empty layers span no vertices
        ranges.retain(|range| !range.is_empty());

        trace!(
            "Planned {} draw ranges for {} layers in {:?} mode",
            ranges.len(),
            num_layers,
            view.mode
        );
        ranges
    }

    /// Index of the highest layer strictly below `height`, or 0 if none is.
    pub fn layer_below_height(&self, height: f32) -> usize {
        self.layer_heights
            .iter()
            .rposition(|&layer_height| layer_height < height)
            .unwrap_or(0)
    }
}

/// Free-function form of [`DrawPlanner::plan`].
pub fn plan(
    view: &ViewState,
    num_layers_to_draw: usize,
    layer_heights: &[f32],
    layer_stops: &[usize],
) -> Vec<DrawRange> {
    DrawPlanner::new(layer_heights, layer_stops).plan(view, num_layers_to_draw)
}
