//! # Toolpath Mesh Builder
//!
//! Turns a layered movement stream into flat, GPU-ready buffers plus the
//! index tables the draw planner, overlays and picking work from.
//!
//! Every non-degenerate movement owns one run of exactly
//! [`MeshBuffers::vertices_per_movement`] vertices, in stream order.
//! Zero-length movements are skipped everywhere: they add no vertices,
//! colors, arrow or line-number entry, so run `i` of the vertex buffer is
//! always movement line `movement_line_numbers[i]`. They still advance the
//! path position and count for layer heights and layer markers.

use glam::Vec3;
use std::ops::ControlFlow;
use std::time::Instant;
use toolview_core::{Layer, ModelError, ModelResult, MovementStream, Rgba};
use toolview_settings::RenderConfig;
use tracing::{debug, info, trace};

use super::classify::classify;
use super::draw_planner::{DrawPlanner, DrawRange};
use super::geometry::generate_cylinder;
use super::overlay::{OverlayTemplates, ARROW_VERTICES};

/// Called as `(completed_layers, total_layers)` while building. Returning
/// [`ControlFlow::Break`] cancels the build.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(usize, usize) -> ControlFlow<()>;

/// Upper bound on progress callbacks per build, not counting the final one.
const PROGRESS_UPDATES: usize = 100;

/// Geometry and index tables for one loaded toolpath. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffers {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    colors: Vec<Rgba>,
    layer_stops: Vec<usize>,
    layer_movement_stops: Vec<usize>,
    layer_heights: Vec<f32>,
    movement_line_numbers: Vec<u32>,
    arrow_vertices: Vec<Vec3>,
    arrow_colors: Vec<Rgba>,
    layer_marker_vertices: Vec<Vec3>,
    layer_marker_stops: Vec<usize>,
    vertices_per_movement: usize,
    bounds: Option<(Vec3, Vec3)>,
    skipped_movements: usize,
}

impl MeshBuffers {
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Cumulative vertex count after each layer, starting with 0.
    pub fn layer_stops(&self) -> &[usize] {
        &self.layer_stops
    }

    /// Cumulative movement-run count after each layer, starting with 0.
    pub fn layer_movement_stops(&self) -> &[usize] {
        &self.layer_movement_stops
    }

    pub fn layer_heights(&self) -> &[f32] {
        &self.layer_heights
    }

    /// Source line of each movement run.
    pub fn movement_line_numbers(&self) -> &[u32] {
        &self.movement_line_numbers
    }

    pub fn arrow_vertices(&self) -> &[Vec3] {
        &self.arrow_vertices
    }

    pub fn arrow_colors(&self) -> &[Rgba] {
        &self.arrow_colors
    }

    pub fn layer_marker_vertices(&self) -> &[Vec3] {
        &self.layer_marker_vertices
    }

    pub fn layer_marker_stops(&self) -> &[usize] {
        &self.layer_marker_stops
    }

    /// Run length of one movement: `cylinder_sides * 6`.
    pub fn vertices_per_movement(&self) -> usize {
        self.vertices_per_movement
    }

    pub fn layer_count(&self) -> usize {
        self.layer_heights.len()
    }

    pub fn movement_count(&self) -> usize {
        self.movement_line_numbers.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Zero-length movements left out of the buffers.
    pub fn skipped_movements(&self) -> usize {
        self.skipped_movements
    }

    /// Axis-aligned `(min, max)` of all path positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.bounds
    }

    /// Vertex run of movement `index`.
    pub fn movement_range(&self, index: usize) -> Option<DrawRange> {
        (index < self.movement_count()).then(|| {
            DrawRange::new(
                index * self.vertices_per_movement,
                self.vertices_per_movement,
            )
        })
    }

    /// Source line of movement run `index`.
    pub fn line_number(&self, index: usize) -> Option<u32> {
        self.movement_line_numbers.get(index).copied()
    }

    pub fn planner(&self) -> DrawPlanner<'_> {
        DrawPlanner::new(&self.layer_heights, &self.layer_stops)
    }
}

/// Builds [`MeshBuffers`] from layers of movements.
#[derive(Debug, Clone)]
pub struct MeshBuilder<'a> {
    config: &'a RenderConfig,
    templates: OverlayTemplates,
}

impl<'a> MeshBuilder<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self {
            config,
            templates: OverlayTemplates::default(),
        }
    }

    pub fn with_templates(mut self, templates: OverlayTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Build from a stream whose first movement is the starting point.
    pub fn build_stream(
        &self,
        stream: MovementStream,
        progress: Option<ProgressCallback<'_>>,
    ) -> ModelResult<MeshBuffers> {
        let (origin, layers) = stream.split_origin()?;
        self.build(&layers, origin, progress)
    }

    /// Build from `layers`, the first movement starting at `origin`.
    ///
    /// Nothing is returned unless every layer is processed; a cancelled
    /// build yields [`ModelError::Cancelled`].
    pub fn build(
        &self,
        layers: &[Layer],
        origin: Vec3,
        mut progress: Option<ProgressCallback<'_>>,
    ) -> ModelResult<MeshBuffers> {
        if layers.iter().all(Layer::is_empty) {
            return Err(ModelError::EmptyStream);
        }

        let t_start = Instant::now();
        let radius = self.config.cylinder_radius;
        let sides = self.config.cylinder_sides;
        let vertices_per_movement = self.config.vertices_per_movement();
        let colors_config = &self.config.gcode_colors;

        let total_layers = layers.len();
        let movement_total: usize = layers.iter().map(Layer::len).sum();
        let callback_every = total_layers.div_ceil(PROGRESS_UPDATES).max(1);
        debug!(
            "Building toolpath mesh: {} layers, {} movements, {} vertices per movement",
            total_layers, movement_total, vertices_per_movement
        );

        let mut vertices = Vec::with_capacity(movement_total * vertices_per_movement);
        let mut normals = Vec::with_capacity(movement_total * vertices_per_movement);
        let mut colors = Vec::with_capacity(movement_total * vertices_per_movement);
        let mut movement_line_numbers = Vec::with_capacity(movement_total);
        let mut arrow_vertices = Vec::with_capacity(movement_total * ARROW_VERTICES);
        let mut arrow_colors = Vec::with_capacity(movement_total * ARROW_VERTICES);
        let mut layer_stops = Vec::with_capacity(total_layers + 1);
        let mut layer_movement_stops = Vec::with_capacity(total_layers + 1);
        let mut layer_heights = Vec::with_capacity(total_layers);
        let mut layer_marker_vertices = Vec::new();
        let mut layer_marker_stops = Vec::with_capacity(total_layers + 1);
        layer_stops.push(0);
        layer_movement_stops.push(0);
        layer_marker_stops.push(0);

        let mut min = origin;
        let mut max = origin;
        let mut skipped_movements = 0;
        let mut prev = origin;
        let mut prev_height = origin.z;

        for (layer_idx, layer) in layers.iter().enumerate() {
            for movement in layer {
                let end = movement.position;
                min = min.min(end);
                max = max.max(end);

                let cylinder = generate_cylinder(prev, end, radius, sides);
                if cylinder.is_empty() {
                    trace!(
                        "Skipping zero-length movement at line {}",
                        movement.source_line
                    );
                    skipped_movements += 1;
                    prev = end;
                    continue;
                }

                let color = classify(movement, colors_config);
                vertices.extend_from_slice(&cylinder.vertices);
                normals.extend_from_slice(&cylinder.normals);
                colors.extend(std::iter::repeat(color).take(vertices_per_movement));

                let arrow = self.templates.place_arrow(movement.heading_from(prev), end);
                arrow_vertices.extend_from_slice(&arrow);
                arrow_colors.extend(std::iter::repeat(color).take(ARROW_VERTICES));

                movement_line_numbers.push(movement.source_line);
                prev = end;
            }

            layer_stops.push(vertices.len());
            layer_movement_stops.push(movement_line_numbers.len());

            let height = layer.height().unwrap_or(prev_height);
            layer_heights.push(height);
            prev_height = height;

            if layer_idx > 0 {
                if let Some(last) = layers[layer_idx - 1].last() {
                    layer_marker_vertices
                        .extend_from_slice(&self.templates.place_entry_marker(last.position));
                }
            } else if let Some(first) = layer.first() {
                layer_marker_vertices
                    .extend_from_slice(&self.templates.place_entry_marker(first.position));
            }

            if layer.len() > 1 {
                if let Some(last) = layer.last() {
                    layer_marker_vertices
                        .extend_from_slice(&self.templates.place_exit_marker(last.position));
                }
            }
            layer_marker_stops.push(layer_marker_vertices.len());

            let completed = layer_idx + 1;
            if layer_idx % callback_every == 0 || completed == total_layers {
                trace!("Mesh build progress: {}/{} layers", completed, total_layers);
                if let Some(callback) = progress.as_deref_mut() {
                    if callback(completed, total_layers).is_break() {
                        debug!("Mesh build cancelled at layer {}", completed);
                        return Err(ModelError::Cancelled {
                            completed_layers: completed,
                            total_layers,
                        });
                    }
                }
            }
        }

        debug!("Skipped {} zero-length movements", skipped_movements);
        info!(
            "Initialized toolpath mesh in {:.2} seconds",
            t_start.elapsed().as_secs_f64()
        );
        info!("Vertex count: {}", vertices.len());

        Ok(MeshBuffers {
            vertices,
            normals,
            colors,
            layer_stops,
            layer_movement_stops,
            layer_heights,
            movement_line_numbers,
            arrow_vertices,
            arrow_colors,
            layer_marker_vertices,
            layer_marker_stops,
            vertices_per_movement,
            bounds: Some((min, max)),
            skipped_movements,
        })
    }
}
