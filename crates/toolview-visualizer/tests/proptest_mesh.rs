//! Property-based tests for mesh build invariants using the `proptest` crate.

use glam::Vec3;
use proptest::prelude::*;
use toolview_core::{Layer, Movement, MovementFlags};
use toolview_settings::RenderConfig;
use toolview_visualizer::picking::color_to_rgb;
use toolview_visualizer::{DrawMode, GcodeModel, MeshBuilder, ViewState};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Movement on a coarse grid so repeated points (zero-length moves) are common.
fn arb_movement() -> impl Strategy<Value = Movement> {
    (0u8..4, 0u8..4, 0u8..3, 0u32..16, -0.1f32..0.3, 1u32..100_000).prop_map(
        |(x, y, z, flags, delta, line)| {
            Movement::new(
                Vec3::new(x as f32, y as f32, 0.2 * z as f32),
                MovementFlags::from_bits(flags),
                delta,
                line,
            )
        },
    )
}

fn arb_layers() -> impl Strategy<Value = Vec<Layer>> {
    prop::collection::vec(
        prop::collection::vec(arb_movement(), 0..12).prop_map(Layer::new),
        1..8,
    )
    .prop_filter("needs a movement", |layers| {
        layers.iter().any(|layer| !layer.is_empty())
    })
}

fn arb_sides() -> impl Strategy<Value = u32> {
    3u32..12
}

// ---------------------------------------------------------------------------
// 1. Index tables stay aligned with the vertex buffer
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn index_tables_align(layers in arb_layers(), sides in arb_sides()) {
        let config = RenderConfig { cylinder_sides: sides, ..Default::default() };
        let mesh = MeshBuilder::new(&config).build(&layers, Vec3::ZERO, None).unwrap();
        let vpm = mesh.vertices_per_movement();

        prop_assert_eq!(vpm, sides as usize * 6);
        prop_assert_eq!(mesh.layer_stops().len(), layers.len() + 1);
        prop_assert_eq!(mesh.layer_heights().len(), layers.len());
        prop_assert_eq!(mesh.layer_marker_stops().len(), layers.len() + 1);
        prop_assert!(mesh.layer_stops().windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(*mesh.layer_stops().last().unwrap(), mesh.vertices().len());

        // every layer contributes a whole number of runs
        prop_assert!(mesh.layer_stops().iter().all(|stop| stop % vpm == 0));

        let runs = mesh.movement_count();
        prop_assert_eq!(mesh.vertices().len(), runs * vpm);
        prop_assert_eq!(mesh.normals().len(), runs * vpm);
        prop_assert_eq!(mesh.colors().len(), runs * vpm);
        prop_assert_eq!(mesh.arrow_vertices().len(), runs * 3);
        prop_assert_eq!(mesh.arrow_colors().len(), runs * 3);

        let total: usize = layers.iter().map(Layer::len).sum();
        prop_assert_eq!(runs + mesh.skipped_movements(), total);
    }
}

// ---------------------------------------------------------------------------
// 2. Every run is one solid color
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn runs_are_uniformly_colored(layers in arb_layers()) {
        let config = RenderConfig::default();
        let mesh = MeshBuilder::new(&config).build(&layers, Vec3::ZERO, None).unwrap();
        let vpm = mesh.vertices_per_movement();

        for run in mesh.colors().chunks(vpm) {
            prop_assert!(run.iter().all(|c| *c == run[0]));
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Picking any run recovers that run's source line
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn picking_resolves_every_run(layers in arb_layers()) {
        let config = RenderConfig::default();
        let mesh = MeshBuilder::new(&config).build(&layers, Vec3::ZERO, None).unwrap();
        let model = GcodeModel::new(mesh);
        let pick_colors = model.pick_colors().unwrap();
        let vpm = model.buffers().vertices_per_movement();

        for (i, line) in model.buffers().movement_line_numbers().iter().enumerate() {
            let rgb = color_to_rgb(pick_colors[i * vpm + vpm - 1]);
            prop_assert_eq!(model.pick_line(rgb), Some(*line));
        }
    }
}

// ---------------------------------------------------------------------------
// 4. Plans stay inside the drawn layers and never overlap
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn plans_cover_drawn_layers_once(
        layers in arb_layers(),
        num_layers in 1usize..10,
        elevation in -90.0f32..90.0,
        eye_height in -2.0f32..2.0,
        mode in prop_oneof![
            Just(DrawMode::Flat2D),
            Just(DrawMode::Orthographic),
            Just(DrawMode::Perspective),
        ],
    ) {
        let config = RenderConfig::default();
        let mesh = MeshBuilder::new(&config).build(&layers, Vec3::ZERO, None).unwrap();
        let view = ViewState { mode, elevation, eye_height, offset_z: 0.0 };
        let drawn = num_layers.min(mesh.layer_count());

        let mut ranges = mesh.planner().plan(&view, num_layers);
        let limit = mesh.layer_stops()[drawn];
        prop_assert!(ranges.iter().all(|r| r.end() <= limit));

        ranges.sort_by_key(|r| r.start);
        prop_assert!(ranges.windows(2).all(|w| w[0].end() <= w[1].start));

        let covered: usize = ranges.iter().map(|r| r.count).sum();
        let expected = match mode {
            DrawMode::Flat2D => limit - mesh.layer_stops()[drawn - 1],
            DrawMode::Orthographic | DrawMode::Perspective => limit,
        };
        prop_assert_eq!(covered, expected);
    }
}
