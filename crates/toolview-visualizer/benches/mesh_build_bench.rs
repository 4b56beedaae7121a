use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use toolview_core::{Layer, Movement, MovementFlags};
use toolview_settings::RenderConfig;
use toolview_visualizer::{DrawMode, MeshBuilder, ViewState};

/// Concentric squares per layer, `rings * 4` movements each.
fn synthetic_layers(layer_count: u32, rings: u32) -> Vec<Layer> {
    let mut line = 0;
    (0..layer_count)
        .map(|layer| {
            let z = 0.2 * (layer + 1) as f32;
            let mut movements = Vec::with_capacity(rings as usize * 4);
            for ring in 0..rings {
                let lo = ring as f32;
                let hi = 50.0 - ring as f32;
                let flags = if ring == 0 {
                    MovementFlags::EXTRUDER_ON | MovementFlags::PERIMETER | MovementFlags::PERIMETER_OUTER
                } else {
                    MovementFlags::EXTRUDER_ON | MovementFlags::PERIMETER
                };
                for (x, y) in [(hi, lo), (hi, hi), (lo, hi), (lo, lo)] {
                    line += 1;
                    movements.push(Movement::new(Vec3::new(x, y, z), flags, 0.05, line));
                }
            }
            Layer::new(movements)
        })
        .collect()
}

fn bench_mesh_build(c: &mut Criterion) {
    let config = RenderConfig::default();
    let mut group = c.benchmark_group("mesh_build");

    for layer_count in [10u32, 100, 500] {
        let layers = synthetic_layers(layer_count, 10);
        group.bench_with_input(
            BenchmarkId::from_parameter(layer_count),
            &layers,
            |b, layers| {
                let builder = MeshBuilder::new(&config);
                b.iter(|| builder.build(black_box(layers), Vec3::ZERO, None))
            },
        );
    }

    group.finish();
}

fn bench_draw_plan(c: &mut Criterion) {
    let config = RenderConfig::default();
    let layers = synthetic_layers(1000, 2);
    let mesh = match MeshBuilder::new(&config).build(&layers, Vec3::ZERO, None) {
        Ok(mesh) => mesh,
        Err(e) => panic!("bench mesh failed to build: {}", e),
    };
    let view = ViewState {
        mode: DrawMode::Perspective,
        elevation: 20.0,
        eye_height: 100.0,
        offset_z: 0.0,
    };

    c.bench_function("draw_plan_perspective_1000_layers", |b| {
        b.iter(|| mesh.planner().plan(black_box(&view), 1000))
    });
}

criterion_group!(benches, bench_mesh_build, bench_draw_plan);
criterion_main!(benches);
