//! Command-line front end: load a JSON movement dump, build the mesh and
//! report what a frame would draw.

use std::{
    fs::File,
    io::{BufReader, Write},
    ops::ControlFlow,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use toolview_core::MovementStream;
use toolview_settings::Config;
use toolview_visualizer::{picking, DrawMode, GcodeModel, MeshBuilder, ViewState};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "toolview", version)]
pub struct Cli {
    /// Movement stream JSON: an array of layers, each an array of movements.
    pub input: PathBuf,

    /// TOML config file; searched for in the usual places when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of layers to draw (defaults to all).
    #[arg(long)]
    pub layers: Option<usize>,

    /// Projection mode.
    #[arg(long, value_enum, default_value_t = ModeChoice::Perspective)]
    pub mode: ModeChoice,

    /// Camera elevation in degrees; negative looks from below.
    #[arg(long, default_value_t = 30.0, allow_hyphen_values = true)]
    pub elevation: f32,

    /// World Z of the eye (defaults to above the model).
    #[arg(long, allow_hyphen_values = true)]
    pub eye_height: Option<f32>,

    /// Source lines to highlight, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<u32>,

    /// Resolve the picking color of this movement index back to its line.
    #[arg(long)]
    pub pick_index: Option<usize>,

    /// Hide direction arrows and layer markers.
    #[arg(long)]
    pub no_arrows: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeChoice {
    #[value(name = "2d")]
    Flat,
    Ortho,
    Perspective,
}

impl From<ModeChoice> for DrawMode {
    fn from(choice: ModeChoice) -> Self {
        match choice {
            ModeChoice::Flat => DrawMode::Flat2D,
            ModeChoice::Ortho => DrawMode::Orthographic,
            ModeChoice::Perspective => DrawMode::Perspective,
        }
    }
}

pub fn read_stream_json(path: &Path) -> anyhow::Result<MovementStream> {
    let f = File::open(path).with_context(|| format!("open movement stream '{}'", path.display()))?;
    let r = BufReader::new(f);
    let stream: MovementStream =
        serde_json::from_reader(r).with_context(|| "parse movement stream JSON")?;
    Ok(stream)
}

/// Build the mesh for `cli.input` and write a summary and frame plan to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;
    config.validate()?;

    let stream = read_stream_json(&cli.input)?;
    info!(
        "Loaded {} movements in {} layers from {}",
        stream.movement_count(),
        stream.layer_count(),
        cli.input.display()
    );

    let mut report_progress = |done: usize, total: usize| {
        info!("Building mesh: {}/{} layers", done, total);
        ControlFlow::Continue(())
    };
    let buffers = MeshBuilder::new(&config.rendering)
        .build_stream(stream, Some(&mut report_progress))?;

    let mut model = GcodeModel::new(buffers);
    if let Some(layers) = cli.layers {
        model.set_num_layers_to_draw(layers);
    }
    model.set_selected_lines(cli.select.iter().copied());
    model.set_arrows_enabled(!cli.no_arrows);

    let mesh = model.buffers();
    writeln!(out, "layers: {}", mesh.layer_count())?;
    writeln!(out, "movements: {}", mesh.movement_count())?;
    writeln!(out, "skipped zero-length movements: {}", mesh.skipped_movements())?;
    writeln!(out, "vertices: {}", mesh.vertex_count())?;
    if let Some((min, max)) = mesh.bounds() {
        let size = max - min;
        writeln!(
            out,
            "dimensions: {:.2} x {:.2} x {:.2} mm",
            size.x, size.y, size.z
        )?;
    }

    let offset_z = config.machine.platform_offset_z;
    let eye_height = cli.eye_height.unwrap_or_else(|| {
        let top = mesh.layer_heights().last().copied().unwrap_or_default();
        top + offset_z + 1.0
    });
    let view = ViewState {
        mode: cli.mode.into(),
        elevation: cli.elevation,
        eye_height,
        offset_z,
    };

    let plan = model.frame_plan(&view);
    writeln!(
        out,
        "plan: {:?}, {} of {} layers",
        view.mode,
        model.num_layers_to_draw(),
        model.max_layers()
    )?;
    for range in &plan.movements {
        writeln!(out, "  draw {}..{}", range.start, range.end())?;
    }
    for range in &plan.selection {
        writeln!(out, "  selection {}..{}", range.start, range.end())?;
    }
    if let Some(range) = plan.arrows {
        writeln!(out, "  arrows {}..{}", range.start, range.end())?;
    }
    if let Some(range) = plan.markers {
        writeln!(out, "  markers {}..{}", range.start, range.end())?;
    }

    if let Some(index) = cli.pick_index {
        let rgb = picking::encode_index(index);
        match model.pick_line(rgb) {
            Some(line) => writeln!(out, "pick {}: {:?} -> line {}", index, rgb, line)?,
            None => writeln!(out, "pick {}: {:?} -> no movement", index, rgb)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;

    const STREAM: &str = r#"[
        [
            {"position": [0.0, 0.0, 0.2], "source_line": 1},
            {"position": [10.0, 0.0, 0.2], "flags": 1, "source_line": 2},
            {"position": [10.0, 10.0, 0.2], "flags": 3, "source_line": 3}
        ],
        [
            {"position": [10.0, 10.0, 0.4], "flags": 1, "source_line": 5},
            {"position": [0.0, 10.0, 0.4], "flags": 1, "source_line": 6}
        ]
    ]"#;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn cli(input: PathBuf, config: PathBuf) -> Cli {
        Cli {
            input,
            config: Some(config),
            layers: None,
            mode: ModeChoice::Ortho,
            elevation: 30.0,
            eye_height: None,
            select: Vec::new(),
            pick_index: None,
            no_arrows: false,
        }
    }

    fn run_to_string(cli: &Cli) -> String {
        let mut out = Vec::new();
        run(cli, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_summary() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "stream.json", STREAM);
        let config = write_file(&dir, "config.toml", "");

        let report = run_to_string(&cli(input, config));
        assert!(report.contains("layers: 2"));
        assert!(report.contains("movements: 4"));
        assert!(report.contains("vertices: 192"));
        assert!(report.contains("dimensions: 10.00 x 10.00 x 0.20 mm"));
        assert!(report.contains("  draw 0..192"));
    }

    #[test]
    fn test_report_honours_config_and_pick() {
        let dir = TempDir::new().unwrap();
        let input = write_file(&dir, "stream.json", STREAM);
        let config = write_file(&dir, "config.toml", "[rendering]\ncylinder_sides = 4\n");

        let mut args = cli(input, config);
        args.pick_index = Some(2);
        args.layers = Some(1);
        args.select = vec![3];

        let report = run_to_string(&args);
        assert!(report.contains("vertices: 96"));
        assert!(report.contains("  draw 0..48"));
        assert!(report.contains("  selection 24..48"));
        assert!(report.contains("pick 2: [0, 0, 3] -> line 5"));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = write_file(&dir, "config.toml", "");
        let mut out = Vec::new();
        let err = run(&cli(dir.path().join("missing.json"), config), &mut out).unwrap_err();
        assert!(err.to_string().contains("open movement stream"));
    }

    #[test]
    fn test_mode_choice_maps_to_draw_mode() {
        assert_eq!(DrawMode::from(ModeChoice::Flat), DrawMode::Flat2D);
        assert_eq!(DrawMode::from(ModeChoice::Ortho), DrawMode::Orthographic);
    }
}
