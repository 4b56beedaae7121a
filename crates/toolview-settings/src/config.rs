//! Rendering and machine configuration
//!
//! Loaded from a TOML file shaped like:
//!
//! ```toml
//! [rendering]
//! cylinder_radius = 0.1
//! cylinder_sides = 8
//! background_color = [0.0, 0.0, 0.0, 0.0]
//!
//! [rendering.gcode_colors]
//! perimeter = [0.0, 1.0, 0.0]          # alpha defaults to 1.0
//! outer_perimeter = [0.0, 0.875, 0.875, 0.6]
//!
//! [rendering.selection]
//! color = [1.0, 1.0, 0.0, 0.8]
//!
//! [machine]
//! platform_offset_z = 0.5
//! ```
//!
//! Every key is optional. Color entries with anything other than three or
//! four numbers fall back to their default with a warning.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toolview_core::Rgba;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

const DEFAULT_MOVEMENT_COLOR: Rgba = [0.6, 0.6, 0.6, 0.6];
const DEFAULT_OUTER_PERIMETER_COLOR: Rgba = [0.0, 0.875, 0.875, 0.6];
const DEFAULT_PERIMETER_COLOR: Rgba = [0.0, 1.0, 0.0, 0.6];
const DEFAULT_LOOP_COLOR: Rgba = [1.0, 0.875, 0.0, 0.6];
const DEFAULT_EXTRUDER_ON_COLOR: Rgba = [1.0, 0.0, 0.0, 0.6];
const DEFAULT_SELECTION_COLOR: Rgba = [1.0, 1.0, 0.0, 0.8];
const DEFAULT_MARKER_COLOR: Rgba = [0.6, 0.6, 0.6, 0.6];
const DEFAULT_BACKGROUND_COLOR: Rgba = [0.0, 0.0, 0.0, 0.0];
const DEFAULT_CYLINDER_RADIUS: f32 = 0.1;
const DEFAULT_CYLINDER_SIDES: u32 = 8;
const MIN_CYLINDER_SIDES: u32 = 3;

/// File names probed, in order, when no config path is given.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["toolview.toml", "config.toml"];

/// Draw colors, one per movement classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovementColors {
    /// Travel moves (extruder off)
    pub movement_default: Rgba,
    pub outer_perimeter: Rgba,
    pub perimeter: Rgba,
    #[serde(rename = "loop")]
    pub loop_color: Rgba,
    /// Extruding moves that are neither perimeter nor loop
    pub extruder_on: Rgba,
}

impl Default for MovementColors {
    fn default() -> Self {
        Self {
            movement_default: DEFAULT_MOVEMENT_COLOR,
            outer_perimeter: DEFAULT_OUTER_PERIMETER_COLOR,
            perimeter: DEFAULT_PERIMETER_COLOR,
            loop_color: DEFAULT_LOOP_COLOR,
            extruder_on: DEFAULT_EXTRUDER_ON_COLOR,
        }
    }
}

/// Highlight drawn over selected movements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionStyle {
    pub color: Rgba,
}

impl Default for SelectionStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_SELECTION_COLOR,
        }
    }
}

/// Mesh and color settings consumed by the mesh builder and renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRenderConfig")]
pub struct RenderConfig {
    pub gcode_colors: MovementColors,
    pub selection: SelectionStyle,
    /// Flat color of the layer entry/exit markers
    pub marker_color: Rgba,
    pub background_color: Rgba,
    /// Radius of the cylinder drawn for each movement, in mm
    pub cylinder_radius: f32,
    /// Number of faces around each cylinder
    pub cylinder_sides: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            gcode_colors: MovementColors::default(),
            selection: SelectionStyle::default(),
            marker_color: DEFAULT_MARKER_COLOR,
            background_color: DEFAULT_BACKGROUND_COLOR,
            cylinder_radius: DEFAULT_CYLINDER_RADIUS,
            cylinder_sides: DEFAULT_CYLINDER_SIDES,
        }
    }
}

impl RenderConfig {
    /// Vertices emitted per movement: two triangles per cylinder face.
    pub fn vertices_per_movement(&self) -> usize {
        self.cylinder_sides as usize * 6
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.cylinder_sides < MIN_CYLINDER_SIDES {
            return Err(ConfigError::ValueOutOfRange {
                key: "rendering.cylinder_sides".to_string(),
                value: self.cylinder_sides.to_string(),
            });
        }

        if !self.cylinder_radius.is_finite() || self.cylinder_radius <= 0.0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "rendering.cylinder_radius".to_string(),
                value: self.cylinder_radius.to_string(),
            });
        }

        Ok(())
    }
}

/// Placement of the model on the build platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub platform_offset_x: f32,
    pub platform_offset_y: f32,
    pub platform_offset_z: f32,
}

impl MachineConfig {
    pub fn offsets(&self) -> [f32; 3] {
        [
            self.platform_offset_x,
            self.platform_offset_y,
            self.platform_offset_z,
        ]
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rendering: RenderConfig,
    pub machine: MachineConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::LoadError {
            path: path.display().to_string(),
            source,
        })?;

        debug!("Loading configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Save config to a TOML file
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `explicit` if given; otherwise the first discovered config file,
    /// falling back to defaults when none exists or it fails to load.
    pub fn load_or_default(explicit: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        let Some(path) = find_config_file() else {
            debug!("No configuration file found, using defaults");
            return Ok(Self::default());
        };

        match Self::load_from_file(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to load config from {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.rendering.validate()
    }
}

/// Candidate config locations, most specific first.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".toolview.toml"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("toolview").join("config.toml"));
    }
    paths.extend(CONFIG_FILE_NAMES.iter().map(PathBuf::from));

    paths
}

/// First existing config file from the search path.
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|path| path.is_file())
}

/// A color entry as written by the user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColorValue {
    Components(Vec<f32>),
    Invalid(IgnoredAny),
}

fn parse_color(key: &str, value: Option<ColorValue>, default: Rgba) -> Rgba {
    match value {
        None => default,
        Some(ColorValue::Components(c)) if c.len() == 3 => [c[0], c[1], c[2], 1.0],
        Some(ColorValue::Components(c)) if c.len() == 4 => [c[0], c[1], c[2], c[3]],
        Some(other) => {
            warn!("Ignoring malformed color for '{}': {:?}", key, other);
            default
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMovementColors {
    movement_default: Option<ColorValue>,
    outer_perimeter: Option<ColorValue>,
    perimeter: Option<ColorValue>,
    #[serde(rename = "loop")]
    loop_color: Option<ColorValue>,
    extruder_on: Option<ColorValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSelectionStyle {
    color: Option<ColorValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRenderConfig {
    gcode_colors: RawMovementColors,
    selection: RawSelectionStyle,
    marker_color: Option<ColorValue>,
    background_color: Option<ColorValue>,
    cylinder_radius: Option<f32>,
    cylinder_sides: Option<u32>,
}

impl From<RawRenderConfig> for RenderConfig {
    fn from(raw: RawRenderConfig) -> Self {
        let colors = raw.gcode_colors;
        Self {
            gcode_colors: MovementColors {
                movement_default: parse_color(
                    "gcode_colors.movement_default",
                    colors.movement_default,
                    DEFAULT_MOVEMENT_COLOR,
                ),
                outer_perimeter: parse_color(
                    "gcode_colors.outer_perimeter",
                    colors.outer_perimeter,
                    DEFAULT_OUTER_PERIMETER_COLOR,
                ),
                perimeter: parse_color(
                    "gcode_colors.perimeter",
                    colors.perimeter,
                    DEFAULT_PERIMETER_COLOR,
                ),
                loop_color: parse_color("gcode_colors.loop", colors.loop_color, DEFAULT_LOOP_COLOR),
                extruder_on: parse_color(
                    "gcode_colors.extruder_on",
                    colors.extruder_on,
                    DEFAULT_EXTRUDER_ON_COLOR,
                ),
            },
            selection: SelectionStyle {
                color: parse_color("selection.color", raw.selection.color, DEFAULT_SELECTION_COLOR),
            },
            marker_color: parse_color("marker_color", raw.marker_color, DEFAULT_MARKER_COLOR),
            background_color: parse_color(
                "background_color",
                raw.background_color,
                DEFAULT_BACKGROUND_COLOR,
            ),
            cylinder_radius: raw.cylinder_radius.unwrap_or(DEFAULT_CYLINDER_RADIUS),
            cylinder_sides: raw.cylinder_sides.unwrap_or(DEFAULT_CYLINDER_SIDES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rendering.cylinder_sides, 8);
        assert_eq!(config.rendering.cylinder_radius, 0.1);
        assert_eq!(config.rendering.vertices_per_movement(), 48);
        assert_eq!(config.rendering.gcode_colors.perimeter, [0.0, 1.0, 0.0, 0.6]);
        assert_eq!(config.machine.offsets(), [0.0, 0.0, 0.0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_rgb_color_gets_opaque_alpha() {
        let config = Config::from_toml_str(
            r#"
            [rendering.gcode_colors]
            perimeter = [0.1, 0.2, 0.3]
            loop = [0.5, 0.5, 0.5, 0.25]
            "#,
        )
        .unwrap();

        assert_eq!(config.rendering.gcode_colors.perimeter, [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(config.rendering.gcode_colors.loop_color, [0.5, 0.5, 0.5, 0.25]);
        assert_eq!(
            config.rendering.gcode_colors.extruder_on,
            DEFAULT_EXTRUDER_ON_COLOR
        );
    }

    #[test]
    fn test_malformed_color_falls_back() {
        let config = Config::from_toml_str(
            r#"
            [rendering]
            background_color = "black"

            [rendering.selection]
            color = [1.0, 0.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.rendering.background_color, DEFAULT_BACKGROUND_COLOR);
        assert_eq!(config.rendering.selection.color, DEFAULT_SELECTION_COLOR);
    }

    #[test]
    fn test_cylinder_and_machine_settings() {
        let config = Config::from_toml_str(
            r#"
            [rendering]
            cylinder_radius = 0.2
            cylinder_sides = 12

            [machine]
            platform_offset_z = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.rendering.cylinder_radius, 0.2);
        assert_eq!(config.rendering.vertices_per_movement(), 72);
        assert_eq!(config.machine.offsets(), [0.0, 0.0, 1.5]);
    }

    #[test]
    fn test_invalid_cylinder_sides_rejected() {
        let err = Config::from_toml_str("[rendering]\ncylinder_sides = 2\n").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Config(ConfigError::ValueOutOfRange { .. })
        ));

        let err = Config::from_toml_str("[rendering]\ncylinder_radius = 0.0\n").unwrap_err();
        assert!(matches!(err, SettingsError::Config(_)));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolview.toml");

        let mut config = Config::default();
        config.rendering.cylinder_sides = 6;
        config.rendering.gcode_colors.loop_color = [0.2, 0.4, 0.6, 0.8];
        config.machine.platform_offset_x = -10.0;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_explicit_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = Config::load_or_default(Some(&path)).unwrap_err();
        assert!(matches!(err, SettingsError::LoadError { .. }));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rendering]\ncylinder_sides = 5").unwrap();

        let config = Config::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.rendering.cylinder_sides, 5);
    }
}
