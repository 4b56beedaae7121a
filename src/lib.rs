//! # toolview
//!
//! Viewer core for 3D-printer toolpaths. A layered movement stream is
//! turned into a shaded cylinder mesh with direction arrows, layer markers,
//! progressive layer reveal, selection highlighting and click-to-line
//! picking.
//!
//! ## Architecture
//!
//! toolview is organized as a workspace with multiple crates:
//!
//! 1. **toolview-core** - Movement stream data model and error types
//! 2. **toolview-settings** - Rendering and machine configuration, TOML loading
//! 3. **toolview-visualizer** - Mesh building, draw planning, picking, OpenGL rendering
//! 4. **toolview** - Command-line front end that integrates all crates

pub mod cli;

pub use toolview_core::{
    Layer, ModelError, ModelResult, Movement, MovementFlags, MovementStream, PickError, Rgba,
};
pub use toolview_settings::{Config, MachineConfig, MovementColors, RenderConfig};
pub use toolview_visualizer::{
    DrawMode, DrawRange, FramePlan, GcodeModel, MeshBuffers, MeshBuilder, ViewState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr so reports on stdout stay clean
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
