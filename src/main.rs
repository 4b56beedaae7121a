use clap::Parser;
use toolview::cli::{run, Cli};
use toolview::{init_logging, BUILD_DATE, VERSION};
use tracing::debug;

fn main() -> anyhow::Result<()> {
    init_logging()?;
    debug!("toolview {} built {}", VERSION, BUILD_DATE);

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(&cli, &mut stdout.lock())
}
