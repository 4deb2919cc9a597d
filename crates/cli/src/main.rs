use clap::Parser;
use shmring_cli::{run, Cli};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Results go to stdout, logs to stderr
    shmring_utils::tracing::init().map_err(|e| eyre::eyre!(e))?;

    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}
