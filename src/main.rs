//! Temporal-KV: Main entry point

use anyhow::Context;
use clap::Parser;
use temporal_kv::cli::{self, Cli, LogFormat};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = cli::resolve_config(&cli).context("resolving store configuration")?;
    let store = cli::open_store(&config)
        .with_context(|| format!("opening store at {}", config.path.display()))?;

    let stdout = std::io::stdout();
    cli::execute(cli.command, store, &mut stdout.lock()).context("running command")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
