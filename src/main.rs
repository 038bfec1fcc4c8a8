use clap::Parser;
use tracing_subscriber::EnvFilter;

use approval_mediator::cli::Cli;
use approval_mediator::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    cli.run().await
}

/// `RUST_LOG` wins over the configured filter. Logs go to stderr so command
/// output on stdout stays machine-readable.
fn init_tracing(cli: &Cli) {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(Settings::default_toml_path);
    let logging = Settings::load_toml(&path)
        .ok()
        .flatten()
        .unwrap_or_default()
        .logging;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let json = std::env::var("MEDIATOR_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(logging.json);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
