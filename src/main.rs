use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zone_consumption::config::Config;
use zone_consumption::menu::Menu;

#[derive(Parser)]
#[command(name = "zone-consumption")]
#[command(about = "Explore electricity consumption of four metered zones", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// Directory searched for data files, overrides the configured one
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so they don't interleave with the menu on stdout
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,zone_consumption=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration: {}\n\n\
             Make sure:\n\
             1. {} is valid YAML\n\
             2. All referenced environment variables are set",
            e,
            cli.config.display()
        )
    })?;
    if let Some(dir) = cli.data_dir {
        config.data.directory = dir;
    }
    info!(
        "Configuration loaded, data directory {}",
        config.data.directory.display()
    );

    let stdin = io::stdin();
    let mut menu = Menu::new(stdin.lock(), io::stdout(), config);
    menu.run()?;

    info!("Shutting down");
    Ok(())
}
