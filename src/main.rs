use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use leashkit::replay::{self, Scenario};
use leashkit::{init_logging, SettingsManager, BUILD_DATE, VERSION};

#[derive(Parser)]
#[command(name = "leashkit")]
#[command(version, about = "Leash constraints between moving entities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scenario file and print final positions as JSON
    Replay {
        /// Scenario file (JSON)
        scenario: PathBuf,

        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Print the effective leash settings as JSON
    Settings {
        /// Settings file (defaults to the platform config directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::debug!("leashkit {} built {}", VERSION, BUILD_DATE);

    let cli = Cli::parse();
    match cli.command {
        Command::Replay { scenario, compact } => {
            let base_dir = scenario
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let report = replay::run(Scenario::load(&scenario)?, &base_dir).await?;
            let output = if compact {
                serde_json::to_string(&report)?
            } else {
                serde_json::to_string_pretty(&report)?
            };
            println!("{}", output);
        }
        Command::Settings { path } => {
            let manager = match path {
                Some(path) => SettingsManager::load_or_default(path)?,
                None => SettingsManager::open()?,
            };
            tracing::info!("Settings from {}", manager.path().display());
            println!("{}", serde_json::to_string_pretty(manager.settings())?);
        }
    }

    Ok(())
}
