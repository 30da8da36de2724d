use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "kvport")]
#[command(about = "Azure Key Vault keys import/export tool")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.kvport/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export keys from a vault to a JSON file
    Export {
        /// The name of the Key Vault (not the full URL)
        #[arg(long)]
        key_vault_name: String,

        /// File the keys will be saved to
        #[arg(long)]
        file_path: PathBuf,

        /// Include all versions of keys
        #[arg(long)]
        include_all_versions: bool,
    },

    /// Import keys from a JSON file into a vault
    Import {
        /// The name of the Key Vault (not the full URL)
        #[arg(long)]
        key_vault_name: String,

        /// File the keys will be read from
        #[arg(long)]
        file_path: PathBuf,

        /// Skip keys that already exist
        #[arg(long)]
        skip_existing: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::FAILURE,
            };
        }
    };

    let config = match kvport::Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);

    let result = match cli.command {
        Commands::Export {
            key_vault_name,
            file_path,
            include_all_versions,
        } => {
            commands::run_export(&config, &key_vault_name, &file_path, include_all_versions).await
        }
        Commands::Import {
            key_vault_name,
            file_path,
            skip_existing,
        } => commands::run_import(&config, &key_vault_name, &file_path, skip_existing).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error executing command: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(logging: &kvport::config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
