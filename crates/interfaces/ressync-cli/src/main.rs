use anyhow::{bail, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use ressync_cli::{commands, CliOptionalMode};
use tracing::Level;

#[derive(Parser)]
#[command(name = "ressync", version, about = "Manifest-driven Minecraft resource synchronizer")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the mod list and print it with a per-subject summary
    List {
        #[arg(default_value = ressync_config::DEFAULT_MANIFEST_URL)]
        url: String,
    },
    /// Compare local files against the mod list without changing anything
    Check {
        #[arg(default_value = ressync_config::DEFAULT_MANIFEST_URL)]
        url: String,
        /// Base directory containing mods/, config/, resourcepacks/, ...
        #[arg(long, default_value = ".")]
        path: Utf8PathBuf,
        /// Local modlist JSON used when the endpoint is unreachable
        #[arg(long)]
        fallback: Option<Utf8PathBuf>,
    },
    /// Run the staged synchronization workflow
    Sync {
        #[arg(default_value = ressync_config::DEFAULT_MANIFEST_URL)]
        url: String,
        #[arg(long, default_value = ".")]
        path: Utf8PathBuf,
        #[arg(long)]
        fallback: Option<Utf8PathBuf>,
        /// How to treat optional mods
        #[arg(long, value_enum, default_value_t = CliOptionalMode::None)]
        optional: CliOptionalMode,
        /// Comma-separated entry ids, used with --optional ids
        #[arg(long, value_delimiter = ',')]
        optional_ids: Vec<i64>,
        /// Report what would change without downloading
        #[arg(long)]
        no_download: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::List { url } => {
            validate_endpoint(&url)?;
            commands::cmd_list(url).await
        }
        Commands::Check {
            url,
            path,
            fallback,
        } => {
            validate_endpoint(&url)?;
            commands::cmd_check(url, path, fallback).await
        }
        Commands::Sync {
            url,
            path,
            fallback,
            optional,
            optional_ids,
            no_download,
        } => {
            validate_endpoint(&url)?;
            let report =
                commands::cmd_sync(url, path, fallback, optional, optional_ids, no_download)
                    .await?;
            if report.total_failed() > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn validate_endpoint(url: &str) -> Result<()> {
    if !ressync_config::is_valid_endpoint(url) {
        bail!("Invalid endpoint URL: {url}");
    }
    Ok(())
}
