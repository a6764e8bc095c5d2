use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "lifelog-ingest",
    version,
    about = "Normalize wearable lifelog exports into date-partitioned JSON records"
)]
pub struct Cli {
    /// TOML config file. Defaults to $HOME/.lifelog-ingest.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output root directory.
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// Replace records that already exist.
    #[arg(long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Ingest a directory of Bee .txt exports.
    Bee {
        #[arg(long)]
        source: PathBuf,
    },
    /// Ingest a directory of Omi .txt exports.
    Omi {
        #[arg(long)]
        source: PathBuf,
    },
    /// Ingest a directory of ChatGPT recorder .txt transcripts.
    #[command(name = "chatgpt")]
    ChatGpt {
        #[arg(long)]
        source: PathBuf,
    },
    /// Pull lifelogs from the Limitless API.
    Limitless {
        /// API key. Falls back to LIFELOG_TOKEN or the config file.
        #[arg(long)]
        token: Option<String>,

        /// Lifelogs endpoint.
        #[arg(long)]
        url: Option<String>,

        /// Inclusive lower bound: RFC 3339, YYYY-MM-DD or MM-DD-YYYY.
        #[arg(long)]
        start: Option<String>,

        /// Inclusive upper bound. A bare date covers the whole day.
        #[arg(long)]
        end: Option<String>,

        /// Do not derive --start from records already on disk.
        #[arg(long)]
        no_resume: bool,
    },
    /// Print the version and exit.
    Version,
}
