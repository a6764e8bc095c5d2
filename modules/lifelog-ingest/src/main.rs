//! lifelog-ingest: normalize wearable lifelog exports into a
//! date-partitioned tree of canonical JSON records.
//!
//! Usage:
//!   lifelog-ingest [--config PATH] [--out DIR] [--force] bee --source DIR
//!   lifelog-ingest limitless [--token KEY] [--start DATE] [--end DATE]

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use lifelog_ingest::adapters::text_adapter;
use lifelog_ingest::config::IngestConfig;
use lifelog_ingest::driver::{IngestSummary, Ingestor};
use lifelog_ingest::error::IngestError;
use lifelog_ingest::limitless_api::LimitlessClient;
use lifelog_ingest::remote::{DateWindow, RemoteAdapter};
use lifelog_ingest::resume::latest_start_time;
use lifelog_ingest::timestamps::{parse_date_bound, BoundSide};
use lifelog_ingest::writer::OverwritePolicy;
use lifelog_types::SourceType;
use std::path::Path;
use std::process::ExitCode;

/// Bad flags or missing credentials.
const EXIT_USAGE: u8 = 2;
/// The run could not start or could not finish.
const EXIT_FATAL: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(Some(summary)) => {
            println!("Done. {}.", summary);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

#[derive(Debug)]
enum RunError {
    Usage(String),
    Fatal(IngestError),
}

impl RunError {
    fn exit_code(&self) -> u8 {
        match self {
            RunError::Usage(_) => EXIT_USAGE,
            RunError::Fatal(_) => EXIT_FATAL,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Usage(msg) => write!(f, "{}", msg),
            RunError::Fatal(e) => write!(f, "{}", e),
        }
    }
}

impl From<IngestError> for RunError {
    fn from(e: IngestError) -> Self {
        RunError::Fatal(e)
    }
}

/// Resolves config and dispatches. `Ok(None)` for commands that ingest nothing.
async fn run(cli: Cli) -> Result<Option<IngestSummary>, RunError> {
    let mut config = IngestConfig::load(cli.config.as_deref()).map_err(IngestError::from)?;
    if let Some(out) = cli.out {
        config.output_root = out;
    }
    let policy = if cli.force {
        OverwritePolicy::Overwrite
    } else {
        OverwritePolicy::SkipExisting
    };

    let summary = match cli.command {
        Command::Version => {
            println!("{}", version_line(&config));
            return Ok(None);
        }
        Command::Bee { source } => run_text(SourceType::Bee, &source, &config, policy)?,
        Command::Omi { source } => run_text(SourceType::Omi, &source, &config, policy)?,
        Command::ChatGpt { source } => run_text(SourceType::ChatGpt, &source, &config, policy)?,
        Command::Limitless {
            token,
            url,
            start,
            end,
            no_resume,
        } => {
            if let Some(token) = token {
                config.token = Some(token);
            }
            if let Some(url) = url {
                config.url = url;
            }
            run_limitless(&config, policy, start, end, !no_resume).await?
        }
    };
    Ok(Some(summary))
}

/// The export version stamped into records written with this config.
fn version_line(config: &IngestConfig) -> &str {
    &config.export_version
}

fn run_text(
    source: SourceType,
    dir: &Path,
    config: &IngestConfig,
    policy: OverwritePolicy,
) -> Result<IngestSummary, RunError> {
    let adapter = text_adapter(source)
        .ok_or_else(|| RunError::Usage(format!("{} is not a file-based source", source)))?;
    log::info!(
        "[INGEST] {} -> {} ({:?})",
        dir.display(),
        config.output_root.display(),
        policy
    );
    Ok(Ingestor::new(config, policy).ingest_directory(adapter, dir)?)
}

async fn run_limitless(
    config: &IngestConfig,
    policy: OverwritePolicy,
    start: Option<String>,
    end: Option<String>,
    resume: bool,
) -> Result<IngestSummary, RunError> {
    let token = config
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            RunError::Usage("missing API token (use --token or LIFELOG_TOKEN)".to_string())
        })?;
    if config.url.trim().is_empty() {
        return Err(RunError::Usage(
            "missing API URL (use --url or LIFELOG_URL)".to_string(),
        ));
    }

    let bound = |value: Option<String>, side| {
        value
            .map(|v| parse_date_bound(&v, side).map_err(RunError::Usage))
            .transpose()
    };
    let mut window = DateWindow {
        start: bound(start, BoundSide::Start)?,
        end: bound(end, BoundSide::End)?,
    };
    if let (Some(s), Some(e)) = (window.start, window.end) {
        if s > e {
            return Err(RunError::Usage(format!(
                "--start {} is after --end {}",
                s.to_rfc3339(),
                e.to_rfc3339()
            )));
        }
    }

    if window.start.is_none() && resume {
        if let Some(latest) = latest_start_time(&config.output_root, SourceType::Limitless) {
            log::info!(
                "[INGEST] Resuming from latest saved startTime {}",
                latest.to_rfc3339()
            );
            window.start = Some(latest);
        }
    }

    let client = LimitlessClient::new(&config.url, token);
    let mut remote = RemoteAdapter::new(client, window)
        .with_backoff(config.rate_limit_backoff)
        .with_page_limit(config.page_limit);

    log::info!(
        "[INGEST] {} -> {} ({:?})",
        config.url,
        config.output_root.display(),
        policy
    );
    Ok(Ingestor::new(config, policy)
        .ingest_remote(&mut remote)
        .await?)
}
