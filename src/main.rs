use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;

use farmhand::api::{ApiClient, JobApi};
use farmhand::cli::{Cli, Command};
use farmhand::config::FarmhandConfig;
use farmhand::event::Outcome;
use farmhand::job::JobParams;
use farmhand::set::JobSet;
use farmhand::ui::WatchProgress;

/// Job definitions file loaded by `farmhand run --file`.
#[derive(Debug, Deserialize)]
struct JobFile {
    jobs: Vec<JobParams>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => FarmhandConfig::load_from(path)?,
        None => FarmhandConfig::load()?,
    };

    match cli.command {
        Command::Run { file } => run(&config, &file, cli.verbose).await,
        Command::Status { key } => status(&config, &key).await,
    }
}

fn client(config: &FarmhandConfig) -> Result<ApiClient> {
    if config.api_url.is_empty() {
        bail!("api_url is not configured; set it in farmhand.toml");
    }
    if config.token.is_empty() {
        bail!("no auth token; set token in farmhand.toml or FARMHAND_TOKEN");
    }
    Ok(ApiClient::new(config.api_url.clone(), config.token.clone()))
}

async fn run(config: &FarmhandConfig, file: &Path, verbose: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let job_file: JobFile = toml::from_str(&contents)?;
    let mut set = JobSet::from_params(job_file.jobs)?;

    let api = client(config)?;
    set.submit(&api).await?;
    let progress = WatchProgress::start(&format!("Watching {} job(s)", set.len()));

    let mut watcher = set.watch(api, config.watch());
    let mut finals = Vec::new();
    while let Some(event) = watcher.next_event().await {
        progress.event(&event);
        if verbose {
            eprintln!("{}", serde_json::to_string(&event)?);
        }
        if event.is_final {
            finals.push(event);
        }
    }
    progress.finish(&finals);

    let all_ok = watcher.failures().is_empty()
        && finals
            .iter()
            .all(|e| matches!(e.status, Some(Outcome::Pass) | Some(Outcome::Warning)));
    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn status(config: &FarmhandConfig, key: &str) -> Result<()> {
    let api = client(config)?;
    let doc = api.fetch_status(key).await?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
