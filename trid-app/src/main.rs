use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use trid_app::config::Config;
use trid_app::output::{exit_code, render_json, render_text, ScanResult};
use trid_core::Scanner;

/// Identify file types with the TrID command-line tool
#[derive(Parser, Debug)]
#[command(name = "trid-scan", version, about)]
struct Cli {
    /// Files to identify
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Maximum number of candidates per file
    #[arg(short = 'n', long)]
    max_matches: Option<usize>,

    /// Alternate TrID definitions package (triddefs.trd)
    #[arg(short = 'd', long)]
    definitions: Option<PathBuf>,

    /// TrID executable name or path
    #[arg(long)]
    cmd: Option<String>,

    /// Per-file timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Configuration file (YAML), default ./trid-scan.yaml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::from(3)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load_or_default(cli.config.as_deref())?.with_env_overrides()?;
    if let Some(cmd) = cli.cmd {
        config.command = cmd;
    }
    if let Some(definitions) = cli.definitions {
        config.definitions = Some(definitions);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(max_matches) = cli.max_matches {
        config.max_matches = max_matches;
    }
    config.validate().context("Invalid configuration")?;

    let scanner = Scanner::new(config.scan_options());
    tracing::debug!(
        "Scan options: {:?}, max {} matches",
        scanner.options(),
        config.max_matches
    );
    let handles: Vec<_> = cli
        .files
        .iter()
        .cloned()
        .map(|file| {
            let scanner = scanner.clone();
            let max_matches = config.max_matches;
            tokio::spawn(async move { scanner.scan(&file, max_matches).await })
        })
        .collect();

    let mut results: Vec<(&std::path::Path, ScanResult)> = Vec::with_capacity(handles.len());
    for (file, handle) in cli.files.iter().zip(handles) {
        let result = handle.await.context("Scan task failed")?;
        results.push((file.as_path(), result));
    }

    if cli.json {
        println!("{}", render_json(&results)?);
    } else {
        for (file, result) in &results {
            print!("{}", render_text(file, result));
        }
    }

    let code = results
        .iter()
        .filter_map(|(_, result)| result.as_ref().err())
        .map(exit_code)
        .max()
        .unwrap_or(0);
    Ok(ExitCode::from(code))
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // RUST_LOG=debug shows the exact TrID command lines
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
