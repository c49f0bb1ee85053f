use clap::Parser;
use hrwsi_s3::cli::{Cli, Command};
use hrwsi_s3::config::Config;
use hrwsi_s3::download::DownloadExecutor;
use hrwsi_s3::error::{Error, EXIT_VALIDATION};
use hrwsi_s3::provider::Hrwsi;
use hrwsi_s3::query::QueryEngine;
use hrwsi_s3::resolver::TileResolver;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hrwsi_s3=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Creates the output directory if needed and returns its absolute path.
fn prepare_output_dir(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() {
        warn!("Existing directory {}", path.display());
    } else {
        info!("Creating directory {}", path.display());
        fs::create_dir_all(path)?;
    }
    fs::canonicalize(path)
}

async fn run(command: Command, config: &Config, output_dir: &Path) -> Result<(), Error> {
    let provider = Hrwsi::from_config(&config.catalog).await;

    let query_file = match command {
        Command::Query { request, download } => {
            let resolver = TileResolver::new(config.grid.clone());
            let engine = QueryEngine::new(&provider, &resolver, &config.query);
            let result = engine.build_query(&request).await?;
            let path = engine.persist(&result, output_dir)?;
            if !download {
                info!("No products were downloaded.");
                return Ok(());
            }
            path
        }
        Command::Download { query_file } => query_file,
    };

    info!("Start downloading...");
    let executor = DownloadExecutor::new(&provider, &config.download, output_dir);
    let report = executor.run(&query_file).await?.into_result()?;
    info!("Downloading complete! {} products", report.downloaded());
    info!(
        "Downloaded products are in {}",
        executor.result_dir().display()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(EXIT_VALIDATION);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    let command = match cli.validate() {
        Ok(command) => command,
        Err(e) => {
            error!("{e}");
            std::process::exit(EXIT_VALIDATION);
        }
    };

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(EXIT_VALIDATION);
        }
    };

    let output_dir = match prepare_output_dir(&cli.output_dir) {
        Ok(path) => path,
        Err(e) => {
            error!("Unable to create {}: {e}", cli.output_dir.display());
            std::process::exit(EXIT_VALIDATION);
        }
    };

    let code = match run(command, &config, &output_dir).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    };
    info!("End.");
    std::process::exit(code);
}
