//! Articlenator CLI - web app and one-shot conversions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use articlenator::auth::{validate_cookies, CookieStore};
use articlenator::pipeline::Resolution;
use articlenator::server::{self, AppState};
use articlenator::{logging, version, Config};

/// Articlenator - Turn tweets and articles into e-reader PDFs.
#[derive(Parser)]
#[command(name = "articlenator")]
#[command(about = "Convert Twitter/X posts and web articles into e-reader PDFs")]
#[command(version = version::VERSION)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web application
    Serve {
        /// Bind host (overrides ARTICLENATOR_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Convert links into a single PDF
    Convert {
        /// Tweet or article URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Cookie string for X (defaults to the saved cookies)
        #[arg(long, env = "ARTICLENATOR_COOKIES")]
        cookies: Option<String>,

        /// Output directory (overrides ARTICLENATOR_OUTPUT_DIR)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Normalise and save a cookie string
    SaveCookies {
        /// Cookie string or DevTools table rows
        cookies: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    logging::init(&level, config.json_logging);

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            run_serve(config).await
        }
        Commands::Convert {
            urls,
            cookies,
            output,
        } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            run_convert(config, &urls, cookies.as_deref()).await
        }
        Commands::SaveCookies { cookies } => run_save_cookies(&config, &cookies),
    }
}

async fn run_serve(config: Config) -> Result<()> {
    config
        .ensure_dirs()
        .context("Failed to create config and output directories")?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    tracing::info!(
        version = %version::version_string(),
        output_dir = %config.output_dir.display(),
        max_browsers = config.max_browsers,
        "Starting articlenator"
    );

    let (state, pool) = AppState::from_config(config)?;
    let result = server::serve(state, addr).await;
    pool.shutdown().await;
    result?;
    Ok(())
}

async fn run_convert(config: Config, urls: &[String], cookies: Option<&str>) -> Result<()> {
    let (state, pool) = AppState::from_config(config)?;
    let session = state.session_for(cookies);

    let outcome = match state
        .pipeline
        .plan(urls, session.as_ref(), Resolution::Strict)
    {
        Ok(plan) => state.pipeline.run(plan, session.as_ref(), None).await,
        Err(e) => Err(e),
    };
    pool.shutdown().await;
    let report = outcome?;

    let path = state.config.output_dir.join(&report.filename);
    println!("PDF written to {}", path.display());
    println!(
        "Converted {}/{} link(s)",
        report.summary.succeeded, report.summary.total
    );
    for err in report.errors.iter().flatten() {
        eprintln!("  - {}: {}", err.url, err.error);
    }
    Ok(())
}

fn run_save_cookies(config: &Config, cookies: &str) -> Result<()> {
    let store = CookieStore::new(config.cookie_path());
    let saved = store.save(cookies)?;
    let validation = validate_cookies(Some(&saved));

    println!("Cookies saved to {}", store.path().display());
    if validation.valid {
        println!("{}", validation.message);
    } else {
        eprintln!("Warning: {}", validation.message);
    }
    Ok(())
}
