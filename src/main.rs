mod config;
mod driver;
mod error;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, OutputFormat};
use crate::driver::webdriver::WebDriverPage;
use crate::pipeline::CrawlSession;
use crate::storage::ResultWriter;

#[derive(Parser)]
#[command(name = "contract-crawler", about = "Public contracts portal crawler", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl every listing page and save the contracts found
    Crawl {
        /// Directory for the results file
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Results file format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Listing URL (overrides config)
        #[arg(long, env = "CONTRACTS_LISTING_URL")]
        url: Option<String>,
    },

    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "contract_crawler=info,warn",
        1 => "contract_crawler=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Crawl { out, format, headless, max_pages, url } => {
            if let Some(out) = out {
                config.output.dir = out;
            }
            if let Some(format) = format {
                config.output.format = format;
            }
            if headless {
                config.driver.headless = true;
            }
            if max_pages.is_some() {
                config.crawl.max_pages = max_pages;
            }
            if let Some(url) = url {
                config.site.listing_url = url;
            }
            config.validate()?;
            crawl(config).await
        }

        Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn crawl(config: AppConfig) -> Result<ExitCode> {
    let _t = utils::Timer::start("Contract crawl");

    let driver = WebDriverPage::connect(&config.driver, config.timing.poll_interval())
        .await
        .context("Failed to start browser session")?;
    let outcome = CrawlSession::new(driver, &config).run().await;

    let writer = ResultWriter::new(&config.output.dir, config.output.format);
    let path = writer.write(&outcome.records)?;

    println!("\n=== SCRAPING COMPLETED ({}) ===", outcome.termination);
    println!("Total contracts scraped: {}", outcome.total());
    println!("Results saved to: {}", path.display());
    if !outcome.records.is_empty() {
        println!("\nFirst 3 results:");
        for (i, r) in outcome.records.iter().take(3).enumerate() {
            println!(
                "{}. Value: {}, Purpose: {}",
                i + 1,
                r.contract_value,
                utils::truncate(r.purpose.as_str(), 80)
            );
        }
    }

    if outcome.termination.is_fatal() {
        error!("Run ended on a fatal error; partial results were kept");
        Ok(ExitCode::FAILURE)
    } else {
        info!(
            "{} pages, {} rows seen, {} skipped, {} early restorations",
            outcome.stats.pages_visited,
            outcome.stats.rows_seen,
            outcome.stats.rows_skipped,
            outcome.stats.early_restorations
        );
        Ok(ExitCode::SUCCESS)
    }
}
