mod analyzer;
mod config;
mod db;
mod export;
mod fetch;
mod model;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scraper::Html;
use tracing::{error, info};

use analyzer::extract::FetchMeta;
use config::RunConfig;

#[derive(Parser)]
#[command(name = "seo_daily", about = "Daily SEO page analysis and ranking check")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the results table
    Init,
    /// Check ranking, analyze pages, write the JSON artifact and store the batch
    Run {
        /// Page to analyze (repeatable; defaults to the partner pages)
        #[arg(short, long = "page")]
        pages: Vec<String>,
        /// Search query for the ranking check
        #[arg(short, long, default_value = config::DEFAULT_QUERY)]
        query: String,
        /// URL substring to look for in the search results
        #[arg(short, long, default_value = config::DEFAULT_TARGET)]
        target: String,
        /// Search results endpoint; the query is sent as `q`
        #[arg(long, default_value = fetch::SEARCH_ENDPOINT)]
        search_endpoint: String,
        /// Seconds to wait between page fetches
        #[arg(long, default_value_t = config::DEFAULT_DELAY_SECS)]
        delay: u64,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
        timeout: u64,
        /// Where to write the batch artifact
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
        output: PathBuf,
        /// Write the artifact only, skip the database
        #[arg(long)]
        no_store: bool,
    },
    /// Analyze a saved HTML file and print the record as JSON
    Analyze {
        #[arg(short, long)]
        file: PathBuf,
        /// URL to record for the page
        #[arg(short, long, default_value = "file://local")]
        url: String,
        #[arg(short, long, default_value = config::DEFAULT_QUERY)]
        query: String,
    },
    /// Run the ranking check against a saved results page
    Rank {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long, default_value = config::DEFAULT_QUERY)]
        query: String,
        #[arg(short, long, default_value = config::DEFAULT_TARGET)]
        target: String,
    },
    /// Store a previously written batch artifact
    Upload {
        #[arg(long = "from", default_value = config::DEFAULT_OUTPUT)]
        from: PathBuf,
    },
    /// Show the most recent run
    Latest {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show row counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&config::db_path())?;
            db::init_schema(&conn)?;
            println!("Schema ready at {}", config::db_path().display());
            Ok(())
        }
        Commands::Run {
            pages,
            query,
            target,
            search_endpoint,
            delay,
            timeout,
            output,
            no_store,
        } => {
            let mut cfg = RunConfig {
                search_endpoint,
                search_query: query,
                target_url: target,
                delay: Duration::from_secs(delay),
                timeout: Duration::from_secs(timeout),
                output,
                ..RunConfig::default()
            };
            if !pages.is_empty() {
                cfg.pages = pages;
            }
            run_daily(&cfg, !no_store).await
        }
        Commands::Analyze { file, url, query } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let meta = FetchMeta {
                load_time_seconds: 0.0,
                content_size_bytes: html.len() as u64,
            };
            let record = analyzer::analyze_html(&url, &query, &html, meta);
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Rank { file, query, target } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let record = analyzer::ranking::check_ranking(&query, &Html::parse_document(&html), &target);
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::Upload { from } => {
            let batch = export::read_batch(&from)?;
            let conn = db::connect(&config::db_path())?;
            db::init_schema(&conn)?;
            let rows = db::save_batch(&conn, &batch)?;
            println!("Stored {} rows from {}", rows, from.display());
            Ok(())
        }
        Commands::Latest { limit } => {
            let conn = db::connect(&config::db_path())?;
            db::init_schema(&conn)?;
            let rows = db::fetch_latest(&conn, limit)?;
            if rows.is_empty() {
                println!("No analysis stored yet. Run 'run' first.");
                return Ok(());
            }

            println!(
                "{:<8} | {:<40} | {:>4} | {:>7} | {:>5} | {:>7} | {:>4} | {:>3} | {:<8}",
                "Kind", "Page", "Rank", "Overall", "Local", "Content", "Tech", "UX", "Priority"
            );
            println!("{}", "-".repeat(105));

            for r in &rows {
                let rank = r
                    .ranking_position
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".into());
                let priority = match (&r.error, &r.improvement_priority) {
                    (Some(_), _) => "ERROR".to_string(),
                    (None, Some(p)) => p.split(" - ").next().unwrap_or(p).to_string(),
                    (None, None) => "-".to_string(),
                };
                println!(
                    "{:<8} | {:<40} | {:>4} | {:>7.2} | {:>5.1} | {:>7.1} | {:>4.1} | {:>3.1} | {:<8}",
                    r.record_kind,
                    truncate(&r.page_url, 40),
                    rank,
                    r.overall_score,
                    r.local_seo_score,
                    r.content_quality_score,
                    r.technical_seo_score,
                    r.user_experience_score,
                    priority
                );
            }

            let titled: Vec<_> = rows
                .iter()
                .filter_map(|r| r.page_title.as_deref().filter(|t| !t.is_empty()).map(|t| (r, t)))
                .collect();
            if !titled.is_empty() {
                println!("\n--- Titles ---");
                for (r, title) in &titled {
                    println!("  {}: {}", truncate(&r.page_url, 40), title);
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&config::db_path())?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Rows:         {}", s.total);
            println!("Runs:         {}", s.generations);
            println!("Page rows:    {}", s.pages);
            println!("Failed pages: {}", s.failed_pages);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Full daily run. The artifact is written before storage so a failed
/// upload can be retried with `upload`.
async fn run_daily(cfg: &RunConfig, store: bool) -> anyhow::Result<()> {
    cfg.validate()?;
    info!("Starting daily SEO analysis of {} pages", cfg.pages.len());

    let client = fetch::build_client(cfg.timeout)?;
    let batch = analyzer::run_batch(&client, cfg).await;

    export::write_batch(&cfg.output, &batch)?;
    info!("Analysis results saved to {}", cfg.output.display());

    println!("Ranking for \"{}\": {}", batch.ranking.search_query, batch.ranking.position);
    for page in &batch.pages {
        match &page.error {
            Some(e) => println!("  {:<50} ERROR {}", truncate(&page.page_url, 50), e),
            None => println!(
                "  {:<50} {:.3} {}",
                truncate(&page.page_url, 50),
                page.scores.overall_score,
                page.improvement_priority
                    .map(|p| p.to_string())
                    .unwrap_or_default()
            ),
        }
    }

    if store {
        let stored = db::connect(&cfg.db_path).and_then(|conn| {
            db::init_schema(&conn)?;
            db::save_batch(&conn, &batch)
        });
        match stored {
            Ok(rows) => info!("Stored {} rows in {}", rows, cfg.db_path.display()),
            Err(e) => {
                error!("Error storing batch: {:#}", e);
                bail!(
                    "storing the batch failed ({:#}); retry with: seo_daily upload --from {}",
                    e,
                    cfg.output.display()
                );
            }
        }
    }

    if batch.failed_pages() == batch.pages.len() {
        bail!("all {} page fetches failed", batch.pages.len());
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
