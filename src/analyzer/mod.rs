pub mod extract;
pub mod priority;
pub mod ranking;
pub mod score;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use scraper::Html;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::fetch;
use crate::model::{AnalysisBatch, AnalysisRecord, RankingRecord};
use extract::FetchMeta;

/// Three-stage pipeline: html → observables → scores → priority.
pub fn analyze_html(url: &str, query: &str, html: &str, meta: FetchMeta) -> AnalysisRecord {
    let document = Html::parse_document(html);
    let page = extract::extract(url, &document, meta);
    let scores = score::score(&page.observables);
    let class = priority::classify(&page.observables, &scores);

    AnalysisRecord::analyzed(
        &page.url,
        page.title.unwrap_or_else(|| "No title".to_string()),
        query,
        page.observables,
        scores,
        class.priority,
        class.notes,
    )
}

/// Fetch and analyze one page. Fetch failures become a degraded record.
pub async fn analyze_page(client: &Client, url: &str, query: &str) -> AnalysisRecord {
    info!("Analyzing SEO for: {}", url);
    match fetch::fetch_page(client, url).await {
        Ok(page) => {
            let meta = FetchMeta {
                load_time_seconds: page.load_time_seconds,
                content_size_bytes: page.content_size_bytes,
            };
            analyze_html(url, query, &page.body, meta)
        }
        Err(e) => {
            error!("Error analyzing {}: {:#}", url, e);
            AnalysisRecord::failed(url, query, format!("{:#}", e))
        }
    }
}

pub async fn check_ranking_live(
    client: &Client,
    endpoint: &str,
    query: &str,
    target: &str,
) -> RankingRecord {
    info!("Checking ranking for: {}", query);
    let fetched = match fetch::search_url(endpoint, query) {
        Ok(url) => fetch::fetch_page(client, url.as_str()).await,
        Err(e) => Err(e),
    };
    match fetched {
        Ok(page) => {
            let document = Html::parse_document(&page.body);
            let record = ranking::check_ranking(query, &document, target);
            info!("Ranking position for {}: {}", target, record.position);
            record
        }
        Err(e) => {
            error!("Error checking ranking: {:#}", e);
            ranking::ranking_failed(query, target, format!("{:#}", e))
        }
    }
}

/// One ranking check, then every page in order, one request at a time.
pub async fn run_batch(client: &Client, config: &RunConfig) -> AnalysisBatch {
    let ranking = check_ranking_live(
        client,
        &config.search_endpoint,
        &config.search_query,
        &config.target_url,
    )
    .await;

    let pb = ProgressBar::new(config.pages.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut pages = Vec::with_capacity(config.pages.len());
    for (i, url) in config.pages.iter().enumerate() {
        if i > 0 && !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }
        pb.set_message(url.clone());
        pages.push(analyze_page(client, url, &config.search_query).await);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let batch = AnalysisBatch {
        generated_at: Utc::now(),
        ranking,
        pages,
    };
    let failed = batch.failed_pages();
    if failed > 0 {
        warn!("{} of {} pages failed", failed, batch.pages.len());
    }
    batch
}
