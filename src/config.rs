use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::fetch::SEARCH_ENDPOINT;

pub const DEFAULT_QUERY: &str = "snowflake consultants copenhagen";
pub const DEFAULT_TARGET: &str = "https://www.devoteam.com/snowflake-elite-partner/";
pub const DEFAULT_PAGES: &[&str] = &[
    "https://www.devoteam.com/snowflake-elite-partner/",
    "https://www.devoteam.com/",
    "https://www.devoteam.com/contact/",
];
pub const DEFAULT_DELAY_SECS: u64 = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_OUTPUT: &str = "seo_analysis_results.json";
pub const DEFAULT_DB_PATH: &str = "data/seo.sqlite";
pub const DB_PATH_ENV: &str = "SEO_DB_PATH";

/// Database path: `SEO_DB_PATH` if set, else the default under `data/`.
pub fn db_path() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pages: Vec<String>,
    pub search_endpoint: String,
    pub search_query: String,
    pub target_url: String,
    pub delay: Duration,
    pub timeout: Duration,
    pub output: PathBuf,
    pub db_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES.iter().map(|p| p.to_string()).collect(),
            search_endpoint: SEARCH_ENDPOINT.to_string(),
            search_query: DEFAULT_QUERY.to_string(),
            target_url: DEFAULT_TARGET.to_string(),
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            output: PathBuf::from(DEFAULT_OUTPUT),
            db_path: db_path(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pages.is_empty() {
            bail!("no pages to analyze");
        }
        if let Some(bad) = self
            .pages
            .iter()
            .find(|p| !(p.starts_with("http://") || p.starts_with("https://")))
        {
            bail!("page URL must be http(s): {}", bad);
        }
        if reqwest::Url::parse(&self.search_endpoint).is_err() {
            bail!("search endpoint is not a valid URL: {}", self.search_endpoint);
        }
        if self.search_query.trim().is_empty() {
            bail!("search query must not be empty");
        }
        if self.target_url.trim().is_empty() {
            bail!("ranking target must not be empty");
        }
        if self.timeout.is_zero() {
            bail!("fetch timeout must be greater than zero");
        }
        Ok(())
    }
}
