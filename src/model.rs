use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw signals measured on one page. Field names are the warehouse column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageObservables {
    pub title_length: u32,
    pub word_count: u32,
    pub copenhagen_mentions: u32,
    pub denmark_mentions: u32,
    pub danish_mentions: u32,
    pub snowflake_keyword_count: u32,
    pub meta_description_length: u32,
    pub canonical_url_present: bool,
    pub images_count: u32,
    pub images_with_alt_text: u32,
    /// Derived from the two image counts. Set it through [`PageObservables::with_images`];
    /// artifacts where it disagrees with the counts are rejected on read.
    pub alt_text_coverage_percentage: f64,
    pub cta_count: u32,
    pub forms_count: u32,
    pub headings_count: u32,
    pub contact_info_present: bool,
    pub local_address_present: bool,
    pub danish_phone_present: bool,
    pub schema_markup_count: u32,
    pub structured_data_count: u32,
    pub social_tags_count: u32,
    pub load_time_seconds: f64,
    pub content_size_bytes: u64,
}

impl PageObservables {
    /// Sets both image counts and recomputes the derived alt-text coverage.
    pub fn with_images(mut self, total: u32, with_alt: u32) -> Self {
        let with_alt = with_alt.min(total);
        self.images_count = total;
        self.images_with_alt_text = with_alt;
        self.alt_text_coverage_percentage = alt_text_coverage(total, with_alt);
        self
    }

    /// Whether the stored coverage matches the image counts.
    pub fn images_consistent(&self) -> bool {
        self.images_with_alt_text <= self.images_count
            && (self.alt_text_coverage_percentage
                - alt_text_coverage(self.images_count, self.images_with_alt_text))
            .abs()
                < 1e-9
    }
}

/// Percentage of images carrying alt text; 0 when there are no images.
pub fn alt_text_coverage(total: u32, with_alt: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (with_alt.min(total) as f64 / total as f64) * 100.0
}

/// Four bounded sub-scores plus their mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub local_seo_score: f64,
    pub content_quality_score: f64,
    pub technical_seo_score: f64,
    pub user_experience_score: f64,
    pub overall_score: f64,
}

impl ScoreSet {
    pub fn new(local: f64, content: f64, technical: f64, ux: f64) -> Self {
        Self {
            local_seo_score: local,
            content_quality_score: content,
            technical_seo_score: technical,
            user_experience_score: ux,
            overall_score: (local + content + technical + ux) / 4.0,
        }
    }

    /// All-zero scores recorded for pages that could not be fetched.
    pub fn degraded() -> Self {
        Self {
            local_seo_score: 0.0,
            content_quality_score: 0.0,
            technical_seo_score: 0.0,
            user_experience_score: 0.0,
            overall_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Label text stored in the warehouse `improvement_priority` column.
    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "HIGH - Local SEO optimization needed",
            Priority::Medium => "MEDIUM - General SEO improvements needed",
            Priority::Low => "LOW - Minor optimizations",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        };
        f.write_str(s)
    }
}

/// One analyzed page. Failed pages carry zero scores and an `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub page_url: String,
    pub page_title: String,
    pub search_query: String,
    #[serde(flatten)]
    pub observables: PageObservables,
    #[serde(flatten)]
    pub scores: ScoreSet,
    pub improvement_priority: Option<Priority>,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn analyzed(
        page_url: &str,
        page_title: String,
        search_query: &str,
        observables: PageObservables,
        scores: ScoreSet,
        priority: Priority,
        notes: String,
    ) -> Self {
        Self {
            page_url: page_url.to_string(),
            page_title,
            search_query: search_query.to_string(),
            observables,
            scores,
            improvement_priority: Some(priority),
            notes,
            error: None,
            analyzed_at: Utc::now(),
        }
    }

    pub fn failed(page_url: &str, search_query: &str, message: impl Into<String>) -> Self {
        Self {
            page_url: page_url.to_string(),
            page_title: String::new(),
            search_query: search_query.to_string(),
            observables: PageObservables::default(),
            scores: ScoreSet::degraded(),
            improvement_priority: None,
            notes: String::new(),
            error: Some(message.into()),
            analyzed_at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// 1-based position of the target among result anchors, or a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingPosition {
    Found(u32),
    NotFound,
    Error,
}

impl RankingPosition {
    pub fn as_rank(self) -> Option<u32> {
        match self {
            RankingPosition::Found(n) => Some(n),
            RankingPosition::NotFound | RankingPosition::Error => None,
        }
    }
}

impl fmt::Display for RankingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingPosition::Found(n) => write!(f, "{}", n),
            RankingPosition::NotFound => f.write_str("not-found"),
            RankingPosition::Error => f.write_str("error"),
        }
    }
}

impl Serialize for RankingPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RankingPosition::Found(n) => serializer.serialize_u32(*n),
            RankingPosition::NotFound => serializer.serialize_str("not-found"),
            RankingPosition::Error => serializer.serialize_str("error"),
        }
    }
}

impl<'de> Deserialize<'de> for RankingPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Rank(u32),
            Sentinel(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Rank(n) => Ok(RankingPosition::Found(n)),
            Raw::Sentinel(s) => match s.as_str() {
                "not-found" => Ok(RankingPosition::NotFound),
                "error" => Ok(RankingPosition::Error),
                other => Err(serde::de::Error::custom(format!(
                    "unknown ranking position: {}",
                    other
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRecord {
    pub search_query: String,
    pub target_url: String,
    pub position: RankingPosition,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything one run produces; handed to storage as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub generated_at: DateTime<Utc>,
    pub ranking: RankingRecord,
    pub pages: Vec<AnalysisRecord>,
}

impl AnalysisBatch {
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_failed()).count()
    }
}
