//! Additive threshold rubric: each sub-score starts at `BASE`, gains `STEP`
//! per satisfied predicate and is capped at `CEILING`.

use crate::model::{PageObservables, ScoreSet};

pub const BASE: f64 = 1.0;
pub const STEP: f64 = 0.5;
pub const CEILING: f64 = 3.0;

pub fn score(o: &PageObservables) -> ScoreSet {
    ScoreSet::new(
        local_seo_score(o),
        content_quality_score(o),
        technical_seo_score(o),
        user_experience_score(o),
    )
}

pub fn local_seo_score(o: &PageObservables) -> f64 {
    rubric(&[
        o.copenhagen_mentions > 0,
        o.denmark_mentions > 0,
        o.contact_info_present,
        o.local_address_present,
    ])
}

pub fn content_quality_score(o: &PageObservables) -> f64 {
    rubric(&[
        o.word_count > 500,
        o.headings_count >= 3,
        o.snowflake_keyword_count > 0,
        o.word_count > 1000,
    ])
}

pub fn technical_seo_score(o: &PageObservables) -> f64 {
    rubric(&[
        o.title_length > 10,
        o.meta_description_length > 50,
        o.canonical_url_present,
        o.title_length > 30 && o.title_length < 60,
    ])
}

pub fn user_experience_score(o: &PageObservables) -> f64 {
    rubric(&[
        o.alt_text_coverage_percentage > 80.0,
        o.cta_count >= 3,
        o.forms_count > 0,
        o.alt_text_coverage_percentage > 50.0,
    ])
}

fn rubric(predicates: &[bool]) -> f64 {
    let mut score = BASE;
    for _ in predicates.iter().filter(|p| **p) {
        score += STEP;
    }
    score.min(CEILING)
}
