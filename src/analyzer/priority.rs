use crate::model::{PageObservables, Priority, ScoreSet};

pub const ALL_CLEAR: &str = "All areas look good";

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub priority: Priority,
    pub notes: String,
}

pub fn classify(observables: &PageObservables, scores: &ScoreSet) -> Classification {
    Classification {
        priority: priority(scores),
        notes: notes(observables),
    }
}

/// Weak local relevance always wins over a merely mediocre overall score.
pub fn priority(scores: &ScoreSet) -> Priority {
    if scores.local_seo_score < 2.0 {
        Priority::High
    } else if scores.overall_score < 2.5 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn notes(o: &PageObservables) -> String {
    let mut notes = Vec::new();
    if o.copenhagen_mentions == 0 {
        notes.push("No Copenhagen mentions found".to_string());
    }
    if !o.contact_info_present {
        notes.push("Missing local contact information".to_string());
    }
    if o.alt_text_coverage_percentage < 80.0 {
        notes.push(format!(
            "Low alt text coverage ({:.1}%)",
            o.alt_text_coverage_percentage
        ));
    }

    if notes.is_empty() {
        ALL_CLEAR.to_string()
    } else {
        notes.join("; ")
    }
}
