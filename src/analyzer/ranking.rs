use std::sync::LazyLock;

use chrono::Utc;
use scraper::{Html, Selector};

use crate::model::{RankingPosition, RankingRecord};

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// 1-based index of the first linked anchor whose href contains `target`.
pub fn find_position(results: &Html, target: &str) -> RankingPosition {
    results
        .select(&LINK_SEL)
        .enumerate()
        .find(|(_, a)| a.value().attr("href").is_some_and(|h| h.contains(target)))
        .map(|(i, _)| RankingPosition::Found(u32::try_from(i + 1).unwrap_or(u32::MAX)))
        .unwrap_or(RankingPosition::NotFound)
}

pub fn check_ranking(query: &str, results: &Html, target: &str) -> RankingRecord {
    RankingRecord {
        search_query: query.to_string(),
        target_url: target.to_string(),
        position: find_position(results, target),
        checked_at: Utc::now(),
        error: None,
    }
}

pub fn ranking_failed(query: &str, target: &str, message: impl Into<String>) -> RankingRecord {
    RankingRecord {
        search_query: query.to_string(),
        target_url: target.to_string(),
        position: RankingPosition::Error,
        checked_at: Utc::now(),
        error: Some(message.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: &str = "https://www.devoteam.com/snowflake-elite-partner/";

    fn results() -> Html {
        let html = std::fs::read_to_string("tests/fixtures/search_results.html").unwrap();
        Html::parse_document(&html)
    }

    #[test]
    fn target_in_fourth_link() {
        let rec = check_ranking("snowflake consultants copenhagen", &results(), TARGET);
        assert_eq!(rec.position, RankingPosition::Found(4));
        assert_eq!(rec.search_query, "snowflake consultants copenhagen");
        assert!(rec.error.is_none());
    }

    #[test]
    fn target_missing() {
        let rec = check_ranking("q", &results(), "https://nowhere.example/");
        assert_eq!(rec.position, RankingPosition::NotFound);
    }

    #[test]
    fn anchors_without_href_are_not_counted() {
        let doc = Html::parse_document(r#"<a>x</a><a name="top">y</a><a href="https://t.dk/">t</a>"#);
        assert_eq!(find_position(&doc, "t.dk"), RankingPosition::Found(1));
    }

    #[test]
    fn empty_page_is_not_found() {
        assert_eq!(find_position(&Html::parse_document(""), TARGET), RankingPosition::NotFound);
    }

    #[test]
    fn failure_keeps_message() {
        let rec = ranking_failed("q", TARGET, "connection reset");
        assert_eq!(rec.position, RankingPosition::Error);
        assert_eq!(rec.error.as_deref(), Some("connection reset"));
    }
}
