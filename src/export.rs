use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::model::AnalysisBatch;

/// Write the batch as pretty JSON, creating parent directories as needed.
pub fn write_batch(path: &Path, batch: &AnalysisBatch) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(batch)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Read a batch artifact. Pages whose alt-text coverage disagrees with their
/// image counts are rejected so hand-edited files cannot reach storage.
pub fn read_batch(path: &Path) -> Result<AnalysisBatch> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let batch: AnalysisBatch = serde_json::from_str(&json)
        .with_context(|| format!("Invalid batch file {}", path.display()))?;
    if let Some(page) = batch.pages.iter().find(|p| !p.observables.images_consistent()) {
        bail!(
            "Invalid batch file {}: alt-text coverage {} does not match {} of {} images for {}",
            path.display(),
            page.observables.alt_text_coverage_percentage,
            page.observables.images_with_alt_text,
            page.observables.images_count,
            page.page_url
        );
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{analyze_html, extract::FetchMeta, ranking};
    use crate::model::AnalysisRecord;
    use chrono::Utc;

    #[test]
    fn batch_survives_disk_round_trip() {
        let html = std::fs::read_to_string("tests/fixtures/partner_page.html").unwrap();
        let meta = FetchMeta {
            load_time_seconds: 0.731,
            content_size_bytes: html.len() as u64,
        };
        let batch = AnalysisBatch {
            generated_at: Utc::now(),
            ranking: ranking::ranking_failed("q", "https://t.dk/", "HTTP status 429"),
            pages: vec![
                analyze_html("https://example.dk/partner/", "q", &html, meta),
                AnalysisRecord::failed("https://example.dk/down", "q", "timed out"),
            ],
        };

        let dir = std::env::temp_dir().join(format!("seo_daily_export_{}", std::process::id()));
        let path = dir.join("nested").join("batch.json");
        write_batch(&path, &batch).unwrap();
        let back = read_batch(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(back, batch);
        assert_eq!(back.failed_pages(), 1);
    }

    #[test]
    fn edited_coverage_is_rejected() {
        let html = std::fs::read_to_string("tests/fixtures/partner_page.html").unwrap();
        let meta = FetchMeta {
            load_time_seconds: 0.2,
            content_size_bytes: html.len() as u64,
        };
        let mut batch = AnalysisBatch {
            generated_at: Utc::now(),
            ranking: ranking::ranking_failed("q", "https://t.dk/", "HTTP status 429"),
            pages: vec![analyze_html("https://example.dk/partner/", "q", &html, meta)],
        };
        let obs = &mut batch.pages[0].observables;
        obs.alt_text_coverage_percentage = if obs.alt_text_coverage_percentage > 50.0 {
            10.0
        } else {
            95.0
        };

        let dir = std::env::temp_dir().join(format!("seo_daily_edited_{}", std::process::id()));
        let path = dir.join("batch.json");
        write_batch(&path, &batch).unwrap();
        let err = read_batch(&path).unwrap_err().to_string();
        std::fs::remove_dir_all(&dir).ok();

        assert!(err.contains("https://example.dk/partner/"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_batch(Path::new("does/not/exist.json")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
