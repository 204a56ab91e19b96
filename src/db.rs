use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::model::{AnalysisBatch, AnalysisRecord, RankingRecord};

const RANKING_PRIORITY: &str = "Daily ranking check";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS seo_analysis (
            id                           INTEGER PRIMARY KEY,
            analysis_date                TEXT NOT NULL,
            recorded_at                  TEXT NOT NULL,
            record_kind                  TEXT NOT NULL CHECK(record_kind IN ('ranking','page')),
            page_url                     TEXT NOT NULL,
            page_title                   TEXT,
            google_ranking_position      INTEGER,
            search_query                 TEXT NOT NULL,
            local_seo_score              REAL NOT NULL DEFAULT 0,
            content_quality_score        REAL NOT NULL DEFAULT 0,
            technical_seo_score          REAL NOT NULL DEFAULT 0,
            user_experience_score        REAL NOT NULL DEFAULT 0,
            overall_score                REAL NOT NULL DEFAULT 0,
            copenhagen_mentions          INTEGER NOT NULL DEFAULT 0,
            denmark_mentions             INTEGER NOT NULL DEFAULT 0,
            danish_mentions              INTEGER NOT NULL DEFAULT 0,
            snowflake_keyword_count      INTEGER NOT NULL DEFAULT 0,
            contact_info_present         BOOLEAN NOT NULL DEFAULT 0,
            local_address_present        BOOLEAN NOT NULL DEFAULT 0,
            danish_phone_present         BOOLEAN NOT NULL DEFAULT 0,
            alt_text_coverage_percentage REAL NOT NULL DEFAULT 0,
            cta_count                    INTEGER NOT NULL DEFAULT 0,
            forms_count                  INTEGER NOT NULL DEFAULT 0,
            headings_count               INTEGER NOT NULL DEFAULT 0,
            images_count                 INTEGER NOT NULL DEFAULT 0,
            meta_description_length      INTEGER NOT NULL DEFAULT 0,
            title_length                 INTEGER NOT NULL DEFAULT 0,
            canonical_url_present        BOOLEAN NOT NULL DEFAULT 0,
            schema_markup_count          INTEGER NOT NULL DEFAULT 0,
            structured_data_count        INTEGER NOT NULL DEFAULT 0,
            social_tags_count            INTEGER NOT NULL DEFAULT 0,
            load_time_seconds            REAL NOT NULL DEFAULT 0,
            content_size_bytes           INTEGER NOT NULL DEFAULT 0,
            improvement_priority         TEXT,
            notes                        TEXT,
            error                        TEXT,
            created_at                   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_seo_analysis_date ON seo_analysis(analysis_date);
        CREATE INDEX IF NOT EXISTS idx_seo_page_url ON seo_analysis(page_url);
        ",
    )?;
    Ok(())
}

/// Insert the whole batch in one transaction; nothing is written on failure.
pub fn save_batch(conn: &Connection, batch: &AnalysisBatch) -> Result<usize> {
    let analysis_date = timestamp(&batch.generated_at);
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut ranking_stmt = tx.prepare(
            "INSERT INTO seo_analysis (
                analysis_date, recorded_at, record_kind, page_url, page_title,
                google_ranking_position, search_query, improvement_priority, notes, error
             ) VALUES (?1, ?2, 'ranking', ?3, NULL, ?4, ?5, ?6, ?7, ?8)",
        )?;
        count += insert_ranking(&mut ranking_stmt, &analysis_date, &batch.ranking)?;

        let mut page_stmt = tx.prepare(
            "INSERT INTO seo_analysis (
                analysis_date, recorded_at, record_kind, page_url, page_title, search_query,
                local_seo_score, content_quality_score, technical_seo_score,
                user_experience_score, overall_score,
                copenhagen_mentions, denmark_mentions, danish_mentions, snowflake_keyword_count,
                contact_info_present, local_address_present, danish_phone_present,
                alt_text_coverage_percentage, cta_count, forms_count, headings_count, images_count,
                meta_description_length, title_length, canonical_url_present,
                schema_markup_count, structured_data_count, social_tags_count,
                load_time_seconds, content_size_bytes, improvement_priority, notes, error
             ) VALUES (
                ?1, ?2, 'page', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31,
                ?32, ?33
             )",
        )?;
        for page in &batch.pages {
            count += insert_page(&mut page_stmt, &analysis_date, page)?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// Fixed-width UTC timestamps so generations sort as text.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn insert_ranking(
    stmt: &mut rusqlite::Statement,
    analysis_date: &str,
    r: &RankingRecord,
) -> Result<usize> {
    Ok(stmt.execute(rusqlite::params![
        analysis_date,
        timestamp(&r.checked_at),
        r.target_url,
        r.position.as_rank(),
        r.search_query,
        RANKING_PRIORITY,
        format!("Google ranking check for {}", r.search_query),
        r.error,
    ])?)
}

fn insert_page(
    stmt: &mut rusqlite::Statement,
    analysis_date: &str,
    p: &AnalysisRecord,
) -> Result<usize> {
    let o = &p.observables;
    let s = &p.scores;
    Ok(stmt.execute(rusqlite::params![
        analysis_date,
        timestamp(&p.analyzed_at),
        p.page_url,
        p.page_title,
        p.search_query,
        s.local_seo_score,
        s.content_quality_score,
        s.technical_seo_score,
        s.user_experience_score,
        s.overall_score,
        o.copenhagen_mentions,
        o.denmark_mentions,
        o.danish_mentions,
        o.snowflake_keyword_count,
        o.contact_info_present,
        o.local_address_present,
        o.danish_phone_present,
        o.alt_text_coverage_percentage,
        o.cta_count,
        o.forms_count,
        o.headings_count,
        o.images_count,
        o.meta_description_length,
        o.title_length,
        o.canonical_url_present,
        o.schema_markup_count,
        o.structured_data_count,
        o.social_tags_count,
        o.load_time_seconds,
        o.content_size_bytes as i64,
        p.improvement_priority.map(|pr| pr.label()),
        p.notes,
        p.error,
    ])?)
}

// ── Reporting ──

pub struct LatestRow {
    pub record_kind: String,
    pub page_url: String,
    pub page_title: Option<String>,
    pub ranking_position: Option<i64>,
    pub overall_score: f64,
    pub local_seo_score: f64,
    pub content_quality_score: f64,
    pub technical_seo_score: f64,
    pub user_experience_score: f64,
    pub improvement_priority: Option<String>,
    pub error: Option<String>,
}

/// Rows of the most recent run generation, ranking row first.
pub fn fetch_latest(conn: &Connection, limit: usize) -> Result<Vec<LatestRow>> {
    let mut stmt = conn.prepare(
        "SELECT record_kind, page_url, page_title, google_ranking_position,
                overall_score, local_seo_score, content_quality_score,
                technical_seo_score, user_experience_score, improvement_priority, error
         FROM seo_analysis
         WHERE analysis_date = (SELECT MAX(analysis_date) FROM seo_analysis)
         ORDER BY id
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(LatestRow {
                record_kind: row.get(0)?,
                page_url: row.get(1)?,
                page_title: row.get(2)?,
                ranking_position: row.get(3)?,
                overall_score: row.get(4)?,
                local_seo_score: row.get(5)?,
                content_quality_score: row.get(6)?,
                technical_seo_score: row.get(7)?,
                user_experience_score: row.get(8)?,
                improvement_priority: row.get(9)?,
                error: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct Stats {
    pub total: i64,
    pub generations: i64,
    pub pages: i64,
    pub failed_pages: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let stats = conn.query_row(
        "SELECT COUNT(*),
                COUNT(DISTINCT analysis_date),
                COALESCE(SUM(record_kind = 'page'), 0),
                COALESCE(SUM(record_kind = 'page' AND error IS NOT NULL), 0)
         FROM seo_analysis",
        [],
        |row| {
            Ok(Stats {
                total: row.get(0)?,
                generations: row.get(1)?,
                pages: row.get(2)?,
                failed_pages: row.get(3)?,
            })
        },
    )?;
    Ok(stats)
}
