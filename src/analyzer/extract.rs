use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::model::PageObservables;

/// Product keyword counted as a substring of whitespace-delimited tokens.
pub const DOMAIN_KEYWORD: &str = "snowflake";

pub const COPENHAGEN_PATTERN: &str = r"copenhagen|københavn";
pub const DENMARK_PATTERN: &str = r"denmark|danmark";
pub const DANISH_PATTERN: &str = r"danish|dansk";

/// Link texts that count as a call to action.
pub const CTA_PHRASES: &[&str] = &[
    "contact",
    "get started",
    "request",
    "consultation",
    "free",
    "quote",
];

/// Danish phone-number groupings: "12 34 56 78", "1234 5678", "+45 12 34 56 78".
pub const PHONE_PATTERNS: &[&str] = &[
    r"\b\d{2}\s\d{2}\s\d{2}\s\d{2}\b",
    r"\b\d{4}\s\d{4}\b",
    r"\+45\s\d{2}\s\d{2}\s\d{2}\s\d{2}",
];

// Alternation binds loosely: a bare "copenhagen" also matches. Historical runs
// were scored with exactly this pattern.
pub const LOCAL_ADDRESS_PATTERN: &str = r"copenhagen|københavn.*\d{4}";
pub const DANISH_PHONE_PATTERN: &str = r"\+45";

static COPENHAGEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(COPENHAGEN_PATTERN).unwrap());
static DENMARK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DENMARK_PATTERN).unwrap());
static DANISH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DANISH_PATTERN).unwrap());
static PHONE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PHONE_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(LOCAL_ADDRESS_PATTERN).unwrap());
static DANISH_PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(DANISH_PHONE_PATTERN).unwrap());

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static META_DESC_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static CANONICAL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel~="canonical"]"#).unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static FORM_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static ITEMTYPE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("[itemtype]").unwrap());
static LD_JSON_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static META_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").unwrap());

/// Transport measurements taken while fetching the page.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchMeta {
    pub load_time_seconds: f64,
    pub content_size_bytes: u64,
}

/// Extractor output: page identity plus its observables.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub url: String,
    pub title: Option<String>,
    pub observables: PageObservables,
}

pub fn extract(url: &str, document: &Html, meta: FetchMeta) -> ExtractedPage {
    let text = page_text(document);
    let title = page_title(document);
    let (images_total, images_with_alt) = image_counts(document);

    let observables = PageObservables {
        title_length: title.as_deref().map(char_len).unwrap_or(0),
        word_count: clamp_count(text.split_whitespace().count()),
        copenhagen_mentions: count_mentions(&COPENHAGEN_RE, &text),
        denmark_mentions: count_mentions(&DENMARK_RE, &text),
        danish_mentions: count_mentions(&DANISH_RE, &text),
        snowflake_keyword_count: keyword_tokens(&text, DOMAIN_KEYWORD),
        meta_description_length: meta_description_length(document),
        canonical_url_present: canonical_present(document),
        cta_count: cta_links(document),
        forms_count: count_matching(document, &FORM_SEL),
        headings_count: count_matching(document, &HEADING_SEL),
        contact_info_present: contact_info_present(&text),
        local_address_present: local_address_present(&text),
        danish_phone_present: DANISH_PHONE_RE.is_match(&text),
        schema_markup_count: count_matching(document, &ITEMTYPE_SEL),
        structured_data_count: count_matching(document, &LD_JSON_SEL),
        social_tags_count: social_tags(document),
        load_time_seconds: finite_or_zero(meta.load_time_seconds),
        content_size_bytes: meta.content_size_bytes,
        ..Default::default()
    }
    .with_images(images_total, images_with_alt);

    ExtractedPage {
        url: url.to_string(),
        title,
        observables,
    }
}

/// All text nodes of the document, lower-cased once.
pub fn page_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .collect::<String>()
        .to_lowercase()
}

pub fn page_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SEL)
        .next()
        .map(|el| el.text().collect::<String>())
}

pub fn meta_description_length(document: &Html) -> u32 {
    document
        .select(&META_DESC_SEL)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(char_len)
        .unwrap_or(0)
}

pub fn canonical_present(document: &Html) -> bool {
    document.select(&CANONICAL_SEL).next().is_some()
}

/// (total images, images with a non-empty alt attribute)
pub fn image_counts(document: &Html) -> (u32, u32) {
    let mut total = 0usize;
    let mut with_alt = 0usize;
    for img in document.select(&IMG_SEL) {
        total += 1;
        if img.value().attr("alt").is_some_and(|alt| !alt.is_empty()) {
            with_alt += 1;
        }
    }
    (clamp_count(total), clamp_count(with_alt))
}

/// Anchors whose text contains any CTA phrase; each link counts at most once.
pub fn cta_links(document: &Html) -> u32 {
    let count = document
        .select(&ANCHOR_SEL)
        .filter(|a| {
            let text = a.text().collect::<String>().to_lowercase();
            CTA_PHRASES.iter().any(|phrase| text.contains(phrase))
        })
        .count();
    clamp_count(count)
}

/// Open Graph `property="og:*"` plus Twitter `name="twitter:*"` meta tags.
pub fn social_tags(document: &Html) -> u32 {
    let mut count = 0usize;
    for el in document.select(&META_SEL) {
        let attrs = el.value();
        if attrs
            .attr("property")
            .is_some_and(|p| p.to_lowercase().starts_with("og:"))
        {
            count += 1;
        }
        if attrs
            .attr("name")
            .is_some_and(|n| n.to_lowercase().starts_with("twitter:"))
        {
            count += 1;
        }
    }
    clamp_count(count)
}

pub fn count_mentions(re: &Regex, text: &str) -> u32 {
    clamp_count(re.find_iter(text).count())
}

pub fn keyword_tokens(text: &str, keyword: &str) -> u32 {
    let keyword = keyword.to_lowercase();
    let count = text
        .split_whitespace()
        .filter(|word| word.to_lowercase().contains(&keyword))
        .count();
    clamp_count(count)
}

pub fn contact_info_present(text: &str) -> bool {
    PHONE_RES.iter().any(|re| re.is_match(text))
}

pub fn local_address_present(text: &str) -> bool {
    ADDRESS_RE.is_match(text)
}

fn count_matching(document: &Html, selector: &Selector) -> u32 {
    clamp_count(document.select(selector).count())
}

fn char_len(s: &str) -> u32 {
    clamp_count(s.chars().count())
}

fn clamp_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    fn fixture(name: &str) -> Html {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        Html::parse_document(&html)
    }

    #[test]
    fn mentions_are_counted_not_just_detected() {
        let text = "copenhagen, københavn and copenhagen again. denmark / danmark. dansk danish";
        assert_eq!(count_mentions(&COPENHAGEN_RE, text), 3);
        assert_eq!(count_mentions(&DENMARK_RE, text), 2);
        assert_eq!(count_mentions(&DANISH_RE, text), 2);
    }

    #[test]
    fn keyword_matches_compound_tokens() {
        let text = "snowflake snowflake-partner datasnowflake snow flake";
        assert_eq!(keyword_tokens(text, DOMAIN_KEYWORD), 3);
        assert_eq!(keyword_tokens("SNOWFLAKE", DOMAIN_KEYWORD), 1);
        assert_eq!(keyword_tokens("", DOMAIN_KEYWORD), 0);
    }

    #[test]
    fn phone_patterns() {
        assert!(contact_info_present("ring 70 20 30 40"));
        assert!(contact_info_present("tlf 7020 3040"));
        assert!(contact_info_present("+45 70 20 30 40"));
        assert!(!contact_info_present("call 702030 40"));
        assert!(!contact_info_present("no digits here"));
    }

    #[test]
    fn local_address_heuristic_is_loose() {
        assert!(local_address_present("københavn k 1050"));
        // Any Copenhagen mention qualifies, with or without a postal code.
        assert!(local_address_present("offices in copenhagen"));
        assert!(!local_address_present("københavn only"));
        assert!(!local_address_present("aarhus 8000"));
    }

    #[test]
    fn title_and_meta_keep_original_case_lengths() {
        let d = doc(
            r#"<html><head><title>Data Platform | Nordic</title>
            <meta name="description" content="Short description">
            <link rel="canonical" href="https://example.dk/"></head><body></body></html>"#,
        );
        assert_eq!(page_title(&d).as_deref(), Some("Data Platform | Nordic"));
        assert_eq!(meta_description_length(&d), 17);
        assert!(canonical_present(&d));
    }

    #[test]
    fn missing_head_elements_fall_back() {
        let d = doc("<html><body><p>nothing</p></body></html>");
        assert_eq!(page_title(&d), None);
        assert_eq!(meta_description_length(&d), 0);
        assert!(!canonical_present(&d));
        assert_eq!(image_counts(&d), (0, 0));
        assert_eq!(social_tags(&d), 0);
    }

    #[test]
    fn meta_without_content_counts_zero() {
        let d = doc(r#"<html><head><meta name="description"></head></html>"#);
        assert_eq!(meta_description_length(&d), 0);
    }

    #[test]
    fn images_with_empty_alt_are_not_covered() {
        let d = doc(r#"<body><img src="a" alt="logo"><img src="b" alt=""><img src="c"></body>"#);
        assert_eq!(image_counts(&d), (3, 1));
    }

    #[test]
    fn cta_link_counts_once_even_with_two_phrases() {
        let d = doc(
            r#"<body>
            <a href="/c">Contact us for a free quote</a>
            <a href="/s">GET STARTED</a>
            <a href="/about">About</a>
            <a>Request a demo</a>
            </body>"#,
        );
        assert_eq!(cta_links(&d), 3);
    }

    #[test]
    fn social_tags_count_og_and_twitter() {
        let d = doc(
            r#"<head>
            <meta property="og:title" content="x">
            <meta property="OG:image" content="x">
            <meta name="twitter:card" content="x">
            <meta name="description" content="x">
            <meta property="article:author" content="x">
            </head>"#,
        );
        assert_eq!(social_tags(&d), 3);
    }

    #[test]
    fn partner_page_fixture() {
        let d = fixture("partner_page");
        let meta = FetchMeta {
            load_time_seconds: 0.42,
            content_size_bytes: 2048,
        };
        let page = extract("https://example.dk/partner/", &d, meta);
        let o = &page.observables;

        assert_eq!(page.title.as_deref(), Some("Snowflake Partner in Copenhagen | Nordic Data"));
        assert_eq!(o.title_length, 45);
        assert_eq!(o.copenhagen_mentions, 3);
        assert_eq!(o.denmark_mentions, 1);
        assert_eq!(o.danish_mentions, 1);
        assert_eq!(o.snowflake_keyword_count, 4);
        assert!(o.meta_description_length > 50);
        assert!(o.canonical_url_present);
        assert_eq!(o.images_count, 4);
        assert_eq!(o.images_with_alt_text, 3);
        assert_eq!(o.alt_text_coverage_percentage, 75.0);
        assert_eq!(o.cta_count, 3);
        assert_eq!(o.forms_count, 1);
        assert_eq!(o.headings_count, 4);
        assert!(o.contact_info_present);
        assert!(o.local_address_present);
        assert!(o.danish_phone_present);
        assert_eq!(o.schema_markup_count, 2);
        assert_eq!(o.structured_data_count, 1);
        assert_eq!(o.social_tags_count, 3);
        assert_eq!(o.load_time_seconds, 0.42);
        assert_eq!(o.content_size_bytes, 2048);
    }

    #[test]
    fn empty_document_yields_defaults() {
        let page = extract("https://example.dk/", &doc(""), FetchMeta::default());
        let o = &page.observables;
        assert_eq!(page.title, None);
        assert_eq!(o.word_count, 0);
        assert_eq!(o.alt_text_coverage_percentage, 0.0);
        assert!(!o.contact_info_present);
    }

    #[test]
    fn bogus_load_time_is_zeroed() {
        let meta = FetchMeta {
            load_time_seconds: f64::NAN,
            content_size_bytes: 0,
        };
        let page = extract("u", &doc("<p>x</p>"), meta);
        assert_eq!(page.observables.load_time_seconds, 0.0);
    }
}
