use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use tracing::info;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Body of a successful fetch plus transport measurements.
#[derive(Debug)]
pub struct FetchedPage {
    pub body: String,
    pub load_time_seconds: f64,
    pub content_size_bytes: u64,
}

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// GET `url`; non-2xx responses and timeouts are errors.
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage> {
    let start = Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()?;
    let charset = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_label)
        .map(str::to_string);
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read body of {}", url))?;
    let load_time_seconds = start.elapsed().as_secs_f64();

    info!("Fetched {} bytes from {} in {:.2}s", bytes.len(), url, load_time_seconds);
    Ok(FetchedPage {
        body: decode_body(&bytes, charset.as_deref()),
        load_time_seconds,
        content_size_bytes: bytes.len() as u64,
    })
}

/// `charset` parameter of a Content-Type value, unquoted.
pub fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Decode with the declared charset; unknown or missing labels fall back to UTF-8.
/// A byte-order mark wins over the label.
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Search URL with the query form-encoded into `q`.
pub fn search_url(endpoint: &str, query: &str) -> Result<Url> {
    Url::parse_with_params(endpoint, &[("q", query.trim())])
        .with_context(|| format!("invalid search endpoint {}", endpoint))
}


#[cfg(test)]
mod tests {
    use super::*;

    fn query_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn search_url_joins_words_with_plus() {
        let url = search_url(SEARCH_ENDPOINT, "snowflake consultants copenhagen").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.google.com/search?q=snowflake+consultants+copenhagen"
        );
    }

    #[test]
    fn search_url_escapes_reserved_characters() {
        let url = search_url(SEARCH_ENDPOINT, "R&D consultants copenhagen").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.google.com/search?q=R%26D+consultants+copenhagen"
        );
        assert_eq!(query_of(&url), "R&D consultants copenhagen");

        let url = search_url(SEARCH_ENDPOINT, "c# developers").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(query_of(&url), "c# developers");

        let url = search_url(SEARCH_ENDPOINT, "c++ københavn").unwrap();
        assert!(url.as_str().contains("c%2B%2B"));
        assert_eq!(query_of(&url), "c++ københavn");
    }

    #[test]
    fn bad_endpoint_is_an_error() {
        assert!(search_url("not a url", "q").is_err());
    }

    #[test]
    fn charset_from_content_type() {
        assert_eq!(charset_label("text/html; charset=ISO-8859-1"), Some("ISO-8859-1"));
        assert_eq!(charset_label("text/html;charset=\"utf-8\""), Some("utf-8"));
        assert_eq!(charset_label("text/html"), None);
    }

    #[test]
    fn latin1_body_decodes() {
        let body = b"1620 K\xF8benhavn V";
        assert_eq!(decode_body(body, Some("iso-8859-1")), "1620 København V");
        assert_eq!(decode_body("København".as_bytes(), None), "København");
        assert_eq!(decode_body("København".as_bytes(), Some("bogus")), "København");
    }

    #[test]
    fn client_builds_with_timeout() {
        assert!(build_client(Duration::from_secs(10)).is_ok());
    }

    #[tokio::test]
    async fn fetch_uses_response_charset_and_raw_size() {
        let body = b"<html><body>1620 K\xF8benhavn V</body></html>".to_vec();
        let len = body.len() as u64;
        let url = testing::serve("200 OK", "text/html; charset=iso-8859-1", body).await;
        let client = build_client(Duration::from_secs(5)).unwrap();

        let page = fetch_page(&client, &url).await.unwrap();
        assert!(page.body.contains("København"));
        assert_eq!(page.content_size_bytes, len);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let url = testing::serve("503 Service Unavailable", "text/html", b"busy".to_vec()).await;
        let client = build_client(Duration::from_secs(5)).unwrap();
        let err = fetch_page(&client, &url).await.unwrap_err();
        assert!(format!("{:#}", err).contains("503"));
    }
}
