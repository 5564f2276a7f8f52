//! Citation metadata source
//!
//! Publications are fetched from the Elsevier Scopus search API by author id.
//! The response is loosely typed: numbers arrive as strings or numbers and
//! an empty result set is reported as a single entry carrying an `error`.

use crate::config::ScopusConfig;
use crate::db::models::Publication;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;

/// Trait for publication lookups
#[async_trait]
pub trait CitationSource: Send + Sync {
    /// Publications of one author
    async fn publications(&self, author_id: &str) -> Result<Vec<Publication>>;
}

/// Scopus search API client
pub struct ScopusClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl ScopusClient {
    pub fn new(config: &ScopusConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl CitationSource for ScopusClient {
    async fn publications(&self, author_id: &str) -> Result<Vec<Publication>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| AppError::Citation {
            message: "missing Scopus API key".to_string(),
        })?;

        let response = self
            .client
            .get(&self.base_url)
            .header("Accept", "application/json")
            .query(&[
                ("query", format!("AU-ID({})", author_id)),
                ("apiKey", api_key.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Citation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::Citation {
                message: format!("scopus status {}", response.status()),
            });
        }

        let body = response.text().await.map_err(|e| AppError::Citation {
            message: format!("Failed to read response: {}", e),
        })?;

        parse_search_results(&body)
    }
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "search-results")]
    search_results: Option<SearchResults>,
}

#[derive(Deserialize)]
struct SearchResults {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(rename = "dc:title", default, deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(rename = "prism:publicationName", default, deserialize_with = "lenient_string")]
    journal: Option<String>,
    #[serde(rename = "prism:coverDate", default, deserialize_with = "lenient_string")]
    cover_date: Option<String>,
    #[serde(rename = "prism:volume", default, deserialize_with = "lenient_string")]
    volume: Option<String>,
    #[serde(rename = "prism:issueIdentifier", default, deserialize_with = "lenient_string")]
    issue: Option<String>,
    #[serde(rename = "prism:pageRange", default, deserialize_with = "lenient_string")]
    pages: Option<String>,
    #[serde(rename = "prism:doi", default, deserialize_with = "lenient_string")]
    doi: Option<String>,
    #[serde(rename = "citedby-count", default, deserialize_with = "lenient_string")]
    cited: Option<String>,
}

/// Accept a string, a number or null; blank strings become `None`
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Year from the first four characters of a `YYYY-MM-DD` cover date
pub fn cover_year(cover_date: &str) -> Option<i32> {
    cover_date.get(..4).and_then(|y| y.parse().ok())
}

/// Citation count from its string or numeric form; unparseable counts are 0
pub fn citation_count(raw: Option<&str>) -> i32 {
    raw.and_then(|s| {
        let s = s.trim();
        s.parse::<i32>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().map(|f| f as i32))
    })
    .unwrap_or(0)
}

/// Decode a search response body. Entries without a title are skipped.
pub fn parse_search_results(body: &str) -> Result<Vec<Publication>> {
    let envelope: SearchEnvelope = serde_json::from_str(body).map_err(|e| AppError::Citation {
        message: format!("Failed to parse response: {}", e),
    })?;

    let entries = envelope
        .search_results
        .map(|r| r.entry)
        .unwrap_or_default();

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title?;
            Some(Publication {
                title,
                journal: entry.journal,
                year: entry.cover_date.as_deref().and_then(cover_year),
                volume: entry.volume,
                issue: entry.issue,
                pages: entry.pages,
                doi: entry.doi,
                cited: citation_count(entry.cited.as_deref()),
            })
        })
        .collect())
}

/// Keep the `limit` most recent publications, newest first
pub fn most_recent(mut publications: Vec<Publication>, limit: usize) -> Vec<Publication> {
    publications.sort_by(|a, b| b.year.cmp(&a.year));
    publications.truncate(limit);
    publications
}

/// Fixed publication lists keyed by author id; unknown authors fail
#[derive(Default)]
pub struct StaticCitationSource {
    by_author: HashMap<String, Vec<Publication>>,
}

impl StaticCitationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author_id: &str, publications: Vec<Publication>) -> Self {
        self.by_author.insert(author_id.to_string(), publications);
        self
    }
}

#[async_trait]
impl CitationSource for StaticCitationSource {
    async fn publications(&self, author_id: &str) -> Result<Vec<Publication>> {
        self.by_author
            .get(author_id)
            .cloned()
            .ok_or_else(|| AppError::Citation {
                message: format!("unknown author {}", author_id),
            })
    }
}
