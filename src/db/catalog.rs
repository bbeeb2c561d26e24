use crate::error::AppResult;
use crate::models::BookRecord;

/// Column values written back to the catalog for one analysed book.
///
/// List-valued fields are JSON-encoded, matching the `books` table layout.
/// `None` leaves the stored column untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogUpdate {
    pub isbn13: String,
    pub genre: Option<String>,
    pub themes: Option<String>,
    pub tone: Option<String>,
    pub setting_period: Option<String>,
    pub setting_location: Option<String>,
    pub target_audience: Option<String>,
    pub sentiment: Option<String>,
    pub description: Option<String>,
    pub categories: Option<String>,
}

impl CatalogUpdate {
    pub fn from_record(record: &BookRecord) -> Self {
        Self {
            isbn13: record.isbn13.clone(),
            genre: record.genre.as_deref().map(encode_list),
            themes: record.themes.as_deref().map(encode_list),
            tone: record.tone.as_deref().map(encode_list),
            setting_period: record.setting_period.clone(),
            setting_location: record.setting_location.clone(),
            target_audience: record.target_audience.clone(),
            sentiment: record.sentiment_summary.clone(),
            description: record.description.clone(),
            categories: (!record.categories.is_empty()).then(|| encode_list(&record.categories)),
        }
    }
}

/// Filter for candidate retrieval
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateQuery {
    /// ISBNs that must not be returned
    pub exclude_isbns: Vec<String>,
    /// When non-empty, the stored genre text must contain at least one of
    /// these, compared case-insensitively as substrings
    pub genre_terms: Vec<String>,
    pub limit: usize,
}

/// Persistent book catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Writes enrichment and metadata for one book, returning the rows affected
    async fn update_enrichment(&self, update: &CatalogUpdate) -> AppResult<u64>;

    /// Returns analysed books (non-empty genre and themes) matching `query`,
    /// in a stable retrieval order
    async fn find_candidates(&self, query: &CandidateQuery) -> AppResult<Vec<BookRecord>>;
}

pub fn encode_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Decodes a JSON-encoded list column.
///
/// A bare JSON string is read as a one-element list. Anything else that does
/// not parse comes back as `None`.
pub fn decode_list(raw: Option<&str>) -> Option<Vec<String>> {
    let raw = raw?;
    match serde_json::from_str::<serde_json::Value>(raw).ok()? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        serde_json::Value::String(s) => Some(vec![s]),
        _ => None,
    }
}
