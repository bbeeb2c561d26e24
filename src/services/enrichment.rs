//! Per-book enrichment, memoized in the key-value cache.
//!
//! The model's raw JSON is cached verbatim under `llm_cache:{isbn}`. Anything
//! read back, from the cache or from the model, goes through the same
//! normalization before it is handed out.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    db::{CacheKey, CacheRetention, KeyValueCache},
    error::{AppError, AppResult},
    models::Enrichment,
    services::llm::TextGenerator,
};

const LIST_FIELDS: [&str; 3] = ["genre", "tone", "themes"];
const SCALAR_FIELDS: [&str; 4] = [
    "setting_period",
    "setting_location",
    "target_audience",
    "sentiment",
];

pub struct EnrichmentCache {
    cache: Arc<dyn KeyValueCache>,
    generator: Arc<dyn TextGenerator>,
    retention: CacheRetention,
}

impl EnrichmentCache {
    pub fn new(
        cache: Arc<dyn KeyValueCache>,
        generator: Arc<dyn TextGenerator>,
        retention: CacheRetention,
    ) -> Self {
        Self {
            cache,
            generator,
            retention,
        }
    }

    /// Returns the enrichment for a book, asking the model only on a cache miss.
    ///
    /// Errors only when `isbn` or `title` is blank. Every other failure (cache
    /// down, model unreachable, unusable output) is logged and yields `Ok(None)`.
    pub async fn fetch_or_compute(
        &self,
        isbn: &str,
        title: &str,
        primary_author: Option<&str>,
    ) -> AppResult<Option<Enrichment>> {
        if isbn.trim().is_empty() {
            return Err(AppError::Validation("isbn must not be empty".to_string()));
        }
        if title.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "title must not be empty (isbn {})",
                isbn
            )));
        }

        let key = CacheKey::LlmAnalysis(isbn.to_string());

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match parse_enrichment(&raw) {
                Ok(enrichment) => {
                    tracing::debug!(isbn = %isbn, "Cache hit");
                    return Ok(Some(enrichment));
                }
                Err(e) => {
                    tracing::warn!(isbn = %isbn, error = %e, "Unreadable cache entry, recomputing");
                }
            },
            Ok(None) => tracing::debug!(isbn = %isbn, "Cache miss"),
            Err(e) => {
                tracing::warn!(isbn = %isbn, error = %e, "Cache unavailable, recomputing");
            }
        }

        let prompt = build_prompt(title, primary_author);
        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    isbn = %isbn,
                    provider = self.generator.name(),
                    error = %e,
                    "Book analysis request failed"
                );
                return Ok(None);
            }
        };

        let enrichment = match parse_enrichment(&raw) {
            Ok(enrichment) => enrichment,
            Err(e) => {
                tracing::error!(isbn = %isbn, error = %e, response = %raw, "Unusable book analysis");
                return Ok(None);
            }
        };

        if let Err(e) = self.cache.set(&key, &raw, self.retention).await {
            tracing::warn!(isbn = %isbn, error = %e, "Failed to cache book analysis");
        }

        tracing::info!(isbn = %isbn, title = %title, "Book analysed");

        Ok(Some(enrichment))
    }
}

/// Fills the fixed analysis prompt for one book
pub fn build_prompt(title: &str, primary_author: Option<&str>) -> String {
    let author = primary_author
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or("an unknown author");

    format!(
        r#"Analyze the book "{title}" by {author}.
Respond with a single JSON object and nothing else. It must have exactly these keys:
  "genre": list of strings, the book's genres
  "setting_period": string, when the story takes place
  "setting_location": string, where the story takes place
  "tone": list of strings, adjectives describing the tone
  "target_audience": string, the intended readership
  "themes": list of strings, the main themes
  "sentiment": string, a short summary of the overall sentiment
If you do not know a value, use an empty string or an empty list."#
    )
}

/// Parses and normalizes model output into an [`Enrichment`].
///
/// All seven keys must be present. A bare scalar where a list is expected
/// becomes a one-element list; `null` becomes empty or absent.
pub fn parse_enrichment(raw: &str) -> AppResult<Enrichment> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| AppError::MalformedResponse(format!("not valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| AppError::MalformedResponse("expected a JSON object".to_string()))?;

    let missing: Vec<&str> = LIST_FIELDS
        .iter()
        .chain(SCALAR_FIELDS.iter())
        .filter(|key| !object.contains_key(**key))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(AppError::MalformedResponse(format!(
            "missing keys: {}",
            missing.join(", ")
        )));
    }

    Ok(Enrichment {
        genre: list_field(object, "genre")?,
        setting_period: scalar_field(object, "setting_period")?,
        setting_location: scalar_field(object, "setting_location")?,
        tone: list_field(object, "tone")?,
        target_audience: scalar_field(object, "target_audience")?,
        themes: list_field(object, "themes")?,
        sentiment: scalar_field(object, "sentiment")?,
    })
}

fn list_field(object: &Map<String, Value>, key: &str) -> AppResult<Vec<String>> {
    match &object[key] {
        Value::Array(items) => Ok(items.iter().filter_map(scalar_text).collect()),
        Value::Object(_) => Err(AppError::MalformedResponse(format!(
            "{} should be a list, got an object",
            key
        ))),
        other => Ok(scalar_text(other).into_iter().collect()),
    }
}

fn scalar_field(object: &Map<String, Value>, key: &str) -> AppResult<Option<String>> {
    match &object[key] {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            Ok((!parts.is_empty()).then(|| parts.join(", ")))
        }
        Value::Object(_) => Err(AppError::MalformedResponse(format!(
            "{} should be a string, got an object",
            key
        ))),
        other => Ok(scalar_text(other)),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}
