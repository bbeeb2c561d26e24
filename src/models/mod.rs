use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod profile;

pub use profile::{Dimension, DimensionWeights, RatingStats, UserProfile, WeightedCounter};

/// Book metadata as supplied by the upstream lookup, before analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookMetadata {
    /// Canonical ISBN-13. Books without one are skipped during analysis.
    #[serde(default)]
    pub isbn13: Option<String>,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<i64>,
}

/// The seven attributes the language model derives for a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Enrichment {
    pub genre: Vec<String>,
    pub setting_period: Option<String>,
    pub setting_location: Option<String>,
    pub tone: Vec<String>,
    pub target_audience: Option<String>,
    pub themes: Vec<String>,
    pub sentiment: Option<String>,
}

/// A catalog book, with enrichment fields left as `None` until analysed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookRecord {
    /// Blank for entries that cannot be identified; those are left out of profiles
    #[serde(default)]
    pub isbn13: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub genre: Option<Vec<String>>,
    #[serde(default)]
    pub tone: Option<Vec<String>>,
    #[serde(default)]
    pub themes: Option<Vec<String>>,
    #[serde(default)]
    pub setting_period: Option<String>,
    #[serde(default)]
    pub setting_location: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub sentiment_summary: Option<String>,
}

impl BookRecord {
    /// Builds an unanalysed record from upstream metadata
    pub fn from_metadata(isbn13: String, metadata: BookMetadata) -> Self {
        Self {
            isbn13,
            title: metadata.title,
            authors: metadata.authors,
            average_rating: metadata.average_rating,
            ratings_count: metadata.ratings_count,
            description: metadata.description,
            categories: metadata.categories,
            ..Default::default()
        }
    }

    /// Replaces all seven enrichment fields at once.
    ///
    /// `None` clears every field back to absent rather than to empty values,
    /// so "never analysed" stays distinguishable from "analysed, nothing found".
    pub fn apply_enrichment(&mut self, enrichment: Option<Enrichment>) {
        match enrichment {
            Some(e) => {
                self.genre = Some(e.genre);
                self.tone = Some(e.tone);
                self.themes = Some(e.themes);
                self.setting_period = e.setting_period;
                self.setting_location = e.setting_location;
                self.target_audience = e.target_audience;
                self.sentiment_summary = e.sentiment;
            }
            None => {
                self.genre = None;
                self.tone = None;
                self.themes = None;
                self.setting_period = None;
                self.setting_location = None;
                self.target_audience = None;
                self.sentiment_summary = None;
            }
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.genre.is_some() || self.tone.is_some() || self.themes.is_some()
    }

    pub fn primary_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }
}

/// Analysed books keyed by ISBN, iterated in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedBooks {
    books: Vec<BookRecord>,
    index: HashMap<String, usize>,
}

impl EnrichedBooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing in place any earlier record with the same ISBN
    pub fn insert(&mut self, record: BookRecord) {
        match self.index.get(&record.isbn13) {
            Some(&pos) => self.books[pos] = record,
            None => {
                self.index.insert(record.isbn13.clone(), self.books.len());
                self.books.push(record);
            }
        }
    }

    pub fn get(&self, isbn13: &str) -> Option<&BookRecord> {
        self.index.get(isbn13).map(|&pos| &self.books[pos])
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookRecord> {
        self.books.iter()
    }

    pub fn as_slice(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn into_vec(self) -> Vec<BookRecord> {
        self.books
    }
}

impl FromIterator<BookRecord> for EnrichedBooks {
    fn from_iter<I: IntoIterator<Item = BookRecord>>(iter: I) -> Self {
        let mut books = EnrichedBooks::new();
        for record in iter {
            books.insert(record);
        }
        books
    }
}

/// One ranked recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateScore {
    pub isbn13: String,
    pub title: String,
    pub authors: Vec<String>,
    pub score: u32,
}
