use std::collections::{HashMap, HashSet};
use std::fmt::Display;

/// The categorical dimensions a reader profile aggregates over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Genre,
    Tone,
    Theme,
    SettingPeriod,
    SettingLocation,
    TargetAudience,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Genre,
        Dimension::Tone,
        Dimension::Theme,
        Dimension::SettingPeriod,
        Dimension::SettingLocation,
        Dimension::TargetAudience,
    ];

    /// How many leading values of this dimension the profile keeps
    pub fn top_k(self) -> usize {
        match self {
            Dimension::Genre | Dimension::Tone => 3,
            Dimension::Theme => 10,
            Dimension::SettingPeriod | Dimension::SettingLocation | Dimension::TargetAudience => 2,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dimension::Genre => "genre",
            Dimension::Tone => "tone",
            Dimension::Theme => "theme",
            Dimension::SettingPeriod => "setting_period",
            Dimension::SettingLocation => "setting_location",
            Dimension::TargetAudience => "target_audience",
        };
        write!(f, "{}", name)
    }
}

/// Value -> accumulated weight, remembering the order values were first seen.
///
/// First-seen order is what breaks ties in [`WeightedCounter::top`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedCounter {
    entries: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl WeightedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: &str, weight: f64) {
        match self.index.get(value) {
            Some(&pos) => self.entries[pos].1 += weight,
            None => {
                self.index.insert(value.to_string(), self.entries.len());
                self.entries.push((value.to_string(), weight));
            }
        }
    }

    pub fn get(&self, value: &str) -> Option<f64> {
        self.index.get(value).map(|&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(value, weight)| (value.as_str(), *weight))
    }

    /// The `k` heaviest values, heaviest first
    pub fn top(&self, k: usize) -> Vec<String> {
        let mut ranked: Vec<&(String, f64)> = self.entries.iter().collect();
        // sort_by is stable, so equal weights keep first-seen order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
            .into_iter()
            .take(k)
            .map(|(value, _)| value.clone())
            .collect()
    }
}

/// One [`WeightedCounter`] per [`Dimension`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionWeights {
    counters: [WeightedCounter; 6],
}

impl DimensionWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dimension: Dimension, value: &str, weight: f64) {
        self.counters[dimension.slot()].add(value, weight);
    }

    pub fn counter(&self, dimension: Dimension) -> &WeightedCounter {
        &self.counters[dimension.slot()]
    }

    pub fn top(&self, dimension: Dimension) -> Vec<String> {
        self.counter(dimension).top(dimension.top_k())
    }
}

/// Rating aggregates over the read set. Reported, never scored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingStats {
    /// Mean catalog rating over books that carried a valid one
    pub mean_rating: Option<f64>,
    /// Sum of catalog rating counts over the same books
    pub total_ratings: i64,
    pub rated_books: usize,
}

/// A reader's weighted preferences, rebuilt for every request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub top_genres: Vec<String>,
    pub top_tones: Vec<String>,
    pub top_themes: Vec<String>,
    pub top_periods: Vec<String>,
    pub top_locations: Vec<String>,
    pub top_audiences: Vec<String>,
    pub weights: DimensionWeights,
    pub read_isbns: HashSet<String>,
    /// Case-folded author names
    pub read_authors: HashSet<String>,
    pub rating_stats: RatingStats,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.read_isbns.is_empty()
    }

    pub fn top(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Genre => &self.top_genres,
            Dimension::Tone => &self.top_tones,
            Dimension::Theme => &self.top_themes,
            Dimension::SettingPeriod => &self.top_periods,
            Dimension::SettingLocation => &self.top_locations,
            Dimension::TargetAudience => &self.top_audiences,
        }
    }
}
