use std::collections::HashSet;

use crate::models::{BookRecord, UserProfile};
use crate::services::profile::fold;

/// Points per top genre the candidate shares
pub const GENRE_WEIGHT: u32 = 7;
/// Points per top tone the candidate shares
pub const TONE_WEIGHT: u32 = 5;
/// Points per top theme the candidate shares
pub const THEME_WEIGHT: u32 = 2;
pub const SETTING_PERIOD_WEIGHT: u32 = 3;
pub const SETTING_LOCATION_WEIGHT: u32 = 3;
pub const TARGET_AUDIENCE_WEIGHT: u32 = 4;
/// Awarded once when any author of the candidate was already read
pub const AUTHOR_WEIGHT: u32 = 5;

/// Scores how well `candidate` matches `profile`.
///
/// The result is a raw sum of fixed feature weights, meaningful only for
/// ranking candidates against the same profile. Absent enrichment on the
/// candidate simply contributes nothing.
pub fn score(profile: &UserProfile, candidate: &BookRecord) -> u32 {
    if profile.is_empty() {
        return 0;
    }

    let mut total = 0;

    total += GENRE_WEIGHT * shared(&profile.top_genres, candidate.genre.as_deref());
    total += TONE_WEIGHT * shared(&profile.top_tones, candidate.tone.as_deref());
    total += THEME_WEIGHT * shared(&profile.top_themes, candidate.themes.as_deref());

    if matches(&profile.top_periods, candidate.setting_period.as_deref()) {
        total += SETTING_PERIOD_WEIGHT;
    }
    if matches(&profile.top_locations, candidate.setting_location.as_deref()) {
        total += SETTING_LOCATION_WEIGHT;
    }
    if matches(&profile.top_audiences, candidate.target_audience.as_deref()) {
        total += TARGET_AUDIENCE_WEIGHT;
    }

    if candidate
        .authors
        .iter()
        .filter_map(|a| fold(a))
        .any(|author| profile.read_authors.contains(&author))
    {
        total += AUTHOR_WEIGHT;
    }

    total
}

/// Number of `top` values present in `values`
fn shared(top: &[String], values: Option<&[String]>) -> u32 {
    let Some(values) = values else {
        return 0;
    };
    let values: HashSet<String> = values.iter().filter_map(|v| fold(v)).collect();
    top.iter().filter(|t| values.contains(*t)).count() as u32
}

fn matches(top: &[String], value: Option<&str>) -> bool {
    value
        .and_then(fold)
        .is_some_and(|value| top.contains(&value))
}
