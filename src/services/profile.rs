use crate::models::{BookRecord, Dimension, DimensionWeights, UserProfile};

/// How much one read book counts towards the profile.
///
/// Rated, well-reviewed books count for more, but the log keeps a handful of
/// blockbusters from drowning out everything else. Books without a usable
/// rating and rating count get the neutral weight 1.0.
pub fn book_weight(rating: Option<f64>, ratings_count: Option<i64>) -> f64 {
    match (rating, ratings_count) {
        (Some(rating), Some(count)) if rating.is_finite() && rating > 0.0 && count > 0 => {
            rating.clamp(1.0, 5.0) * ((count as f64) + 1.0).log10()
        }
        _ => 1.0,
    }
}

/// Trimmed, lowercased form used for every categorical comparison
pub fn fold(value: &str) -> Option<String> {
    let folded = value.trim().to_lowercase();
    (!folded.is_empty()).then_some(folded)
}

/// Aggregates a reader's books into a [`UserProfile`].
///
/// Books are visited in iteration order, which decides ties among equally
/// weighted values. Records with a blank ISBN are ignored.
pub fn build_profile<'a, I>(books: I) -> UserProfile
where
    I: IntoIterator<Item = &'a BookRecord>,
{
    let mut profile = UserProfile::default();
    let mut weights = DimensionWeights::new();
    let mut rating_sum = 0.0;

    for book in books {
        if book.isbn13.trim().is_empty() {
            continue;
        }

        let weight = book_weight(book.average_rating, book.ratings_count);

        let lists = [
            (Dimension::Genre, &book.genre),
            (Dimension::Tone, &book.tone),
            (Dimension::Theme, &book.themes),
        ];
        for (dimension, values) in lists {
            for value in values.iter().flatten().filter_map(|v| fold(v)) {
                weights.add(dimension, &value, weight);
            }
        }

        let scalars = [
            (Dimension::SettingPeriod, &book.setting_period),
            (Dimension::SettingLocation, &book.setting_location),
            (Dimension::TargetAudience, &book.target_audience),
        ];
        for (dimension, value) in scalars {
            if let Some(value) = value.as_deref().and_then(fold) {
                weights.add(dimension, &value, weight);
            }
        }

        profile
            .read_authors
            .extend(book.authors.iter().filter_map(|a| fold(a)));
        profile.read_isbns.insert(book.isbn13.clone());

        if let Some(rating) = book.average_rating.filter(|r| r.is_finite() && *r > 0.0) {
            rating_sum += rating;
            profile.rating_stats.rated_books += 1;
        }
        if let Some(count) = book.ratings_count.filter(|c| *c > 0) {
            profile.rating_stats.total_ratings =
                profile.rating_stats.total_ratings.saturating_add(count);
        }
    }

    let rated_books = profile.rating_stats.rated_books;
    if rated_books > 0 {
        profile.rating_stats.mean_rating = Some(rating_sum / rated_books as f64);
    }

    profile.top_genres = weights.top(Dimension::Genre);
    profile.top_tones = weights.top(Dimension::Tone);
    profile.top_themes = weights.top(Dimension::Theme);
    profile.top_periods = weights.top(Dimension::SettingPeriod);
    profile.top_locations = weights.top(Dimension::SettingLocation);
    profile.top_audiences = weights.top(Dimension::TargetAudience);
    profile.weights = weights;

    tracing::debug!(
        books = profile.read_isbns.len(),
        top_genres = ?profile.top_genres,
        top_tones = ?profile.top_tones,
        "Built reader profile"
    );

    profile
}
