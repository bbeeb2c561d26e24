use std::sync::Arc;

use crate::{
    db::{CandidateQuery, CatalogStore},
    error::AppResult,
    models::{BookRecord, CandidateScore},
    services::{
        profile::{build_profile, fold},
        similarity::score,
    },
};

/// Default number of catalog rows scored per request
pub const DEFAULT_CANDIDATE_LIMIT: usize = 1000;

/// Generates reading recommendations
///
/// Builds a profile from the books the reader has already read, pulls unread
/// analysed books from the catalog that share at least one of the reader's top
/// genres, and ranks them by similarity score.
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    candidate_limit: usize,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, candidate_limit: usize) -> Self {
        Self {
            catalog,
            candidate_limit,
        }
    }

    /// Returns at most `top_n` unread books, best match first.
    ///
    /// Genre pre-filtering is a plain substring match on the stored genre
    /// text, so a differently worded genre can hide a good candidate. Only
    /// the first `candidate_limit` catalog rows are scored.
    ///
    /// Fails with `StoreUnavailable` when the catalog cannot be reached.
    pub async fn recommend(
        &self,
        books: &[BookRecord],
        top_n: usize,
    ) -> AppResult<Vec<CandidateScore>> {
        let profile = build_profile(books);
        if profile.is_empty() || top_n == 0 {
            return Ok(vec![]);
        }

        let query = CandidateQuery {
            exclude_isbns: profile.read_isbns.iter().cloned().collect(),
            genre_terms: profile.top_genres.clone(),
            limit: self.candidate_limit,
        };

        let mut candidates = self.catalog.find_candidates(&query).await?;
        let fetched = candidates.len();

        candidates.retain(|book| {
            !profile.read_isbns.contains(&book.isbn13)
                && is_admissible(book)
                && shares_genre_term(book, &profile.top_genres)
        });
        candidates.truncate(self.candidate_limit);

        let mut scored: Vec<CandidateScore> = candidates
            .into_iter()
            .filter_map(|book| {
                let score = score(&profile, &book);
                (score > 0).then(|| CandidateScore {
                    isbn13: book.isbn13,
                    title: book.title,
                    authors: book.authors,
                    score,
                })
            })
            .collect();

        // Stable, so equal scores keep catalog order
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(top_n);

        tracing::info!(
            read = profile.read_isbns.len(),
            candidates = fetched,
            returned = scored.len(),
            top_genres = ?profile.top_genres,
            "Recommendations generated"
        );

        Ok(scored)
    }
}

/// Only books with both genre and theme analysis are worth scoring
fn is_admissible(book: &BookRecord) -> bool {
    let non_empty = |values: &Option<Vec<String>>| values.as_ref().is_some_and(|v| !v.is_empty());
    non_empty(&book.genre) && non_empty(&book.themes)
}

/// Substring match of any top genre against the candidate's genres, ignoring case
fn shares_genre_term(book: &BookRecord, top_genres: &[String]) -> bool {
    if top_genres.is_empty() {
        return true;
    }
    book.genre
        .iter()
        .flatten()
        .filter_map(|g| fold(g))
        .any(|genre| top_genres.iter().any(|term| genre.contains(term.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::MockCatalogStore;
    use crate::error::AppError;

    fn read_book(isbn: &str, genre: &str, tone: &str) -> BookRecord {
        BookRecord {
            isbn13: isbn.to_string(),
            title: format!("Read {}", isbn),
            authors: vec!["Someone Read".to_string()],
            genre: Some(vec![genre.to_string()]),
            tone: Some(vec![tone.to_string()]),
            themes: Some(vec!["survival".to_string()]),
            average_rating: Some(4.5),
            ratings_count: Some(200),
            ..Default::default()
        }
    }

    fn catalog_book(isbn: &str, genre: &[&str], tone: &[&str]) -> BookRecord {
        BookRecord {
            isbn13: isbn.to_string(),
            title: format!("Catalog {}", isbn),
            authors: vec![format!("Author {}", isbn)],
            genre: Some(genre.iter().map(|s| s.to_string()).collect()),
            tone: Some(tone.iter().map(|s| s.to_string()).collect()),
            themes: Some(vec!["unrelated".to_string()]),
            ..Default::default()
        }
    }

    fn engine_over(books: Vec<BookRecord>) -> RecommendationEngine {
        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_find_candidates()
            .returning(move |_| Ok(books.clone()));
        RecommendationEngine::new(Arc::new(catalog), DEFAULT_CANDIDATE_LIMIT)
    }

    #[tokio::test]
    async fn test_no_read_books_skips_catalog() {
        let mut catalog = MockCatalogStore::new();
        catalog.expect_find_candidates().never();
        let engine = RecommendationEngine::new(Arc::new(catalog), DEFAULT_CANDIDATE_LIMIT);

        let result = engine.recommend(&[], 10).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_query_excludes_read_books_and_filters_on_top_genres() {
        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_find_candidates()
            .withf(|query| {
                query.exclude_isbns == vec!["A".to_string()]
                    && query.genre_terms == vec!["scifi".to_string()]
                    && query.limit == 250
            })
            .times(1)
            .returning(|_| Ok(vec![]));
        let engine = RecommendationEngine::new(Arc::new(catalog), 250);

        let result = engine
            .recommend(&[read_book("A", "SciFi", "bleak")], 10)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_top_n_keeps_best_scores() {
        let engine = engine_over(vec![
            catalog_book("low", &["horror"], &["bleak"]),
            catalog_book("high", &["scifi"], &["bleak"]),
        ]);

        let result = engine
            .recommend(&[read_book("A", "scifi", "bleak")], 1)
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].isbn13, "high");
        assert_eq!(result[0].score, 12);
    }

    #[tokio::test]
    async fn test_ties_keep_catalog_order_and_zero_scores_are_dropped() {
        let engine = engine_over(vec![
            catalog_book("first", &["scifi"], &[]),
            catalog_book("nothing", &["cookbook"], &[]),
            catalog_book("second", &["scifi"], &[]),
        ]);

        let result = engine
            .recommend(&[read_book("A", "scifi", "bleak")], 10)
            .await
            .unwrap();

        let isbns: Vec<&str> = result.iter().map(|c| c.isbn13.as_str()).collect();
        assert_eq!(isbns, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_read_and_unanalysed_books_never_returned() {
        let mut unanalysed = catalog_book("bare", &["scifi"], &["bleak"]);
        unanalysed.themes = None;
        let engine = engine_over(vec![
            catalog_book("A", &["scifi"], &["bleak"]),
            unanalysed,
            catalog_book("B", &["scifi"], &[]),
        ]);

        let result = engine
            .recommend(&[read_book("A", "scifi", "bleak")], 10)
            .await
            .unwrap();

        let isbns: Vec<&str> = result.iter().map(|c| c.isbn13.as_str()).collect();
        assert_eq!(isbns, vec!["B"]);
    }

    #[tokio::test]
    async fn test_scores_are_non_increasing_and_bounded() {
        let books: Vec<BookRecord> = (0..30)
            .map(|i| {
                let tones: &[&str] = if i % 3 == 0 { &["bleak"] } else { &[] };
                let genres: &[&str] = if i % 2 == 0 { &["scifi"] } else { &["noir"] };
                catalog_book(&format!("c{}", i), genres, tones)
            })
            .collect();
        let engine = engine_over(books);
        let read = [read_book("A", "scifi", "bleak"), read_book("B", "noir", "grim")];

        for top_n in [1, 5, 12, 100] {
            let result = engine.recommend(&read, top_n).await.unwrap();
            assert!(result.len() <= top_n);
            assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
            assert!(result.iter().all(|c| c.isbn13 != "A" && c.isbn13 != "B"));
        }
    }

    #[tokio::test]
    async fn test_candidate_limit_bounds_scoring() {
        let books: Vec<BookRecord> = (0..5)
            .map(|i| catalog_book(&format!("c{}", i), &["scifi"], &[]))
            .collect();
        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_find_candidates()
            .returning(move |_| Ok(books.clone()));
        let engine = RecommendationEngine::new(Arc::new(catalog), 2);

        let result = engine
            .recommend(&[read_book("A", "scifi", "bleak")], 10)
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_reported() {
        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_find_candidates()
            .returning(|_| Err(AppError::StoreUnavailable("connection refused".to_string())));
        let engine = RecommendationEngine::new(Arc::new(catalog), DEFAULT_CANDIDATE_LIMIT);

        let result = engine.recommend(&[read_book("A", "scifi", "bleak")], 10).await;
        assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_candidates_outside_top_genres_are_dropped() {
        let engine = engine_over(vec![
            catalog_book("romance", &["Romance"], &["bleak"]),
            catalog_book("hard", &["Hard SciFi"], &["bleak"]),
        ]);

        let result = engine
            .recommend(&[read_book("A", "scifi", "bleak")], 10)
            .await
            .unwrap();

        let isbns: Vec<&str> = result.iter().map(|c| c.isbn13.as_str()).collect();
        assert_eq!(isbns, vec!["hard"]);
    }
}
