use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::{
    db::{CatalogStore, CatalogUpdate},
    models::{BookMetadata, BookRecord, EnrichedBooks},
    services::enrichment::EnrichmentCache,
};

/// Counters for one analysis batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    /// Books that carried an ISBN and were analysed
    pub processed: usize,
    /// Books dropped for lacking an ISBN
    pub skipped: usize,
    pub enriched: usize,
    pub persisted: usize,
    /// Updates that matched no catalog row
    pub missing_in_catalog: usize,
    pub persist_failures: usize,
}

/// Result of [`BookAnalysisOrchestrator::analyse_books`]
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub books: EnrichedBooks,
    pub report: AnalysisReport,
}

enum Persisted {
    Updated,
    NotInCatalog,
    Failed,
}

/// Runs enrichment over a list of books and writes the results to the catalog
pub struct BookAnalysisOrchestrator {
    enrichment: EnrichmentCache,
    catalog: Arc<dyn CatalogStore>,
    concurrency: usize,
}

impl BookAnalysisOrchestrator {
    /// `concurrency` bounds how many books are in flight at once. 1 analyses
    /// them one after another.
    pub fn new(
        enrichment: EnrichmentCache,
        catalog: Arc<dyn CatalogStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            enrichment,
            catalog,
            concurrency: concurrency.max(1),
        }
    }

    /// Enriches every book that has an ISBN and persists the result.
    ///
    /// Never fails as a whole: books whose analysis or persistence fails are
    /// logged and still appear in the returned map, with absent enrichment in
    /// the first case. The map follows input order whatever the concurrency.
    pub async fn analyse_books(&self, books: Vec<BookMetadata>) -> AnalysisOutcome {
        let total = books.len();
        let mut report = AnalysisReport::default();

        let identified: Vec<(String, BookMetadata)> = books
            .into_iter()
            .filter_map(|mut book| {
                let isbn = book.isbn13.take().map(|isbn| isbn.trim().to_string());
                match isbn {
                    Some(isbn) if !isbn.is_empty() => Some((isbn, book)),
                    _ => {
                        tracing::debug!(title = %book.title, "Skipping book without ISBN");
                        None
                    }
                }
            })
            .collect();
        report.skipped = total - identified.len();

        tracing::info!(
            total,
            to_process = identified.len(),
            concurrency = self.concurrency,
            "Starting book analysis batch"
        );

        let results: Vec<(BookRecord, Persisted)> = stream::iter(identified)
            .map(|(isbn, book)| self.analyse_one(isbn, book))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut enriched = EnrichedBooks::new();
        for (record, persisted) in results {
            report.processed += 1;
            if record.is_enriched() {
                report.enriched += 1;
            }
            match persisted {
                Persisted::Updated => report.persisted += 1,
                Persisted::NotInCatalog => report.missing_in_catalog += 1,
                Persisted::Failed => report.persist_failures += 1,
            }
            enriched.insert(record);
        }

        tracing::info!(
            processed = report.processed,
            skipped = report.skipped,
            enriched = report.enriched,
            persisted = report.persisted,
            missing_in_catalog = report.missing_in_catalog,
            persist_failures = report.persist_failures,
            "Book analysis batch finished"
        );

        AnalysisOutcome {
            books: enriched,
            report,
        }
    }

    async fn analyse_one(&self, isbn: String, book: BookMetadata) -> (BookRecord, Persisted) {
        let mut record = BookRecord::from_metadata(isbn, book);

        let enrichment = match self
            .enrichment
            .fetch_or_compute(&record.isbn13, &record.title, record.primary_author())
            .await
        {
            Ok(enrichment) => enrichment,
            Err(e) => {
                tracing::warn!(isbn = %record.isbn13, error = %e, "Book cannot be analysed");
                None
            }
        };
        record.apply_enrichment(enrichment);

        let persisted = self.persist(&record).await;
        (record, persisted)
    }

    async fn persist(&self, record: &BookRecord) -> Persisted {
        match self
            .catalog
            .update_enrichment(&CatalogUpdate::from_record(record))
            .await
        {
            Ok(0) => {
                tracing::info!(isbn = %record.isbn13, "Book not in catalog yet, nothing updated");
                Persisted::NotInCatalog
            }
            Ok(_) => {
                tracing::debug!(isbn = %record.isbn13, "Catalog updated");
                Persisted::Updated
            }
            Err(e) => {
                tracing::error!(isbn = %record.isbn13, error = %e, "Failed to persist book analysis");
                Persisted::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalog::MockCatalogStore;
    use crate::db::cache::MockKeyValueCache;
    use crate::db::CacheRetention;
    use crate::error::AppError;
    use crate::services::llm::MockTextGenerator;

    const ANALYSIS: &str = r#"{
        "genre": ["Mystery"],
        "setting_period": "1930s",
        "setting_location": "Orient Express",
        "tone": ["suspenseful"],
        "target_audience": "Adult",
        "themes": ["justice"],
        "sentiment": "Tense"
    }"#;

    fn book(isbn: Option<&str>, title: &str) -> BookMetadata {
        BookMetadata {
            isbn13: isbn.map(str::to_string),
            title: title.to_string(),
            authors: vec!["Agatha Christie".to_string()],
            description: Some("A snowbound train".to_string()),
            ..Default::default()
        }
    }

    fn empty_cache() -> MockKeyValueCache {
        let mut cache = MockKeyValueCache::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_set().returning(|_, _, _| Ok(()));
        cache
    }

    fn orchestrator(generator: MockTextGenerator, catalog: MockCatalogStore) -> BookAnalysisOrchestrator {
        let enrichment = EnrichmentCache::new(
            Arc::new(empty_cache()),
            Arc::new(generator),
            CacheRetention::Forever,
        );
        BookAnalysisOrchestrator::new(enrichment, Arc::new(catalog), 1)
    }

    #[tokio::test]
    async fn test_books_without_isbn_are_skipped() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok(ANALYSIS.to_string()));
        generator.expect_name().return_const("mock");

        let mut catalog = MockCatalogStore::new();
        catalog.expect_update_enrichment().times(1).returning(|_| Ok(1));

        let outcome = orchestrator(generator, catalog)
            .analyse_books(vec![
                book(None, "Untraceable"),
                book(Some("  "), "Blank"),
                book(Some("9780062693662"), "Murder on the Orient Express"),
            ])
            .await;

        assert_eq!(outcome.books.len(), 1);
        assert_eq!(outcome.report.skipped, 2);
        assert_eq!(outcome.report.persisted, 1);
        let record = outcome.books.get("9780062693662").unwrap();
        assert_eq!(record.genre, Some(vec!["Mystery".to_string()]));
        assert_eq!(record.setting_period.as_deref(), Some("1930s"));
    }

    #[tokio::test]
    async fn test_failed_analysis_leaves_fields_absent() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(AppError::UpstreamService("timeout".to_string())));
        generator.expect_name().return_const("mock");

        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_update_enrichment()
            .withf(|update| update.genre.is_none() && update.description.is_some())
            .times(1)
            .returning(|_| Ok(1));

        let outcome = orchestrator(generator, catalog)
            .analyse_books(vec![book(Some("9780062693662"), "Murder on the Orient Express")])
            .await;

        let record = outcome.books.get("9780062693662").unwrap();
        assert_eq!(record.genre, None);
        assert_eq!(record.themes, None);
        assert_eq!(record.target_audience, None);
        assert_eq!(outcome.report.enriched, 0);
    }

    #[tokio::test]
    async fn test_persistence_failures_do_not_stop_the_batch() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .times(3)
            .returning(|_| Ok(ANALYSIS.to_string()));
        generator.expect_name().return_const("mock");

        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_update_enrichment()
            .times(3)
            .returning(|update| match update.isbn13.as_str() {
                "1" => Err(AppError::Internal("disk full".to_string())),
                "2" => Ok(0),
                _ => Ok(1),
            });

        let outcome = orchestrator(generator, catalog)
            .analyse_books(vec![
                book(Some("1"), "One"),
                book(Some("2"), "Two"),
                book(Some("3"), "Three"),
            ])
            .await;

        let order: Vec<&str> = outcome.books.iter().map(|b| b.isbn13.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "3"]);
        assert_eq!(outcome.report.persist_failures, 1);
        assert_eq!(outcome.report.missing_in_catalog, 1);
        assert_eq!(outcome.report.persisted, 1);
        assert_eq!(outcome.report.enriched, 3);
    }

    #[tokio::test]
    async fn test_bounded_concurrency_keeps_input_order() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Ok(ANALYSIS.to_string()));
        generator.expect_name().return_const("mock");

        let mut catalog = MockCatalogStore::new();
        catalog.expect_update_enrichment().returning(|_| Ok(1));

        let enrichment = EnrichmentCache::new(
            Arc::new(empty_cache()),
            Arc::new(generator),
            CacheRetention::Forever,
        );
        let orchestrator = BookAnalysisOrchestrator::new(enrichment, Arc::new(catalog), 4);

        let isbns: Vec<String> = (0..10).map(|i| format!("97800000000{:02}", i)).collect();
        let books = isbns.iter().map(|isbn| book(Some(isbn.as_str()), "Title")).collect();

        let outcome = orchestrator.analyse_books(books).await;
        let order: Vec<String> = outcome.books.iter().map(|b| b.isbn13.clone()).collect();
        assert_eq!(order, isbns);
    }
}
