pub mod cache;
pub mod catalog;
pub mod postgres;
pub mod redis;

pub use cache::{CacheKey, CacheRetention, KeyValueCache};
pub use catalog::{CandidateQuery, CatalogStore, CatalogUpdate};
pub use postgres::{create_pool, PgCatalog};
pub use self::redis::{create_redis_client, Cache};
