#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agrimarket_backend::config::CacheConfig;
use agrimarket_backend::services::cache::{Cache, CacheError, MemoryCache};
use agrimarket_backend::services::harvest::HarvestService;
use agrimarket_backend::services::price_revision::PriceService;
use agrimarket_backend::services::report_dispatcher::{BrokerError, JobPublisher, ReportDispatcher};
use agrimarket_backend::services::report_renderer::ReportRenderer;
use agrimarket_backend::services::report_resolver::ReportResolver;
use agrimarket_backend::services::report_worker::ReportWorker;
use agrimarket_backend::AppState;
use async_trait::async_trait;
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;

pub const TEST_EXCHANGE: &str = "report-exchange";
pub const TEST_BASE_URL: &str = "http://localhost:3000";

/// Migrated SQLite database in a temp directory
/// The directory must outlive the connection
pub async fn setup_test_db() -> Result<(TempDir, DatabaseConnection), DbErr> {
    let dir = tempfile::tempdir().map_err(|e| DbErr::Custom(e.to_string()))?;
    let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    let db = Database::connect(&database_url).await?;
    migration::Migrator::up(&db, None).await?;

    Ok((dir, db))
}

/// Memory cache that records every invalidation prefix
pub struct RecordingCache {
    inner: MemoryCache,
    invalidations: Mutex<Vec<String>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryCache::new(1_000),
            invalidations: Mutex::new(Vec::new()),
        }
    }

    pub fn invalidations(&self) -> Vec<String> {
        self.invalidations.lock().unwrap().clone()
    }

    pub fn invalidation_count(&self, prefix: &str) -> usize {
        self.invalidations()
            .iter()
            .filter(|p| p.as_str() == prefix)
            .count()
    }
}

#[async_trait]
impl Cache for RecordingCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete_by_pattern(&self, prefix: &str) -> Result<u64, CacheError> {
        self.invalidations.lock().unwrap().push(prefix.to_string());
        self.inner.delete_by_pattern(prefix).await
    }
}

/// Cache whose invalidation always fails; reads miss
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_by_pattern(&self, _prefix: &str) -> Result<u64, CacheError> {
        Err(CacheError::Backend(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "cache unavailable",
        ))))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedJob {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
}

impl PublishedJob {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap()
    }
}

/// Publisher that keeps messages in memory instead of sending them
#[derive(Default)]
pub struct InMemoryPublisher {
    published: Mutex<Vec<PublishedJob>>,
}

impl InMemoryPublisher {
    pub fn published(&self) -> Vec<PublishedJob> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobPublisher for InMemoryPublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError> {
        self.published.lock().unwrap().push(PublishedJob {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Publisher for an unreachable broker
pub struct FailingPublisher;

#[async_trait]
impl JobPublisher for FailingPublisher {
    async fn publish(
        &self,
        _exchange: &str,
        _routing_key: &str,
        _payload: Vec<u8>,
    ) -> Result<(), BrokerError> {
        Err(BrokerError::Connection("connection refused".to_string()))
    }
}

/// Everything a test needs to drive the API and the worker side by side
pub struct TestApp {
    pub state: AppState,
    pub db: DatabaseConnection,
    pub cache: Arc<RecordingCache>,
    pub publisher: Arc<InMemoryPublisher>,
    pub worker: ReportWorker,
    pub reports_dir: TempDir,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Dispatcher publishes to a broker that refuses every message
    pub async fn with_failing_publisher() -> Self {
        Self::build(Some(Arc::new(FailingPublisher))).await
    }

    async fn build(dispatch_publisher: Option<Arc<dyn JobPublisher>>) -> Self {
        let (db_dir, db) = setup_test_db().await.expect("Failed to set up test DB");
        let reports_dir = tempfile::tempdir().expect("Failed to create reports dir");
        let cache = Arc::new(RecordingCache::new());
        let cache_config = CacheConfig::default();

        let publisher = Arc::new(InMemoryPublisher::default());
        let dispatch_publisher: Arc<dyn JobPublisher> =
            dispatch_publisher.unwrap_or_else(|| publisher.clone() as Arc<dyn JobPublisher>);

        let state = AppState {
            prices: PriceService::new(db.clone(), cache.clone(), &cache_config),
            harvests: HarvestService::new(db.clone(), cache.clone(), &cache_config),
            dispatcher: Arc::new(ReportDispatcher::new(
                dispatch_publisher,
                TEST_EXCHANGE,
                TEST_BASE_URL,
            )),
            resolver: Arc::new(ReportResolver::new(reports_dir.path())),
        };

        let worker = ReportWorker::new(db.clone(), ReportRenderer::new(reports_dir.path()));

        Self {
            state,
            db,
            cache,
            publisher,
            worker,
            reports_dir,
            _db_dir: db_dir,
        }
    }

    /// Hands every job published so far to the worker, as the consumer would
    pub async fn run_published_jobs(&self) {
        for job in self.publisher.published() {
            let _ = self.worker.handle_delivery(&job.payload).await;
        }
    }
}
