use std::sync::Arc;

use fitlens_core::config::AppConfig;
use fitlens_core::recommend::RecommendationService;
use fitlens_db::repositories::{
    OrderRepository, ProductCatalogRepository, SegmentRepository, SqlOrderRepository,
    SqlProductCatalogRepository, SqlSegmentRepository,
};
use fitlens_db::DbPool;
use tokio::sync::Mutex;

/// Shared handler state. Everything behind an `Arc` so clones are cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: DbPool,
    pub recommendations: Arc<RecommendationService>,
    pub orders: Arc<dyn OrderRepository>,
    pub catalog: Arc<dyn ProductCatalogRepository>,
    pub segments: Arc<dyn SegmentRepository>,
    /// Held for the duration of a segmentation run; a second run is refused.
    pub segmentation_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: DbPool) -> Self {
        Self {
            config: Arc::new(config),
            orders: Arc::new(SqlOrderRepository::new(db_pool.clone())),
            catalog: Arc::new(SqlProductCatalogRepository::new(db_pool.clone())),
            segments: Arc::new(SqlSegmentRepository::new(db_pool.clone())),
            db_pool,
            recommendations: Arc::new(RecommendationService::new()),
            segmentation_lock: Arc::new(Mutex::new(())),
        }
    }
}
