use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use common::config::Settings;
use common::db::repositories::LawRepository;
use common::db::DbPool;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub config: Arc<Settings>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(db_pool: DbPool, config: Settings, metrics_handle: PrometheusHandle) -> Self {
        Self {
            db_pool,
            config: Arc::new(config),
            metrics_handle,
        }
    }

    pub fn laws(&self) -> LawRepository {
        LawRepository::new(self.db_pool.clone())
    }
}
