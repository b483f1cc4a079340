pub mod access;
pub mod api;
pub mod compiler;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod live;
pub mod sessions;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::compiler::Compiler;
use crate::live::LiveSessions;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub live: LiveSessions,
    pub compiler: Compiler,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, compiler: Compiler) -> Self {
        Self {
            config,
            db,
            live: LiveSessions::new(),
            compiler,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
