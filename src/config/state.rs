// Application state module
// Built once at startup and shared read-only by all connections

use super::types::Config;
use crate::dataset::DatasetStore;
use crate::handler::dashboard::DashboardTemplate;

/// Application state
pub struct AppState {
    pub config: Config,
    pub datasets: DatasetStore,
    pub dashboard: DashboardTemplate,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let datasets = DatasetStore::new(&config.app.data_dir);
        let dashboard = DashboardTemplate::from_config(&config.app);

        Self {
            config,
            datasets,
            dashboard,
        }
    }
}
