use app_square::auth::AdminGuard;
use app_square::config::AppConfig;
use app_square::directory::DirectoryService;
use app_square::error::AppError;
use app_square::ranking::RankingService;
use app_square::SqliteStore;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Domain services sharing one store, plus the admin guard for privileged routes.
#[derive(Clone)]
pub(crate) struct Portal {
    pub(crate) directory: Arc<DirectoryService<SqliteStore>>,
    pub(crate) ranking: Arc<RankingService<SqliteStore>>,
    pub(crate) admin: AdminGuard,
}

impl Portal {
    pub(crate) fn open(config: &AppConfig) -> Result<Self, AppError> {
        let store = Arc::new(SqliteStore::open(&config.database)?);
        if config.admin.token.is_none() {
            info!("APP_ADMIN_TOKEN is not set; privileged routes will reject every request");
        }
        let directory = DirectoryService::new(Arc::clone(&store))
            .with_rule_base_url(config.portal.oa_rule_base_url.as_str());
        Ok(Self {
            directory: Arc::new(directory),
            ranking: Arc::new(RankingService::new(store)),
            admin: AdminGuard::new(&config.admin),
        })
    }

    pub(crate) fn from_store(store: Arc<SqliteStore>, admin: AdminGuard) -> Self {
        Self {
            directory: Arc::new(DirectoryService::new(Arc::clone(&store))),
            ranking: Arc::new(RankingService::new(store)),
            admin,
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
