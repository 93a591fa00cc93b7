use crate::config::Config;
use crate::utils::{
    assets::{AssetStore, DisabledAssetStore, HttpAssetStore},
    mailer::{LogMailer, Mailer, SmtpMailer},
};
use axum::extract::FromRef;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub mailer: Arc<dyn Mailer>,
    pub assets: Arc<dyn AssetStore>,
}

impl AppState {
    /// Picks the SMTP mailer and HTTP asset store when they are configured,
    /// falling back to the log mailer and a disabled store.
    pub fn new(pool: PgPool, config: Config) -> Self {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => match SmtpMailer::new(smtp) {
                Ok(mailer) => Arc::new(mailer),
                Err(e) => {
                    tracing::error!("SMTP disabled, invalid configuration: {}", e);
                    Arc::new(LogMailer)
                }
            },
            None => Arc::new(LogMailer),
        };

        let assets: Arc<dyn AssetStore> = match &config.assets {
            Some(assets) => Arc::new(HttpAssetStore::new(assets.clone())),
            None => Arc::new(DisabledAssetStore),
        };

        Self {
            pool,
            config,
            mailer,
            assets,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

