//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::repository::FullRepository;
use crate::mail::{LogMailer, Mailer};
use crate::services::AuthService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn FullRepository>,
    pub auth: Arc<AuthService>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        mailer: Arc<dyn Mailer>,
        config: AppConfig,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(&config.auth)),
            repository,
            mailer,
            config: Arc::new(config),
        }
    }

    /// State with the log mailer, for tests and local runs.
    pub fn with_log_mailer(repository: Arc<dyn FullRepository>, config: AppConfig) -> Self {
        Self::new(repository, Arc::new(LogMailer::new()), config)
    }

    pub fn frontend_url(&self) -> &str {
        &self.config.server.frontend_url
    }
}
