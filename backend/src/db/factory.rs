//! Backend selection.
//!
//! [`RepositoryFactory::from_config`] builds the store the server runs on.
//! Which backends can be built depends on the enabled cargo features.

use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use super::repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresRepository;
use super::repository::{FullRepository, RepositoryError, RepositoryResult};
#[cfg(feature = "postgres-repo")]
use super::PostgresConfig;
use crate::config::AppConfig;

/// Storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Postgres through Diesel.
    Postgres,
    /// In-memory store, lost on restart.
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Accepts `postgres`, `pg` and `local` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" | "memory" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// Backend named by the process environment.
    ///
    /// `REPOSITORY_TYPE` wins; an unknown value falls back to Local. Without
    /// it, a `DATABASE_URL` or `PG_DATABASE_URL` selects Postgres.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }
        let has_url = ["DATABASE_URL", "PG_DATABASE_URL"]
            .iter()
            .any(|key| std::env::var(key).is_ok_and(|v| !v.is_empty()));
        if has_url {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

/// Builds repositories behind `Arc<dyn FullRepository>`.
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Build the backend described by `config`.
    pub async fn from_config(config: &AppConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
        match config.repository_type()? {
            RepositoryType::Local => {
                info!("using in-memory repository");
                Ok(Self::create_local())
            }
            RepositoryType::Postgres => Self::postgres_from(config).await,
        }
    }

    pub fn create_local() -> Arc<dyn FullRepository> {
        Arc::new(LocalRepository::new())
    }

    #[cfg(feature = "postgres-repo")]
    async fn postgres_from(config: &AppConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
        let pg_config = config.postgres_config()?;
        info!(
            max_pool_size = pg_config.max_pool_size,
            "using postgres repository"
        );
        let repo = Self::create_postgres(pg_config).await?;
        Ok(repo as Arc<dyn FullRepository>)
    }

    #[cfg(not(feature = "postgres-repo"))]
    async fn postgres_from(_config: &AppConfig) -> RepositoryResult<Arc<dyn FullRepository>> {
        Err(RepositoryError::configuration(
            "Postgres repository feature not enabled",
        ))
    }

    /// Connect, run migrations and wrap the pool. Connecting blocks, so it
    /// runs off the async workers.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(
        config: PostgresConfig,
    ) -> RepositoryResult<Arc<PostgresRepository>> {
        let repo = tokio::task::spawn_blocking(move || PostgresRepository::new(config))
            .await
            .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))??;
        Ok(Arc::new(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_type_from_str() {
        assert_eq!("local".parse::<RepositoryType>(), Ok(RepositoryType::Local));
        assert_eq!(" Pg ".parse::<RepositoryType>(), Ok(RepositoryType::Postgres));
        assert!("sqlite".parse::<RepositoryType>().is_err());
    }

    #[tokio::test]
    async fn test_from_default_config_is_local() {
        let repo = RepositoryFactory::from_config(&AppConfig::default())
            .await
            .unwrap();
        assert!(repo.health_check().await.unwrap());
    }

    #[cfg(not(feature = "postgres-repo"))]
    #[tokio::test]
    async fn test_postgres_without_feature_is_configuration_error() {
        let mut config = AppConfig::default();
        config.database.repo_type = "postgres".into();
        let result = RepositoryFactory::from_config(&config).await;
        assert!(matches!(
            result,
            Err(RepositoryError::ConfigurationError { .. })
        ));
    }
}
