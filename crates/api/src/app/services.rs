use std::sync::Arc;

use wrenchbook_infra::config::StoreBackend;
use wrenchbook_infra::services::ServiceSettings;
use wrenchbook_infra::store::{PostgresStore, StoreError};
use wrenchbook_infra::{AppConfig, Services};

/// Build the application services on the configured storage backend.
///
/// The Postgres backend connects eagerly and creates its tables if missing.
pub async fn build_services(config: &AppConfig) -> Result<Arc<Services>, StoreError> {
    let settings = ServiceSettings::from(config.clone());
    let services = match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory store");
            Services::in_memory(settings)
        }
        StoreBackend::Postgres {
            database_url,
            max_connections,
        } => {
            let store = Arc::new(PostgresStore::connect(database_url, *max_connections).await?);
            store.ensure_schema().await?;
            tracing::info!(max_connections, "using postgres store");
            Services::new(store.clone(), store, settings)
        }
    };
    Ok(Arc::new(services))
}
