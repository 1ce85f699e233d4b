//! cfgmirror Service Entry Point
//!
//! Bootstraps configuration and tracing, loads the configuration mirror from
//! PostgreSQL, reports its status, and holds it until Ctrl-C.

use std::sync::Arc;

use cfgmirror_api::{init_tracing, ApiResult, Audience, ServiceConfig, SettingsService};
use cfgmirror_storage::PgConfigStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ServiceConfig::from_env();
    init_tracing(&config.telemetry)?;
    config.validate()?;

    let pool = config.db.create_pool()?;
    let store = Arc::new(PgConfigStore::new(pool));
    if let Err(e) = store.ensure_schema().await {
        tracing::warn!(error = %e, "Could not ensure schema; continuing with existing tables");
    }

    let service = SettingsService::new(store, config.mirror.clone());
    if let Err(e) = service.initialize().await {
        tracing::error!(error = %e, "Configuration mirror failed to load; aborting");
        return Err(e);
    }

    let stats = service.stats();
    tracing::info!(stats = %serde_json::to_string(&stats)?, "Configuration mirror ready");

    let public = service.public_settings(Audience::Admin).await;
    tracing::info!(
        source = %public.meta.source,
        config_entries = public.config.len(),
        complaint_types = public.complaint_types.len(),
        "Public settings tier resolved"
    );

    for check in service.health().await {
        tracing::info!(
            component = %check.component(),
            status = ?check.status,
            message = ?check.message,
            "Health check"
        );
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }

    service.destroy();
    Ok(())
}
