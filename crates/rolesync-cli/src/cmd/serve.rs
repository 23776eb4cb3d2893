use anyhow::{Context, Result};
use rolesync_core::SyncService;
use rolesync_server::AppState;
use std::sync::Arc;

use crate::settings::Settings;

pub fn run(settings: &Settings, port: u16) -> Result<()> {
    let config = settings.to_config();
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        // Bad configuration or an unknown guild aborts here, before the
        // server starts.
        let sync = SyncService::connect(&config)
            .await
            .context("startup failed")?;
        let state = AppState::new(Arc::new(sync), config.webhook_secret.as_str());

        tokio::select! {
            res = rolesync_server::serve(state, port) => {
                res.with_context(|| format!("webhook server on port {port} failed"))
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
