use anyhow::{Context, Result};
use rolesync_core::SyncService;

use crate::output::{mask, print_json, print_table};
use crate::settings::Settings;

/// Validate settings, log in to Discord and resolve the guild without
/// serving anything.
pub fn run(settings: &Settings, json: bool) -> Result<()> {
    let config = settings.to_config();

    let rt = tokio::runtime::Runtime::new()?;
    let sync = rt
        .block_on(SyncService::connect(&config))
        .context("startup failed")?;
    let community = sync.reconciler().community();

    if json {
        print_json(&serde_json::json!({
            "ok": true,
            "guild_id": community.id,
            "guild_name": community.name,
            "role_id": sync.reconciler().role_id(),
            "subscription_api_url": config.authority.base_url,
            "authority_max_attempts": config.authority.retry.max_attempts,
        }))?;
        return Ok(());
    }

    print_table(
        &["SETTING", "VALUE"],
        vec![
            vec!["guild".into(), format!("{} ({})", community.name, community.id)],
            vec!["role".into(), sync.reconciler().role_id().to_string()],
            vec!["subscription api".into(), config.authority.base_url.clone()],
            vec!["subscription key".into(), mask(&config.authority.api_key)],
            vec!["webhook secret".into(), mask(&config.webhook_secret)],
            vec![
                "max attempts".into(),
                config.authority.retry.max_attempts.to_string(),
            ],
        ],
    );
    Ok(())
}
