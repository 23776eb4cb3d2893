use anyhow::{Context, Result};
use rolesync_core::{OperationKind, SyncService};

use crate::output::print_json;
use crate::settings::Settings;

/// Run one reconciliation for `user_id` and print the outcome.
pub fn run(settings: &Settings, user_id: &str, remove: bool, json: bool) -> Result<()> {
    let config = settings.to_config();
    let kind = if remove {
        OperationKind::Remove
    } else {
        OperationKind::Update
    };

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        let sync = SyncService::connect(&config)
            .await
            .context("startup failed")?;
        sync.run(kind, user_id)
            .await
            .with_context(|| format!("{kind} failed for user {user_id}"))
    })?;

    if json {
        print_json(&serde_json::json!({
            "user_id": user_id,
            "operation": kind,
            "outcome": outcome,
            "mutated": outcome.mutated(),
        }))?;
    } else {
        println!("{user_id}: {outcome}");
    }
    Ok(())
}
