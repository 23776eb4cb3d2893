use std::sync::Arc;

use crate::authority::{HttpAuthority, SubscriptionAuthority};
use crate::config::SyncConfig;
use crate::directory::PlatformDirectory;
use crate::discord::DiscordDirectory;
use crate::error::{Result, SyncError};
use crate::locks::UserLocks;
use crate::reconcile::Reconciler;
use crate::resolver::MembershipResolver;
use crate::types::{OperationKind, ReconciliationOutcome};

/// One entry point for a sync trigger: read the subscription service, then
/// reconcile the member's role, serialized per user.
pub struct SyncService {
    authority: Arc<dyn SubscriptionAuthority>,
    reconciler: Reconciler,
    locks: UserLocks,
}

impl SyncService {
    pub fn new(authority: Arc<dyn SubscriptionAuthority>, reconciler: Reconciler) -> Self {
        Self {
            authority,
            reconciler,
            locks: UserLocks::new(),
        }
    }

    /// Build the production collaborators from `config`: validates the
    /// configuration, logs in to Discord and resolves the target guild.
    /// Any failure here means the deployment is misconfigured.
    pub async fn connect(config: &SyncConfig) -> Result<Self> {
        config.validate()?;

        let directory: Arc<dyn PlatformDirectory> =
            Arc::new(DiscordDirectory::new(&config.discord)?);
        let bot = directory.current_user().await?;
        tracing::info!("logged in to Discord as {bot}");

        let resolver = MembershipResolver::connect(directory, &config.guild_id).await?;
        let reconciler = Reconciler::new(resolver, config.role_id.clone());
        let authority = Arc::new(HttpAuthority::new(&config.authority)?);

        Ok(Self::new(authority, reconciler))
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Run one trigger for `user_id`. The per-user lock is held from before
    /// the subscription read until after the role mutation.
    pub async fn run(&self, kind: OperationKind, user_id: &str) -> Result<ReconciliationOutcome> {
        if user_id.trim().is_empty() {
            return Err(SyncError::InvalidInput("user id must not be empty".into()));
        }

        let _guard = self.locks.acquire(user_id).await;

        let record = self.authority.fetch_status(user_id).await?;
        let outcome = match kind {
            OperationKind::Update => self.reconciler.reconcile(&record).await?,
            OperationKind::Remove => self.reconciler.remove_only(&record).await?,
        };

        tracing::info!(
            user_id,
            operation = %kind,
            subscribed = record.is_subscribed,
            outcome = %outcome,
            mutated = outcome.mutated(),
            "reconciliation finished"
        );
        Ok(outcome)
    }
}
