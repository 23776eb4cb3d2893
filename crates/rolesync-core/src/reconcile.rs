use crate::error::Result;
use crate::resolver::MembershipResolver;
use crate::types::{Community, Member, ReconciliationOutcome, SubscriptionRecord};

/// Brings a member's possession of the subscriber role into line with their
/// subscription status. Issues at most one role mutation per call.
#[derive(Clone)]
pub struct Reconciler {
    resolver: MembershipResolver,
    role_id: String,
}

impl Reconciler {
    pub fn new(resolver: MembershipResolver, role_id: impl Into<String>) -> Self {
        Self {
            resolver,
            role_id: role_id.into(),
        }
    }

    pub fn role_id(&self) -> &str {
        &self.role_id
    }

    pub fn community(&self) -> &Community {
        self.resolver.community()
    }

    /// Grant the role to subscribers who lack it, revoke it from
    /// non-subscribers who hold it, otherwise leave the member alone.
    pub async fn reconcile(&self, record: &SubscriptionRecord) -> Result<ReconciliationOutcome> {
        let member = match self.lookup(record).await? {
            Ok(member) => member,
            Err(outcome) => return Ok(outcome),
        };

        let has_role = member.has_role(&self.role_id);
        let desired = record.is_subscribed;

        if desired == has_role {
            return Ok(ReconciliationOutcome::NoOpAlreadyCorrect);
        }
        if desired {
            self.grant(&member).await?;
            Ok(ReconciliationOutcome::Granted)
        } else {
            self.revoke(&member).await?;
            Ok(ReconciliationOutcome::Revoked)
        }
    }

    /// Revoke the role if the member holds it. Never grants, whatever the
    /// subscription status says.
    pub async fn remove_only(&self, record: &SubscriptionRecord) -> Result<ReconciliationOutcome> {
        let member = match self.lookup(record).await? {
            Ok(member) => member,
            Err(outcome) => return Ok(outcome),
        };

        if !member.has_role(&self.role_id) {
            return Ok(ReconciliationOutcome::NoOpAlreadyCorrect);
        }
        self.revoke(&member).await?;
        Ok(ReconciliationOutcome::Revoked)
    }

    /// Resolve the record to a guild member, or the terminal outcome that
    /// stops reconciliation early.
    async fn lookup(
        &self,
        record: &SubscriptionRecord,
    ) -> Result<std::result::Result<Member, ReconciliationOutcome>> {
        let Some(platform_user_id) = record.platform_user_id.as_deref() else {
            tracing::info!(
                user_id = %record.external_user_id,
                "no linked Discord account"
            );
            return Ok(Err(ReconciliationOutcome::IdentityNotLinked));
        };

        match self.resolver.resolve_member(platform_user_id).await? {
            Some(member) => Ok(Ok(member)),
            None => {
                tracing::info!(
                    user_id = %record.external_user_id,
                    platform_user_id,
                    "linked Discord account is not a guild member"
                );
                Ok(Err(ReconciliationOutcome::MemberNotFound))
            }
        }
    }

    async fn grant(&self, member: &Member) -> Result<()> {
        self.resolver
            .directory()
            .add_role(&self.resolver.community().id, &member.user_id, &self.role_id)
            .await?;
        tracing::info!(
            platform_user_id = %member.user_id,
            role_id = %self.role_id,
            "granted subscriber role"
        );
        Ok(())
    }

    async fn revoke(&self, member: &Member) -> Result<()> {
        self.resolver
            .directory()
            .remove_role(&self.resolver.community().id, &member.user_id, &self.role_id)
            .await?;
        tracing::info!(
            platform_user_id = %member.user_id,
            role_id = %self.role_id,
            "revoked subscriber role"
        );
        Ok(())
    }
}
