use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// SubscriptionRecord
// ---------------------------------------------------------------------------

/// A user's subscription status as reported by the subscription service.
/// Built fresh for every request and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub external_user_id: String,
    /// `None` when the user has not linked a Discord account.
    pub platform_user_id: Option<String>,
    pub is_subscribed: bool,
}

impl SubscriptionRecord {
    pub fn new(
        external_user_id: impl Into<String>,
        platform_user_id: Option<String>,
        is_subscribed: bool,
    ) -> Self {
        Self {
            external_user_id: external_user_id.into(),
            platform_user_id: platform_user_id.filter(|id| !id.trim().is_empty()),
            is_subscribed,
        }
    }
}

// ---------------------------------------------------------------------------
// Community / Member
// ---------------------------------------------------------------------------

/// A resolved guild handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community {
    pub id: String,
    pub name: String,
}

/// Snapshot of a guild member's role state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: String,
    pub username: Option<String>,
    pub roles: HashSet<String>,
}

impl Member {
    pub fn new<I, S>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_id: user_id.into(),
            username: None,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.contains(role_id)
    }
}

// ---------------------------------------------------------------------------
// ReconciliationOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    Granted,
    Revoked,
    NoOpAlreadyCorrect,
    MemberNotFound,
    IdentityNotLinked,
}

impl ReconciliationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReconciliationOutcome::Granted => "granted",
            ReconciliationOutcome::Revoked => "revoked",
            ReconciliationOutcome::NoOpAlreadyCorrect => "no_op_already_correct",
            ReconciliationOutcome::MemberNotFound => "member_not_found",
            ReconciliationOutcome::IdentityNotLinked => "identity_not_linked",
        }
    }

    /// True when the platform was changed.
    pub fn mutated(self) -> bool {
        matches!(
            self,
            ReconciliationOutcome::Granted | ReconciliationOutcome::Revoked
        )
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Which reconciliation entry point a trigger runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Full reconciliation: grant or revoke to match the subscription.
    Update,
    /// Revoke only; never grants.
    Remove,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Update => "update",
            OperationKind::Remove => "remove",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
