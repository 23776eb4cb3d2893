//! In-memory collaborators for tests. They record every call so tests can
//! assert on how many reads and mutations a reconciliation issued.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::authority::SubscriptionAuthority;
use crate::directory::PlatformDirectory;
use crate::error::{Result, SyncError};
use crate::types::{Community, Member, SubscriptionRecord};

/// A role mutation recorded by [`FakeDirectory`]: `(user_id, role_id)`.
pub type RoleCall = (String, String);

// ---------------------------------------------------------------------------
// FakeDirectory
// ---------------------------------------------------------------------------

pub struct FakeDirectory {
    community_id: String,
    members: Mutex<HashMap<String, HashSet<String>>>,
    member_lookups: AtomicUsize,
    added: Mutex<Vec<RoleCall>>,
    removed: Mutex<Vec<RoleCall>>,
    fail_mutations: bool,
}

impl FakeDirectory {
    pub fn new(community_id: impl Into<String>) -> Self {
        Self {
            community_id: community_id.into(),
            members: Mutex::new(HashMap::new()),
            member_lookups: AtomicUsize::new(0),
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            fail_mutations: false,
        }
    }

    pub fn with_member(self, user_id: &str, roles: &[&str]) -> Self {
        lock(&self.members).insert(
            user_id.to_string(),
            roles.iter().map(|r| r.to_string()).collect(),
        );
        self
    }

    /// Make every role mutation fail with a platform error.
    pub fn failing_mutations(mut self) -> Self {
        self.fail_mutations = true;
        self
    }

    pub fn member_lookups(&self) -> usize {
        self.member_lookups.load(Ordering::SeqCst)
    }

    pub fn added(&self) -> Vec<RoleCall> {
        lock(&self.added).clone()
    }

    pub fn removed(&self) -> Vec<RoleCall> {
        lock(&self.removed).clone()
    }

    pub fn mutation_count(&self) -> usize {
        lock(&self.added).len() + lock(&self.removed).len()
    }

    pub fn roles_of(&self, user_id: &str) -> Option<HashSet<String>> {
        lock(&self.members).get(user_id).cloned()
    }

    fn check_community(&self, community_id: &str) -> Result<()> {
        if community_id == self.community_id {
            Ok(())
        } else {
            Err(SyncError::Platform(format!("unknown guild {community_id}")))
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PlatformDirectory for FakeDirectory {
    async fn current_user(&self) -> Result<String> {
        Ok("fake-bot".into())
    }

    async fn fetch_community(&self, community_id: &str) -> Result<Option<Community>> {
        Ok((community_id == self.community_id).then(|| Community {
            id: community_id.to_string(),
            name: "Fake Guild".into(),
        }))
    }

    async fn fetch_member(&self, community_id: &str, user_id: &str) -> Result<Option<Member>> {
        self.check_community(community_id)?;
        self.member_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.members)
            .get(user_id)
            .map(|roles| Member::new(user_id, roles.iter().cloned())))
    }

    async fn add_role(&self, community_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.check_community(community_id)?;
        if self.fail_mutations {
            return Err(SyncError::Platform("Missing Permissions".into()));
        }
        lock(&self.added).push((user_id.to_string(), role_id.to_string()));
        if let Some(roles) = lock(&self.members).get_mut(user_id) {
            roles.insert(role_id.to_string());
        }
        Ok(())
    }

    async fn remove_role(&self, community_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.check_community(community_id)?;
        if self.fail_mutations {
            return Err(SyncError::Platform("Missing Permissions".into()));
        }
        lock(&self.removed).push((user_id.to_string(), role_id.to_string()));
        if let Some(roles) = lock(&self.members).get_mut(user_id) {
            roles.remove(role_id);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeAuthority
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeAuthority {
    statuses: Mutex<HashMap<String, (Option<String>, bool)>>,
    calls: AtomicUsize,
    unavailable: bool,
}

impl FakeAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// An authority whose every read fails with `UpstreamUnavailable`.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn with_status(
        self,
        user_id: &str,
        platform_user_id: Option<&str>,
        subscribed: bool,
    ) -> Self {
        self.set_status(user_id, platform_user_id, subscribed);
        self
    }

    pub fn set_status(&self, user_id: &str, platform_user_id: Option<&str>, subscribed: bool) {
        lock(&self.statuses).insert(
            user_id.to_string(),
            (platform_user_id.map(str::to_string), subscribed),
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionAuthority for FakeAuthority {
    async fn fetch_status(&self, external_user_id: &str) -> Result<SubscriptionRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(SyncError::UpstreamUnavailable(
                "subscription service returned 503 Service Unavailable".into(),
            ));
        }
        let (platform_user_id, subscribed) = lock(&self.statuses)
            .get(external_user_id)
            .cloned()
            .unwrap_or((None, false));
        Ok(SubscriptionRecord::new(
            external_user_id,
            platform_user_id,
            subscribed,
        ))
    }
}
