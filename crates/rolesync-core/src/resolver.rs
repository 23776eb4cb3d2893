use std::sync::Arc;

use crate::directory::PlatformDirectory;
use crate::error::{Result, SyncError};
use crate::types::{Community, Member};

/// Maps a Discord user id to a member of the one guild this process manages.
#[derive(Clone)]
pub struct MembershipResolver {
    directory: Arc<dyn PlatformDirectory>,
    community: Community,
}

impl MembershipResolver {
    /// Resolve the configured guild. A missing guild is a deployment error
    /// and should abort startup.
    pub async fn connect(
        directory: Arc<dyn PlatformDirectory>,
        community_id: &str,
    ) -> Result<Self> {
        let community = directory
            .fetch_community(community_id)
            .await?
            .ok_or_else(|| SyncError::CommunityNotFound(community_id.to_string()))?;
        tracing::info!(
            community_id = %community.id,
            community = %community.name,
            "resolved target community"
        );
        Ok(Self {
            directory,
            community,
        })
    }

    pub fn community(&self) -> &Community {
        &self.community
    }

    pub fn directory(&self) -> &Arc<dyn PlatformDirectory> {
        &self.directory
    }

    /// Look up `platform_user_id` in the guild. `Ok(None)` means the user is
    /// not a member (left, or the linked id is stale).
    pub async fn resolve_member(&self, platform_user_id: &str) -> Result<Option<Member>> {
        if platform_user_id.trim().is_empty() {
            return Err(SyncError::InvalidInput(
                "platform user id must not be empty".into(),
            ));
        }
        self.directory
            .fetch_member(&self.community.id, platform_user_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;

    #[tokio::test]
    async fn connect_fails_for_unknown_community() {
        let directory = Arc::new(FakeDirectory::new("g1"));
        let err = MembershipResolver::connect(directory, "other")
            .await
            .err()
            .expect("connect should fail");
        assert!(matches!(err, SyncError::CommunityNotFound(ref id) if id == "other"));
    }

    #[tokio::test]
    async fn resolves_existing_member() {
        let directory = Arc::new(FakeDirectory::new("g1").with_member("d1", &["r1"]));
        let resolver = MembershipResolver::connect(directory, "g1").await.unwrap();
        let member = resolver.resolve_member("d1").await.unwrap().unwrap();
        assert!(member.has_role("r1"));
        assert_eq!(resolver.community().id, "g1");
    }

    #[tokio::test]
    async fn absent_member_is_none() {
        let directory = Arc::new(FakeDirectory::new("g1"));
        let resolver = MembershipResolver::connect(directory, "g1").await.unwrap();
        assert!(resolver.resolve_member("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_id_rejected_without_lookup() {
        let directory = Arc::new(FakeDirectory::new("g1"));
        let resolver = MembershipResolver::connect(directory.clone(), "g1")
            .await
            .unwrap();
        assert!(resolver.resolve_member("").await.is_err());
        assert_eq!(directory.member_lookups(), 0);
    }
}
