use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Community, Member};

/// The chat platform's guild and member directory.
///
/// One instance is shared by every in-flight request. Lookups return
/// `Ok(None)` when the platform reports the entity does not exist; transport
/// and permission failures are errors.
#[async_trait]
pub trait PlatformDirectory: Send + Sync {
    /// Display name of the account the directory is authenticated as.
    async fn current_user(&self) -> Result<String>;

    async fn fetch_community(&self, community_id: &str) -> Result<Option<Community>>;

    async fn fetch_member(&self, community_id: &str, user_id: &str) -> Result<Option<Member>>;

    async fn add_role(&self, community_id: &str, user_id: &str, role_id: &str) -> Result<()>;

    async fn remove_role(&self, community_id: &str, user_id: &str, role_id: &str) -> Result<()>;
}
