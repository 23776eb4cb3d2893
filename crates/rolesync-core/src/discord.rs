//! Discord REST implementation of [`PlatformDirectory`].
//!
//! Talks to the HTTP API directly with a bot token; no gateway connection is
//! opened. A single pooled `reqwest::Client` backs every request.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use crate::authority::retry_after;
use crate::config::{DiscordConfig, RetryPolicy};
use crate::directory::PlatformDirectory;
use crate::error::{Result, SyncError};
use crate::types::{Community, Member};

const AUDIT_LOG_REASON: &str = "Subscription status sync";

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct DiscordGuild {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DiscordMember {
    user: DiscordUser,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DiscordErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

pub struct DiscordDirectory {
    client: reqwest::Client,
    api_base: String,
    token: String,
    retry: RetryPolicy,
}

/// Discord ids are snowflakes: unsigned 64-bit integers sent as decimal
/// strings. Anything else must never reach a request path.
fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) && id.parse::<u64>().is_ok()
}

impl DiscordDirectory {
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(
                "DiscordBot (https://github.com/orchard9/rolesync, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            retry: config.retry.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_base))
            .header("Authorization", format!("Bot {}", self.token))
    }

    /// Send `req`, retrying 429 responses after Discord's `Retry-After`.
    /// The last 429 is returned to the caller once attempts run out.
    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let this_try = req
                .try_clone()
                .ok_or_else(|| SyncError::Platform(format!("{what}: request not cloneable")))?;
            let resp = this_try
                .send()
                .await
                .map_err(|e| SyncError::Platform(format!("{what}: request failed: {e}")))?;
            if resp.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= max_attempts {
                return Ok(resp);
            }

            let delay = self.retry.delay_for(attempt, retry_after(resp.headers()));
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "{what}: rate limited by Discord, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// GET `path`, mapping 404 to `None`.
    async fn get_optional<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<Option<T>> {
        let resp = self.send(self.request(Method::GET, path), what).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp, what).await?;
        let value = resp
            .json::<T>()
            .await
            .map_err(|e| SyncError::Platform(format!("{what}: unexpected response: {e}")))?;
        Ok(Some(value))
    }

    async fn mutate_role(
        &self,
        method: Method,
        community_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<()> {
        let what = format!("{method} role {role_id} on member {user_id}");
        if let Some(bad) = [community_id, user_id, role_id]
            .into_iter()
            .find(|id| !is_snowflake(id))
        {
            return Err(SyncError::Platform(format!("{what}: invalid id '{bad}'")));
        }
        let req = self
            .request(
                method,
                &format!("/guilds/{community_id}/members/{user_id}/roles/{role_id}"),
            )
            .header("X-Audit-Log-Reason", AUDIT_LOG_REASON);
        let resp = self.send(req, &what).await?;
        check_status(resp, &what).await?;
        Ok(())
    }
}

/// Turn a non-success response into a `Platform` error carrying Discord's
/// error code and message when present.
async fn check_status(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = match resp.json::<DiscordErrorBody>().await {
        Ok(body) if !body.message.is_empty() => format!(" ({}: {})", body.code, body.message),
        _ => String::new(),
    };
    Err(SyncError::Platform(format!(
        "{what}: Discord returned {status}{detail}"
    )))
}

#[async_trait]
impl PlatformDirectory for DiscordDirectory {
    async fn current_user(&self) -> Result<String> {
        let user: DiscordUser = self
            .get_optional("/users/@me", "fetch current user")
            .await?
            .ok_or_else(|| SyncError::Platform("fetch current user: not found".into()))?;
        Ok(user.username)
    }

    async fn fetch_community(&self, community_id: &str) -> Result<Option<Community>> {
        if !is_snowflake(community_id) {
            return Ok(None);
        }
        let guild: Option<DiscordGuild> = self
            .get_optional(&format!("/guilds/{community_id}"), "fetch guild")
            .await?;
        Ok(guild.map(|g| Community {
            id: g.id,
            name: g.name,
        }))
    }

    async fn fetch_member(&self, community_id: &str, user_id: &str) -> Result<Option<Member>> {
        if !is_snowflake(community_id) || !is_snowflake(user_id) {
            tracing::warn!(user_id, "linked Discord id is not a snowflake, treating as absent");
            return Ok(None);
        }
        let member: Option<DiscordMember> = self
            .get_optional(
                &format!("/guilds/{community_id}/members/{user_id}"),
                "fetch member",
            )
            .await?;
        Ok(member.map(|m| Member {
            user_id: m.user.id,
            username: Some(m.user.username),
            roles: m.roles.into_iter().collect(),
        }))
    }

    async fn add_role(&self, community_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.mutate_role(Method::PUT, community_id, user_id, role_id)
            .await
    }

    async fn remove_role(&self, community_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.mutate_role(Method::DELETE, community_id, user_id, role_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const GUILD: &str = "613425648685547541";
    const USER: &str = "80351110224678912";
    const ROLE: &str = "41771983423143936";

    fn directory(api_base: &str) -> DiscordDirectory {
        DiscordDirectory::new(&DiscordConfig {
            token: "bot-token".into(),
            api_base: api_base.to_string(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::fast(3),
        })
        .unwrap()
    }

    fn member_path() -> String {
        format!("/guilds/{GUILD}/members/{USER}")
    }

    fn role_path() -> String {
        format!("/guilds/{GUILD}/members/{USER}/roles/{ROLE}")
    }

    #[test]
    fn snowflake_ids() {
        assert!(is_snowflake(USER));
        assert!(!is_snowflake(""));
        assert!(!is_snowflake("+123"));
        assert!(!is_snowflake("../../users/@me"));
        assert!(!is_snowflake("123/roles/456"));
        assert!(!is_snowflake("99999999999999999999999"));
    }

    #[tokio::test]
    async fn fetch_member_parses_roles() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", member_path().as_str())
            .match_header("authorization", "Bot bot-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"user":{{"id":"{USER}","username":"alice"}},"roles":["r1","r2"],"nick":null}}"#
            ))
            .create_async()
            .await;

        let member = directory(&server.url())
            .fetch_member(GUILD, USER)
            .await
            .unwrap()
            .expect("member should exist");

        mock.assert_async().await;
        assert_eq!(member.user_id, USER);
        assert_eq!(member.username.as_deref(), Some("alice"));
        assert!(member.has_role("r1"));
        assert!(member.has_role("r2"));
    }

    #[tokio::test]
    async fn unknown_member_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", member_path().as_str())
            .with_status(404)
            .with_body(r#"{"message":"Unknown Member","code":10007}"#)
            .create_async()
            .await;

        let member = directory(&server.url())
            .fetch_member(GUILD, USER)
            .await
            .unwrap();
        assert!(member.is_none());
    }

    #[tokio::test]
    async fn non_snowflake_member_id_never_requested() {
        let mut server = mockito::Server::new_async().await;
        let me = server
            .mock("GET", "/users/@me")
            .with_status(200)
            .with_body(r#"{"id":"1","username":"rolesync-bot"}"#)
            .expect(0)
            .create_async()
            .await;
        let any = server
            .mock("GET", mockito::Matcher::Any)
            .with_status(500)
            .expect(0)
            .create_async()
            .await;

        let member = directory(&server.url())
            .fetch_member(GUILD, "../../users/@me")
            .await
            .unwrap();

        assert!(member.is_none());
        me.assert_async().await;
        any.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_guild_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", format!("/guilds/{GUILD}").as_str())
            .with_status(404)
            .with_body(r#"{"message":"Unknown Guild","code":10004}"#)
            .create_async()
            .await;

        let guild = directory(&server.url()).fetch_community(GUILD).await.unwrap();
        assert!(guild.is_none());
    }

    #[tokio::test]
    async fn non_snowflake_guild_is_none() {
        let guild = directory("http://127.0.0.1:1")
            .fetch_community("my-guild")
            .await
            .unwrap();
        assert!(guild.is_none());
    }

    #[tokio::test]
    async fn add_role_puts_with_audit_reason() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", role_path().as_str())
            .match_header("authorization", "Bot bot-token")
            .match_header("x-audit-log-reason", AUDIT_LOG_REASON)
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        directory(&server.url())
            .add_role(GUILD, USER, ROLE)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remove_role_deletes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", role_path().as_str())
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        directory(&server.url())
            .remove_role(GUILD, USER, ROLE)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn role_mutation_rejects_non_snowflake_ids() {
        let err = directory("http://127.0.0.1:1")
            .add_role(GUILD, "../1", ROLE)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid id"), "got: {err}");
    }

    #[tokio::test]
    async fn rate_limited_mutation_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("PUT", role_path().as_str())
            .with_status(429)
            .with_header("retry-after", "0")
            .with_body(r#"{"message":"You are being rate limited.","retry_after":0.0,"global":false}"#)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("PUT", role_path().as_str())
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        directory(&server.url())
            .add_role(GUILD, USER, ROLE)
            .await
            .unwrap();
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn persistent_rate_limit_surfaces_429() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", member_path().as_str())
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(3)
            .create_async()
            .await;

        let err = directory(&server.url())
            .fetch_member(GUILD, USER)
            .await
            .unwrap_err();
        mock.assert_async().await;
        assert!(err.to_string().contains("429"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_permissions_surface_discord_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", role_path().as_str())
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Missing Permissions","code":50013}"#)
            .create_async()
            .await;

        let err = directory(&server.url())
            .add_role(GUILD, USER, ROLE)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("Missing Permissions"), "got: {msg}");
    }

    #[tokio::test]
    async fn current_user_returns_username() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/@me")
            .with_status(200)
            .with_body(r#"{"id":"1","username":"rolesync-bot"}"#)
            .create_async()
            .await;

        let name = directory(&server.url()).current_user().await.unwrap();
        assert_eq!(name, "rolesync-bot");
    }
}
