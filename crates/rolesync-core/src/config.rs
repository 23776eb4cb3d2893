use crate::error::{Result, SyncError};
use std::time::Duration;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_PORT: u16 = 3000;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Bounded exponential backoff for subscription service reads.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(200)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(2)
}

fn default_multiplier() -> u32 {
    2
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            multiplier: default_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Millisecond backoff for tests.
    pub fn fast(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Delay before the next attempt. A server-supplied `Retry-After` wins
    /// over the computed backoff but is still capped at `max_backoff`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(self.max_backoff),
            None => self.backoff_for(attempt),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthorityConfig / DiscordConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthorityConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub api_base: String,
    pub timeout: Duration,
    /// Applied to rate-limited (429) responses only.
    pub retry: RetryPolicy,
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Process-wide settings. Fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub guild_id: String,
    pub role_id: String,
    pub webhook_secret: String,
    pub authority: AuthorityConfig,
    pub discord: DiscordConfig,
}

impl SyncConfig {
    /// Reject empty required values. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("guild id", &self.guild_id),
            ("role id", &self.role_id),
            ("webhook secret", &self.webhook_secret),
            ("subscription service URL", &self.authority.base_url),
            ("subscription service key", &self.authority.api_key),
            ("Discord bot token", &self.discord.token),
            ("Discord API base", &self.discord.api_base),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("{name} must not be empty")));
            }
        }

        for (name, url) in [
            ("subscription service URL", &self.authority.base_url),
            ("Discord API base", &self.discord.api_base),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SyncError::Config(format!(
                    "{name} must start with http:// or https://, got '{url}'"
                )));
            }
        }

        if self.authority.retry.max_attempts == 0 {
            return Err(SyncError::Config(
                "subscription service max attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
