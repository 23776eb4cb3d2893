use clap::Args;
use rolesync_core::config::{
    AuthorityConfig, DiscordConfig, RetryPolicy, SyncConfig, DEFAULT_DISCORD_API_BASE,
};
use std::time::Duration;

/// Connection settings shared by every command. Each value can come from a
/// flag or its environment variable.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Discord bot token
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    pub discord_token: String,

    /// Guild whose subscriber role is managed
    #[arg(long, env = "GUILD_ID")]
    pub guild_id: String,

    /// Role granted to subscribers
    #[arg(long, env = "ROLE_ID")]
    pub role_id: String,

    /// Shared secret webhook callers must present
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: String,

    /// Base URL of the subscription service
    #[arg(long, env = "SUBSCRIPTION_API_URL")]
    pub authority_url: String,

    /// Bearer credential for the subscription service
    #[arg(long, env = "SUBSCRIPTION_API_KEY", hide_env_values = true)]
    pub authority_key: String,

    /// Discord REST API base URL
    #[arg(long, env = "DISCORD_API_BASE", default_value = DEFAULT_DISCORD_API_BASE)]
    pub discord_api_base: String,

    /// Timeout for each outbound HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Attempts per subscription service read (1 disables retries)
    #[arg(long, env = "AUTHORITY_MAX_ATTEMPTS", default_value_t = 3)]
    pub authority_max_attempts: u32,
}

impl Settings {
    pub fn to_config(&self) -> SyncConfig {
        let timeout = Duration::from_secs(self.http_timeout_secs);
        SyncConfig {
            guild_id: self.guild_id.trim().to_string(),
            role_id: self.role_id.trim().to_string(),
            webhook_secret: self.webhook_secret.clone(),
            authority: AuthorityConfig {
                base_url: self.authority_url.trim().to_string(),
                api_key: self.authority_key.clone(),
                timeout,
                retry: RetryPolicy {
                    max_attempts: self.authority_max_attempts,
                    ..RetryPolicy::default()
                },
            },
            discord: DiscordConfig {
                token: self.discord_token.clone(),
                api_base: self.discord_api_base.trim().to_string(),
                timeout,
                retry: RetryPolicy::default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        settings: Settings,
    }

    fn parse(extra: &[&str]) -> Settings {
        let mut args = vec![
            "rolesync",
            "--discord-token",
            "tok",
            "--guild-id",
            " g1 ",
            "--role-id",
            "r1",
            "--webhook-secret",
            "s",
            "--authority-url",
            "https://subs.example.com",
            "--authority-key",
            "k",
        ];
        args.extend_from_slice(extra);
        Wrapper::try_parse_from(args).unwrap().settings
    }

    #[test]
    fn defaults_fill_optional_values() {
        let config = parse(&[]).to_config();
        assert_eq!(config.guild_id, "g1");
        assert_eq!(config.discord.api_base, DEFAULT_DISCORD_API_BASE);
        assert_eq!(config.authority.timeout, Duration::from_secs(10));
        assert_eq!(config.authority.retry.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse(&["--http-timeout-secs", "2", "--authority-max-attempts", "1"]).to_config();
        assert_eq!(config.discord.timeout, Duration::from_secs(2));
        assert_eq!(config.authority.retry.max_attempts, 1);
    }
}
