//! Process configuration.
//!
//! Everything is resolved once at startup (CLI flags, falling back to environment variables and an
//! optional `.env` file) into an immutable [`Config`] that is shared by reference.

use crate::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.sendblue.co/api";
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://api.sendblue.co/accounts";
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Every outbound request is bounded by this.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug, Clone)]
#[command(name = "sendblue-mcp")]
#[command(about = "Expose the Sendblue SMS/iMessage API as MCP tools")]
pub struct Cli {
    /// Sendblue API key id.
    #[arg(long, env = "SENDBLUE_API_KEY_ID", hide_env_values = true)]
    pub api_key_id: Option<String>,

    /// Sendblue API secret key.
    #[arg(long, env = "SENDBLUE_API_SECRET_KEY", hide_env_values = true)]
    pub api_secret_key: Option<String>,

    /// Base URL for messaging and evaluation endpoints.
    #[arg(long, env = "SENDBLUE_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Base URL for account-level endpoints (message history).
    #[arg(long, env = "SENDBLUE_ACCOUNTS_BASE_URL", default_value = DEFAULT_ACCOUNTS_BASE_URL)]
    pub accounts_base_url: String,

    /// MCP transport: `stdio` or `http`. Unknown values fall back to `stdio`.
    #[arg(long, env = "MCP_TRANSPORT", default_value = "stdio")]
    pub transport: String,

    /// Bind host for the HTTP transport.
    #[arg(long, env = "MCP_HTTP_HOST", default_value = "0.0.0.0")]
    pub http_host: String,

    /// Bind port for the HTTP transport.
    #[arg(long, env = "MCP_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Log level (overridden by `RUST_LOG` when set).
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

impl Transport {
    /// Parse a transport name. Only the exact lowercase names `stdio` / `http` are accepted.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stdio" => Some(Self::Stdio),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Sendblue API credentials. Only obtainable through [`Config::check_credentials`].
#[derive(Clone)]
pub struct Credentials {
    pub(crate) key_id: String,
    pub(crate) secret_key: String,
}

impl Credentials {
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            key_id: "test_api_key_id".to_string(),
            secret_key: "test_api_secret_key".to_string(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    api_key_id: Option<String>,
    api_secret_key: Option<String>,
    /// No trailing slash.
    pub api_base_url: String,
    /// No trailing slash.
    pub accounts_base_url: String,
    pub transport: Transport,
    pub http_host: String,
    pub http_port: u16,
    pub request_timeout: Duration,
}

impl Config {
    /// Build the runtime configuration from parsed CLI/env values.
    ///
    /// An unknown transport name is not an error: it is logged and replaced with `stdio`.
    ///
    /// # Errors
    ///
    /// Returns an error if either base URL is not a valid absolute URL.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let transport = Transport::parse(&cli.transport).unwrap_or_else(|| {
            tracing::warn!(
                transport = %cli.transport,
                "invalid transport, defaulting to 'stdio'"
            );
            Transport::Stdio
        });

        Ok(Self {
            api_key_id: cli.api_key_id.clone(),
            api_secret_key: cli.api_secret_key.clone(),
            api_base_url: normalize_base_url(&cli.api_base_url)?,
            accounts_base_url: normalize_base_url(&cli.accounts_base_url)?,
            transport,
            http_host: cli.http_host.clone(),
            http_port: cli.http_port,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Configuration with production base URLs and the given credentials.
    #[must_use]
    pub fn with_credentials(api_key_id: Option<String>, api_secret_key: Option<String>) -> Self {
        Self {
            api_key_id,
            api_secret_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            accounts_base_url: DEFAULT_ACCOUNTS_BASE_URL.to_string(),
            transport: Transport::Stdio,
            http_host: "0.0.0.0".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Point both API surfaces at other base URLs (stubs, staging).
    ///
    /// # Errors
    ///
    /// Returns an error if either URL is invalid.
    pub fn with_base_urls(mut self, api: &str, accounts: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(api)?;
        self.accounts_base_url = normalize_base_url(accounts)?;
        Ok(self)
    }

    /// Verify both credentials are present and non-empty.
    ///
    /// Must pass before the gateway is built; nothing else is checked before tools run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming the first missing variable.
    pub fn check_credentials(&self) -> Result<Credentials, ConfigError> {
        let key_id = non_empty(self.api_key_id.as_deref())
            .ok_or(ConfigError::MissingCredential("SENDBLUE_API_KEY_ID"))?;
        let secret_key = non_empty(self.api_secret_key.as_deref())
            .ok_or(ConfigError::MissingCredential("SENDBLUE_API_SECRET_KEY"))?;
        Ok(Credentials {
            key_id: key_id.to_string(),
            secret_key: secret_key.to_string(),
        })
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

/// iMessage expressive send styles accepted by Sendblue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendStyle {
    Celebration,
    ShootingStar,
    Fireworks,
    Lasers,
    Love,
    Confetti,
    Balloons,
    Spotlight,
    Echo,
    Invisible,
    Gentle,
    Loud,
    Slam,
}

impl SendStyle {
    pub const ALL: [SendStyle; 13] = [
        Self::Celebration,
        Self::ShootingStar,
        Self::Fireworks,
        Self::Lasers,
        Self::Love,
        Self::Confetti,
        Self::Balloons,
        Self::Spotlight,
        Self::Echo,
        Self::Invisible,
        Self::Gentle,
        Self::Loud,
        Self::Slam,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Celebration => "celebration",
            Self::ShootingStar => "shooting_star",
            Self::Fireworks => "fireworks",
            Self::Lasers => "lasers",
            Self::Love => "love",
            Self::Confetti => "confetti",
            Self::Balloons => "balloons",
            Self::Spotlight => "spotlight",
            Self::Echo => "echo",
            Self::Invisible => "invisible",
            Self::Gentle => "gentle",
            Self::Loud => "loud",
            Self::Slam => "slam",
        }
    }

    /// Comma-separated list of accepted values, for error messages and schemas.
    #[must_use]
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for SendStyle {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|v| v.as_str() == s).ok_or(())
    }
}

impl fmt::Display for SendStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
