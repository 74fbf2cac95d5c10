use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Operator auth. Required so open access is always a deliberate choice.
    pub ops: OpsAuthConfig,
    pub stripe: StripeConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
    #[serde(default)]
    pub live: LiveConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("valet.db")
}

/// Operator authentication method
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Operator endpoint authentication
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpsAuthConfig {
    pub method: AuthMethod,
    /// Required when method is `api_key`
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Stripe payment provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeConfig {
    pub secret_key: String,
    /// Signing secret for webhook verification (whsec_...)
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Accept unsigned webhooks when no secret is set. Local use only.
    #[serde(default)]
    pub allow_unsigned_webhooks: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Maximum age of a signed webhook (default: 300)
    #[serde(default = "default_signature_tolerance")]
    pub signature_tolerance_secs: i64,
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Window for collapsing duplicate intent requests; 0 disables (default: 60)
    #[serde(default = "default_idempotency_window")]
    pub idempotency_window_secs: u64,
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_signature_tolerance() -> i64 {
    300
}

fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_idempotency_window() -> u64 {
    60
}

/// Twilio SMS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 format
    pub from_number: String,
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}

/// Live status feed configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiveConfig {
    /// Broadcast buffer size; slow subscribers skip ahead past it
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub ops: SanitizedOpsConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: SanitizedStripeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<SanitizedSmsConfig>,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedOpsConfig {
    pub method: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStripeConfig {
    pub secret_key_configured: bool,
    pub webhook_secret_configured: bool,
    pub allow_unsigned_webhooks: bool,
    pub currency: String,
    pub signature_tolerance_secs: i64,
    pub api_base: String,
    pub timeout_secs: u64,
    pub idempotency_window_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSmsConfig {
    pub account_sid: String,
    pub auth_token_configured: bool,
    pub from_number: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            ops: SanitizedOpsConfig {
                method: match config.ops.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            stripe: SanitizedStripeConfig {
                secret_key_configured: !config.stripe.secret_key.is_empty(),
                webhook_secret_configured: config
                    .stripe
                    .webhook_secret
                    .as_ref()
                    .is_some_and(|s| !s.is_empty()),
                allow_unsigned_webhooks: config.stripe.allow_unsigned_webhooks,
                currency: config.stripe.currency.clone(),
                signature_tolerance_secs: config.stripe.signature_tolerance_secs,
                api_base: config.stripe.api_base.clone(),
                timeout_secs: config.stripe.timeout_secs,
                idempotency_window_secs: config.stripe.idempotency_window_secs,
            },
            sms: config.sms.as_ref().map(|s| SanitizedSmsConfig {
                account_sid: s.account_sid.clone(),
                auth_token_configured: !s.auth_token.is_empty(),
                from_number: s.from_number.clone(),
            }),
            live: config.live.clone(),
        }
    }
}
