use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Stripe secret key is set and currency is a 3-letter code
/// - Unsigned webhooks are only accepted when explicitly allowed
/// - API key auth has a key
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let stripe = &config.stripe;
    if stripe.secret_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "stripe.secret_key must be set".to_string(),
        ));
    }

    if stripe.currency.len() != 3 || !stripe.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::ValidationError(format!(
            "stripe.currency must be a 3-letter code, got {:?}",
            stripe.currency
        )));
    }

    let has_secret = stripe
        .webhook_secret
        .as_ref()
        .is_some_and(|s| !s.trim().is_empty());
    if !has_secret && !stripe.allow_unsigned_webhooks {
        return Err(ConfigError::ValidationError(
            "stripe.webhook_secret must be set unless stripe.allow_unsigned_webhooks = true"
                .to_string(),
        ));
    }

    if stripe.signature_tolerance_secs <= 0 {
        return Err(ConfigError::ValidationError(
            "stripe.signature_tolerance_secs must be positive".to_string(),
        ));
    }

    if config.ops.method == AuthMethod::ApiKey
        && config
            .ops
            .api_key
            .as_ref()
            .map_or(true, |k| k.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "ops.api_key must be set when ops.method = \"api_key\"".to_string(),
        ));
    }

    if config.live.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "live.channel_capacity cannot be 0".to_string(),
        ));
    }

    Ok(())
}
