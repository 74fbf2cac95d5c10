//! Operator authentication.
//!
//! Guests are never authenticated; the ticket code is their only
//! capability. Operator endpoints go through an [`Authenticator`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AuthMethod, OpsAuthConfig};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Request headers relevant to authentication, keys lowercased.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
}

/// Who is calling an operator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operator {
    pub id: String,
    pub method: String,
}

impl Operator {
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Operator, AuthError>;

    fn method_name(&self) -> &'static str;
}

/// Lets every request through. Must be chosen explicitly in config.
#[derive(Debug, Default)]
pub struct OpenAuthenticator;

#[async_trait]
impl Authenticator for OpenAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Operator, AuthError> {
        Ok(Operator::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

/// Accepts `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub struct ApiKeyAuthenticator {
    expected_key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            expected_key: api_key,
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(value) = request.headers.get("authorization") {
            let key = value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "));
            if key.is_some() {
                return key;
            }
        }
        request.headers.get("x-api-key").map(String::as_str)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Operator, AuthError> {
        let provided = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided.as_bytes(), self.expected_key.as_bytes()) {
            Ok(Operator {
                id: "operator".to_string(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Build the authenticator named by `config`.
pub fn create_authenticator(config: &OpsAuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(OpenAuthenticator)),
        AuthMethod::ApiKey => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "api_key must be set when using api_key auth method".to_string(),
                )
            })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}

/// Byte comparison whose running time does not depend on where inputs differ.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> AuthRequest {
        AuthRequest {
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_open_authenticator() {
        let operator = OpenAuthenticator.authenticate(&request(&[])).await.unwrap();
        assert_eq!(operator, Operator::anonymous());
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = ApiKeyAuthenticator::new("ops-key".to_string());
        let operator = auth
            .authenticate(&request(&[("Authorization", "Bearer ops-key")]))
            .await
            .unwrap();
        assert_eq!(operator.method, "api_key");
    }

    #[tokio::test]
    async fn test_x_api_key_header_valid() {
        let auth = ApiKeyAuthenticator::new("ops-key".to_string());
        let result = auth
            .authenticate(&request(&[("X-API-Key", "ops-key")]))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let auth = ApiKeyAuthenticator::new("ops-key".to_string());
        let result = auth
            .authenticate(&request(&[("Authorization", "Bearer nope")]))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let auth = ApiKeyAuthenticator::new("ops-key".to_string());
        let result = auth.authenticate(&request(&[])).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn test_create_authenticator() {
        let open = create_authenticator(&OpsAuthConfig {
            method: AuthMethod::None,
            api_key: None,
        })
        .unwrap();
        assert_eq!(open.method_name(), "none");

        let keyed = create_authenticator(&OpsAuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("k".to_string()),
        })
        .unwrap();
        assert_eq!(keyed.method_name(), "api_key");

        let missing = create_authenticator(&OpsAuthConfig {
            method: AuthMethod::ApiKey,
            api_key: None,
        });
        assert!(matches!(missing, Err(AuthError::ConfigurationError(_))));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
