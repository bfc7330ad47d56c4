//! Client configuration, validated and stored once per client lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{ClientError, Result};

/// Connection settings supplied to `initialize`.
///
/// Set exactly once per client lifetime; a second initialization with a
/// differing configuration is rejected.
///
/// # Security
///
/// The pass phrase keys payload encryption and must never be logged; the
/// `Debug` implementation redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL requests with relative paths are resolved against
    pub base_url: String,
    /// Whether request/response payloads are encrypted with the pass phrase
    pub is_encryption_required: bool,
    /// Identifier sent to the server with every request
    pub client_id: String,
    /// Encryption pass phrase; required iff encryption is enabled
    #[serde(default)]
    pub pass_phrase: Option<String>,
}

impl ClientConfig {
    /// Validate the configuration and return the parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the base URL is malformed or not
    /// http(s), the client id is empty, or encryption is enabled without a
    /// pass phrase.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::InvalidConfig(format!("invalid base URL '{}': {}", self.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.client_id.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "client id must not be empty".to_string(),
            ));
        }

        if self.is_encryption_required
            && self.pass_phrase.as_deref().map_or(true, |p| p.is_empty())
        {
            return Err(ClientError::InvalidConfig(
                "pass phrase is required when encryption is enabled".to_string(),
            ));
        }

        Ok(url)
    }
}

// Custom Debug implementation to avoid logging the pass phrase
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("is_encryption_required", &self.is_encryption_required)
            .field("client_id", &self.client_id)
            .field(
                "pass_phrase",
                &self.pass_phrase.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_config() -> ClientConfig {
        ClientConfig {
            base_url: "https://api.example.com".to_string(),
            is_encryption_required: false,
            client_id: "client-1".to_string(),
            pass_phrase: None,
        }
    }

    #[test]
    fn test_valid_config() {
        let url = plain_config().validate().unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = ClientConfig {
            base_url: "not a url".to_string(),
            ..plain_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let config = ClientConfig {
            base_url: "ftp://files.example.com".to_string(),
            ..plain_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_client_id_rejected() {
        let config = ClientConfig {
            client_id: "  ".to_string(),
            ..plain_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_encryption_requires_pass_phrase() {
        let config = ClientConfig {
            is_encryption_required: true,
            pass_phrase: None,
            ..plain_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfig(_))
        ));

        let config = ClientConfig {
            is_encryption_required: true,
            pass_phrase: Some(String::new()),
            ..plain_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfig(_))
        ));

        let config = ClientConfig {
            is_encryption_required: true,
            pass_phrase: Some("secret".to_string()),
            ..plain_config()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_pass_phrase() {
        let config = ClientConfig {
            is_encryption_required: true,
            pass_phrase: Some("super-secret".to_string()),
            ..plain_config()
        };
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("super-secret"));
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_value(plain_config()).unwrap();
        assert!(json.get("baseUrl").is_some());
        assert!(json.get("isEncryptionRequired").is_some());
        assert!(json.get("clientId").is_some());
    }
}
