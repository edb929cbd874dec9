//! Client configuration.
//!
//! Values come from code (`ClientConfig::new`) or from the environment
//! (`ClientConfig::from_env`), where a `.env` file in the working directory
//! is loaded first if present.

use std::fmt;

use crate::error::ApiError;

/// Root of the vendor's v2 REST API.
pub const DEFAULT_API_ROOT: &str = "https://api.constantcontact.com/v2/";

pub const ENV_API_KEY: &str = "CONSTANTCONTACT_API_KEY";
pub const ENV_API_TOKEN: &str = "CONSTANTCONTACT_API_TOKEN";
pub const ENV_API_ROOT: &str = "CONSTANTCONTACT_API_ROOT";

/// Credentials and endpoint for a `Session`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Sent as the `api_key` query parameter.
    pub api_key: String,
    /// Sent as `Authorization: Bearer <token>`.
    pub access_token: String,
    /// Base URL every request path is appended to.
    pub api_root: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            access_token: access_token.into(),
            api_root: DEFAULT_API_ROOT.to_string(),
        }
    }

    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        self.api_root = api_root.into();
        self
    }

    /// Read the configuration from `CONSTANTCONTACT_API_KEY`,
    /// `CONSTANTCONTACT_API_TOKEN` and, optionally,
    /// `CONSTANTCONTACT_API_ROOT`.
    pub fn from_env() -> Result<Self, ApiError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::Configuration(format!("{name} is not set")))
        };
        let config = Self::new(required(ENV_API_KEY)?, required(ENV_API_TOKEN)?);
        Ok(match lookup(ENV_API_ROOT).filter(|v| !v.is_empty()) {
            Some(root) => config.with_api_root(root),
            None => config,
        })
    }

    /// Check credentials and normalise `api_root` to end in a single `/`.
    pub(crate) fn validated(mut self) -> Result<Self, ApiError> {
        if self.api_key.trim().is_empty() {
            return Err(ApiError::Configuration("api key is empty".to_string()));
        }
        if self.access_token.trim().is_empty() {
            return Err(ApiError::Configuration("access token is empty".to_string()));
        }
        let root = self.api_root.trim_end_matches('/');
        if root.is_empty() {
            return Err(ApiError::Configuration("api root is empty".to_string()));
        }
        self.api_root = format!("{root}/");
        Ok(self)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key)
            .field("access_token", &"<redacted>")
            .field("api_root", &self.api_root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn new_uses_vendor_root() {
        let config = ClientConfig::new("key", "token");
        assert_eq!(config.api_root, DEFAULT_API_ROOT);
    }

    #[test]
    fn from_lookup_reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "key"),
            (ENV_API_TOKEN, "token"),
            (ENV_API_ROOT, "http://127.0.0.1:9000/v2"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.access_token, "token");
        assert_eq!(config.api_root, "http://127.0.0.1:9000/v2");
    }

    // The only test in this binary that touches the process environment.
    #[test]
    fn from_env_reads_process_environment() {
        std::env::set_var(ENV_API_KEY, "env-key");
        std::env::set_var(ENV_API_TOKEN, "env-token");
        std::env::set_var(ENV_API_ROOT, "http://127.0.0.1:9100/v2/");

        let config = ClientConfig::from_env();

        std::env::remove_var(ENV_API_KEY);
        std::env::remove_var(ENV_API_TOKEN);
        std::env::remove_var(ENV_API_ROOT);

        let config = config.unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.access_token, "env-token");
        assert_eq!(config.api_root, "http://127.0.0.1:9100/v2/");
    }

    #[test]
    fn from_lookup_requires_token() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_API_KEY, "key")])).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(msg) if msg.contains(ENV_API_TOKEN)));
    }

    #[test]
    fn validated_normalises_trailing_slashes() {
        let config = ClientConfig::new("k", "t")
            .with_api_root("http://localhost:3000/v2///")
            .validated()
            .unwrap();
        assert_eq!(config.api_root, "http://localhost:3000/v2/");

        let config = ClientConfig::new("k", "t")
            .with_api_root("http://localhost:3000/v2")
            .validated()
            .unwrap();
        assert_eq!(config.api_root, "http://localhost:3000/v2/");
    }

    #[test]
    fn validated_rejects_blank_credentials() {
        assert!(ClientConfig::new("", "t").validated().is_err());
        assert!(ClientConfig::new("k", "  ").validated().is_err());
        assert!(ClientConfig::new("k", "t").with_api_root("/").validated().is_err());
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", ClientConfig::new("key", "s3cret"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("key"));
    }
}
