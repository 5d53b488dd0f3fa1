//! Recorder configuration.
//!
//! Loaded from a JSON file:
//!
//! ```json
//! { "token": "s3cret", "reply_timeout_ms": 10000 }
//! ```
//!
//! or from the environment (`JR_MEDIA_RECORDING_TOKEN`, `JR_REPLY_TIMEOUT_MS`).
//! An absent or empty token means recording control is open to any caller.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable holding the recording token.
pub const TOKEN_ENV: &str = "JR_MEDIA_RECORDING_TOKEN";

/// Environment variable holding the start reply timeout in milliseconds.
pub const REPLY_TIMEOUT_ENV: &str = "JR_REPLY_TIMEOUT_MS";

/// Who may start and stop recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Any caller may control recording
    Open,
    /// Callers must present exactly this token
    Token(String),
}

impl AuthPolicy {
    /// Empty or missing tokens yield [`AuthPolicy::Open`].
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(token) if !token.is_empty() => Self::Token(token.to_string()),
            _ => Self::Open,
        }
    }

    pub fn authorize(&self, presented: Option<&str>) -> bool {
        match self {
            Self::Open => true,
            Self::Token(expected) => presented == Some(expected.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub token: Option<String>,
    /// How long a START waits for its reply
    pub reply_timeout_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            token: None,
            reply_timeout_ms: jr_runtime::DEFAULT_REPLY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl RecorderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self {
            token: lookup(TOKEN_ENV),
            ..Self::default()
        };

        if let Some(raw) = lookup(REPLY_TIMEOUT_ENV) {
            config.reply_timeout_ms = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: REPLY_TIMEOUT_ENV,
                message: format!("{raw:?}: {e}"),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn auth_policy(&self) -> AuthPolicy {
        AuthPolicy::from_token(self.token.as_deref())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.reply_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reply_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_token_is_open() {
        assert_eq!(AuthPolicy::from_token(None), AuthPolicy::Open);
        assert_eq!(AuthPolicy::from_token(Some("")), AuthPolicy::Open);
        assert_eq!(
            AuthPolicy::from_token(Some("t")),
            AuthPolicy::Token("t".to_string())
        );
    }

    #[test]
    fn test_token_policy_requires_exact_match() {
        let policy = AuthPolicy::Token("s3cret".to_string());
        assert!(policy.authorize(Some("s3cret")));
        assert!(!policy.authorize(Some("S3CRET")));
        assert!(!policy.authorize(Some("")));
        assert!(!policy.authorize(None));

        assert!(AuthPolicy::Open.authorize(None));
        assert!(AuthPolicy::Open.authorize(Some("anything")));
    }

    #[test]
    fn test_json_defaults() {
        let config = RecorderConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RecorderConfig::default());
        assert_eq!(config.reply_timeout(), Duration::from_secs(10));

        let config =
            RecorderConfig::from_json_str(r#"{"token": "abc", "reply_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.auth_policy(), AuthPolicy::Token("abc".to_string()));
        assert_eq!(config.reply_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = RecorderConfig::from_json_str(r#"{"reply_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "reply_timeout_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(TOKEN_ENV, "tok"), (REPLY_TIMEOUT_ENV, " 500 ")]);
        let config = RecorderConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.reply_timeout_ms, 500);

        let err = RecorderConfig::from_lookup(|key| {
            (key == REPLY_TIMEOUT_ENV).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: REPLY_TIMEOUT_ENV, .. }));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorder.json");
        std::fs::write(&path, r#"{"token": ""}"#).unwrap();

        let config = RecorderConfig::from_path(&path).unwrap();
        assert_eq!(config.auth_policy(), AuthPolicy::Open);

        let missing = RecorderConfig::from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
