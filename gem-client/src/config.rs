use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::{health::HEALTH_URL, paths::GemPaths, process::DEFAULT_INTERPRETER};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid health url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("health url must use http or https, got {0:?}")]
    UnsupportedScheme(String),
}

/// Effective runtime settings after command-line overrides.
#[derive(Debug, Clone)]
pub struct GemConfig {
    pub paths: GemPaths,
    pub interpreter: String,
    pub health_url: Url,
    /// `None` disables the suggestion popup's auto-dismiss.
    pub suggestion_timeout: Option<Duration>,
}

impl GemConfig {
    pub fn new(
        paths: GemPaths,
        interpreter: Option<String>,
        health_url: &str,
        suggestion_timeout_secs: Option<u64>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            paths,
            interpreter: interpreter.unwrap_or_else(|| DEFAULT_INTERPRETER.to_owned()),
            health_url: validate_health_url(health_url)?,
            suggestion_timeout: match suggestion_timeout_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => gem_core::PopupKind::Suggestion.default_countdown(),
            },
        })
    }
}

pub fn validate_health_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_health_url("http://localhost:3030/health").is_ok());
        assert!(validate_health_url("https://gem.local/health").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert!(matches!(
            validate_health_url("ws://localhost:3030/health"),
            Err(ConfigError::UnsupportedScheme(scheme)) if scheme == "ws"
        ));
        assert!(matches!(
            validate_health_url("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn zero_timeout_disables_auto_dismiss() {
        let config = GemConfig::new(GemPaths::new("/opt/gem"), None, HEALTH_URL, Some(0))
            .expect("valid config");
        assert_eq!(config.suggestion_timeout, None);
        assert_eq!(config.interpreter, "node");

        let config = GemConfig::new(GemPaths::new("/opt/gem"), None, HEALTH_URL, None)
            .expect("valid config");
        assert_eq!(config.suggestion_timeout, Some(Duration::from_secs(15)));
    }
}
