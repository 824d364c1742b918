use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiSettingsError {
    #[error("API base URL is missing")]
    MissingBaseUrl,

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("request timeout must be > 0 seconds")]
    InvalidTimeout,
}

/// Validated location and credentials of the learning backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiSettings {
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

/// Raw settings as read from the environment or flags.
#[derive(Clone, Debug, Default)]
pub struct ApiSettingsDraft {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ApiSettingsDraft {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `ApiSettingsError` if the base URL is missing or unparsable, or
    /// the timeout is zero.
    pub fn validate(self) -> Result<ApiSettings, ApiSettingsError> {
        let raw = normalize_optional(self.base_url).ok_or(ApiSettingsError::MissingBaseUrl)?;
        // Url::join drops the last path segment unless it ends in '/'.
        let with_slash = if raw.ends_with('/') {
            raw
        } else {
            format!("{raw}/")
        };
        let base_url = Url::parse(&with_slash)
            .map_err(|_| ApiSettingsError::InvalidBaseUrl(with_slash.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiSettingsError::InvalidBaseUrl(with_slash));
        }

        let timeout_secs = self.timeout_secs.unwrap_or(Self::DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ApiSettingsError::InvalidTimeout);
        }

        Ok(ApiSettings {
            base_url,
            token: normalize_optional(self.token),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl ApiSettings {
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve a relative API path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ApiSettingsError::InvalidBaseUrl` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiSettingsError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|_| ApiSettingsError::InvalidBaseUrl(path.to_owned()))
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
