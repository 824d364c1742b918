//! Environment-driven configuration.
//!
//! Every reader takes a lookup function so callers and tests can supply
//! values without touching the process environment.

use std::env;
use std::str::FromStr;

use course_core::model::{ApiSettings, ApiSettingsDraft, SyncPolicy, SyncPolicyDraft};

use crate::error::ConfigError;

pub const API_BASE_URL_VAR: &str = "LEARN_API_BASE_URL";
pub const API_TOKEN_VAR: &str = "LEARN_API_TOKEN";
pub const API_TIMEOUT_VAR: &str = "LEARN_API_TIMEOUT_SECS";
pub const MIN_DELTA_VAR: &str = "LEARN_SYNC_MIN_DELTA";
pub const DWELL_VAR: &str = "LEARN_READING_DWELL_SECS";

/// # Errors
///
/// Returns `ConfigError` if the base URL is missing or a value is malformed.
pub fn api_settings_from_env() -> Result<ApiSettings, ConfigError> {
    api_settings_from_lookup(|var| env::var(var).ok())
}

/// # Errors
///
/// Returns `ConfigError` if the base URL is missing or a value is malformed.
pub fn api_settings_from_lookup(
    lookup: impl Fn(&'static str) -> Option<String>,
) -> Result<ApiSettings, ConfigError> {
    let draft = ApiSettingsDraft {
        base_url: lookup(API_BASE_URL_VAR),
        token: lookup(API_TOKEN_VAR),
        timeout_secs: parse_var(&lookup, API_TIMEOUT_VAR)?,
    };
    Ok(draft.validate()?)
}

/// Default policy with the optional overrides applied.
///
/// # Errors
///
/// Returns `ConfigError` if an override is malformed or out of range.
pub fn sync_policy_from_env() -> Result<SyncPolicy, ConfigError> {
    sync_policy_from_lookup(|var| env::var(var).ok())
}

/// # Errors
///
/// Returns `ConfigError` if an override is malformed or out of range.
pub fn sync_policy_from_lookup(
    lookup: impl Fn(&'static str) -> Option<String>,
) -> Result<SyncPolicy, ConfigError> {
    let mut draft = SyncPolicyDraft::default();
    if let Some(min_delta) = parse_var(&lookup, MIN_DELTA_VAR)? {
        draft.min_delta = min_delta;
    }
    if let Some(dwell) = parse_var(&lookup, DWELL_VAR)? {
        draft.dwell_secs = dwell;
    }
    Ok(draft.validate()?)
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber { var, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(
        pairs: &[(&'static str, &str)],
    ) -> impl Fn(&'static str) -> Option<String> + use<> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, (*v).to_owned())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn api_settings_require_base_url() {
        let err = api_settings_from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Api(_)));
    }

    #[test]
    fn api_settings_read_token_and_timeout() {
        let settings = api_settings_from_lookup(lookup(&[
            (API_BASE_URL_VAR, "https://learn.example.com/api"),
            (API_TOKEN_VAR, "secret"),
            (API_TIMEOUT_VAR, " 3 "),
        ]))
        .unwrap();
        assert_eq!(settings.base_url().as_str(), "https://learn.example.com/api/");
        assert_eq!(settings.token(), Some("secret"));
        assert_eq!(settings.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn malformed_timeout_names_the_variable() {
        let err = api_settings_from_lookup(lookup(&[
            (API_BASE_URL_VAR, "https://learn.example.com"),
            (API_TIMEOUT_VAR, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidNumber { var: API_TIMEOUT_VAR, .. }
        ));
    }

    #[test]
    fn policy_overrides_apply() {
        let policy = sync_policy_from_lookup(lookup(&[(DWELL_VAR, "60"), (MIN_DELTA_VAR, "0.1")]))
            .unwrap();
        assert_eq!(policy.dwell_secs(), 60);
        assert!((policy.min_delta() - 0.1).abs() < f64::EPSILON);
        assert_eq!(sync_policy_from_lookup(lookup(&[])).unwrap(), SyncPolicy::default());
    }

    #[test]
    fn out_of_range_policy_is_rejected() {
        let err = sync_policy_from_lookup(lookup(&[(MIN_DELTA_VAR, "1.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::Policy(_)));
    }
}
