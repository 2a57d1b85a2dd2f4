use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::utils::trim_line;

pub const API_URL_ENV: &str = "QUIZ_BUILDER_API_URL";
pub const TIMEOUT_ENV: &str = "QUIZ_BUILDER_TIMEOUT_SECS";
pub const DEFAULT_API_URL: &str = "https://superbackend-c4ew.onrender.com";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the question service, without a trailing slash.
    pub api_base_url: String,
    /// Per-request timeout. `None` leaves requests to the transport's own limits.
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Defaults, then environment, then command-line flags.
    pub fn resolve(api_url: Option<String>, timeout_secs: Option<u64>) -> Result<Self> {
        Self::resolve_with(|key| env::var(key).ok(), api_url, timeout_secs)
    }

    fn resolve_with<F>(lookup: F, api_url: Option<String>, timeout_secs: Option<u64>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_url = lookup(API_URL_ENV).filter(|value| trim_line(value).is_some());
        let raw_url = api_url
            .or(env_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = normalize_base_url(&raw_url)?;

        let env_timeout = match lookup(TIMEOUT_ENV).as_deref().and_then(trim_line) {
            Some(value) => Some(
                value
                    .parse::<u64>()
                    .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?,
            ),
            None => None,
        };
        let timeout = timeout_secs
            .or(env_timeout)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            api_base_url,
            timeout,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(url: &str) -> Self {
        Self {
            api_base_url: url.trim_end_matches('/').to_string(),
            timeout: None,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        bail!("API URL must start with http:// or https://, got '{}'", raw.trim());
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::resolve_with(lookup(&[]), None, None).unwrap();
        assert_eq!(settings.api_base_url, DEFAULT_API_URL);
        assert_eq!(settings.timeout, None);
    }

    #[test]
    fn flags_override_environment() {
        let env = lookup(&[(API_URL_ENV, "http://env.test/"), (TIMEOUT_ENV, "5")]);
        let settings =
            Settings::resolve_with(env, Some("http://flag.test".into()), Some(30)).unwrap();
        assert_eq!(settings.api_base_url, "http://flag.test");
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn environment_overrides_defaults() {
        let env = lookup(&[(API_URL_ENV, " http://env.test// "), (TIMEOUT_ENV, "5")]);
        let settings = Settings::resolve_with(env, None, None).unwrap();
        assert_eq!(settings.api_base_url, "http://env.test");
        assert_eq!(settings.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let env = lookup(&[(API_URL_ENV, "   "), (TIMEOUT_ENV, "")]);
        let settings = Settings::resolve_with(env, None, None).unwrap();
        assert_eq!(settings.api_base_url, DEFAULT_API_URL);
        assert_eq!(settings.timeout, None);
    }

    #[test]
    fn zero_timeout_means_none() {
        let settings = Settings::resolve_with(lookup(&[]), None, Some(0)).unwrap();
        assert_eq!(settings.timeout, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Settings::resolve_with(lookup(&[]), Some("ftp://x".into()), None).is_err());
        assert!(Settings::resolve_with(lookup(&[(TIMEOUT_ENV, "soon")]), None, None).is_err());
    }
}
