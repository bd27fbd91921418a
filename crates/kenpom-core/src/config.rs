//! Runtime settings, read once from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `KENPOM_API_KEY` | required |
//! | `KENPOM_BASE_URL` | `https://kenpom.com` |
//! | `KENPOM_TIMEOUT_SECONDS` | `20` |
//! | `KENPOM_MAX_RETRIES` | `5` (total attempts) |
//! | `KENPOM_BACKOFF_BASE_SECONDS` | `0.6` |
//! | `KENPOM_MAX_BACKOFF_SECONDS` | `15` |
//! | `KENPOM_RATE_LIMIT_RPS` | `2.0` |
//! | `KENPOM_RATE_LIMIT_BURST` | `1` |
//! | `KENPOM_CACHE_DIR` | `.cache/kenpom` |
//! | `KENPOM_CACHE_TTL_SECONDS` | `21600` |
//! | `KENPOM_SEASON_STABILIZATION_DAYS` | `14` |
//! | `KENPOM_SEASON_START` | `11-01` |
//! | `KENPOM_EARLIEST_ARCHIVE_SEASON` | `2002` |
//!
//! Blank values fall back to the default.

use std::env;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::calendar::SeasonStart;
use crate::point_in_time::{
    ResolverConfig, DEFAULT_EARLIEST_ARCHIVE_SEASON, DEFAULT_STABILIZATION_DAYS,
};
use crate::retry::{Backoff, RetryConfig};
use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://kenpom.com";
pub const DEFAULT_CACHE_DIR: &str = ".cache/kenpom";

const API_KEY_VAR: &str = "KENPOM_API_KEY";

#[derive(Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Total attempts per request, including the first.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
    pub rate_limit_rps: f64,
    pub rate_limit_burst: u32,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub stabilization_days: u32,
    pub season_start: SeasonStart,
    pub earliest_archive_season: i32,
}

impl Settings {
    /// Settings with every default and the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout: Duration::from_secs(20),
            max_retries: 5,
            backoff_base: Duration::from_millis(600),
            max_backoff: Duration::from_secs(15),
            rate_limit_rps: 2.0,
            rate_limit_burst: 1,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_ttl: Duration::from_secs(21_600),
            stabilization_days: DEFAULT_STABILIZATION_DAYS,
            season_start: SeasonStart::default(),
            earliest_archive_season: DEFAULT_EARLIEST_ARCHIVE_SEASON,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`, so callers can supply any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = value(API_KEY_VAR).ok_or(ConfigError::MissingApiKey { key: API_KEY_VAR })?;
        let defaults = Self::new(api_key);

        let season_start = match value("KENPOM_SEASON_START") {
            Some(raw) => SeasonStart::parse(&raw).map_err(|_| ConfigError::InvalidValue {
                key: "KENPOM_SEASON_START",
                value: raw,
                expected: "a MM-DD month and day",
            })?,
            None => defaults.season_start,
        };

        Ok(Self {
            base_url: value("KENPOM_BASE_URL").unwrap_or(defaults.base_url.clone()),
            timeout: seconds(&value, "KENPOM_TIMEOUT_SECONDS", defaults.timeout)?,
            max_retries: parsed(&value, "KENPOM_MAX_RETRIES", defaults.max_retries)?.max(1),
            backoff_base: seconds(&value, "KENPOM_BACKOFF_BASE_SECONDS", defaults.backoff_base)?,
            max_backoff: seconds(&value, "KENPOM_MAX_BACKOFF_SECONDS", defaults.max_backoff)?,
            rate_limit_rps: parsed(&value, "KENPOM_RATE_LIMIT_RPS", defaults.rate_limit_rps)?,
            rate_limit_burst: parsed(&value, "KENPOM_RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            cache_dir: value("KENPOM_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir.clone()),
            cache_ttl: Duration::from_secs(parsed(
                &value,
                "KENPOM_CACHE_TTL_SECONDS",
                defaults.cache_ttl.as_secs(),
            )?),
            stabilization_days: parsed(
                &value,
                "KENPOM_SEASON_STABILIZATION_DAYS",
                defaults.stabilization_days,
            )?,
            season_start,
            earliest_archive_season: parsed(
                &value,
                "KENPOM_EARLIEST_ARCHIVE_SEASON",
                defaults.earliest_archive_season,
            )?,
            ..defaults
        })
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retries,
            backoff: Backoff::Exponential {
                base: self.backoff_base,
                max: self.max_backoff,
                jitter: true,
            },
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            stabilization_days: self.stabilization_days,
            season_start: self.season_start,
            earliest_archive_season: self.earliest_archive_season,
        }
    }
}

// Keeps the API key out of logs.
impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base", &self.backoff_base)
            .field("max_backoff", &self.max_backoff)
            .field("rate_limit_rps", &self.rate_limit_rps)
            .field("rate_limit_burst", &self.rate_limit_burst)
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl", &self.cache_ttl)
            .field("stabilization_days", &self.stabilization_days)
            .field("season_start", &self.season_start)
            .field("earliest_archive_season", &self.earliest_archive_season)
            .finish()
    }
}

fn parsed<T: FromStr>(
    value: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw,
            expected: std::any::type_name::<T>(),
        }),
        None => Ok(default),
    }
}

fn seconds(
    value: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs = parsed(value, key, default.as_secs_f64())?;
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
        key,
        value: secs.to_string(),
        expected: "a non-negative number of seconds",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let error = Settings::from_lookup(lookup(&[("KENPOM_API_KEY", "  ")])).expect_err("blank key");
        assert_eq!(error, ConfigError::MissingApiKey { key: "KENPOM_API_KEY" });
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let settings = Settings::from_lookup(lookup(&[
            ("KENPOM_API_KEY", "secret"),
            ("KENPOM_RATE_LIMIT_RPS", ""),
        ]))
        .expect("valid");

        assert_eq!(settings, Settings::new("secret"));
        assert_eq!(settings.cache_ttl, Duration::from_secs(6 * 60 * 60));
        assert_eq!(settings.timeout, Duration::from_secs(20));
        assert_eq!(settings.stabilization_days, 14);
    }

    #[test]
    fn overrides_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("KENPOM_API_KEY", "secret"),
            ("KENPOM_BASE_URL", "http://localhost:8080"),
            ("KENPOM_TIMEOUT_SECONDS", "2.5"),
            ("KENPOM_MAX_RETRIES", "3"),
            ("KENPOM_RATE_LIMIT_RPS", "0.5"),
            ("KENPOM_CACHE_DIR", "/tmp/kp"),
            ("KENPOM_SEASON_STABILIZATION_DAYS", "21"),
            ("KENPOM_SEASON_START", "11-06"),
        ]))
        .expect("valid");

        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.timeout, Duration::from_millis(2_500));
        assert_eq!(settings.retry_config().max_attempts, 3);
        assert_eq!(settings.rate_limit_rps, 0.5);
        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/kp"));
        assert_eq!(settings.resolver_config().stabilization_days, 21);
        assert_eq!(settings.season_start, SeasonStart::new(11, 6).expect("valid"));
    }

    #[test]
    fn unparseable_values_name_the_variable() {
        let error = Settings::from_lookup(lookup(&[
            ("KENPOM_API_KEY", "secret"),
            ("KENPOM_MAX_RETRIES", "many"),
        ]))
        .expect_err("invalid");

        assert!(matches!(
            error,
            ConfigError::InvalidValue { key: "KENPOM_MAX_RETRIES", .. }
        ));

        let error = Settings::from_lookup(lookup(&[
            ("KENPOM_API_KEY", "secret"),
            ("KENPOM_TIMEOUT_SECONDS", "-1"),
        ]))
        .expect_err("negative timeout");
        assert!(matches!(
            error,
            ConfigError::InvalidValue { key: "KENPOM_TIMEOUT_SECONDS", .. }
        ));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let rendered = format!("{:?}", Settings::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }
}
