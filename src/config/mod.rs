//! Environment-driven configuration.
//!
//! Loaded with figment from raw environment variables (after `.env` is applied
//! by dotenvy). Duration values accept fundu notation such as `30s` or `5m`,
//! or a bare number of seconds.

use chrono::NaiveDate;
use figment::Figment;
use figment::providers::Env;
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// First day of the rating era when no season matches the configured prefix.
pub const FALLBACK_RATING_START_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2026, 1, 1) {
    Some(date) => date,
    None => panic!("invalid fallback rating start date"),
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base log level for this crate's targets; `RUST_LOG` overrides it entirely.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub database_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Budget for draining in-flight requests on shutdown.
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    #[serde(
        default = "default_active_season_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub active_season_ttl: Duration,
    #[serde(
        default = "default_rating_start_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub rating_start_ttl: Duration,
    #[serde(
        default = "default_lifetime_snapshot_ttl",
        deserialize_with = "deserialize_duration"
    )]
    pub lifetime_snapshot_ttl: Duration,
    /// Season-name prefix that opens the rating era, matched case-insensitively.
    #[serde(default = "default_rating_start_season")]
    pub rating_start_season: String,
    #[serde(default = "default_fallback_rating_start_date")]
    pub fallback_rating_start_date: NaiveDate,
}

impl Config {
    /// Extract configuration from the process environment.
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::new().merge(Env::raw()).extract()
    }

    /// The slice of configuration the rating caches are built from.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            active_season_ttl: self.active_season_ttl,
            rating_start_ttl: self.rating_start_ttl,
            lifetime_snapshot_ttl: self.lifetime_snapshot_ttl,
            rating_start_season: self.rating_start_season.clone(),
            fallback_rating_start_date: self.fallback_rating_start_date,
        }
    }
}

/// TTLs and era resolution settings for [`crate::ratings::RatingCaches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub active_season_ttl: Duration,
    pub rating_start_ttl: Duration,
    pub lifetime_snapshot_ttl: Duration,
    pub rating_start_season: String,
    pub fallback_rating_start_date: NaiveDate,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            active_season_ttl: default_active_season_ttl(),
            rating_start_ttl: default_rating_start_ttl(),
            lifetime_snapshot_ttl: default_lifetime_snapshot_ttl(),
            rating_start_season: default_rating_start_season(),
            fallback_rating_start_date: default_fallback_rating_start_date(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_active_season_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_rating_start_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_lifetime_snapshot_ttl() -> Duration {
    Duration::from_secs(15)
}

fn default_rating_start_season() -> String {
    "spring 2026".to_string()
}

fn default_fallback_rating_start_date() -> NaiveDate {
    FALLBACK_RATING_START_DATE
}

/// Parse a duration string like `30s`, `5m`, `1500ms` or `2h`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(input.trim())
        .map_err(|e| format!("invalid duration {input:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {input:?}: {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a duration such as \"30s\" or a number of seconds")
        }

        fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(secs))
        }

        fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Duration, E> {
            u64::try_from(secs)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            parse_duration(value).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
