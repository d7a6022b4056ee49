use crate::errors::ConfigError;
use crate::window::{MAX_WEEKS, PeriodAnchor};
use chrono::Weekday;
use std::env;
use std::str::FromStr;

pub const DEFAULT_API_URL: &str = "https://api.lml.live/gigs/query";

/// What to do when one week's query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Treat the week as empty and keep going.
    #[default]
    Skip,
    /// Stop and return what was fetched so far.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub weeks_past: u32,
    pub weeks_future: u32,
    pub anchor: PeriodAnchor,
    pub failure_policy: FailurePolicy,
    pub locations: Vec<String>,
    pub owners_csv_url: Option<String>,
    pub refresh_on_start: bool,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            weeks_past: 10,
            weeks_future: 6,
            anchor: PeriodAnchor::default(),
            failure_policy: FailurePolicy::Skip,
            locations: vec!["melbourne".to_string(), "goldfields".to_string()],
            owners_csv_url: None,
            refresh_on_start: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get("GIG_API_URL") {
            config.api_url = url.trim().to_string();
        }
        if let Some(value) = get("GIG_WEEKS_PAST") {
            config.weeks_past = parse_weeks(&value, "GIG_WEEKS_PAST")?;
        }
        if let Some(value) = get("GIG_WEEKS_FUTURE") {
            config.weeks_future = parse_weeks(&value, "GIG_WEEKS_FUTURE")?;
        }

        let weekday = match get("GIG_ANCHOR_WEEKDAY") {
            Some(value) => value
                .trim()
                .parse::<Weekday>()
                .map_err(|_| ConfigError::invalid("GIG_ANCHOR_WEEKDAY", "a weekday name", &value))?,
            None => config.anchor.weekday(),
        };
        let hour = match get("GIG_ANCHOR_HOUR") {
            Some(value) => parse(&value, "GIG_ANCHOR_HOUR", "an hour between 0 and 23")?,
            None => config.anchor.hour(),
        };
        config.anchor = PeriodAnchor::new(weekday, hour).ok_or_else(|| {
            ConfigError::invalid("GIG_ANCHOR_HOUR", "an hour between 0 and 23", hour.to_string())
        })?;

        if let Some(value) = get("GIG_FAILURE_POLICY") {
            config.failure_policy = value
                .parse()
                .map_err(|_| ConfigError::invalid("GIG_FAILURE_POLICY", "skip or abort", &value))?;
        }
        if let Some(value) = get("GIG_LOCATIONS") {
            config.locations = value
                .split(',')
                .map(|location| location.trim().to_string())
                .filter(|location| !location.is_empty())
                .collect();
            if config.locations.is_empty() {
                return Err(ConfigError::NoLocations);
            }
        }
        config.owners_csv_url = get("GIG_OWNERS_CSV_URL").map(|url| url.trim().to_string());
        if let Some(value) = get("GIG_REFRESH_ON_START") {
            config.refresh_on_start = parse_bool(&value)
                .ok_or_else(|| ConfigError::invalid("GIG_REFRESH_ON_START", "true or false", &value))?;
        }
        if let Some(value) = get("PORT") {
            config.port = parse(&value, "PORT", "a TCP port")?;
        }

        Ok(config)
    }

    pub fn default_location(&self) -> &str {
        self.locations.first().map(String::as_str).unwrap_or("melbourne")
    }

    pub fn knows_location(&self, location: &str) -> bool {
        self.locations.iter().any(|known| known == location)
    }
}

fn parse<T: FromStr>(value: &str, key: &'static str, expected: &'static str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, expected, value))
}

fn parse_weeks(value: &str, key: &'static str) -> Result<u32, ConfigError> {
    const EXPECTED: &str = "a whole number of weeks up to 520";
    let weeks: u32 = parse(value, key, EXPECTED)?;
    if weeks > MAX_WEEKS {
        return Err(ConfigError::invalid(key, EXPECTED, value));
    }
    Ok(weeks)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
