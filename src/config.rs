use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use crate::drivers::ads1115::{Gain, DEFAULT_ADDRESS};
use crate::drivers::table::default_output_path;
use crate::types::ConnectionMode;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/submit";
pub const DEFAULT_PLOT_DIR: &str = "detrend_plots";
pub const DEFAULT_LOG_FILE: &str = "mushroom_data.txt";
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_WINDOW: usize = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    MissingVariable(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Settings for one `detrend_batch` run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub plot_dir: PathBuf,
    pub endpoint: String,
    pub http_timeout: Duration,
    pub send: bool,
}

/// Settings for the `adc_poller` loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub mode: ConnectionMode,
    pub i2c_bus: String,
    pub address: u16,
    pub gain: Gain,
    pub interval: Duration,
    pub log_file: PathBuf,
    pub window: usize,
    pub max_ticks: Option<u64>,
    pub endpoint: String,
    pub http_timeout: Duration,
}

impl BatchConfig {
    /// Positional `<input> [output] [plot_dir]` override the environment.
    pub fn from_env_and_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| match key {
            "BIOME_INPUT" => args.first().cloned().or_else(|| env::var(key).ok()),
            _ => env::var(key).ok(),
        })?;
        if let Some(output) = args.get(1) {
            config.output = PathBuf::from(output);
        }
        if let Some(plot_dir) = args.get(2) {
            config.plot_dir = PathBuf::from(plot_dir);
        }
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let input = lookup("BIOME_INPUT")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingVariable("BIOME_INPUT (or first argument)".into()))?;
        let output = lookup("BIOME_OUTPUT")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_output_path(&input));
        let plot_dir = PathBuf::from(lookup("BIOME_PLOT_DIR").unwrap_or_else(|| DEFAULT_PLOT_DIR.into()));
        Ok(Self {
            input,
            output,
            plot_dir,
            endpoint: endpoint(&lookup)?,
            http_timeout: Duration::from_millis(parse_or(&lookup, "BIOME_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?),
            send: parse_bool(&lookup, "BIOME_SEND", true)?,
        })
    }
}

impl PollerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = match lookup("BIOME_ADC_MODE") {
            Some(raw) => raw.parse::<ConnectionMode>().map_err(|reason| ConfigError::InvalidValue {
                key: "BIOME_ADC_MODE".into(),
                reason,
            })?,
            None => ConnectionMode::Hardware,
        };
        let gain = match lookup("BIOME_ADC_GAIN") {
            Some(raw) => raw.parse::<Gain>().map_err(|e| ConfigError::InvalidValue {
                key: "BIOME_ADC_GAIN".into(),
                reason: e.to_string(),
            })?,
            None => Gain::Eight,
        };
        let address = match lookup("BIOME_ADC_ADDRESS") {
            Some(raw) => parse_address(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "BIOME_ADC_ADDRESS".into(),
                reason: format!("'{raw}' is not a 7-bit I2C address"),
            })?,
            None => DEFAULT_ADDRESS,
        };
        let interval_ms = parse_or(&lookup, "BIOME_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BIOME_POLL_INTERVAL_MS".into(),
                reason: "must be greater than zero".into(),
            });
        }
        let window = parse_or(&lookup, "BIOME_WINDOW", DEFAULT_WINDOW)?;
        if window < 2 {
            return Err(ConfigError::InvalidValue {
                key: "BIOME_WINDOW".into(),
                reason: "needs at least 2 readings to fit a trend".into(),
            });
        }
        let max_ticks = match lookup("BIOME_MAX_TICKS") {
            Some(_) => Some(parse_or(&lookup, "BIOME_MAX_TICKS", 0u64)?),
            None => None,
        };
        Ok(Self {
            mode,
            i2c_bus: lookup("BIOME_I2C_BUS").unwrap_or_else(|| DEFAULT_I2C_BUS.into()),
            address,
            gain,
            interval: Duration::from_millis(interval_ms),
            log_file: PathBuf::from(lookup("BIOME_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.into())),
            window,
            max_ticks,
            endpoint: endpoint(&lookup)?,
            http_timeout: Duration::from_millis(parse_or(&lookup, "BIOME_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?),
        })
    }
}

fn endpoint(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    let url = lookup("BIOME_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.into());
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidValue {
            key: "BIOME_ENDPOINT".into(),
            reason: "must start with http:// or https://".into(),
        });
    }
    Ok(url)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.into(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            key: key.into(),
            reason: format!("'{v}' is not a boolean"),
        }),
    }
}

fn parse_address(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok()?,
        None => raw.parse().ok()?,
    };
    (value <= 0x7F).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn batch_defaults_derive_from_input() {
        let config = BatchConfig::from_lookup(lookup(&[("BIOME_INPUT", "/data/run1.csv")])).unwrap();
        assert_eq!(config.output, PathBuf::from("/data/run1_detrended.csv"));
        assert_eq!(config.plot_dir, PathBuf::from(DEFAULT_PLOT_DIR));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.send);
    }

    #[test]
    fn batch_requires_input() {
        let err = BatchConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVariable(_)));
    }

    #[test]
    fn endpoint_must_be_http() {
        let err = BatchConfig::from_lookup(lookup(&[
            ("BIOME_INPUT", "a.csv"),
            ("BIOME_ENDPOINT", "ftp://example"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "BIOME_ENDPOINT"));
    }

    #[test]
    fn poller_defaults_match_bench_setup() {
        let config = PollerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mode, ConnectionMode::Hardware);
        assert_eq!(config.address, 0x48);
        assert_eq!(config.gain, Gain::Eight);
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.max_ticks, None);
    }

    #[test]
    fn poller_parses_overrides() {
        let config = PollerConfig::from_lookup(lookup(&[
            ("BIOME_ADC_MODE", "Simulation"),
            ("BIOME_ADC_ADDRESS", "0x49"),
            ("BIOME_ADC_GAIN", "2/3"),
            ("BIOME_POLL_INTERVAL_MS", "250"),
            ("BIOME_MAX_TICKS", "10"),
        ]))
        .unwrap();
        assert_eq!(config.mode, ConnectionMode::Simulation);
        assert_eq!(config.address, 0x49);
        assert_eq!(config.gain, Gain::TwoThirds);
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.max_ticks, Some(10));
    }

    #[test]
    fn poller_rejects_bad_values() {
        for (key, value) in [
            ("BIOME_ADC_GAIN", "3"),
            ("BIOME_ADC_ADDRESS", "0x80"),
            ("BIOME_POLL_INTERVAL_MS", "0"),
            ("BIOME_WINDOW", "1"),
            ("BIOME_ADC_MODE", "usb"),
        ] {
            let result = PollerConfig::from_lookup(lookup(&[(key, value)]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn bools_accept_common_spellings() {
        let off = BatchConfig::from_lookup(lookup(&[("BIOME_INPUT", "a.csv"), ("BIOME_SEND", "off")])).unwrap();
        assert!(!off.send);
        let bad = BatchConfig::from_lookup(lookup(&[("BIOME_INPUT", "a.csv"), ("BIOME_SEND", "maybe")]));
        assert!(bad.is_err());
    }
}
