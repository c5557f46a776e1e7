use std::env;
use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_TTL};
use crate::history::DEFAULT_HISTORY_DAYS;

const ENV_PREFIX: &str = "STOCKSCOPE_";
pub const DEMO_API_KEY: &str = "demo";
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Runtime settings shared by the CLI and the web service.
///
/// Missing keys do not switch the service to simulated data. Twelve Data and
/// Finnhub fall back to the public `demo` key and Yahoo needs no key, so a
/// default config still calls all three. Only the analyzer's `offline` flag
/// (`--offline` on the CLI) or an unreachable network leaves the simulated
/// generator as the sole source.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Alpha Vantage is skipped entirely without a key.
    pub alpha_vantage_api_key: Option<String>,
    pub twelve_data_api_key: String,
    pub finnhub_api_key: String,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub provider_timeout: Duration,
    pub history_days: usize,
    pub bind_addr: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: None,
            twelve_data_api_key: String::from(DEMO_API_KEY),
            finnhub_api_key: String::from(DEMO_API_KEY),
            cache_ttl: DEFAULT_TTL,
            cache_capacity: DEFAULT_CAPACITY,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            history_days: DEFAULT_HISTORY_DAYS,
            bind_addr: String::from(DEFAULT_BIND_ADDR),
        }
    }
}

impl ServiceConfig {
    /// Reads `STOCKSCOPE_<NAME>` first, then the bare `<NAME>`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .or_else(|| lookup(name))
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            alpha_vantage_api_key: read("ALPHA_VANTAGE_API_KEY"),
            twelve_data_api_key: read("TWELVE_DATA_API_KEY")
                .unwrap_or(defaults.twelve_data_api_key),
            finnhub_api_key: read("FINNHUB_API_KEY").unwrap_or(defaults.finnhub_api_key),
            cache_ttl: parse_or("CACHE_TTL_SECS", read("CACHE_TTL_SECS"), |secs: u64| {
                Some(Duration::from_secs(secs))
            })
            .unwrap_or(defaults.cache_ttl),
            cache_capacity: parse_or("CACHE_CAPACITY", read("CACHE_CAPACITY"), |cap: usize| {
                (cap > 0).then_some(cap)
            })
            .unwrap_or(defaults.cache_capacity),
            provider_timeout: parse_or(
                "PROVIDER_TIMEOUT_MS",
                read("PROVIDER_TIMEOUT_MS"),
                |ms: u64| (ms > 0).then(|| Duration::from_millis(ms)),
            )
            .unwrap_or(defaults.provider_timeout),
            history_days: parse_or("HISTORY_DAYS", read("HISTORY_DAYS"), |days: usize| {
                (days > 0).then_some(days)
            })
            .unwrap_or(defaults.history_days),
            bind_addr: read("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }

    /// Whether any upstream provider has a real (non-demo) credential.
    ///
    /// Informational only; demo keys still route to the network.
    pub fn has_credentials(&self) -> bool {
        self.alpha_vantage_api_key.is_some()
            || self.twelve_data_api_key != DEMO_API_KEY
            || self.finnhub_api_key != DEMO_API_KEY
    }
}

impl Debug for ServiceConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("alpha_vantage_api_key", &redact(self.alpha_vantage_api_key.as_deref()))
            .field("twelve_data_api_key", &redact(Some(self.twelve_data_api_key.as_str())))
            .field("finnhub_api_key", &redact(Some(self.finnhub_api_key.as_str())))
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .field("provider_timeout", &self.provider_timeout)
            .field("history_days", &self.history_days)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

fn redact(key: Option<&str>) -> &'static str {
    match key {
        None => "<unset>",
        Some(DEMO_API_KEY) => DEMO_API_KEY,
        Some(_) => "***",
    }
}

/// Parse and validate; malformed values are logged and ignored.
fn parse_or<T, U>(name: &str, raw: Option<String>, validate: impl Fn(T) -> Option<U>) -> Option<U>
where
    T: FromStr,
{
    let raw = raw?;
    let parsed = raw.parse::<T>().ok().and_then(validate);
    if parsed.is_none() {
        warn!(
            variable = %format!("{ENV_PREFIX}{name}"),
            value = %raw,
            "ignoring invalid setting, using default"
        );
    }
    parsed
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_use_demo_keys_and_thirty_second_ttl() {
        let config = config(&[]);

        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.twelve_data_api_key, "demo");
        assert!(config.alpha_vantage_api_key.is_none());
        assert!(!config.has_credentials());
    }

    #[test]
    fn prefixed_variables_win_over_bare_names() {
        let config = config(&[
            ("ALPHA_VANTAGE_API_KEY", "bare"),
            ("STOCKSCOPE_ALPHA_VANTAGE_API_KEY", "prefixed"),
            ("FINNHUB_API_KEY", "fh-key"),
        ]);

        assert_eq!(config.alpha_vantage_api_key.as_deref(), Some("prefixed"));
        assert_eq!(config.finnhub_api_key, "fh-key");
        assert!(config.has_credentials());
    }

    #[test]
    fn numeric_settings_fall_back_on_garbage() {
        let config = config(&[
            ("STOCKSCOPE_CACHE_TTL_SECS", "ten"),
            ("STOCKSCOPE_CACHE_CAPACITY", "0"),
            ("STOCKSCOPE_PROVIDER_TIMEOUT_MS", "5000"),
            ("STOCKSCOPE_HISTORY_DAYS", "45"),
        ]);

        assert_eq!(config.cache_ttl, DEFAULT_TTL);
        assert_eq!(config.cache_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.provider_timeout, Duration::from_millis(5_000));
        assert_eq!(config.history_days, 45);
    }

    #[test]
    fn blank_key_counts_as_unset() {
        let config = config(&[("ALPHA_VANTAGE_API_KEY", "  ")]);
        assert!(config.alpha_vantage_api_key.is_none());
    }

    #[test]
    fn debug_output_hides_real_keys() {
        let config = config(&[("ALPHA_VANTAGE_API_KEY", "super-secret")]);
        let rendered = format!("{config:?}");

        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("***"));
    }
}
