//! Flat key-value parameters with per-layer sections.
//!
//! Keys of the form `name[index].key` belong to one layer occurrence; keys
//! without a dot are common to every layer in the chain.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Dial timeout key.
pub const PARAM_TIMEOUT: &str = "timeout";
/// Keepalive period key. Accepts a duration or a false boolean.
pub const PARAM_KEEPALIVE: &str = "keepalive";
/// Dead-peer-detection interval key. Advisory only.
pub const PARAM_DPD: &str = "dpd";

/// Default dial timeout.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Default keepalive period.
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(15);

/// Value type of a documented parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    /// Decimal integer.
    Integer,
    /// Boolean (`1/y/yes/true/t`, `0/n/no/false/f`).
    Bool,
    /// Duration such as `5s` or `150ms`.
    Duration,
    /// Duration, or a false boolean to disable.
    DurationOrFalse,
    /// Free-form string.
    String,
    /// Comma-separated strings.
    MultiString,
}

/// Documentation for one parameter an implementation understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterHint {
    /// Key inside the layer's section.
    pub key: &'static str,
    /// Human readable description.
    pub description: &'static str,
    /// Value type.
    pub kind: ParameterType,
    /// Default used when the key is absent.
    pub default_value: &'static str,
}

/// String parameters passed to layer implementations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: HashMap<String, String>,
}

impl Parameters {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters from a URL query string. The first value of a repeated key
    /// wins and empty values are dropped.
    #[must_use]
    pub fn from_url_query(url: &Url) -> Self {
        let mut values = HashMap::new();
        for (key, value) in url.query_pairs() {
            if !value.is_empty() {
                values
                    .entry(key.into_owned())
                    .or_insert_with(|| value.into_owned());
            }
        }
        Self { values }
    }

    /// Sets a value, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Raw value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether a key is set.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys scoped to `section`, with the `section.` prefix stripped.
    #[must_use]
    pub fn section(&self, section: &str) -> Self {
        let prefix = format!("{}.", section.trim_end_matches('.'));
        let values = self
            .values
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|stripped| (stripped.to_string(), value.clone()))
            })
            .collect();
        Self { values }
    }

    /// Unscoped keys, shared by every layer.
    #[must_use]
    pub fn common(&self) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(key, value)| !key.contains('.') && !value.is_empty())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self { values }
    }

    /// Common keys overlaid with the keys scoped to `section`.
    #[must_use]
    pub fn section_with_common(&self, section: &str) -> Self {
        let mut merged = self.common();
        merged.values.extend(self.section(section).values);
        merged
    }

    /// Merges `other` on top of `self`.
    #[must_use]
    pub fn combine(mut self, other: &Self) -> Self {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Duration value, or `default` when absent or malformed.
    #[must_use]
    pub fn duration(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|value| humantime::parse_duration(value).ok())
            .unwrap_or(default)
    }

    /// Duration that may be disabled with a false boolean. Returns `None`
    /// when disabled, `default` when absent or malformed.
    #[must_use]
    pub fn duration_or_disabled(&self, key: &str, default: Duration) -> Option<Duration> {
        match self.get(key) {
            Some(value) if is_false(value) => None,
            Some(value) => Some(humantime::parse_duration(value).unwrap_or(default)),
            None => Some(default),
        }
    }

    /// Numeric value, or `default` when absent or malformed.
    #[must_use]
    pub fn integer<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    /// Boolean value, or `default` when absent or malformed.
    #[must_use]
    pub fn boolean(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(parse_bool).unwrap_or(default)
    }

    /// String value, or `default` when absent.
    #[must_use]
    pub fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Comma-separated values, or `default` when absent.
    #[must_use]
    pub fn strings(&self, key: &str, default: &[&str]) -> Vec<String> {
        self.get(key).map_or_else(
            || default.iter().map(ToString::to_string).collect(),
            |value| value.split(',').map(ToString::to_string).collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parses `1/y/yes/true/t` and `0/n/no/false/f`, ignoring case.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    if is_true(value) {
        Some(true)
    } else if is_false(value) {
        Some(false)
    } else {
        None
    }
}

fn is_true(value: &str) -> bool {
    ["1", "y", "yes", "true", "t"]
        .iter()
        .any(|candidate| value.eq_ignore_ascii_case(candidate))
}

fn is_false(value: &str) -> bool {
    ["0", "n", "no", "false", "f"]
        .iter()
        .any(|candidate| value.eq_ignore_ascii_case(candidate))
}

/// Chain-wide settings read from the common parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonParams {
    /// Dial timeout.
    pub dial_timeout: Duration,
    /// Keepalive period, `None` when disabled.
    pub keepalive: Option<Duration>,
    /// Dead-peer-detection interval.
    pub dpd: Option<Duration>,
}

impl Default for CommonParams {
    fn default() -> Self {
        Self {
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            keepalive: Some(DEFAULT_KEEPALIVE),
            dpd: None,
        }
    }
}

impl CommonParams {
    /// Reads the common settings, falling back to defaults.
    #[must_use]
    pub fn from_parameters(parameters: &Parameters) -> Self {
        let defaults = Self::default();
        Self {
            dial_timeout: parameters.duration(PARAM_TIMEOUT, defaults.dial_timeout),
            keepalive: parameters.duration_or_disabled(PARAM_KEEPALIVE, DEFAULT_KEEPALIVE),
            dpd: parameters
                .get(PARAM_DPD)
                .and_then(|value| humantime::parse_duration(value).ok()),
        }
    }

    /// Hints for the common keys.
    #[must_use]
    pub fn hints() -> Vec<ParameterHint> {
        vec![
            ParameterHint {
                key: PARAM_TIMEOUT,
                description: "dial timeout",
                kind: ParameterType::Duration,
                default_value: "5s",
            },
            ParameterHint {
                key: PARAM_KEEPALIVE,
                description: "keepalive period, or false to disable",
                kind: ParameterType::DurationOrFalse,
                default_value: "15s",
            },
            ParameterHint {
                key: PARAM_DPD,
                description: "dead peer detection interval",
                kind: ParameterType::Duration,
                default_value: "",
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Parameters {
        Parameters::new()
            .with("timeout", "2s")
            .with("sni", "common.example")
            .with("tls[0].sni", "first.example")
            .with("tls[1].sni", "second.example")
            .with("tls[1].alpn", "h2,http/1.1")
    }

    #[test]
    fn section_strips_prefix() {
        let section = sample().section("tls[1]");
        assert_eq!(section.len(), 2);
        assert_eq!(section.get("sni"), Some("second.example"));
        assert_eq!(
            section.strings("alpn", &[]),
            vec!["h2".to_string(), "http/1.1".to_string()]
        );
    }

    #[test]
    fn scoped_keys_override_common() {
        let merged = sample().section_with_common("tls[0]");
        assert_eq!(merged.get("sni"), Some("first.example"));
        assert_eq!(merged.get("timeout"), Some("2s"));
        assert!(merged.get("alpn").is_none());
    }

    #[test]
    fn common_excludes_scoped_keys() {
        let common = sample().common();
        assert_eq!(common.len(), 2);
        assert!(common.contains("timeout"));
        assert!(common.contains("sni"));
    }

    #[test]
    fn booleans_accept_short_forms() {
        assert_eq!(parse_bool("Y"), Some(true));
        assert_eq!(parse_bool("t"), Some(true));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);

        let params = Parameters::new().with("flag", "garbage");
        assert!(params.boolean("flag", true));
    }

    #[test]
    fn common_params_defaults_and_overrides() {
        assert_eq!(
            CommonParams::from_parameters(&Parameters::new()),
            CommonParams::default()
        );

        let params = Parameters::new()
            .with("timeout", "150ms")
            .with("keepalive", "false")
            .with("dpd", "30s");
        let common = CommonParams::from_parameters(&params);
        assert_eq!(common.dial_timeout, Duration::from_millis(150));
        assert_eq!(common.keepalive, None);
        assert_eq!(common.dpd, Some(Duration::from_secs(30)));
    }

    #[test]
    fn malformed_values_fall_back() {
        let params = Parameters::new()
            .with("keepalive", "soon")
            .with("backlog", "lots");
        assert_eq!(
            params.duration_or_disabled("keepalive", DEFAULT_KEEPALIVE),
            Some(DEFAULT_KEEPALIVE)
        );
        assert_eq!(params.integer("backlog", 1000usize), 1000);
    }

    #[test]
    fn url_query_keeps_first_value() {
        let url = Url::parse("tcp+tls://host:1?sni=a&sni=b&empty=&tls[0].alpn=h2").unwrap();
        let params = Parameters::from_url_query(&url);
        assert_eq!(params.get("sni"), Some("a"));
        assert!(!params.contains("empty"));
        assert_eq!(params.section("tls[0]").get("alpn"), Some("h2"));
    }
}
