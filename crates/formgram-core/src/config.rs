use std::{env, path::PathBuf, time::Duration};

use crate::{delivery::types::FormatMode, errors::Error, Result};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Typed runtime configuration, read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Bot API
    pub api_base: String,
    pub http_timeout: Duration,
    pub default_parse_mode: FormatMode,

    // Storage
    pub settings_file: PathBuf,

    // Activity log
    pub activity_log_path: PathBuf,
    pub activity_log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            http_timeout: Duration::from_millis(10_000),
            default_parse_mode: FormatMode::None,
            settings_file: PathBuf::from("/tmp/formgram-settings.json"),
            activity_log_path: PathBuf::from("/tmp/formgram-activity.log"),
            activity_log_json: true,
        }
    }
}

impl Config {
    /// Load from the process environment. Hosts that use a `.env` file load
    /// it before calling this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (used by `from_env` and tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_base = lookup("FORMGRAM_API_BASE")
            .and_then(non_empty)
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
            return Err(Error::Config(format!(
                "FORMGRAM_API_BASE must be an http(s) URL, got {api_base}"
            )));
        }

        let http_timeout = match lookup("FORMGRAM_HTTP_TIMEOUT_MS").and_then(non_empty) {
            Some(raw) => {
                let ms = raw.trim().parse::<u64>().map_err(|_| {
                    Error::Config(format!("FORMGRAM_HTTP_TIMEOUT_MS is not a number: {raw}"))
                })?;
                if ms == 0 {
                    return Err(Error::Config(
                        "FORMGRAM_HTTP_TIMEOUT_MS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_millis(ms)
            }
            None => defaults.http_timeout,
        };

        let default_parse_mode = match lookup("FORMGRAM_DEFAULT_PARSE_MODE") {
            Some(raw) => raw.parse::<FormatMode>()?,
            None => defaults.default_parse_mode,
        };

        let settings_file = lookup("FORMGRAM_SETTINGS_FILE")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or(defaults.settings_file);

        let activity_log_path = lookup("FORMGRAM_ACTIVITY_LOG")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or(defaults.activity_log_path);
        let activity_log_json = lookup("FORMGRAM_ACTIVITY_LOG_JSON")
            .map(|s| parse_bool(&s))
            .unwrap_or(defaults.activity_log_json);

        Ok(Self {
            api_base,
            http_timeout,
            default_parse_mode,
            settings_file,
            activity_log_path,
            activity_log_json,
        })
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert_eq!(cfg.default_parse_mode, FormatMode::None);
        assert!(cfg.activity_log_json);
    }

    #[test]
    fn reads_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("FORMGRAM_API_BASE", "http://127.0.0.1:8081/"),
            ("FORMGRAM_HTTP_TIMEOUT_MS", "2500"),
            ("FORMGRAM_DEFAULT_PARSE_MODE", "html"),
            ("FORMGRAM_SETTINGS_FILE", "/var/lib/formgram/settings.json"),
            ("FORMGRAM_ACTIVITY_LOG_JSON", "off"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_base, "http://127.0.0.1:8081");
        assert_eq!(cfg.http_timeout, Duration::from_millis(2500));
        assert_eq!(cfg.default_parse_mode, FormatMode::Html);
        assert_eq!(
            cfg.settings_file,
            PathBuf::from("/var/lib/formgram/settings.json")
        );
        assert!(!cfg.activity_log_json);
    }

    #[test]
    fn rejects_invalid_values() {
        for pairs in [
            [("FORMGRAM_HTTP_TIMEOUT_MS", "soon")],
            [("FORMGRAM_HTTP_TIMEOUT_MS", "0")],
            [("FORMGRAM_API_BASE", "api.telegram.org")],
            [("FORMGRAM_DEFAULT_PARSE_MODE", "rtf")],
        ] {
            assert!(
                matches!(Config::from_lookup(lookup(&pairs)), Err(Error::Config(_))),
                "{pairs:?}"
            );
        }
    }
}
