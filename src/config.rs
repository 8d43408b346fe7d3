use anyhow::{Context, Result, anyhow};
use regex::Regex;
use reqwest::Url;

/// Bump on every deploy that changes the shell. It is the only way old caches go away.
pub const CACHE_VERSION: &str = "v3";

/// Everything the crossword shell needs to boot offline.
pub const SHELL_ASSETS: &[&str] = &[
    "/crossword",
    "/crossword/manifest.json",
    "/crossword/icons/icon-192.png",
    "/crossword/icons/icon-512.png",
    "/crossword/icons/badge-72.png",
];

const DEFAULT_DB_PATH: &str = "xword.db";
const DEFAULT_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_CACHE_PREFIX: &str = "crossword";
const DEFAULT_SHELL_PREFIX: &str = "/crossword";
const DEFAULT_API_PATTERN: &str = r"^/(api|puzzles?)/";
const DEFAULT_ENTRY_PATH: &str = "/crossword";
const DEFAULT_REMINDER_HOUR: u32 = 14;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,

    /// The agent's own origin; anything else passes through untouched.
    pub origin: Url,
    pub cache_prefix: String,
    pub cache_version: String,
    pub shell_assets: Vec<String>,
    pub shell_prefix: String,
    pub api_pattern: Regex,

    /// Where notification clicks land when the payload carries no URL.
    pub entry_path: String,

    /// UTC hours for the daily reminder pushes.
    pub reminder_hour: u32,
    pub streak_warning_hour: Option<u32>,
}

impl Config {
    /// Reads `XWORD_*` variables from the process environment (call `dotenv()` first
    /// to pick up a `.env` file).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults for absent keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let origin = get("XWORD_ORIGIN", DEFAULT_ORIGIN);
        let origin = Url::parse(&origin).with_context(|| format!("XWORD_ORIGIN is not a URL: {origin}"))?;

        let api_pattern = get("XWORD_API_PATTERN", DEFAULT_API_PATTERN);
        let api_pattern = Regex::new(&api_pattern)
            .with_context(|| format!("XWORD_API_PATTERN is not a valid regex: {api_pattern}"))?;

        let reminder_hour = match lookup("XWORD_REMINDER_HOUR") {
            Some(raw) => parse_hour("XWORD_REMINDER_HOUR", &raw)?,
            None => DEFAULT_REMINDER_HOUR,
        };
        let streak_warning_hour = lookup("XWORD_STREAK_WARNING_HOUR")
            .map(|raw| parse_hour("XWORD_STREAK_WARNING_HOUR", &raw))
            .transpose()?;
        if streak_warning_hour == Some(reminder_hour) {
            return Err(anyhow!(
                "XWORD_STREAK_WARNING_HOUR and XWORD_REMINDER_HOUR are both {reminder_hour}; only one push fits in an hour"
            ));
        }

        Ok(Self {
            db_path: get("XWORD_DB", DEFAULT_DB_PATH),
            origin,
            cache_prefix: get("XWORD_CACHE_PREFIX", DEFAULT_CACHE_PREFIX),
            cache_version: get("XWORD_CACHE_VERSION", CACHE_VERSION),
            shell_assets: SHELL_ASSETS.iter().map(|path| path.to_string()).collect(),
            shell_prefix: get("XWORD_SHELL_PREFIX", DEFAULT_SHELL_PREFIX),
            api_pattern,
            entry_path: get("XWORD_ENTRY_PATH", DEFAULT_ENTRY_PATH),
            reminder_hour,
            streak_warning_hour,
        })
    }

    /// Name of the cache that belongs to the current generation.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }
}

fn parse_hour(key: &str, raw: &str) -> Result<u32> {
    let hour = raw
        .trim()
        .parse::<u32>()
        .with_context(|| format!("{key} must be an hour of the day, got '{raw}'"))?;
    if hour > 23 {
        return Err(anyhow!("{key} must be between 0 and 23, got {hour}"));
    }
    Ok(hour)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.cache_name(), "crossword-v3");
        assert_eq!(config.shell_assets.len(), SHELL_ASSETS.len());
        assert_eq!(config.reminder_hour, DEFAULT_REMINDER_HOUR);
        assert!(config.streak_warning_hour.is_none());
        assert!(config.api_pattern.is_match("/api/puzzle/today"));
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("XWORD_CACHE_VERSION", "v9"),
            ("XWORD_ORIGIN", "https://games.example.com"),
            ("XWORD_STREAK_WARNING_HOUR", "21"),
        ])
        .unwrap();
        assert_eq!(config.cache_name(), "crossword-v9");
        assert_eq!(config.origin.host_str(), Some("games.example.com"));
        assert_eq!(config.streak_warning_hour, Some(21));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(config_from(&[("XWORD_ORIGIN", "not a url")]).is_err());
        assert!(config_from(&[("XWORD_API_PATTERN", "(")]).is_err());
        assert!(config_from(&[("XWORD_REMINDER_HOUR", "24")]).is_err());
        assert!(config_from(&[("XWORD_REMINDER_HOUR", "noon")]).is_err());
    }

    #[test]
    fn streak_warning_cannot_share_the_reminder_hour() {
        let err = config_from(&[("XWORD_REMINDER_HOUR", "18"), ("XWORD_STREAK_WARNING_HOUR", "18")]).unwrap_err();
        assert!(err.to_string().contains("both 18"));

        // The default reminder hour counts too.
        assert!(config_from(&[("XWORD_STREAK_WARNING_HOUR", "14")]).is_err());
        assert!(config_from(&[("XWORD_STREAK_WARNING_HOUR", "15")]).is_ok());
    }
}
