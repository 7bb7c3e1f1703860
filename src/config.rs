use std::time::Duration;

use crate::throttle::DEFAULT_COOLDOWN_SECS;
use crate::torn_api::{DEFAULT_API_BASE, DEFAULT_FACTION_ID, FetchStrategy};

pub const DEFAULT_LISTS_SOURCE: &str = "data.json";
pub const DEFAULT_CARD_LAYOUT_MAX_COLS: u16 = 100;
pub const DEFAULT_FETCH_PARALLELISM: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    /// Shown in the header only. Stat filtering is not implemented.
    pub stats_filter: Option<String>,
    pub default_list: Option<String>,
    pub lists_source: String,
    pub api_base: String,
    pub faction_id: u64,
    pub strategy: FetchStrategy,
    pub fetch_parallelism: usize,
    pub cooldown: Duration,
    pub card_layout_max_cols: u16,
    pub verbose: bool,
}

impl AppConfig {
    /// Command line first, environment second, defaults last.
    pub fn from_env_and_args() -> Self {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |flag: &str, key: &str| {
            parse_flag(args, flag)
                .or_else(|| env(key))
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };

        let strategy = lookup("--strategy", "FETCH_STRATEGY")
            .and_then(|val| FetchStrategy::parse(&val))
            .unwrap_or(FetchStrategy::Batched);
        let faction_id = lookup("--faction", "FACTION_ID")
            .and_then(|val| val.parse::<u64>().ok())
            .filter(|id| *id > 0)
            .unwrap_or(DEFAULT_FACTION_ID);
        let fetch_parallelism = env("FETCH_PARALLELISM")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_FETCH_PARALLELISM)
            .clamp(2, 32);
        let cooldown_secs = env("FETCH_COOLDOWN_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_COOLDOWN_SECS)
            .clamp(5, 600);
        let card_layout_max_cols = env("CARD_LAYOUT_MAX_COLS")
            .and_then(|val| val.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_CARD_LAYOUT_MAX_COLS);
        let verbose = env("LOG_VERBOSE")
            .map(|val| {
                let normalized = val.trim().to_ascii_lowercase();
                matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
            })
            .unwrap_or(false);

        Self {
            api_key: lookup("--key", "TORN_API_KEY"),
            stats_filter: lookup("--stats-filter", "STATS_FILTER"),
            default_list: lookup("--list", "DEFAULT_LIST"),
            lists_source: lookup("--lists", "LISTS_SOURCE")
                .unwrap_or_else(|| DEFAULT_LISTS_SOURCE.to_string()),
            api_base: lookup("--api-base", "TORN_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            faction_id,
            strategy,
            fetch_parallelism,
            cooldown: Duration::from_secs(cooldown_secs),
            card_layout_max_cols,
            verbose,
        }
    }
}

/// `--flag value` or `--flag=value`.
fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(rest) = arg.strip_prefix(flag)
            && let Some(value) = rest.strip_prefix('=')
        {
            return Some(value.to_string());
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.starts_with("--") {
                return Some(next.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_input() {
        let cfg = AppConfig::from_sources(&[], |_| None);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.lists_source, DEFAULT_LISTS_SOURCE);
        assert_eq!(cfg.faction_id, DEFAULT_FACTION_ID);
        assert_eq!(cfg.strategy, FetchStrategy::Batched);
        assert_eq!(cfg.cooldown, Duration::from_secs(30));
        assert!(!cfg.verbose);
    }

    #[test]
    fn flags_override_environment() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TORN_API_KEY", "env-key"),
            ("STATS_FILTER", "1000"),
            ("FETCH_STRATEGY", "per-player"),
            ("FETCH_PARALLELISM", "99"),
        ]);
        let cfg = AppConfig::from_sources(
            &args(&["--key", "cli-key", "--list=faction1"]),
            |key| env.get(key).map(|v| v.to_string()),
        );
        assert_eq!(cfg.api_key.as_deref(), Some("cli-key"));
        assert_eq!(cfg.stats_filter.as_deref(), Some("1000"));
        assert_eq!(cfg.default_list.as_deref(), Some("faction1"));
        assert_eq!(cfg.strategy, FetchStrategy::PerPlayer);
        assert_eq!(cfg.fetch_parallelism, 32);
    }

    #[test]
    fn flag_without_value_is_ignored() {
        let cfg = AppConfig::from_sources(&args(&["--key", "--list", "a"]), |_| None);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.default_list.as_deref(), Some("a"));
    }
}
