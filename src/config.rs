//! Process configuration and scheduler tunables.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Knobs of the runway heuristic and the displacement protocol.
///
/// Every field has a default, so a scenario file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub base_score: f64,
    pub headwind_weight: f64,
    pub crosswind_weight: f64,
    /// Runways shorter than this (metres) are penalised for HEAVY and SUPER traffic.
    pub heavy_min_length: u32,
    pub short_runway_penalty: f64,
    pub wait_penalty_per_minute: f64,
    pub inactive_score: f64,
    /// Extra seconds given to a flight moved onto another runway by an emergency.
    pub bump_buffer_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            base_score: 100.0,
            headwind_weight: 2.0,
            crosswind_weight: 3.0,
            heavy_min_length: 3000,
            short_runway_penalty: 50.0,
            wait_penalty_per_minute: 5.0,
            inactive_score: -1000.0,
            bump_buffer_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON store location; in-memory only when absent.
    pub store_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            store_path: env::var("RUNWAY_SCHED_STORE").ok().map(PathBuf::from),
            log_filter: env::var("RUNWAY_SCHED_LOG")
                .unwrap_or_else(|_| "runway_sched=info".to_string()),
        }
    }

    /// Filter directive to log with: the `--log` flag, then `rust_log`, then `log_filter`.
    pub fn log_directive(&self, flag: Option<&str>, rust_log: Option<&str>) -> String {
        flag.or(rust_log.filter(|d| !d.trim().is_empty()))
            .unwrap_or(self.log_filter.as_str())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fall_back_to_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{ "bump_buffer_secs": 90, "headwind_weight": 4.0 }"#).unwrap();
        assert_eq!(90, settings.bump_buffer_secs);
        assert_eq!(4.0, settings.headwind_weight);
        assert_eq!(EngineSettings::default().crosswind_weight, settings.crosswind_weight);
    }

    #[test]
    fn test_log_flag_wins_over_environment() {
        let config = Config {
            store_path: None,
            log_filter: "runway_sched=info".to_string(),
        };
        assert_eq!("debug", config.log_directive(Some("debug"), Some("warn")));
        assert_eq!("warn", config.log_directive(None, Some("warn")));
        assert_eq!("runway_sched=info", config.log_directive(None, Some(" ")));
        assert_eq!("runway_sched=info", config.log_directive(None, None));
    }
}
