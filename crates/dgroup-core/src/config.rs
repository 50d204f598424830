use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Delay between existence checks while waiting for a deletion to settle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    Fixed {
        interval_seconds: u64,
    },
    /// Doubles each attempt starting at `initial_seconds`, capped at `max_seconds`.
    Exponential {
        initial_seconds: u64,
        max_seconds: u64,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            initial_seconds: 1,
            max_seconds: default_max_interval(),
        }
    }
}

fn default_max_interval() -> u64 {
    10
}

impl Backoff {
    /// Delay before attempt `attempt + 1`, where `attempt` is 1-indexed.
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed { interval_seconds } => Duration::from_secs(*interval_seconds),
            Backoff::Exponential {
                initial_seconds,
                max_seconds,
            } => {
                let shift = attempt.saturating_sub(1).min(32);
                let secs = initial_seconds.saturating_mul(1u64 << shift);
                Duration::from_secs(secs.min(*max_seconds))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PollSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Total time allowed for a deletion to become observable.
    #[serde(default = "default_budget")]
    pub budget_seconds: u64,
    #[serde(default)]
    pub backoff: Backoff,
}

fn default_budget() -> u64 {
    40 * 60
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            budget_seconds: default_budget(),
            backoff: Backoff::default(),
        }
    }
}

impl PollSettings {
    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_seconds)
    }
}

// ---------------------------------------------------------------------------
// ValidationRules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Reject groups that select no instances by tag (neither EC2 nor
    /// on-premises filters). Groups that target only autoscaling groups are
    /// legal remotely, so this is off unless asked for.
    #[serde(default)]
    pub require_instance_selection: bool,
    /// Pattern every trigger target must match.
    #[serde(default = "default_target_pattern")]
    pub trigger_target_pattern: String,
}

fn default_target_pattern() -> String {
    "^arn:[a-z0-9-]+:sns:".to_string()
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            require_instance_selection: false,
            trigger_target_pattern: default_target_pattern(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReconcileConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub validation: ValidationRules,
}

impl ReconcileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: ReconcileConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. A zero budget can never observe a deletion
        if self.poll.budget_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "poll.budget_seconds must be greater than 0".to_string(),
            });
        }

        // 2. Backoff shape
        match &self.poll.backoff {
            Backoff::Fixed { interval_seconds } => {
                if *interval_seconds == 0 {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: "poll.backoff.interval_seconds=0 polls without pause".to_string(),
                    });
                }
                if *interval_seconds > self.poll.budget_seconds {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "poll.backoff.interval_seconds={} exceeds the budget of {}s; \
                             only one check will run",
                            interval_seconds, self.poll.budget_seconds
                        ),
                    });
                }
            }
            Backoff::Exponential {
                initial_seconds,
                max_seconds,
            } => {
                if initial_seconds > max_seconds {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "poll.backoff.initial_seconds={} is larger than max_seconds={}",
                            initial_seconds, max_seconds
                        ),
                    });
                }
            }
        }

        // 3. Target pattern must compile
        if let Err(e) = regex::Regex::new(&self.validation.trigger_target_pattern) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("validation.trigger_target_pattern is not a valid regex: {e}"),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = ReconcileConfig::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: ReconcileConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.poll, cfg.poll);
        assert_eq!(parsed.validation, cfg.validation);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn empty_document_gets_defaults() {
        let cfg: ReconcileConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.poll.budget(), Duration::from_secs(2400));
        assert!(!cfg.validation.require_instance_selection);
    }

    #[test]
    fn fixed_backoff_parses() {
        let yaml = "poll:\n  budget_seconds: 60\n  backoff:\n    kind: fixed\n    interval_seconds: 5\n";
        let cfg: ReconcileConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.poll.backoff, Backoff::Fixed { interval_seconds: 5 });
        assert_eq!(cfg.poll.backoff.delay(7), Duration::from_secs(5));
    }

    #[test]
    fn exponential_backoff_is_bounded() {
        let b = Backoff::Exponential {
            initial_seconds: 1,
            max_seconds: 10,
        };
        assert_eq!(b.delay(1), Duration::from_secs(1));
        assert_eq!(b.delay(2), Duration::from_secs(2));
        assert_eq!(b.delay(4), Duration::from_secs(8));
        assert_eq!(b.delay(5), Duration::from_secs(10));
        assert_eq!(b.delay(500), Duration::from_secs(10));
    }

    #[test]
    fn validate_flags_bad_settings() {
        let mut cfg = ReconcileConfig::default();
        cfg.poll.budget_seconds = 0;
        cfg.poll.backoff = Backoff::Exponential {
            initial_seconds: 30,
            max_seconds: 5,
        };
        cfg.validation.trigger_target_pattern = "(".to_string();
        let warnings = cfg.validate();
        let errors = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .count();
        assert_eq!(errors, 3);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dgroup.yaml");
        let mut cfg = ReconcileConfig::default();
        cfg.validation.require_instance_selection = true;
        cfg.save(&path).unwrap();
        let loaded = ReconcileConfig::load(&path).unwrap();
        assert!(loaded.validation.require_instance_selection);
    }
}
