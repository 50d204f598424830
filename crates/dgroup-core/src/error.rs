use crate::client::{ApiError, ErrorClass};
use crate::types::GroupIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One broken rule in a desired or observed configuration. Always names the
/// offending field and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl Violation {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?}: {}", self.field, self.value, self.reason)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum DgroupError {
    #[error("invalid configuration: {}", join_violations(.0))]
    InvalidConfiguration(Vec<Violation>),

    #[error("malformed remote state for {identity}: {}", join_violations(.violations))]
    MalformedState {
        identity: GroupIdentity,
        violations: Vec<Violation>,
    },

    #[error("deployment group not found: {0}")]
    NotFound(GroupIdentity),

    #[error("transient error on {identity}: {source}")]
    Transient {
        identity: GroupIdentity,
        #[source]
        source: ApiError,
    },

    #[error("remote error on {identity}: {source}")]
    Fatal {
        identity: GroupIdentity,
        #[source]
        source: ApiError,
    },

    #[error("timed out waiting for {identity} to be deleted after {}s", .elapsed.as_secs())]
    TimedOut {
        identity: GroupIdentity,
        elapsed: Duration,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DgroupError {
    /// Lift a remote error into the taxonomy using its classification.
    pub fn from_api(identity: &GroupIdentity, err: ApiError) -> Self {
        match err.classify() {
            ErrorClass::NotFound => DgroupError::NotFound(identity.clone()),
            ErrorClass::Transient => DgroupError::Transient {
                identity: identity.clone(),
                source: err,
            },
            ErrorClass::Fatal => DgroupError::Fatal {
                identity: identity.clone(),
                source: err,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DgroupError::Transient { .. })
    }
}

pub type Result<T> = std::result::Result<T, DgroupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_names_field_and_value() {
        let err = DgroupError::InvalidConfiguration(vec![Violation::new(
            "trigger_configuration[0].trigger_events",
            "Foo",
            "must be one of DeploymentStart",
        )]);
        let msg = err.to_string();
        assert!(msg.contains("trigger_configuration[0].trigger_events"));
        assert!(msg.contains("\"Foo\""));
    }

    #[test]
    fn fatal_preserves_provider_text() {
        let id = GroupIdentity::new("app", "group");
        let err = DgroupError::from_api(
            &id,
            ApiError::new("AccessDeniedException", "not authorized to perform codedeploy:Get"),
        );
        assert!(matches!(err, DgroupError::Fatal { .. }));
        assert!(err.to_string().contains("not authorized to perform codedeploy:Get"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn throttling_is_retryable() {
        let id = GroupIdentity::new("app", "group");
        let err = DgroupError::from_api(&id, ApiError::new("ThrottlingException", "slow down"));
        assert!(err.is_retryable());
    }

    #[test]
    fn timeout_states_identity_and_budget() {
        let err = DgroupError::TimedOut {
            identity: GroupIdentity::new("app", "group"),
            elapsed: Duration::from_secs(2400),
        };
        let msg = err.to_string();
        assert!(msg.contains("app/group"));
        assert!(msg.contains("2400s"));
    }
}
