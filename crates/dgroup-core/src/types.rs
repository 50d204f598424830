use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Deployment config applied when the configuration source names none.
pub const DEFAULT_DEPLOYMENT_CONFIG: &str = "CodeDeployDefault.OneAtATime";

// ---------------------------------------------------------------------------
// GroupIdentity
// ---------------------------------------------------------------------------

/// The immutable identity of a deployment group: the owning application and
/// the group's own name. Neither may change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupIdentity {
    pub app_name: String,
    pub deployment_group_name: String,
}

impl GroupIdentity {
    pub fn new(app_name: impl Into<String>, deployment_group_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            deployment_group_name: deployment_group_name.into(),
        }
    }
}

impl fmt::Display for GroupIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.deployment_group_name)
    }
}

// ---------------------------------------------------------------------------
// TagFilterType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TagFilterType {
    KeyOnly,
    ValueOnly,
    KeyAndValue,
}

impl TagFilterType {
    pub fn all() -> &'static [TagFilterType] {
        &[
            TagFilterType::KeyOnly,
            TagFilterType::ValueOnly,
            TagFilterType::KeyAndValue,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TagFilterType::KeyOnly => "KEY_ONLY",
            TagFilterType::ValueOnly => "VALUE_ONLY",
            TagFilterType::KeyAndValue => "KEY_AND_VALUE",
        }
    }
}

impl fmt::Display for TagFilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TagFilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagFilterType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "must be one of {}",
                    TagFilterType::all()
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

// ---------------------------------------------------------------------------
// TagFilter
// ---------------------------------------------------------------------------

/// Instance selector. An empty `key` or `value` means the field is unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagFilter {
    pub key: String,
    pub value: String,
    pub filter_type: TagFilterType,
}

impl TagFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>, filter_type: TagFilterType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            filter_type,
        }
    }

    /// Describe why this filter cannot select anything, if it can't.
    pub fn shape_problem(&self) -> Option<&'static str> {
        match self.filter_type {
            TagFilterType::KeyOnly if self.key.is_empty() => Some("KEY_ONLY filter requires a key"),
            TagFilterType::ValueOnly if self.value.is_empty() => {
                Some("VALUE_ONLY filter requires a value")
            }
            TagFilterType::KeyAndValue if self.key.is_empty() || self.value.is_empty() => {
                Some("KEY_AND_VALUE filter requires both key and value")
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TriggerEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TriggerEvent {
    DeploymentStart,
    DeploymentStop,
    DeploymentSuccess,
    DeploymentFailure,
    InstanceStart,
    InstanceSuccess,
    InstanceFailure,
}

impl TriggerEvent {
    pub fn all() -> &'static [TriggerEvent] {
        &[
            TriggerEvent::DeploymentStart,
            TriggerEvent::DeploymentStop,
            TriggerEvent::DeploymentSuccess,
            TriggerEvent::DeploymentFailure,
            TriggerEvent::InstanceStart,
            TriggerEvent::InstanceSuccess,
            TriggerEvent::InstanceFailure,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerEvent::DeploymentStart => "DeploymentStart",
            TriggerEvent::DeploymentStop => "DeploymentStop",
            TriggerEvent::DeploymentSuccess => "DeploymentSuccess",
            TriggerEvent::DeploymentFailure => "DeploymentFailure",
            TriggerEvent::InstanceStart => "InstanceStart",
            TriggerEvent::InstanceSuccess => "InstanceSuccess",
            TriggerEvent::InstanceFailure => "InstanceFailure",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TriggerEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TriggerEvent::all()
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "must be one of {}",
                    TriggerEvent::all()
                        .iter()
                        .map(|e| e.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

// ---------------------------------------------------------------------------
// TriggerConfiguration
// ---------------------------------------------------------------------------

/// A notification subscription. `events` is a set; iteration order is the
/// enumeration order above, never input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerConfiguration {
    pub name: String,
    pub target_arn: String,
    pub events: BTreeSet<TriggerEvent>,
}

impl TriggerConfiguration {
    pub fn new(
        name: impl Into<String>,
        target_arn: impl Into<String>,
        events: impl IntoIterator<Item = TriggerEvent>,
    ) -> Self {
        Self {
            name: name.into(),
            target_arn: target_arn.into(),
            events: events.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeploymentGroup
// ---------------------------------------------------------------------------

/// One deployment group, either as declared (desired) or as last read from
/// the remote store (observed). Collections are set-valued: order carries no
/// meaning and duplicates collapse by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentGroup {
    pub identity: GroupIdentity,
    pub service_role_arn: String,
    pub deployment_config_name: String,
    #[serde(default)]
    pub ec2_tag_filters: Vec<TagFilter>,
    #[serde(default)]
    pub on_premises_tag_filters: Vec<TagFilter>,
    #[serde(default)]
    pub triggers: Vec<TriggerConfiguration>,
    #[serde(default)]
    pub autoscaling_groups: Vec<String>,
}

impl DeploymentGroup {
    pub fn new(identity: GroupIdentity, service_role_arn: impl Into<String>) -> Self {
        Self {
            identity,
            service_role_arn: service_role_arn.into(),
            deployment_config_name: DEFAULT_DEPLOYMENT_CONFIG.to_string(),
            ec2_tag_filters: Vec::new(),
            on_premises_tag_filters: Vec::new(),
            triggers: Vec::new(),
            autoscaling_groups: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_event_parse_is_exact() {
        for event in TriggerEvent::all() {
            assert_eq!(event.as_str().parse::<TriggerEvent>().unwrap(), *event);
        }
        assert!("DeploymentStarts".parse::<TriggerEvent>().is_err());
        assert!("InstanceFail".parse::<TriggerEvent>().is_err());
        assert!("deploymentstart".parse::<TriggerEvent>().is_err());
        assert!("".parse::<TriggerEvent>().is_err());
    }

    #[test]
    fn tag_filter_type_parse() {
        assert_eq!(
            "KEY_AND_VALUE".parse::<TagFilterType>().unwrap(),
            TagFilterType::KeyAndValue
        );
        let err = "KEY".parse::<TagFilterType>().unwrap_err();
        assert!(err.contains("KEY_ONLY"));
    }

    #[test]
    fn tag_filter_shape() {
        assert!(TagFilter::new("k", "", TagFilterType::KeyOnly).shape_problem().is_none());
        assert!(TagFilter::new("", "v", TagFilterType::KeyOnly).shape_problem().is_some());
        assert!(TagFilter::new("k", "", TagFilterType::KeyAndValue)
            .shape_problem()
            .is_some());
        assert!(TagFilter::new("", "v", TagFilterType::ValueOnly).shape_problem().is_none());
    }

    #[test]
    fn identity_display() {
        let id = GroupIdentity::new("foo_app", "foo_group");
        assert_eq!(id.to_string(), "foo_app/foo_group");
    }

    #[test]
    fn new_group_uses_default_config() {
        let group = DeploymentGroup::new(GroupIdentity::new("a", "g"), "arn:aws:iam::1:role/r");
        assert_eq!(group.deployment_config_name, DEFAULT_DEPLOYMENT_CONFIG);
        assert!(group.triggers.is_empty());
    }

    #[test]
    fn trigger_events_are_a_set() {
        let t = TriggerConfiguration::new(
            "foo-trigger",
            "arn:aws:sns:us-west-2:123456789012:foo-topic",
            [
                TriggerEvent::DeploymentSuccess,
                TriggerEvent::DeploymentFailure,
                TriggerEvent::DeploymentSuccess,
            ],
        );
        assert_eq!(t.events.len(), 2);
    }
}
