//! Configuration source: the declared, user-facing shape of a deployment group.

use crate::builder;
use crate::config::ValidationRules;
use crate::error::Result;
use crate::types::{DeploymentGroup, DEFAULT_DEPLOYMENT_CONFIG};
use crate::validate::validate_group;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagFilterSpec {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type")]
    pub filter_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerSpec {
    pub trigger_name: String,
    pub trigger_target_arn: String,
    /// Treated as a set; the display form lists events in enumeration order.
    #[serde(default)]
    pub trigger_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub app_name: String,
    pub deployment_group_name: String,
    #[serde(default)]
    pub service_role_arn: String,
    #[serde(default = "default_deployment_config")]
    pub deployment_config_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ec2_tag_filter: Vec<TagFilterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_premises_instance_tag_filter: Vec<TagFilterSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_configuration: Vec<TriggerSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub autoscaling_groups: Vec<String>,
}

fn default_deployment_config() -> String {
    DEFAULT_DEPLOYMENT_CONFIG.to_string()
}

impl GroupSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Build the desired state and check every invariant before anything
    /// touches the remote API.
    pub fn to_desired(&self, rules: &ValidationRules) -> Result<DeploymentGroup> {
        let group = builder::build_group(self)?;
        validate_group(&group, rules)?;
        Ok(group)
    }
}
