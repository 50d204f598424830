//! Desired-vs-observed comparison.
//!
//! Collections are compared by [`SetId`](crate::codec::SetId), never by
//! position. How a changed collection goes on the wire is decided by a
//! [`CollectionUpdatePolicy`]; the remote API replaces whole collections, so
//! [`COLLECTION_UPDATE_POLICY`] is `ReplaceWhole`.

use crate::codec::{MemberSet, SetMember};
use crate::types::DeploymentGroup;
use crate::wire::{WireTagFilter, WireTrigger};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionUpdatePolicy {
    /// Send the full desired collection whenever any member differs.
    ReplaceWhole,
    /// Send only the members to add and to remove.
    Incremental,
}

/// The update API takes each collection wholesale.
pub const COLLECTION_UPDATE_POLICY: CollectionUpdatePolicy = CollectionUpdatePolicy::ReplaceWhole;

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    AppName,
    DeploymentGroupName,
    ServiceRoleArn,
    DeploymentConfigName,
    Ec2TagFilters,
    OnPremisesTagFilters,
    TriggerConfigurations,
    AutoScalingGroups,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::AppName => "app_name",
            Field::DeploymentGroupName => "deployment_group_name",
            Field::ServiceRoleArn => "service_role_arn",
            Field::DeploymentConfigName => "deployment_config_name",
            Field::Ec2TagFilters => "ec2_tag_filter",
            Field::OnPremisesTagFilters => "on_premises_instance_tag_filter",
            Field::TriggerConfigurations => "trigger_configuration",
            Field::AutoScalingGroups => "autoscaling_groups",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UpdateRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CollectionChange<W> {
    Replace { items: Vec<W> },
    Incremental { add: Vec<W>, remove: Vec<W> },
}

/// Update payload. `None` means "leave unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_config_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec2_tag_filters: Option<CollectionChange<WireTagFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_premises_tag_filters: Option<CollectionChange<WireTagFilter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_configurations: Option<CollectionChange<WireTrigger>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling_groups: Option<CollectionChange<String>>,
}

impl UpdateRequest {
    pub fn changed_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        if self.service_role_arn.is_some() {
            fields.push(Field::ServiceRoleArn);
        }
        if self.deployment_config_name.is_some() {
            fields.push(Field::DeploymentConfigName);
        }
        if self.ec2_tag_filters.is_some() {
            fields.push(Field::Ec2TagFilters);
        }
        if self.on_premises_tag_filters.is_some() {
            fields.push(Field::OnPremisesTagFilters);
        }
        if self.trigger_configurations.is_some() {
            fields.push(Field::TriggerConfigurations);
        }
        if self.auto_scaling_groups.is_some() {
            fields.push(Field::AutoScalingGroups);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Plan {
    NoOp,
    Update(UpdateRequest),
    /// An identity field differs; the group has to be destroyed and recreated.
    Replace { field: Field, from: String, to: String },
}

pub fn diff(desired: &DeploymentGroup, observed: &DeploymentGroup) -> Plan {
    diff_with_policy(desired, observed, COLLECTION_UPDATE_POLICY)
}

pub fn diff_with_policy(
    desired: &DeploymentGroup,
    observed: &DeploymentGroup,
    policy: CollectionUpdatePolicy,
) -> Plan {
    if desired.identity.app_name != observed.identity.app_name {
        return Plan::Replace {
            field: Field::AppName,
            from: observed.identity.app_name.clone(),
            to: desired.identity.app_name.clone(),
        };
    }
    if desired.identity.deployment_group_name != observed.identity.deployment_group_name {
        return Plan::Replace {
            field: Field::DeploymentGroupName,
            from: observed.identity.deployment_group_name.clone(),
            to: desired.identity.deployment_group_name.clone(),
        };
    }

    let request = UpdateRequest {
        service_role_arn: scalar_change(&desired.service_role_arn, &observed.service_role_arn),
        deployment_config_name: scalar_change(
            &desired.deployment_config_name,
            &observed.deployment_config_name,
        ),
        ec2_tag_filters: collection_change(
            &desired.ec2_tag_filters,
            &observed.ec2_tag_filters,
            policy,
        ),
        on_premises_tag_filters: collection_change(
            &desired.on_premises_tag_filters,
            &observed.on_premises_tag_filters,
            policy,
        ),
        trigger_configurations: collection_change(&desired.triggers, &observed.triggers, policy),
        auto_scaling_groups: collection_change(
            &desired.autoscaling_groups,
            &observed.autoscaling_groups,
            policy,
        ),
    };

    if request.is_empty() {
        Plan::NoOp
    } else {
        Plan::Update(request)
    }
}

fn scalar_change(desired: &str, observed: &str) -> Option<String> {
    (desired != observed).then(|| desired.to_string())
}

fn collection_change<T: SetMember>(
    desired: &[T],
    observed: &[T],
    policy: CollectionUpdatePolicy,
) -> Option<CollectionChange<T::Wire>> {
    let desired = MemberSet::from_items(desired);
    let observed = MemberSet::from_items(observed);
    let to_add = desired.difference(&observed);
    let to_remove = observed.difference(&desired);
    if to_add.is_empty() && to_remove.is_empty() {
        return None;
    }
    Some(match policy {
        CollectionUpdatePolicy::ReplaceWhole => CollectionChange::Replace {
            items: desired.iter().map(|(_, item)| item.to_wire()).collect(),
        },
        CollectionUpdatePolicy::Incremental => CollectionChange::Incremental {
            add: to_add.into_iter().map(|item| item.to_wire()).collect(),
            remove: to_remove.into_iter().map(|item| item.to_wire()).collect(),
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
