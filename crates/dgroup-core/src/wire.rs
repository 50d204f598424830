use crate::codec::{SetId, SetMember};
use crate::diff::{CollectionChange, UpdateRequest};
use crate::types::{TagFilter, TriggerConfiguration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Tag filter as the remote API lists it. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTagFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_target_arn: Option<String>,
    #[serde(default)]
    pub trigger_events: Vec<String>,
}

/// The group document exchanged with the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireGroup {
    pub application_name: String,
    pub deployment_group_name: String,
    #[serde(default)]
    pub service_role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_config_name: Option<String>,
    #[serde(default, rename = "Ec2TagFilters")]
    pub ec2_tag_filters: Vec<WireTagFilter>,
    #[serde(default)]
    pub on_premises_instance_tag_filters: Vec<WireTagFilter>,
    #[serde(default)]
    pub trigger_configurations: Vec<WireTrigger>,
    #[serde(default)]
    pub auto_scaling_groups: Vec<String>,
}

impl WireGroup {
    /// Apply an update payload the way the remote API does: scalars overwrite,
    /// collections are replaced or patched according to the change mode.
    pub fn apply(&mut self, request: &UpdateRequest) {
        if let Some(role) = &request.service_role_arn {
            self.service_role_arn = role.clone();
        }
        if let Some(config) = &request.deployment_config_name {
            self.deployment_config_name = Some(config.clone());
        }
        if let Some(change) = &request.ec2_tag_filters {
            apply_change::<TagFilter>(&mut self.ec2_tag_filters, change);
        }
        if let Some(change) = &request.on_premises_tag_filters {
            apply_change::<TagFilter>(&mut self.on_premises_instance_tag_filters, change);
        }
        if let Some(change) = &request.trigger_configurations {
            apply_change::<TriggerConfiguration>(&mut self.trigger_configurations, change);
        }
        if let Some(change) = &request.auto_scaling_groups {
            apply_change::<String>(&mut self.auto_scaling_groups, change);
        }
    }
}

/// Incremental changes match members by SetId, so a stored item whose wire
/// form differs only in list order or empty-vs-absent fields is still found.
/// Items that do not decode fall back to exact wire equality.
fn apply_change<T>(items: &mut Vec<T::Wire>, change: &CollectionChange<T::Wire>)
where
    T: SetMember,
    T::Wire: PartialEq,
{
    match change {
        CollectionChange::Replace { items: replacement } => {
            *items = replacement.clone();
        }
        CollectionChange::Incremental { add, remove } => {
            let remove_ids: BTreeSet<SetId> = remove.iter().filter_map(wire_id::<T>).collect();
            items.retain(|item| match wire_id::<T>(item) {
                Some(id) => !remove_ids.contains(&id),
                None => !remove.contains(item),
            });
            for item in add {
                let present = match wire_id::<T>(item) {
                    Some(id) => items.iter().any(|i| wire_id::<T>(i).as_ref() == Some(&id)),
                    None => items.contains(item),
                };
                if !present {
                    items.push(item.clone());
                }
            }
        }
    }
}

fn wire_id<T: SetMember>(wire: &T::Wire) -> Option<SetId> {
    T::from_wire(wire, "").ok().map(|member| member.set_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(name: &str, events: &[&str]) -> WireTrigger {
        WireTrigger {
            trigger_name: Some(name.to_string()),
            trigger_target_arn: Some(format!("arn:aws:sns:us-west-2:123456789012:{name}")),
            trigger_events: events.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn wire_group_uses_api_field_names() {
        let group = WireGroup {
            application_name: "foo_app".into(),
            deployment_group_name: "foo".into(),
            service_role_arn: "arn:aws:iam::123456789012:role/foo".into(),
            ec2_tag_filters: vec![WireTagFilter {
                key: Some("filterkey".into()),
                value: Some("filtervalue".into()),
                filter_type: Some("KEY_AND_VALUE".into()),
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["ApplicationName"], "foo_app");
        assert_eq!(json["Ec2TagFilters"][0]["Type"], "KEY_AND_VALUE");
        assert!(json.get("DeploymentConfigName").is_none());
    }

    #[test]
    fn apply_replaces_whole_collection() {
        let mut group = WireGroup {
            trigger_configurations: vec![trigger("foo-trigger", &["DeploymentFailure"])],
            ..Default::default()
        };
        let request = UpdateRequest {
            trigger_configurations: Some(CollectionChange::Replace {
                items: vec![
                    trigger("foo-trigger", &["DeploymentFailure", "DeploymentSuccess"]),
                    trigger("bar-trigger", &["InstanceFailure"]),
                ],
            }),
            ..Default::default()
        };
        group.apply(&request);
        assert_eq!(group.trigger_configurations.len(), 2);
        assert_eq!(group.trigger_configurations[0].trigger_events.len(), 2);
    }

    #[test]
    fn apply_incremental_patch() {
        let mut group = WireGroup {
            auto_scaling_groups: vec!["asg-a".into(), "asg-b".into()],
            ..Default::default()
        };
        let request = UpdateRequest {
            auto_scaling_groups: Some(CollectionChange::Incremental {
                add: vec!["asg-c".into()],
                remove: vec!["asg-a".into()],
            }),
            service_role_arn: Some("arn:aws:iam::1:role/new".into()),
            ..Default::default()
        };
        group.apply(&request);
        assert_eq!(group.auto_scaling_groups, vec!["asg-b", "asg-c"]);
        assert_eq!(group.service_role_arn, "arn:aws:iam::1:role/new");
    }

    #[test]
    fn incremental_removes_reordered_trigger() {
        use crate::codec::decode_group;
        use crate::diff::{diff_with_policy, CollectionUpdatePolicy, Plan};
        use crate::types::TriggerEvent;

        let mut stored = WireGroup {
            application_name: "foo-app".into(),
            deployment_group_name: "foo-group".into(),
            service_role_arn: "arn:aws:iam::123456789012:role/foo-role".into(),
            trigger_configurations: vec![trigger(
                "foo-trigger",
                &["DeploymentFailure", "DeploymentSuccess"],
            )],
            ..Default::default()
        };
        let observed = decode_group(&stored).unwrap();
        let mut desired = observed.clone();
        desired.triggers[0].events.insert(TriggerEvent::InstanceFailure);

        let Plan::Update(request) =
            diff_with_policy(&desired, &observed, CollectionUpdatePolicy::Incremental)
        else {
            panic!("expected an update");
        };
        stored.apply(&request);

        assert_eq!(stored.trigger_configurations.len(), 1);
        let events = &stored.trigger_configurations[0].trigger_events;
        assert_eq!(events.len(), 3);
        assert!(events.iter().any(|e| e == "InstanceFailure"));
    }

    #[test]
    fn incremental_removes_filter_with_empty_key() {
        let mut group = WireGroup {
            ec2_tag_filters: vec![WireTagFilter {
                key: Some(String::new()),
                value: Some("filtervalue".into()),
                filter_type: Some("VALUE_ONLY".into()),
            }],
            ..Default::default()
        };
        let request = UpdateRequest {
            ec2_tag_filters: Some(CollectionChange::Incremental {
                add: vec![],
                remove: vec![WireTagFilter {
                    key: None,
                    value: Some("filtervalue".into()),
                    filter_type: Some("VALUE_ONLY".into()),
                }],
            }),
            ..Default::default()
        };
        group.apply(&request);
        assert!(group.ec2_tag_filters.is_empty());
    }
}
