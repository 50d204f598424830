use crate::codec::{SetId, SetMember};
use crate::types::{DeploymentGroup, TagFilter};
use std::collections::BTreeMap;

/// Flatten a group into the dotted attribute map external tooling reads.
///
/// Collections appear as `<field>.# = N` plus one entry per member field keyed
/// by the member's SetId, so attribute paths stay stable when the remote store
/// reorders a list.
pub fn flatten(group: &DeploymentGroup) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    attrs.insert("id".to_string(), group.identity.to_string());
    attrs.insert("app_name".to_string(), group.identity.app_name.clone());
    attrs.insert(
        "deployment_group_name".to_string(),
        group.identity.deployment_group_name.clone(),
    );
    attrs.insert(
        "deployment_config_name".to_string(),
        group.deployment_config_name.clone(),
    );
    attrs.insert("service_role_arn".to_string(), group.service_role_arn.clone());

    flatten_filters(&mut attrs, "ec2_tag_filter", &group.ec2_tag_filters);
    flatten_filters(
        &mut attrs,
        "on_premises_instance_tag_filter",
        &group.on_premises_tag_filters,
    );

    attrs.insert(
        "trigger_configuration.#".to_string(),
        group.triggers.len().to_string(),
    );
    for trigger in &group.triggers {
        let prefix = format!("trigger_configuration.{}", trigger.set_id());
        attrs.insert(format!("{prefix}.trigger_name"), trigger.name.clone());
        attrs.insert(format!("{prefix}.trigger_target_arn"), trigger.target_arn.clone());
        attrs.insert(
            format!("{prefix}.trigger_events.#"),
            trigger.events.len().to_string(),
        );
        for event in &trigger.events {
            attrs.insert(
                format!("{prefix}.trigger_events.{}", event_id(event.as_str())),
                event.to_string(),
            );
        }
    }

    attrs.insert(
        "autoscaling_groups.#".to_string(),
        group.autoscaling_groups.len().to_string(),
    );
    for asg in &group.autoscaling_groups {
        attrs.insert(format!("autoscaling_groups.{}", asg.set_id()), asg.clone());
    }

    attrs
}

fn event_id(event: &str) -> SetId {
    SetId::digest(&[("event", event.to_string())])
}

fn flatten_filters(attrs: &mut BTreeMap<String, String>, field: &str, filters: &[TagFilter]) {
    attrs.insert(format!("{field}.#"), filters.len().to_string());
    for filter in filters {
        let prefix = format!("{field}.{}", filter.set_id());
        attrs.insert(format!("{prefix}.key"), filter.key.clone());
        attrs.insert(format!("{prefix}.type"), filter.filter_type.to_string());
        attrs.insert(format!("{prefix}.value"), filter.value.clone());
    }
}
