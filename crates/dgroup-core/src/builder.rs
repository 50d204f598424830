//! Converts declared item maps into domain values, and back.
//!
//! The `*_to_display` functions are the exact inverse of the `build_*`
//! functions: `build(to_display(x))` is set-equal to `x`.

use crate::error::{DgroupError, Result, Violation};
use crate::source::{GroupSpec, TagFilterSpec, TriggerSpec};
use crate::types::{
    DeploymentGroup, GroupIdentity, TagFilter, TagFilterType, TriggerConfiguration, TriggerEvent,
};
use std::collections::BTreeSet;

/// Check one event name against the fixed enumeration.
pub fn validate_trigger_event(value: &str, field: &str) -> std::result::Result<TriggerEvent, Violation> {
    value
        .parse::<TriggerEvent>()
        .map_err(|reason| Violation::new(field, value, reason))
}

/// Build trigger configurations in input order. Each invalid event value
/// produces exactly one violation; all violations are returned together.
pub fn build_trigger_configs(specs: &[TriggerSpec]) -> Result<Vec<TriggerConfiguration>> {
    collect_or_fail(trigger_configs(specs, "trigger_configuration"))
}

fn trigger_configs(
    specs: &[TriggerSpec],
    field: &str,
) -> (Vec<TriggerConfiguration>, Vec<Violation>) {
    let mut out = Vec::with_capacity(specs.len());
    let mut violations = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        let events_field = format!("{field}[{i}].trigger_events");
        let mut events = BTreeSet::new();
        for raw in &spec.trigger_events {
            match validate_trigger_event(raw, &events_field) {
                Ok(event) => {
                    events.insert(event);
                }
                Err(v) => violations.push(v),
            }
        }
        if spec.trigger_events.is_empty() {
            violations.push(Violation::new(
                events_field,
                "[]",
                "at least one trigger event is required",
            ));
        }
        out.push(TriggerConfiguration {
            name: spec.trigger_name.clone(),
            target_arn: spec.trigger_target_arn.clone(),
            events,
        });
    }
    (out, violations)
}

pub fn triggers_to_display(triggers: &[TriggerConfiguration]) -> Vec<TriggerSpec> {
    triggers
        .iter()
        .map(|t| TriggerSpec {
            trigger_name: t.name.clone(),
            trigger_target_arn: t.target_arn.clone(),
            trigger_events: t.events.iter().map(|e| e.as_str().to_string()).collect(),
        })
        .collect()
}

/// Build tag filters, validating `type` against the allowed values.
/// `field` names the collection in violations (e.g. `ec2_tag_filter`).
pub fn build_tag_filters(field: &str, specs: &[TagFilterSpec]) -> Result<Vec<TagFilter>> {
    collect_or_fail(tag_filters(specs, field))
}

fn tag_filters(specs: &[TagFilterSpec], field: &str) -> (Vec<TagFilter>, Vec<Violation>) {
    let mut out = Vec::with_capacity(specs.len());
    let mut violations = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        match spec.filter_type.parse::<TagFilterType>() {
            Ok(filter_type) => out.push(TagFilter {
                key: spec.key.clone(),
                value: spec.value.clone(),
                filter_type,
            }),
            Err(reason) => violations.push(Violation::new(
                format!("{field}[{i}].type"),
                &spec.filter_type,
                reason,
            )),
        }
    }
    (out, violations)
}

pub fn tag_filters_to_display(filters: &[TagFilter]) -> Vec<TagFilterSpec> {
    filters
        .iter()
        .map(|f| TagFilterSpec {
            key: f.key.clone(),
            value: f.value.clone(),
            filter_type: f.filter_type.as_str().to_string(),
        })
        .collect()
}

/// Build the full desired group. Violations from every collection are
/// gathered before failing.
pub fn build_group(spec: &GroupSpec) -> Result<DeploymentGroup> {
    let mut violations = Vec::new();

    let (ec2_tag_filters, mut v) = tag_filters(&spec.ec2_tag_filter, "ec2_tag_filter");
    violations.append(&mut v);
    let (on_premises_tag_filters, mut v) = tag_filters(
        &spec.on_premises_instance_tag_filter,
        "on_premises_instance_tag_filter",
    );
    violations.append(&mut v);
    let (triggers, mut v) = trigger_configs(&spec.trigger_configuration, "trigger_configuration");
    violations.append(&mut v);

    if !violations.is_empty() {
        return Err(DgroupError::InvalidConfiguration(violations));
    }

    Ok(DeploymentGroup {
        identity: GroupIdentity::new(&spec.app_name, &spec.deployment_group_name),
        service_role_arn: spec.service_role_arn.clone(),
        deployment_config_name: spec.deployment_config_name.clone(),
        ec2_tag_filters,
        on_premises_tag_filters,
        triggers,
        autoscaling_groups: spec.autoscaling_groups.clone(),
    })
}

pub fn group_to_display(group: &DeploymentGroup) -> GroupSpec {
    GroupSpec {
        app_name: group.identity.app_name.clone(),
        deployment_group_name: group.identity.deployment_group_name.clone(),
        service_role_arn: group.service_role_arn.clone(),
        deployment_config_name: group.deployment_config_name.clone(),
        ec2_tag_filter: tag_filters_to_display(&group.ec2_tag_filters),
        on_premises_instance_tag_filter: tag_filters_to_display(&group.on_premises_tag_filters),
        trigger_configuration: triggers_to_display(&group.triggers),
        autoscaling_groups: group.autoscaling_groups.clone(),
    }
}

fn collect_or_fail<T>((items, violations): (Vec<T>, Vec<Violation>)) -> Result<Vec<T>> {
    if violations.is_empty() {
        Ok(items)
    } else {
        Err(DgroupError::InvalidConfiguration(violations))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
