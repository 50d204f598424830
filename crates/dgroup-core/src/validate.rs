use crate::config::ValidationRules;
use crate::error::{DgroupError, Result, Violation};
use crate::types::{DeploymentGroup, TagFilter};
use std::collections::HashSet;

/// Check every invariant of a desired group. Runs before the diff and before
/// any remote call; all violations are reported at once.
pub fn validate_group(group: &DeploymentGroup, rules: &ValidationRules) -> Result<()> {
    let mut violations = Vec::new();

    for (field, value) in [
        ("app_name", &group.identity.app_name),
        ("deployment_group_name", &group.identity.deployment_group_name),
        ("service_role_arn", &group.service_role_arn),
        ("deployment_config_name", &group.deployment_config_name),
    ] {
        if value.trim().is_empty() {
            violations.push(Violation::new(field, value.as_str(), "must not be empty"));
        }
    }

    for (field, value) in [
        ("app_name", &group.identity.app_name),
        ("deployment_group_name", &group.identity.deployment_group_name),
    ] {
        if let Some(reason) = identity_name_problem(value) {
            violations.push(Violation::new(field, value.as_str(), reason));
        }
    }

    check_filters(&mut violations, "ec2_tag_filter", &group.ec2_tag_filters);
    check_filters(
        &mut violations,
        "on_premises_instance_tag_filter",
        &group.on_premises_tag_filters,
    );

    if rules.require_instance_selection
        && group.ec2_tag_filters.is_empty()
        && group.on_premises_tag_filters.is_empty()
    {
        violations.push(Violation::new(
            "ec2_tag_filter",
            "[]",
            "at least one ec2_tag_filter or on_premises_instance_tag_filter is required",
        ));
    }

    let target_pattern = match regex::Regex::new(&rules.trigger_target_pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            violations.push(Violation::new(
                "validation.trigger_target_pattern",
                &rules.trigger_target_pattern,
                format!("invalid regex: {e}"),
            ));
            None
        }
    };

    let mut names = HashSet::new();
    for (i, trigger) in group.triggers.iter().enumerate() {
        let field = format!("trigger_configuration[{i}]");
        if trigger.name.trim().is_empty() {
            violations.push(Violation::new(
                format!("{field}.trigger_name"),
                &trigger.name,
                "must not be empty",
            ));
        } else if !names.insert(trigger.name.as_str()) {
            violations.push(Violation::new(
                format!("{field}.trigger_name"),
                &trigger.name,
                "duplicate trigger name in this group",
            ));
        }
        if trigger.events.is_empty() {
            violations.push(Violation::new(
                format!("{field}.trigger_events"),
                "[]",
                "at least one trigger event is required",
            ));
        }
        if let Some(re) = &target_pattern {
            if !re.is_match(&trigger.target_arn) {
                violations.push(Violation::new(
                    format!("{field}.trigger_target_arn"),
                    &trigger.target_arn,
                    format!("does not match {}", rules.trigger_target_pattern),
                ));
            }
        }
    }

    for (i, asg) in group.autoscaling_groups.iter().enumerate() {
        if asg.trim().is_empty() {
            violations.push(Violation::new(
                format!("autoscaling_groups[{i}]"),
                asg.as_str(),
                "must not be empty",
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DgroupError::InvalidConfiguration(violations))
    }
}

/// Identity names double as path segments in file-backed stores, so they may
/// not be `.`/`..` or contain a path separator.
pub fn identity_name_problem(name: &str) -> Option<&'static str> {
    if name == "." || name == ".." {
        Some("must not be a relative path component")
    } else if name.contains(['/', '\\']) {
        Some("must not contain a path separator")
    } else {
        None
    }
}

fn check_filters(violations: &mut Vec<Violation>, field: &str, filters: &[TagFilter]) {
    for (i, filter) in filters.iter().enumerate() {
        if let Some(problem) = filter.shape_problem() {
            violations.push(Violation::new(
                format!("{field}[{i}]"),
                format!("{}={} ({})", filter.key, filter.value, filter.filter_type),
                problem,
            ));
        }
    }
}
