//! Set codec: unordered, identity-keyed collections on one side, the remote
//! API's ordered lists on the other.
//!
//! Every member's identity ([`SetId`]) is a digest over *all* of its fields.
//! Equality, set difference and the attribute paths exposed to callers all go
//! through that one function.

use crate::error::Violation;
use crate::types::{
    DeploymentGroup, GroupIdentity, TagFilter, TagFilterType, TriggerConfiguration, TriggerEvent,
    DEFAULT_DEPLOYMENT_CONFIG,
};
use crate::wire::{WireGroup, WireTagFilter, WireTrigger};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// SetId
// ---------------------------------------------------------------------------

/// Stable identity of a set member: 16 hex chars of SHA-256 over a
/// length-prefixed encoding of every `(field, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetId(String);

impl SetId {
    pub fn digest(fields: &[(&'static str, String)]) -> Self {
        let mut hasher = Sha256::new();
        for (name, value) in fields {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        let digest = hasher.finalize();
        SetId(hex::encode(&digest[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SetMember
// ---------------------------------------------------------------------------

pub trait SetMember: Clone {
    type Wire: Clone;

    /// Every semantically meaningful field, in a fixed order. Leaving a field
    /// out makes distinct members compare equal.
    fn identity_fields(&self) -> Vec<(&'static str, String)>;

    fn to_wire(&self) -> Self::Wire;

    /// `field` is the path of this member inside its collection, used to name
    /// the offending field in violations.
    fn from_wire(wire: &Self::Wire, field: &str) -> Result<Self, Vec<Violation>>;

    fn set_id(&self) -> SetId {
        SetId::digest(&self.identity_fields())
    }
}

impl SetMember for TagFilter {
    type Wire = WireTagFilter;

    fn identity_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.key.clone()),
            ("type", self.filter_type.as_str().to_string()),
            ("value", self.value.clone()),
        ]
    }

    fn to_wire(&self) -> WireTagFilter {
        WireTagFilter {
            key: non_empty(&self.key),
            value: non_empty(&self.value),
            filter_type: Some(self.filter_type.as_str().to_string()),
        }
    }

    fn from_wire(wire: &WireTagFilter, field: &str) -> Result<Self, Vec<Violation>> {
        let raw_type = wire.filter_type.clone().unwrap_or_default();
        let filter_type = raw_type
            .parse::<TagFilterType>()
            .map_err(|reason| vec![Violation::new(format!("{field}.type"), &raw_type, reason)])?;
        Ok(TagFilter {
            key: wire.key.clone().unwrap_or_default(),
            value: wire.value.clone().unwrap_or_default(),
            filter_type,
        })
    }
}

impl SetMember for TriggerConfiguration {
    type Wire = WireTrigger;

    fn identity_fields(&self) -> Vec<(&'static str, String)> {
        let events = self
            .events
            .iter()
            .map(|e| e.as_str())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            ("trigger_events", events),
            ("trigger_name", self.name.clone()),
            ("trigger_target_arn", self.target_arn.clone()),
        ]
    }

    fn to_wire(&self) -> WireTrigger {
        WireTrigger {
            trigger_name: Some(self.name.clone()),
            trigger_target_arn: Some(self.target_arn.clone()),
            trigger_events: self.events.iter().map(|e| e.as_str().to_string()).collect(),
        }
    }

    fn from_wire(wire: &WireTrigger, field: &str) -> Result<Self, Vec<Violation>> {
        let mut violations = Vec::new();
        let name = wire.trigger_name.clone().unwrap_or_default();
        if name.is_empty() {
            violations.push(Violation::new(
                format!("{field}.trigger_name"),
                "",
                "trigger name is required",
            ));
        }
        let mut events = std::collections::BTreeSet::new();
        for raw in &wire.trigger_events {
            match raw.parse::<TriggerEvent>() {
                Ok(event) => {
                    events.insert(event);
                }
                Err(reason) => violations.push(Violation::new(
                    format!("{field}.trigger_events"),
                    raw,
                    reason,
                )),
            }
        }
        if !violations.is_empty() {
            return Err(violations);
        }
        Ok(TriggerConfiguration {
            name,
            target_arn: wire.trigger_target_arn.clone().unwrap_or_default(),
            events,
        })
    }
}

impl SetMember for String {
    type Wire = String;

    fn identity_fields(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.clone())]
    }

    fn to_wire(&self) -> String {
        self.clone()
    }

    fn from_wire(wire: &String, _field: &str) -> Result<Self, Vec<Violation>> {
        Ok(wire.clone())
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// MemberSet
// ---------------------------------------------------------------------------

/// Members keyed by identity. Iteration follows identity order, so anything
/// derived from a `MemberSet` is independent of input order.
#[derive(Debug, Clone)]
pub struct MemberSet<T> {
    members: BTreeMap<SetId, T>,
}

impl<T: SetMember> MemberSet<T> {
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a T>) -> Self
    where
        T: 'a,
    {
        let members = items
            .into_iter()
            .map(|item| (item.set_id(), item.clone()))
            .collect();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &SetId) -> bool {
        self.members.contains_key(id)
    }

    pub fn get(&self, id: &SetId) -> Option<&T> {
        self.members.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &SetId> {
        self.members.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SetId, &T)> {
        self.members.iter()
    }

    pub fn set_eq(&self, other: &MemberSet<T>) -> bool {
        self.members.len() == other.members.len()
            && self.members.keys().all(|id| other.members.contains_key(id))
    }

    /// Members of `self` whose identity is absent from `other`.
    pub fn difference<'a>(&'a self, other: &'a MemberSet<T>) -> Vec<&'a T> {
        self.members
            .iter()
            .filter(|(id, _)| !other.members.contains_key(id))
            .map(|(_, item)| item)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// encode / decode
// ---------------------------------------------------------------------------

/// Encode a collection for the wire: duplicates collapse, order is by identity.
pub fn encode<T: SetMember>(items: &[T]) -> Vec<T::Wire> {
    MemberSet::from_items(items)
        .iter()
        .map(|(_, item)| item.to_wire())
        .collect()
}

/// Decode a wire list. Wire order is kept; later duplicates of an identity
/// are dropped. All violations across the list are reported together.
pub fn decode<T: SetMember>(field: &str, wire: &[T::Wire]) -> Result<Vec<T>, Vec<Violation>> {
    let mut out: Vec<T> = Vec::with_capacity(wire.len());
    let mut seen = std::collections::BTreeSet::new();
    let mut violations = Vec::new();
    for (i, w) in wire.iter().enumerate() {
        match T::from_wire(w, &format!("{field}[{i}]")) {
            Ok(item) => {
                if seen.insert(item.set_id()) {
                    out.push(item);
                }
            }
            Err(mut v) => violations.append(&mut v),
        }
    }
    if violations.is_empty() {
        Ok(out)
    } else {
        Err(violations)
    }
}

pub fn encode_group(group: &DeploymentGroup) -> WireGroup {
    WireGroup {
        application_name: group.identity.app_name.clone(),
        deployment_group_name: group.identity.deployment_group_name.clone(),
        service_role_arn: group.service_role_arn.clone(),
        deployment_config_name: non_empty(&group.deployment_config_name),
        ec2_tag_filters: encode(&group.ec2_tag_filters),
        on_premises_instance_tag_filters: encode(&group.on_premises_tag_filters),
        trigger_configurations: encode(&group.triggers),
        auto_scaling_groups: encode(&group.autoscaling_groups),
    }
}

pub fn decode_group(wire: &WireGroup) -> Result<DeploymentGroup, Vec<Violation>> {
    let mut violations = Vec::new();
    let ec2_tag_filters = collect(
        decode("ec2_tag_filters", &wire.ec2_tag_filters),
        &mut violations,
    );
    let on_premises_tag_filters = collect(
        decode(
            "on_premises_instance_tag_filters",
            &wire.on_premises_instance_tag_filters,
        ),
        &mut violations,
    );
    let triggers = collect(
        decode("trigger_configurations", &wire.trigger_configurations),
        &mut violations,
    );
    let autoscaling_groups = collect(
        decode("auto_scaling_groups", &wire.auto_scaling_groups),
        &mut violations,
    );
    if !violations.is_empty() {
        return Err(violations);
    }
    Ok(DeploymentGroup {
        identity: GroupIdentity::new(&wire.application_name, &wire.deployment_group_name),
        service_role_arn: wire.service_role_arn.clone(),
        deployment_config_name: wire
            .deployment_config_name
            .clone()
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT_CONFIG.to_string()),
        ec2_tag_filters,
        on_premises_tag_filters,
        triggers,
        autoscaling_groups,
    })
}

fn collect<T>(result: Result<Vec<T>, Vec<Violation>>, violations: &mut Vec<Violation>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(mut v) => {
            violations.append(&mut v);
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
