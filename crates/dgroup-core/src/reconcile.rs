//! One reconcile pass per call: validate, read, create or diff-and-update,
//! then read back. Deletion hands off to the [`DeletionPoller`].

use crate::attributes;
use crate::client::CloudApi;
use crate::codec::{decode_group, encode_group};
use crate::config::ReconcileConfig;
use crate::diff::{self, Field, Plan, UpdateRequest};
use crate::error::{DgroupError, Result};
use crate::poller::{DeletionPoller, PollOutcome, PollReport};
use crate::types::{DeploymentGroup, GroupIdentity};
use crate::validate::validate_group;
use crate::wire::WireGroup;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// What a reconcile pass would do, computed without writing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    Create { group: WireGroup },
    Update { request: UpdateRequest },
    Replace { field: Field, from: String, to: String },
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created,
    Updated { fields: Vec<Field> },
    Unchanged,
    /// An identity field changed. Nothing was written.
    ReplaceRequired { field: Field, from: String, to: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub identity: GroupIdentity,
    pub outcome: ReconcileOutcome,
    /// State read back after the write. `None` when the group is not visible
    /// or the read-back failed.
    pub observed: Option<DeploymentGroup>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DestroyOutcome {
    Deleted { report: PollReport },
    AlreadyAbsent,
    /// The delete call succeeded but the group was still visible when the
    /// poll budget ran out.
    Pending { report: PollReport },
    Cancelled { report: PollReport },
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct Reconciler<'a, C: CloudApi + ?Sized> {
    client: &'a C,
    config: &'a ReconcileConfig,
}

impl<'a, C: CloudApi + ?Sized> Reconciler<'a, C> {
    pub fn new(client: &'a C, config: &'a ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Read the group. `Ok(None)` when the remote store reports it absent.
    pub async fn observe(&self, identity: &GroupIdentity) -> Result<Option<DeploymentGroup>> {
        match self.client.get_group(identity).await {
            Ok(wire) => decode_group(&wire)
                .map(Some)
                .map_err(|violations| DgroupError::MalformedState {
                    identity: identity.clone(),
                    violations,
                }),
            Err(e) => match DgroupError::from_api(identity, e) {
                DgroupError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    pub async fn plan(&self, desired: &DeploymentGroup) -> Result<PlannedAction> {
        validate_group(desired, &self.config.validation)?;
        let Some(observed) = self.observe(&desired.identity).await? else {
            return Ok(PlannedAction::Create {
                group: encode_group(desired),
            });
        };
        Ok(match diff::diff(desired, &observed) {
            Plan::NoOp => PlannedAction::NoOp,
            Plan::Update(request) => PlannedAction::Update { request },
            Plan::Replace { field, from, to } => PlannedAction::Replace { field, from, to },
        })
    }

    pub async fn reconcile(&self, desired: &DeploymentGroup) -> Result<ReconcileReport> {
        let identity = &desired.identity;
        let outcome = match self.plan(desired).await? {
            PlannedAction::Create { group } => {
                info!(group = %identity, "creating deployment group");
                self.client
                    .create_group(&group)
                    .await
                    .map_err(|e| DgroupError::from_api(identity, e))?;
                ReconcileOutcome::Created
            }
            PlannedAction::Update { request } => {
                let fields = request.changed_fields();
                info!(
                    group = %identity,
                    fields = ?fields.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
                    "updating deployment group"
                );
                self.client
                    .update_group(identity, &request)
                    .await
                    .map_err(|e| DgroupError::from_api(identity, e))?;
                ReconcileOutcome::Updated { fields }
            }
            PlannedAction::NoOp => {
                debug!(group = %identity, "deployment group up to date");
                ReconcileOutcome::Unchanged
            }
            PlannedAction::Replace { field, from, to } => {
                warn!(group = %identity, %field, %from, %to, "identity change requires replacement");
                ReconcileOutcome::ReplaceRequired { field, from, to }
            }
        };

        // Any write has already been accepted at this point.
        let observed = match self.observe(identity).await {
            Ok(observed) => observed,
            Err(e) => {
                warn!(group = %identity, error = %e, "could not read back deployment group");
                None
            }
        };
        match &observed {
            Some(after) if !matches!(outcome, ReconcileOutcome::ReplaceRequired { .. }) => {
                if diff::diff(desired, after) != Plan::NoOp {
                    warn!(group = %identity, "remote state has not converged after write");
                }
            }
            None => warn!(group = %identity, "deployment group not visible after write"),
            _ => {}
        }

        Ok(ReconcileReport {
            identity: identity.clone(),
            outcome,
            attributes: observed.as_ref().map(attributes::flatten).unwrap_or_default(),
            observed,
        })
    }

    /// Delete the group and wait for the deletion to become observable.
    pub async fn destroy(
        &self,
        identity: &GroupIdentity,
        deadline: Option<Instant>,
    ) -> Result<DestroyOutcome> {
        let started = Instant::now();
        if let Err(e) = self.client.delete_group(identity).await {
            return match DgroupError::from_api(identity, e) {
                DgroupError::NotFound(_) => {
                    info!(group = %identity, "deployment group already absent");
                    Ok(DestroyOutcome::AlreadyAbsent)
                }
                other => Err(other),
            };
        }
        info!(group = %identity, "delete issued, waiting for confirmation");

        let report = DeletionPoller::new(self.client, &self.config.poll)
            .wait(identity, started, deadline)
            .await?;
        Ok(match report.outcome {
            PollOutcome::Confirmed => DestroyOutcome::Deleted { report },
            PollOutcome::TimedOut => DestroyOutcome::Pending { report },
            PollOutcome::Cancelled => DestroyOutcome::Cancelled { report },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use crate::config::{Backoff, PollSettings};
    use crate::testing::ScriptedApi;
    use crate::types::{TagFilter, TagFilterType, TriggerConfiguration, TriggerEvent};
    use std::time::Duration;

    fn id() -> GroupIdentity {
        GroupIdentity::new("foo_app", "foo")
    }

    fn desired() -> DeploymentGroup {
        let mut g = DeploymentGroup::new(id(), "arn:aws:iam::123456789012:role/foo_role");
        g.ec2_tag_filters
            .push(TagFilter::new("filterkey", "filtervalue", TagFilterType::KeyAndValue));
        g.triggers.push(TriggerConfiguration::new(
            "foo-trigger",
            "arn:aws:sns:us-west-2:123456789012:foo-topic",
            [TriggerEvent::DeploymentFailure],
        ));
        g
    }

    fn config() -> ReconcileConfig {
        ReconcileConfig {
            poll: PollSettings {
                budget_seconds: 60,
                backoff: Backoff::Fixed {
                    interval_seconds: 5,
                },
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn creates_then_unchanged() {
        let api = ScriptedApi::new();
        let cfg = config();
        let r = Reconciler::new(&api, &cfg);

        let report = r.reconcile(&desired()).await.unwrap();
        assert_eq!(report.outcome, ReconcileOutcome::Created);
        assert_eq!(report.observed.as_ref(), Some(&desired()));
        assert_eq!(report.attributes["trigger_configuration.#"], "1");

        let again = r.reconcile(&desired()).await.unwrap();
        assert_eq!(again.outcome, ReconcileOutcome::Unchanged);
        assert!(!api.calls().iter().any(|c| c.starts_with("update")));
    }

    #[tokio::test]
    async fn added_event_updates_only_triggers() {
        let api = ScriptedApi::new();
        let cfg = config();
        let r = Reconciler::new(&api, &cfg);
        r.reconcile(&desired()).await.unwrap();

        let mut next = desired();
        next.triggers[0].events.insert(TriggerEvent::DeploymentSuccess);
        let report = r.reconcile(&next).await.unwrap();
        assert_eq!(
            report.outcome,
            ReconcileOutcome::Updated {
                fields: vec![Field::TriggerConfigurations]
            }
        );
        let stored = api.stored(&id()).unwrap();
        assert_eq!(
            stored.trigger_configurations[0].trigger_events,
            vec!["DeploymentSuccess", "DeploymentFailure"]
        );
        assert_eq!(report.observed, Some(next));
    }

    #[tokio::test]
    async fn disappeared_group_is_recreated() {
        let api = ScriptedApi::new();
        let cfg = config();
        let r = Reconciler::new(&api, &cfg);
        r.reconcile(&desired()).await.unwrap();

        api.vanish(&id());
        let report = r.reconcile(&desired()).await.unwrap();
        assert_eq!(report.outcome, ReconcileOutcome::Created);
        assert!(api.stored(&id()).is_some());
    }

    #[tokio::test]
    async fn failed_read_back_still_reports_write() {
        let api = ScriptedApi::new();
        api.push_get(Err(ApiError::group_not_found(&id())));
        api.push_get(Err(ApiError::new("ThrottlingException", "Rate exceeded")));
        let cfg = config();

        let report = Reconciler::new(&api, &cfg).reconcile(&desired()).await.unwrap();
        assert_eq!(report.outcome, ReconcileOutcome::Created);
        assert!(report.observed.is_none());
        assert!(report.attributes.is_empty());
        assert!(api.stored(&id()).is_some());
    }

    #[tokio::test]
    async fn invalid_desired_state_makes_no_calls() {
        let api = ScriptedApi::new();
        let cfg = config();
        let mut bad = desired();
        bad.triggers[0].events.clear();
        let err = Reconciler::new(&api, &cfg).reconcile(&bad).await.unwrap_err();
        assert!(matches!(err, DgroupError::InvalidConfiguration(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn plan_reports_create_for_missing_group() {
        let api = ScriptedApi::new();
        let cfg = config();
        let plan = Reconciler::new(&api, &cfg).plan(&desired()).await.unwrap();
        match plan {
            PlannedAction::Create { group } => {
                assert_eq!(group.deployment_group_name, "foo");
                assert_eq!(group.trigger_configurations.len(), 1);
            }
            other => panic!("expected create, got {other:?}"),
        }
        assert!(api.stored(&id()).is_none());
    }

    #[tokio::test]
    async fn malformed_remote_state_is_reported() {
        let api = ScriptedApi::new();
        let mut wire = encode_group(&desired());
        wire.trigger_configurations[0].trigger_events = vec!["Foo".to_string()];
        api.insert(wire);
        let cfg = config();
        let err = Reconciler::new(&api, &cfg).observe(&id()).await.unwrap_err();
        assert!(matches!(err, DgroupError::MalformedState { .. }));
        assert!(err.to_string().contains("\"Foo\""));
    }

    #[tokio::test]
    async fn write_errors_keep_provider_text() {
        let api = ScriptedApi::new();
        api.fail_next_write(ApiError::new(
            "InvalidRoleException",
            "The service role cannot be assumed by CodeDeploy.",
        ));
        let cfg = config();
        let err = Reconciler::new(&api, &cfg)
            .reconcile(&desired())
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("The service role cannot be assumed by CodeDeploy."));
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_waits_for_lingering_group() {
        let api = ScriptedApi::new();
        let cfg = config();
        let r = Reconciler::new(&api, &cfg);
        r.reconcile(&desired()).await.unwrap();

        api.set_linger(3);
        match r.destroy(&id(), None).await.unwrap() {
            DestroyOutcome::Deleted { report } => {
                assert_eq!(report.checks, 4);
                assert_eq!(report.elapsed, Duration::from_secs(15));
            }
            other => panic!("expected deleted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_missing_group_is_already_absent() {
        let api = ScriptedApi::new();
        let cfg = config();
        let outcome = Reconciler::new(&api, &cfg).destroy(&id(), None).await.unwrap();
        assert!(matches!(outcome, DestroyOutcome::AlreadyAbsent));
    }

    #[tokio::test(start_paused = true)]
    async fn destroy_reports_pending_after_budget() {
        let api = ScriptedApi::new();
        let cfg = config();
        let r = Reconciler::new(&api, &cfg);
        r.reconcile(&desired()).await.unwrap();

        api.set_linger(u32::MAX);
        let outcome = r.destroy(&id(), None).await.unwrap();
        assert!(matches!(outcome, DestroyOutcome::Pending { .. }));
    }
}
