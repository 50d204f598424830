//! In-memory `CloudApi` for unit tests. Holds groups in a map and lets a test
//! script `get_group` responses ahead of the map.

use crate::client::{ApiError, CloudApi};
use crate::diff::UpdateRequest;
use crate::types::GroupIdentity;
use crate::wire::WireGroup;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

pub(crate) fn wire_group(identity: &GroupIdentity) -> WireGroup {
    WireGroup {
        application_name: identity.app_name.clone(),
        deployment_group_name: identity.deployment_group_name.clone(),
        service_role_arn: "arn:aws:iam::123456789012:role/foo-role".to_string(),
        deployment_config_name: Some(crate::types::DEFAULT_DEPLOYMENT_CONFIG.to_string()),
        ..Default::default()
    }
}

#[derive(Default)]
struct State {
    groups: BTreeMap<GroupIdentity, WireGroup>,
    get_script: VecDeque<Result<WireGroup, ApiError>>,
    get_fallback: Option<Result<WireGroup, ApiError>>,
    /// Number of reads that still see a group after its delete call.
    linger: u32,
    lingering: BTreeMap<GroupIdentity, (WireGroup, u32)>,
    fail_next_write: Option<ApiError>,
    calls: Vec<String>,
}

#[derive(Default)]
pub(crate) struct ScriptedApi {
    state: Mutex<State>,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub(crate) fn insert(&self, group: WireGroup) {
        let id = GroupIdentity::new(&group.application_name, &group.deployment_group_name);
        self.state().groups.insert(id, group);
    }

    /// Drop a group out-of-band, as if someone deleted it remotely.
    pub(crate) fn vanish(&self, identity: &GroupIdentity) {
        self.state().groups.remove(identity);
    }

    pub(crate) fn stored(&self, identity: &GroupIdentity) -> Option<WireGroup> {
        self.state().groups.get(identity).cloned()
    }

    pub(crate) fn push_get(&self, response: Result<WireGroup, ApiError>) {
        self.state().get_script.push_back(response);
    }

    pub(crate) fn set_get_fallback(&self, response: Result<WireGroup, ApiError>) {
        self.state().get_fallback = Some(response);
    }

    pub(crate) fn set_linger(&self, reads: u32) {
        self.state().linger = reads;
    }

    pub(crate) fn fail_next_write(&self, error: ApiError) {
        self.state().fail_next_write = Some(error);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.state().calls.iter().filter(|c| c.starts_with("get ")).count()
    }
}

#[async_trait]
impl CloudApi for ScriptedApi {
    async fn get_group(&self, identity: &GroupIdentity) -> Result<WireGroup, ApiError> {
        let mut s = self.state();
        s.calls.push(format!("get {identity}"));
        if let Some(response) = s.get_script.pop_front() {
            return response;
        }
        if let Some(response) = &s.get_fallback {
            return response.clone();
        }
        if let Some((group, remaining)) = s.lingering.get_mut(identity) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(group.clone());
            }
        }
        s.groups
            .get(identity)
            .cloned()
            .ok_or_else(|| ApiError::group_not_found(identity))
    }

    async fn create_group(&self, group: &WireGroup) -> Result<(), ApiError> {
        let mut s = self.state();
        let id = GroupIdentity::new(&group.application_name, &group.deployment_group_name);
        s.calls.push(format!("create {id}"));
        if let Some(err) = s.fail_next_write.take() {
            return Err(err);
        }
        if s.groups.contains_key(&id) {
            return Err(ApiError::new(
                "DeploymentGroupAlreadyExistsException",
                format!("Deployment group already exists: {}", id.deployment_group_name),
            ));
        }
        s.lingering.remove(&id);
        s.groups.insert(id, group.clone());
        Ok(())
    }

    async fn update_group(
        &self,
        identity: &GroupIdentity,
        request: &UpdateRequest,
    ) -> Result<(), ApiError> {
        let mut s = self.state();
        s.calls.push(format!("update {identity}"));
        if let Some(err) = s.fail_next_write.take() {
            return Err(err);
        }
        match s.groups.get_mut(identity) {
            Some(group) => {
                group.apply(request);
                Ok(())
            }
            None => Err(ApiError::group_not_found(identity)),
        }
    }

    async fn delete_group(&self, identity: &GroupIdentity) -> Result<(), ApiError> {
        let mut s = self.state();
        s.calls.push(format!("delete {identity}"));
        if let Some(err) = s.fail_next_write.take() {
            return Err(err);
        }
        match s.groups.remove(identity) {
            Some(group) => {
                let linger = s.linger;
                if linger > 0 {
                    s.lingering.insert(identity.clone(), (group, linger));
                }
                Ok(())
            }
            None => Err(ApiError::group_not_found(identity)),
        }
    }
}
