//! File-backed group store. One YAML document per group at
//! `<root>/<app_name>/<deployment_group_name>.yaml`, holding the wire shape.

use async_trait::async_trait;
use dgroup_core::client::{ApiError, CloudApi};
use dgroup_core::diff::UpdateRequest;
use dgroup_core::io::{atomic_write, remove_if_exists};
use dgroup_core::types::GroupIdentity;
use dgroup_core::validate::identity_name_problem;
use dgroup_core::wire::WireGroup;
use std::path::{Path, PathBuf};
use tracing::debug;

const STORE_ERROR: &str = "StoreFailure";
const INVALID_NAME: &str = "InvalidDeploymentGroupNameException";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of a group's document. Names that would resolve outside the
    /// store root are refused.
    fn path(&self, identity: &GroupIdentity) -> Result<PathBuf, ApiError> {
        for name in [&identity.app_name, &identity.deployment_group_name] {
            if name.is_empty() {
                return Err(ApiError::new(INVALID_NAME, "name must not be empty"));
            }
            if let Some(reason) = identity_name_problem(name) {
                return Err(ApiError::new(INVALID_NAME, format!("{name:?} {reason}")));
            }
        }
        Ok(self
            .root
            .join(&identity.app_name)
            .join(format!("{}.yaml", identity.deployment_group_name)))
    }

    fn read(&self, identity: &GroupIdentity) -> Result<Option<WireGroup>, ApiError> {
        let path = self.path(identity)?;
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error(&path, e)),
        };
        serde_yaml::from_str(&data)
            .map(Some)
            .map_err(|e| store_error(&path, e))
    }

    fn write(&self, group: &WireGroup) -> Result<(), ApiError> {
        let identity = GroupIdentity::new(&group.application_name, &group.deployment_group_name);
        let path = self.path(&identity)?;
        let data = serde_yaml::to_string(group).map_err(|e| store_error(&path, e))?;
        atomic_write(&path, data.as_bytes()).map_err(|e| store_error(&path, e))?;
        debug!(path = %path.display(), "wrote group");
        Ok(())
    }
}

fn store_error(path: &Path, err: impl std::fmt::Display) -> ApiError {
    ApiError::new(STORE_ERROR, format!("{}: {err}", path.display()))
}

#[async_trait]
impl CloudApi for FileStore {
    async fn get_group(&self, identity: &GroupIdentity) -> Result<WireGroup, ApiError> {
        self.read(identity)?
            .ok_or_else(|| ApiError::group_not_found(identity))
    }

    async fn create_group(&self, group: &WireGroup) -> Result<(), ApiError> {
        let identity = GroupIdentity::new(&group.application_name, &group.deployment_group_name);
        if self.read(&identity)?.is_some() {
            return Err(ApiError::new(
                "DeploymentGroupAlreadyExistsException",
                format!(
                    "A deployment group with the name {} already exists",
                    identity.deployment_group_name
                ),
            ));
        }
        self.write(group)
    }

    async fn update_group(
        &self,
        identity: &GroupIdentity,
        request: &UpdateRequest,
    ) -> Result<(), ApiError> {
        let mut group = self
            .read(identity)?
            .ok_or_else(|| ApiError::group_not_found(identity))?;
        group.apply(request);
        self.write(&group)
    }

    async fn delete_group(&self, identity: &GroupIdentity) -> Result<(), ApiError> {
        let path = self.path(identity)?;
        match remove_if_exists(&path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ApiError::group_not_found(identity)),
            Err(e) => Err(store_error(&path, e)),
        }
    }
}
