//! The narrow contract the core needs from a deployment-group API.
//!
//! Transport, signing and credentials live behind [`CloudApi`]; the core only
//! sees wire-shaped payloads and coded errors.

use crate::diff::UpdateRequest;
use crate::types::GroupIdentity;
use crate::wire::WireGroup;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codes the remote API uses to report that a group (or its application) is absent.
pub const NOT_FOUND_CODES: &[&str] = &[
    "DeploymentGroupDoesNotExistException",
    "ApplicationDoesNotExistException",
];

/// Codes that are expected to clear up on retry.
pub const TRANSIENT_CODES: &[&str] = &[
    "ThrottlingException",
    "RequestLimitExceeded",
    "ServiceUnavailable",
    "InternalFailure",
];

/// How a remote failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    NotFound,
    Transient,
    Fatal,
}

/// An error as reported by the remote API. The message is the provider's own
/// text and is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn group_not_found(identity: &GroupIdentity) -> Self {
        Self::new(
            "DeploymentGroupDoesNotExistException",
            format!(
                "No Deployment Group found for name: {}",
                identity.deployment_group_name
            ),
        )
    }

    pub fn classify(&self) -> ErrorClass {
        let code = self.code.as_str();
        if NOT_FOUND_CODES.contains(&code) {
            ErrorClass::NotFound
        } else if TRANSIENT_CODES.contains(&code) {
            ErrorClass::Transient
        } else {
            ErrorClass::Fatal
        }
    }
}

#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn get_group(&self, identity: &GroupIdentity) -> Result<WireGroup, ApiError>;

    async fn create_group(&self, group: &WireGroup) -> Result<(), ApiError>;

    async fn update_group(
        &self,
        identity: &GroupIdentity,
        request: &UpdateRequest,
    ) -> Result<(), ApiError>;

    async fn delete_group(&self, identity: &GroupIdentity) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_codes() {
        let id = GroupIdentity::new("app", "group");
        assert_eq!(ApiError::group_not_found(&id).classify(), ErrorClass::NotFound);
        assert_eq!(
            ApiError::new("ApplicationDoesNotExistException", "x").classify(),
            ErrorClass::NotFound
        );
        assert_eq!(
            ApiError::new("RequestLimitExceeded", "x").classify(),
            ErrorClass::Transient
        );
        assert_eq!(
            ApiError::new("InvalidRoleException", "x").classify(),
            ErrorClass::Fatal
        );
    }

    #[test]
    fn display_keeps_code_and_message() {
        let err = ApiError::new("InvalidTagException", "tag filter is invalid");
        assert_eq!(err.to_string(), "InvalidTagException: tag filter is invalid");
    }
}
