use super::BuildError;
use crate::store::ServiceCommit;
use serde::{Deserialize, Serialize};

/// Request to assemble a snapshot: an application name plus the pinned
/// (service, revision) pairs to include.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildRequest {
    pub app_name: String,
    pub services: Vec<ServiceCommit>,
}

impl BuildRequest {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            services: Vec::new(),
        }
    }

    pub fn with_service(mut self, service_id: impl Into<String>, git_commit_hash: impl Into<String>) -> Self {
        self.services
            .push(ServiceCommit::new(service_id, git_commit_hash));
        self
    }

    /// Precondition for assembly: a non-empty app name and at least one
    /// service, each with a non-empty id and commit hash.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.app_name.trim().is_empty() {
            return Err(BuildError::InvalidRequest("app name is required".to_string()));
        }
        if self.services.is_empty() {
            return Err(BuildError::InvalidRequest(
                "at least one service is required".to_string(),
            ));
        }
        for service in &self.services {
            if service.service_id.trim().is_empty() {
                return Err(BuildError::InvalidRequest(
                    "service id is required for every service".to_string(),
                ));
            }
            if service.git_commit_hash.trim().is_empty() {
                return Err(BuildError::InvalidRequest(format!(
                    "git commit hash is required for service {}",
                    service.service_id
                )));
            }
        }
        Ok(())
    }
}
