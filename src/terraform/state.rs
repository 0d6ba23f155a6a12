//! Local state document in the Terraform `tfstate` v4 layout.
//!
//! Only managed resources are stored. Data sources are re-read every time
//! and never land in state.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DebugError;
use crate::provider::PROVIDER_TYPE_NAME;

pub const STATE_VERSION: u32 = 4;

const MANAGED_MODE: &str = "managed";

pub fn provider_address() -> String {
    format!(
        "provider[\"registry.terraform.io/local/{}\"]",
        PROVIDER_TYPE_NAME
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerraformState {
    pub version: u32,
    #[serde(default)]
    pub resources: Vec<StateResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResource {
    pub mode: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub instances: Vec<StateInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateInstance {
    #[serde(default)]
    pub schema_version: u32,
    pub attributes: Value,
}

impl Default for TerraformState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: Vec::new(),
        }
    }
}

impl TerraformState {
    /// Loads the document at `path`; a missing file is an empty state.
    pub async fn load(path: &Path) -> Result<Self, DebugError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "state file not found, starting empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let state: Self = serde_json::from_slice(&raw)?;
        if state.version != STATE_VERSION {
            return Err(DebugError::State(format!(
                "unsupported state version {} in {}",
                state.version,
                path.display()
            )));
        }

        tracing::debug!(
            path = %path.display(),
            resources = state.resources.len(),
            "loaded state"
        );
        Ok(state)
    }

    /// Writes to a sibling temp file, then renames it over `path`.
    pub async fn save(&self, path: &Path) -> Result<(), DebugError> {
        let body = serde_json::to_vec_pretty(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!(
            path = %path.display(),
            resources = self.resources.len(),
            "saved state"
        );
        Ok(())
    }

    pub fn get(&self, resource_type: &str, name: &str) -> Option<&Value> {
        self.resources
            .iter()
            .find(|r| r.mode == MANAGED_MODE && r.resource_type == resource_type && r.name == name)
            .and_then(|r| r.instances.first())
            .map(|i| &i.attributes)
    }

    pub fn upsert(&mut self, resource_type: &str, name: &str, attributes: Value) {
        let instance = StateInstance {
            schema_version: 0,
            attributes,
        };

        match self
            .resources
            .iter_mut()
            .find(|r| r.mode == MANAGED_MODE && r.resource_type == resource_type && r.name == name)
        {
            Some(existing) => existing.instances = vec![instance],
            None => self.resources.push(StateResource {
                mode: MANAGED_MODE.to_string(),
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                provider: provider_address(),
                instances: vec![instance],
            }),
        }
    }

    /// Returns the removed attributes, if the instance existed.
    pub fn remove(&mut self, resource_type: &str, name: &str) -> Option<Value> {
        let index = self.resources.iter().position(|r| {
            r.mode == MANAGED_MODE && r.resource_type == resource_type && r.name == name
        })?;
        let removed = self.resources.remove(index);
        removed.instances.into_iter().next().map(|i| i.attributes)
    }
}
