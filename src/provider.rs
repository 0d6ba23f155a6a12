use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::context::Context;
use crate::data_sources;
use crate::resources;
use crate::schema::Schema;

pub const PROVIDER_TYPE_NAME: &str = "debug";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown resource type: {0}")]
    UnknownResource(String),
    #[error("unknown data source: {0}")]
    UnknownDataSource(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Diagnostic(Diagnostic),
    #[error("operation cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn diagnostic(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        ProviderError::Diagnostic(Diagnostic::error(summary, detail))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.summary, self.detail)
    }
}

/// Result of a single data source or resource operation.
///
/// `state` is `Value::Null` after a delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub state: Value,
    pub warnings: Vec<Diagnostic>,
}

impl Response {
    pub fn new(state: Value) -> Self {
        Self {
            state,
            warnings: Vec::new(),
        }
    }

    pub fn from_model<T: Serialize>(model: &T) -> Result<Self, ProviderError> {
        Ok(Self::new(encode(model)?))
    }

    pub fn removed() -> Self {
        Self::new(Value::Null)
    }

    pub fn with_warnings(mut self, warnings: Vec<Diagnostic>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Suffix appended to the provider type name, e.g. `cpu_hog`.
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;
    async fn read(&self, ctx: &Context, config: Value) -> Result<Response, ProviderError>;
}

#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn schema(&self) -> Schema;
    async fn create(&self, ctx: &Context, plan: Value) -> Result<Response, ProviderError>;
    async fn read(&self, ctx: &Context, state: Value) -> Result<Response, ProviderError>;
    async fn update(
        &self,
        ctx: &Context,
        prior: Value,
        plan: Value,
    ) -> Result<Response, ProviderError>;
    async fn delete(&self, ctx: &Context, state: Value) -> Result<Response, ProviderError>;
}

pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    serde_json::from_value(value).map_err(|e| ProviderError::InvalidConfig(e.to_string()))
}

pub fn encode<T: Serialize>(model: &T) -> Result<Value, ProviderError> {
    serde_json::to_value(model).map_err(|e| ProviderError::InvalidConfig(e.to_string()))
}

pub fn full_type_name(suffix: &str) -> String {
    format!("{}_{}", PROVIDER_TYPE_NAME, suffix)
}

#[derive(Debug, Clone)]
pub struct DebugProvider {
    version: String,
}

impl DebugProvider {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The provider block takes no attributes.
    pub fn configure(&self, config: &Value) -> Result<(), ProviderError> {
        match config {
            Value::Null => Ok(()),
            Value::Object(map) => match map.keys().next() {
                None => Ok(()),
                Some(key) => Err(ProviderError::diagnostic(
                    "Unsupported Argument",
                    format!("An argument named \"{}\" is not expected here.", key),
                )),
            },
            other => Err(ProviderError::InvalidConfig(format!(
                "provider configuration must be an object, got {}",
                other
            ))),
        }
    }

    pub fn data_sources(&self) -> Vec<Box<dyn DataSource>> {
        data_sources::all()
    }

    pub fn resources(&self) -> Vec<Box<dyn Resource>> {
        resources::all()
    }

    pub fn data_source(&self, name: &str) -> Result<Box<dyn DataSource>, ProviderError> {
        self.data_sources()
            .into_iter()
            .find(|ds| full_type_name(ds.type_name()) == name)
            .ok_or_else(|| ProviderError::UnknownDataSource(name.to_string()))
    }

    pub fn resource(&self, name: &str) -> Result<Box<dyn Resource>, ProviderError> {
        self.resources()
            .into_iter()
            .find(|r| full_type_name(r.type_name()) == name)
            .ok_or_else(|| ProviderError::UnknownResource(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_lookup() {
        let provider = DebugProvider::new("test");
        let resource = provider.resource("debug_sleep").unwrap();
        assert_eq!(resource.type_name(), "sleep");
    }

    #[test]
    fn test_unknown_resource() {
        let provider = DebugProvider::new("test");
        match provider.resource("debug_unknown") {
            Err(ProviderError::UnknownResource(name)) => assert_eq!(name, "debug_unknown"),
            _ => panic!("expected UnknownResource error"),
        }
    }

    #[test]
    fn test_lookup_requires_full_type_name() {
        let provider = DebugProvider::new("test");
        assert!(provider.data_source("cpu_hog").is_err());
        assert!(provider.data_source("debug_cpu_hog").is_ok());
    }

    #[test]
    fn test_registered_types() {
        let provider = DebugProvider::new("test");
        let resources: Vec<&str> = provider
            .resources()
            .iter()
            .map(|r| r.type_name())
            .collect();
        assert_eq!(resources, vec!["failure", "sleep", "command", "http_get"]);

        let data_sources: Vec<&str> = provider
            .data_sources()
            .iter()
            .map(|d| d.type_name())
            .collect();
        assert!(data_sources.contains(&"plan_artifact"));
        assert!(data_sources.contains(&"oom_kill"));
        assert!(data_sources.contains(&"cpu_hog"));
        assert!(data_sources.contains(&"environment_variables"));
        assert!(data_sources.contains(&"dns_lookup"));
        assert!(data_sources.contains(&"tcp_probe"));
        assert!(data_sources.contains(&"file_content"));
        assert!(data_sources.contains(&"failure"));
        assert!(data_sources.contains(&"system_info"));
        assert!(data_sources.contains(&"sleep"));
    }

    #[test]
    fn test_configure_accepts_empty() {
        let provider = DebugProvider::new("dev");
        assert!(provider.configure(&Value::Null).is_ok());
        assert!(provider.configure(&serde_json::json!({})).is_ok());
    }

    #[test]
    fn test_configure_rejects_attributes() {
        let provider = DebugProvider::new("dev");
        let err = provider
            .configure(&serde_json::json!({"region": "us-east-1"}))
            .unwrap_err();
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_diagnostic_error_display() {
        let err = ProviderError::diagnostic("Create Failed", "boom");
        assert_eq!(err.to_string(), "Create Failed: boom");
    }

    #[test]
    fn test_decode_reports_invalid_config() {
        #[derive(Debug, Deserialize)]
        struct Model {
            #[allow(dead_code)]
            port: i32,
        }
        let result: Result<Model, _> = decode(serde_json::json!({"port": "eighty"}));
        assert!(matches!(result, Err(ProviderError::InvalidConfig(_))));
    }
}
