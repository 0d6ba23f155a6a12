use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::provider::{DataSource, Diagnostic, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct EnvironmentVariablesDataSource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct EnvironmentVariablesModel {
    environment_variables: Option<Vec<String>>,
    result: Option<BTreeMap<String, String>>,
}

#[async_trait]
impl DataSource for EnvironmentVariablesDataSource {
    fn type_name(&self) -> &'static str {
        "environment_variables"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Expose environment variables of the run environment.",
            vec![
                Attribute::optional(
                    "environment_variables",
                    AttributeType::ListOfString,
                    "A list of environment variable names to filter. If empty, all environment variables will be returned.",
                ),
                Attribute::computed(
                    "result",
                    AttributeType::MapOfString,
                    "A map of environment variables in the run environment.",
                ),
            ],
        )
    }

    async fn read(&self, _ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let mut data: EnvironmentVariablesModel = decode(config)?;

        let (result, warnings) = match data.environment_variables.as_deref() {
            Some(names) if !names.is_empty() => lookup(names),
            _ => snapshot(),
        };

        tracing::info!(
            count = result.len(),
            warnings = warnings.len(),
            "collected environment variables"
        );

        data.result = Some(result);
        Ok(Response::from_model(&data)?.with_warnings(warnings))
    }
}

fn lookup(names: &[String]) -> (BTreeMap<String, String>, Vec<Diagnostic>) {
    let mut vars = BTreeMap::new();
    let mut warnings = Vec::new();

    for name in names {
        match std::env::var(name) {
            Ok(value) => {
                vars.insert(name.clone(), value);
            }
            Err(std::env::VarError::NotPresent) => warnings.push(Diagnostic::warning(
                "Environment Variable Not Found",
                format!(
                    "Environment variable '{}' is not set in the current environment.",
                    name
                ),
            )),
            Err(std::env::VarError::NotUnicode(_)) => warnings.push(Diagnostic::warning(
                "Invalid Environment Variable",
                format!("Environment variable '{}' is not valid UTF-8.", name),
            )),
        }
    }

    (vars, warnings)
}

fn snapshot() -> (BTreeMap<String, String>, Vec<Diagnostic>) {
    let mut vars = BTreeMap::new();
    let mut warnings = Vec::new();

    for (key, value) in std::env::vars_os() {
        match (key.into_string(), value.into_string()) {
            (Ok(k), Ok(v)) => {
                vars.insert(k, v);
            }
            (key, _) => warnings.push(Diagnostic::warning(
                "Invalid Environment Variable",
                format!(
                    "Environment variable is not valid UTF-8: {}",
                    match key {
                        Ok(k) => k,
                        Err(raw) => raw.to_string_lossy().into_owned(),
                    }
                ),
            )),
        }
    }

    (vars, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_filters_requested_variables() {
        unsafe {
            std::env::set_var("DEBUG_PROVIDER_TEST_VAR", "hello");
        }

        let response = EnvironmentVariablesDataSource
            .read(
                &Context::background(),
                json!({"environment_variables": ["DEBUG_PROVIDER_TEST_VAR"]}),
            )
            .await
            .unwrap();

        unsafe {
            std::env::remove_var("DEBUG_PROVIDER_TEST_VAR");
        }

        assert_eq!(
            response.state["result"],
            json!({"DEBUG_PROVIDER_TEST_VAR": "hello"})
        );
        assert!(response.warnings.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_variable_is_a_warning() {
        unsafe {
            std::env::remove_var("DEBUG_PROVIDER_ABSENT_VAR");
        }

        let response = EnvironmentVariablesDataSource
            .read(
                &Context::background(),
                json!({"environment_variables": ["DEBUG_PROVIDER_ABSENT_VAR"]}),
            )
            .await
            .unwrap();

        assert_eq!(response.state["result"], json!({}));
        assert_eq!(response.warnings.len(), 1);
        assert_eq!(response.warnings[0].summary, "Environment Variable Not Found");
        assert!(response.warnings[0].detail.contains("DEBUG_PROVIDER_ABSENT_VAR"));
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_non_utf8_value_is_a_warning() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        unsafe {
            std::env::set_var("DEBUG_PROVIDER_BINARY_VAR", OsStr::from_bytes(&[0xff, 0xfe]));
        }

        let filtered = EnvironmentVariablesDataSource
            .read(
                &Context::background(),
                json!({"environment_variables": ["DEBUG_PROVIDER_BINARY_VAR"]}),
            )
            .await
            .unwrap();
        let everything = EnvironmentVariablesDataSource
            .read(&Context::background(), json!({"environment_variables": null}))
            .await
            .unwrap();

        unsafe {
            std::env::remove_var("DEBUG_PROVIDER_BINARY_VAR");
        }

        assert_eq!(filtered.state["result"], json!({}));
        assert_eq!(filtered.warnings.len(), 1);
        assert_eq!(filtered.warnings[0].summary, "Invalid Environment Variable");
        assert!(filtered.warnings[0].detail.contains("DEBUG_PROVIDER_BINARY_VAR"));

        assert!(everything.state["result"].get("DEBUG_PROVIDER_BINARY_VAR").is_none());
        assert!(everything.warnings.iter().any(|w| {
            w.summary == "Invalid Environment Variable"
                && w.detail.contains("DEBUG_PROVIDER_BINARY_VAR")
        }));
    }

    #[tokio::test]
    #[serial]
    async fn test_empty_filter_returns_everything() {
        unsafe {
            std::env::set_var("DEBUG_PROVIDER_ALL_VAR", "1");
        }

        let response = EnvironmentVariablesDataSource
            .read(&Context::background(), json!({"environment_variables": []}))
            .await
            .unwrap();

        unsafe {
            std::env::remove_var("DEBUG_PROVIDER_ALL_VAR");
        }

        assert_eq!(response.state["result"]["DEBUG_PROVIDER_ALL_VAR"], "1");
        assert_eq!(response.state["environment_variables"], json!([]));
    }
}
