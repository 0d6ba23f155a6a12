//! Runs data source reads and resource lifecycle steps outside of Terraform.
//!
//! The host does the planning Terraform core would normally do: configs are
//! planned against the schema before they reach the provider, and resource
//! results are recorded in a [`TerraformState`] document.

use std::path::Path;

use serde_json::Value;

use crate::context::Context;
use crate::error::DebugError;
use crate::provider::{DebugProvider, Response};
use crate::terraform::TerraformState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

pub async fn read_data_source(
    provider: &DebugProvider,
    ctx: &Context,
    type_name: &str,
    config: &Value,
) -> Result<Response, DebugError> {
    let data_source = provider.data_source(type_name)?;
    let planned = data_source.schema().plan(config, None)?;

    tracing::info!(data_source = type_name, "reading data source");
    let response = data_source.read(ctx, planned).await?;
    log_warnings(&response);
    Ok(response)
}

/// Applies `operation` to the `type_name.name` instance in `state`.
///
/// `config` is only consulted for create and update.
pub async fn apply(
    provider: &DebugProvider,
    ctx: &Context,
    state: &mut TerraformState,
    operation: Operation,
    type_name: &str,
    name: &str,
    config: &Value,
) -> Result<Response, DebugError> {
    let resource = provider.resource(type_name)?;
    let schema = resource.schema();
    let address = format!("{}.{}", type_name, name);
    let prior = state.get(type_name, name).cloned();

    tracing::info!(resource = %address, ?operation, "applying");

    let response = match (operation, prior) {
        (Operation::Create, Some(_)) => {
            return Err(DebugError::State(format!("{} already exists", address)));
        }
        (Operation::Create, None) => {
            let planned = schema.plan(config, None)?;
            let response = resource.create(ctx, planned).await?;
            state.upsert(type_name, name, response.state.clone());
            response
        }
        (_, None) => {
            return Err(DebugError::State(format!("{} not found in state", address)));
        }
        (Operation::Read, Some(prior)) => {
            let response = resource.read(ctx, prior).await?;
            if response.state.is_null() {
                state.remove(type_name, name);
            } else {
                state.upsert(type_name, name, response.state.clone());
            }
            response
        }
        (Operation::Update, Some(prior)) => {
            let planned = schema.plan(config, Some(&prior))?;
            if schema.requires_replace(&prior, &planned) {
                tracing::info!(resource = %address, "replacement required, destroying first");
                let deleted = resource.delete(ctx, prior).await?;
                state.remove(type_name, name);

                let planned = schema.plan(config, None)?;
                let mut created = resource.create(ctx, planned).await?;
                state.upsert(type_name, name, created.state.clone());

                let mut warnings = deleted.warnings;
                warnings.append(&mut created.warnings);
                created.warnings = warnings;
                created
            } else {
                let response = resource.update(ctx, prior, planned).await?;
                state.upsert(type_name, name, response.state.clone());
                response
            }
        }
        (Operation::Delete, Some(prior)) => {
            let response = resource.delete(ctx, prior).await?;
            state.remove(type_name, name);
            response
        }
    };

    log_warnings(&response);
    Ok(response)
}

/// Loads the state at `path`, applies `operation`, and writes the state back
/// only if the step changed it.
///
/// The write also happens when the step fails part way, e.g. a replacement
/// whose create half fails after the old instance was destroyed.
pub async fn apply_to_file(
    provider: &DebugProvider,
    ctx: &Context,
    path: &Path,
    operation: Operation,
    type_name: &str,
    name: &str,
    config: &Value,
) -> Result<Response, DebugError> {
    let original = TerraformState::load(path).await?;
    let mut state = original.clone();

    let result = apply(provider, ctx, &mut state, operation, type_name, name, config).await;

    if state != original {
        state.save(path).await?;
    } else {
        tracing::debug!(path = %path.display(), "state unchanged, not writing");
    }

    result
}

fn log_warnings(response: &Response) {
    for warning in &response.warnings {
        tracing::warn!(summary = %warning.summary, detail = %warning.detail, "provider warning");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use serde_json::json;

    fn provider() -> DebugProvider {
        DebugProvider::new("test")
    }

    #[tokio::test]
    async fn test_read_data_source_applies_schema() {
        let err = read_data_source(
            &provider(),
            &Context::background(),
            "debug_sleep",
            &json!({"duration": "1ms", "bogus": true}),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported Argument"));
    }

    #[tokio::test]
    async fn test_read_data_source_unknown_type() {
        let err = read_data_source(&provider(), &Context::background(), "debug_nope", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DebugError::Provider(ProviderError::UnknownDataSource(_))
        ));
    }

    #[tokio::test]
    async fn test_create_then_create_again_fails() {
        let mut state = TerraformState::default();
        let config = json!({"id": "failure-0001"});
        let ctx = Context::background();

        apply(&provider(), &ctx, &mut state, Operation::Create, "debug_failure", "this", &config)
            .await
            .unwrap();
        assert_eq!(
            state.get("debug_failure", "this").unwrap()["fail_on_destroy"],
            false
        );

        let err = apply(&provider(), &ctx, &mut state, Operation::Create, "debug_failure", "this", &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_update_missing_instance() {
        let mut state = TerraformState::default();
        let err = apply(
            &provider(),
            &Context::background(),
            &mut state,
            Operation::Update,
            "debug_failure",
            "this",
            &json!({"id": "failure-0001"}),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not found in state"));
    }

    #[tokio::test]
    async fn test_failed_create_leaves_state_untouched() {
        let mut state = TerraformState::default();
        let result = apply(
            &provider(),
            &Context::background(),
            &mut state,
            Operation::Create,
            "debug_failure",
            "this",
            &json!({"id": "failure-0001", "fail_on_create": true}),
        )
        .await;
        assert!(result.is_err());
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_apply_to_file_unknown_type_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terraform.tfstate");

        let err = apply_to_file(
            &provider(),
            &Context::background(),
            &path,
            Operation::Create,
            "debug_nope",
            "this",
            &json!({}),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            DebugError::Provider(ProviderError::UnknownResource(_))
        ));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_apply_to_file_persists_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terraform.tfstate");
        let ctx = Context::background();

        apply_to_file(
            &provider(),
            &ctx,
            &path,
            Operation::Create,
            "debug_failure",
            "this",
            &json!({"id": "failure-0001"}),
        )
        .await
        .unwrap();
        let saved = TerraformState::load(&path).await.unwrap();
        assert_eq!(saved.get("debug_failure", "this").unwrap()["id"], "failure-0001");

        apply_to_file(
            &provider(),
            &ctx,
            &path,
            Operation::Delete,
            "debug_failure",
            "this",
            &Value::Null,
        )
        .await
        .unwrap();
        let saved = TerraformState::load(&path).await.unwrap();
        assert!(saved.resources.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_instance() {
        let mut state = TerraformState::default();
        state.upsert(
            "debug_failure",
            "this",
            json!({"id": "failure-0001", "fail_on_create": false, "fail_on_update": false, "fail_on_destroy": true}),
        );

        let err = apply(
            &provider(),
            &Context::background(),
            &mut state,
            Operation::Delete,
            "debug_failure",
            "this",
            &Value::Null,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("Delete Failed"));
        assert!(state.get("debug_failure", "this").is_some());
    }
}
