use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::context::Context;
use crate::provider::{ProviderError, Resource, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct FailureResource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct FailureModel {
    id: String,
    #[serde(default)]
    fail_on_create: bool,
    #[serde(default)]
    fail_on_update: bool,
    #[serde(default)]
    fail_on_destroy: bool,
}

impl FailureModel {
    fn parse(value: Value) -> Result<Self, ProviderError> {
        let model: Self = decode(value)?;
        let len = model.id.chars().count();
        if !(10..=256).contains(&len) {
            return Err(ProviderError::diagnostic(
                "Invalid Attribute Value Length",
                format!(
                    "Attribute id string length must be between 10 and 256, got: {}",
                    len
                ),
            ));
        }
        Ok(model)
    }
}

#[async_trait]
impl Resource for FailureResource {
    fn type_name(&self) -> &'static str {
        "failure"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Resource that fails on demand during create, update or destroy.",
            vec![
                Attribute::required(
                    "id",
                    AttributeType::String,
                    "The ID of the resource. Can be modified to trigger an update. Must be between 10 and 256 characters.",
                ),
                Attribute::optional("fail_on_create", AttributeType::Bool, "Fail on create")
                    .with_default(json!(false)),
                Attribute::optional("fail_on_update", AttributeType::Bool, "Fail on update")
                    .with_default(json!(false)),
                Attribute::optional("fail_on_destroy", AttributeType::Bool, "Fail on destroy")
                    .with_default(json!(false)),
            ],
        )
    }

    async fn create(&self, _ctx: &Context, plan: Value) -> Result<Response, ProviderError> {
        let data = FailureModel::parse(plan)?;
        if data.fail_on_create {
            return Err(ProviderError::diagnostic(
                "Create Failed",
                "An error occurred while creating the resource.",
            ));
        }
        Response::from_model(&data)
    }

    async fn read(&self, _ctx: &Context, state: Value) -> Result<Response, ProviderError> {
        let data: FailureModel = decode(state)?;
        Response::from_model(&data)
    }

    async fn update(
        &self,
        _ctx: &Context,
        _prior: Value,
        plan: Value,
    ) -> Result<Response, ProviderError> {
        let data = FailureModel::parse(plan)?;
        if data.fail_on_update {
            return Err(ProviderError::diagnostic(
                "Update Failed",
                "An error occurred while updating the resource.",
            ));
        }
        Response::from_model(&data)
    }

    async fn delete(&self, _ctx: &Context, state: Value) -> Result<Response, ProviderError> {
        let data: FailureModel = decode(state)?;
        if data.fail_on_destroy {
            return Err(ProviderError::diagnostic(
                "Delete Failed",
                "An error occurred while deleting the resource.",
            ));
        }
        Ok(Response::removed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::background()
    }

    #[tokio::test]
    async fn test_create_succeeds_by_default() {
        let response = FailureResource
            .create(&ctx(), json!({"id": "failure-0001"}))
            .await
            .unwrap();
        assert_eq!(response.state["fail_on_create"], false);
        assert_eq!(response.state["id"], "failure-0001");
    }

    #[tokio::test]
    async fn test_create_fails_when_requested() {
        let err = FailureResource
            .create(&ctx(), json!({"id": "failure-0001", "fail_on_create": true}))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Create Failed: An error occurred while creating the resource."
        );
    }

    #[tokio::test]
    async fn test_update_uses_plan_flag() {
        let prior = json!({"id": "failure-0001", "fail_on_update": false});
        let plan = json!({"id": "failure-0002", "fail_on_update": true});
        let err = FailureResource
            .update(&ctx(), prior, plan)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Update Failed"));
    }

    #[tokio::test]
    async fn test_delete_uses_state_flag() {
        let err = FailureResource
            .delete(&ctx(), json!({"id": "failure-0001", "fail_on_destroy": true}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Delete Failed"));

        let ok = FailureResource
            .delete(&ctx(), json!({"id": "failure-0001"}))
            .await
            .unwrap();
        assert_eq!(ok.state, Value::Null);
    }

    #[tokio::test]
    async fn test_id_length_is_validated() {
        let err = FailureResource
            .create(&ctx(), json!({"id": "short"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between 10 and 256"));
    }
}
