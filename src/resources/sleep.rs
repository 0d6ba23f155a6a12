use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::duration;
use crate::provider::{ProviderError, Resource, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct SleepResource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SleepModel {
    id: Option<String>,
    duration: String,
    update_duration: Option<String>,
    destroy_duration: Option<String>,
}

async fn sleep_for(ctx: &Context, input: &str, summary: &str) -> Result<(), ProviderError> {
    let duration = duration::parse(input, summary)?;
    tracing::info!(duration = %duration::display(duration), "sleeping for duration");
    ctx.sleep(duration).await
}

#[async_trait]
impl Resource for SleepResource {
    fn type_name(&self) -> &'static str {
        "sleep"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Pause for a specified duration during create, update, or destroy operations. \
             Useful for simulating long-running operations or for inspecting the run environment.",
            vec![
                Attribute::required(
                    "duration",
                    AttributeType::String,
                    "Duration to sleep before completing the create operation. Must be a valid duration string (e.g., '5s', '1m').",
                ),
                Attribute::optional(
                    "update_duration",
                    AttributeType::String,
                    "Duration to sleep before completing the update operation. Must be a valid duration string (e.g., '5s', '1m').",
                ),
                Attribute::optional(
                    "destroy_duration",
                    AttributeType::String,
                    "Duration to sleep before completing the destroy operation. Must be a valid duration string (e.g., '5s', '1m').",
                ),
                Attribute::computed(
                    "id",
                    AttributeType::String,
                    "The time when the resource was created, in RFC3339 format.",
                ),
            ],
        )
    }

    async fn create(&self, ctx: &Context, plan: Value) -> Result<Response, ProviderError> {
        let mut data: SleepModel = decode(plan)?;

        sleep_for(ctx, &data.duration, "Invalid Duration").await?;

        data.id = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        Response::from_model(&data)
    }

    async fn read(&self, _ctx: &Context, state: Value) -> Result<Response, ProviderError> {
        Ok(Response::new(state))
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: Value,
        plan: Value,
    ) -> Result<Response, ProviderError> {
        let mut planned: SleepModel = decode(plan)?;
        let state: SleepModel = decode(prior)?;

        // The duration configured when the resource was last applied governs the update.
        if let Some(update_duration) = state.update_duration.as_deref().filter(|d| !d.is_empty()) {
            sleep_for(ctx, update_duration, "Invalid Update Duration").await?;
        }

        if planned.id.is_none() {
            planned.id = state.id;
        }
        Response::from_model(&planned)
    }

    async fn delete(&self, ctx: &Context, state: Value) -> Result<Response, ProviderError> {
        let data: SleepModel = decode(state)?;

        match data.destroy_duration.as_deref().filter(|d| !d.is_empty()) {
            Some(destroy_duration) => {
                sleep_for(ctx, destroy_duration, "Invalid Duration").await?;
            }
            None => tracing::info!("no destroy_duration specified, skipping sleep"),
        }

        Ok(Response::removed())
    }
}
