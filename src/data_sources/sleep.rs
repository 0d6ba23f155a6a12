use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::duration;
use crate::provider::{DataSource, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct SleepDataSource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SleepModel {
    duration: String,
}

#[async_trait]
impl DataSource for SleepDataSource {
    fn type_name(&self) -> &'static str {
        "sleep"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Pause for a specified duration while reading. Useful for simulating \
             long-running operations or for inspecting the run environment during a plan.",
            vec![Attribute::required(
                "duration",
                AttributeType::String,
                "Duration to sleep, e.g. '30s' for 30 seconds.",
            )],
        )
    }

    async fn read(&self, ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let data: SleepModel = decode(config)?;
        let duration = duration::parse(&data.duration, "Invalid Duration")?;

        tracing::info!(duration = %duration::display(duration), "sleeping for duration");
        ctx.sleep(duration).await?;

        Response::from_model(&data)
    }
}
