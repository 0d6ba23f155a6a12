use async_trait::async_trait;
use serde_json::Value;

use crate::context::Context;
use crate::provider::{DataSource, ProviderError, Response};
use crate::schema::Schema;

pub struct FailureDataSource;

#[async_trait]
impl DataSource for FailureDataSource {
    fn type_name(&self) -> &'static str {
        "failure"
    }

    fn schema(&self) -> Schema {
        Schema::new("Data source whose read always fails.", Vec::new())
    }

    async fn read(&self, _ctx: &Context, _config: Value) -> Result<Response, ProviderError> {
        Err(ProviderError::diagnostic(
            "Failure Data Source Error",
            "An error occurred while reading the failure data source.",
        ))
    }
}
