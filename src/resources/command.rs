use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::process::Command;

use crate::context::Context;
use crate::provider::{ProviderError, Resource, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct CommandResource;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct CommandModel {
    id: Option<String>,
    create_command: Option<Vec<String>>,
    stderr: Option<String>,
    stdout: Option<String>,
    exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandOutput {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

fn command_id(args: &[String]) -> String {
    hex::encode(Sha256::digest(args.join("\0").as_bytes()))
}

async fn run(ctx: &Context, args: &[String]) -> Result<CommandOutput, ProviderError> {
    let (program, rest) = args.split_first().ok_or_else(|| {
        ProviderError::diagnostic(
            "Invalid Attribute Value",
            "Attribute create_command list must contain at least 1 elements, got: 0",
        )
    })?;

    tracing::info!(program = %program, args = rest.len(), "running create command");

    let child = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            ProviderError::diagnostic(
                "Create Command Failed",
                format!("An error occurred while executing the create command: {}", e),
            )
        })?;

    let waited = tokio::select! {
        output = child.wait_with_output() => output,
        _ = ctx.cancelled() => return Err(ProviderError::Cancelled),
    };
    let output = waited.map_err(|e| {
        ProviderError::diagnostic(
            "Create Command Failed",
            format!("An error occurred while executing the create command: {}", e),
        )
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(ProviderError::diagnostic(
            "Create Command Failed",
            format!(
                "An error occurred while executing the create command: {}: {}",
                output.status,
                stderr.trim_end()
            ),
        ));
    }

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr,
        exit_code: output.status.code().unwrap_or(-1),
    })
}

#[async_trait]
impl Resource for CommandResource {
    fn type_name(&self) -> &'static str {
        "command"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Command resource that executes a command and captures its output.",
            vec![
                Attribute::computed("id", AttributeType::String, "ID of the resource, used to track state."),
                Attribute::optional(
                    "create_command",
                    AttributeType::ListOfString,
                    "Command to be run during the Create operation. Must be a valid command with arguments.",
                )
                .requires_replace(),
                Attribute::computed(
                    "stderr",
                    AttributeType::String,
                    "Standard error output from the command.",
                ),
                Attribute::computed(
                    "stdout",
                    AttributeType::String,
                    "Standard output from the command.",
                ),
                Attribute::computed("exit_code", AttributeType::Int32, "Exit code from the command."),
            ],
        )
    }

    async fn create(&self, ctx: &Context, plan: Value) -> Result<Response, ProviderError> {
        let mut data: CommandModel = decode(plan)?;

        let Some(args) = data.create_command.clone() else {
            data.id = Some(command_id(&[]));
            return Response::from_model(&data);
        };

        data.id = Some(command_id(&args));
        let output = run(ctx, &args).await?;

        tracing::info!(exit_code = output.exit_code, "create command finished");

        data.stdout = Some(output.stdout);
        data.stderr = Some(output.stderr);
        data.exit_code = Some(output.exit_code);
        Response::from_model(&data)
    }

    async fn read(&self, _ctx: &Context, state: Value) -> Result<Response, ProviderError> {
        Ok(Response::new(state))
    }

    async fn update(
        &self,
        _ctx: &Context,
        prior: Value,
        _plan: Value,
    ) -> Result<Response, ProviderError> {
        Ok(Response::new(prior))
    }

    async fn delete(&self, _ctx: &Context, _state: Value) -> Result<Response, ProviderError> {
        Ok(Response::removed())
    }
}
