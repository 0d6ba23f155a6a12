use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use debug_provider::cli::{Cli, Command, ResourceCommand};
use debug_provider::host::{self, Operation};
use debug_provider::output::{self, ProviderSchemas};
use debug_provider::{Context, DebugProvider, Diagnostic};

/// `TF_LOG_PROVIDER` wins over `RUST_LOG`; both fall back to `info`.
fn env_filter() -> EnvFilter {
    ["TF_LOG_PROVIDER", "RUST_LOG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

async fn read_config(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        None => return Ok(Value::Null),
        Some(p) if p == Path::new("-") => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
        Some(p) => tokio::fs::read_to_string(p).await?,
    };

    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&raw)?)
}

fn print_warnings(warnings: &[Diagnostic]) {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
}

fn print_state(state: &Value) -> Result<()> {
    if !state.is_null() {
        println!("{}", serde_json::to_string_pretty(state)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let provider = DebugProvider::new(env!("CARGO_PKG_VERSION"));
    provider.configure(&Value::Null)?;

    let (ctx, cancel) = Context::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Command::List => {
            let rows = output::catalog(&provider);
            println!("{}", output::catalog_table(&rows));
        }
        Command::Schema { name, json } => {
            let schemas = ProviderSchemas::collect(&provider, name.as_deref());
            if schemas.is_empty() {
                bail!(
                    "unknown resource or data source type: {}",
                    name.unwrap_or_default()
                );
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&schemas)?);
            } else {
                for tree in schemas.trees() {
                    println!("{}", tree);
                }
            }
        }
        Command::Data { name, config } => {
            let config = read_config(config.as_deref()).await?;
            let response = host::read_data_source(&provider, &ctx, &name, &config).await?;
            print_warnings(&response.warnings);
            print_state(&response.state)?;
        }
        Command::Resource { operation } => {
            let kind = match operation {
                ResourceCommand::Create(_) => Operation::Create,
                ResourceCommand::Read(_) => Operation::Read,
                ResourceCommand::Update(_) => Operation::Update,
                ResourceCommand::Delete(_) => Operation::Delete,
            };
            let args = operation.args();

            let config = read_config(args.config.as_deref()).await?;
            let response = host::apply_to_file(
                &provider,
                &ctx,
                &args.state,
                kind,
                &args.resource_type,
                &args.name,
                &config,
            )
            .await?;
            tracing::info!(
                resource = %args.resource_type,
                name = %args.name,
                operation = ?kind,
                "apply complete"
            );
            print_warnings(&response.warnings);
            print_state(&response.state)?;
        }
    }

    Ok(())
}
