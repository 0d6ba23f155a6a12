use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::duration;
use crate::provider::{DataSource, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

const DEFAULT_DURATION: &str = "30s";

pub struct CpuHogDataSource;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct CpuHogModel {
    num_cores: Option<i32>,
    duration: Option<String>,
}

#[async_trait]
impl DataSource for CpuHogDataSource {
    fn type_name(&self) -> &'static str {
        "cpu_hog"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Keep a number of CPU cores fully busy for a while during the plan phase.",
            vec![
                Attribute::optional(
                    "num_cores",
                    AttributeType::Int32,
                    "The number of CPU cores to hog. Leave blank to use all available cores.",
                ),
                Attribute::optional(
                    "duration",
                    AttributeType::String,
                    "The duration for which to hog the CPU. Defaults to 30 seconds.",
                ),
            ],
        )
    }

    async fn read(&self, ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let mut data: CpuHogModel = decode(config)?;

        let available = available_cores();
        let num_cores = resolve_cores(data.num_cores, available)?;

        let duration_str = data
            .duration
            .clone()
            .unwrap_or_else(|| DEFAULT_DURATION.to_string());
        let duration = duration::parse(&duration_str, "Invalid Duration")?;

        tracing::info!(
            num_cores,
            available,
            duration = %duration::display(duration),
            "hogging CPU cores"
        );

        hog(ctx, num_cores, duration).await?;

        data.num_cores = Some(num_cores as i32);
        data.duration = Some(duration_str);
        Response::from_model(&data)
    }
}

fn available_cores() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn resolve_cores(requested: Option<i32>, available: usize) -> Result<usize, ProviderError> {
    match requested {
        Some(n) if n < 0 => Err(ProviderError::diagnostic(
            "Invalid Number of Cores",
            format!("The number of cores must be greater than zero, got {}", n),
        )),
        None | Some(0) => Ok(available),
        Some(n) if n as usize > available => Err(ProviderError::diagnostic(
            "Invalid Number of Cores",
            format!(
                "The number of cores {} exceeds the available CPU cores {}",
                n, available
            ),
        )),
        Some(n) => Ok(n as usize),
    }
}

/// Spins `num_cores` threads until `duration` elapses or `ctx` is cancelled.
async fn hog(ctx: &Context, num_cores: usize, duration: Duration) -> Result<(), ProviderError> {
    let stop = Arc::new(AtomicBool::new(false));

    let mut workers = Vec::with_capacity(num_cores);
    for core in 0..num_cores {
        let worker_stop = Arc::clone(&stop);
        let spawned = thread::Builder::new()
            .name(format!("cpu-hog-{}", core))
            .spawn(move || {
                tracing::debug!(core, "hogging CPU core");
                spin(&worker_stop);
            });

        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => {
                stop.store(true, Ordering::Relaxed);
                join_all(workers).await?;
                return Err(ProviderError::diagnostic(
                    "CPU Hog Failed",
                    format!("Unable to start a thread for core {}: {}", core, e),
                ));
            }
        }
    }

    let outcome = tokio::select! {
        _ = tokio::time::sleep(duration) => {
            tracing::info!("CPU hogging duration completed");
            Ok(())
        }
        _ = ctx.cancelled() => {
            tracing::info!("context cancelled, stopping CPU hogging");
            Err(ProviderError::Cancelled)
        }
    };

    stop.store(true, Ordering::Relaxed);
    join_all(workers).await?;

    outcome
}

async fn join_all(workers: Vec<thread::JoinHandle<()>>) -> Result<(), ProviderError> {
    tokio::task::spawn_blocking(move || {
        for worker in workers {
            let _ = worker.join();
        }
    })
    .await
    .map_err(|e| ProviderError::diagnostic("CPU Hog Failed", e.to_string()))
}

fn spin(stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_cores_defaults_to_all() {
        assert_eq!(resolve_cores(None, 8).unwrap(), 8);
        assert_eq!(resolve_cores(Some(0), 8).unwrap(), 8);
    }

    #[test]
    fn test_resolve_cores_negative() {
        let err = resolve_cores(Some(-1), 8).unwrap_err();
        assert!(err.to_string().contains("Invalid Number of Cores"));
        assert!(err.to_string().contains("got -1"));
    }

    #[test]
    fn test_resolve_cores_exceeds_available() {
        let err = resolve_cores(Some(16), 8).unwrap_err();
        assert!(err.to_string().contains("exceeds the available CPU cores 8"));
    }

    #[test]
    fn test_resolve_cores_explicit() {
        assert_eq!(resolve_cores(Some(2), 8).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_read_short_hog() {
        let ctx = Context::background();
        let response = CpuHogDataSource
            .read(&ctx, json!({"num_cores": 1, "duration": "50ms"}))
            .await
            .unwrap();
        assert_eq!(response.state["num_cores"], 1);
        assert_eq!(response.state["duration"], "50ms");
    }

    #[tokio::test]
    async fn test_read_invalid_duration() {
        let ctx = Context::background();
        let err = CpuHogDataSource
            .read(&ctx, json!({"num_cores": 1, "duration": "forever"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid Duration"));
    }

    #[tokio::test]
    async fn test_join_all_waits_for_stopped_workers() {
        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let worker_stop = Arc::clone(&stop);
        let worker_finished = Arc::clone(&finished);
        let worker = thread::Builder::new()
            .spawn(move || {
                spin(&worker_stop);
                worker_finished.store(true, Ordering::SeqCst);
            })
            .unwrap();

        stop.store(true, Ordering::Relaxed);
        join_all(vec![worker]).await.unwrap();
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_stops_workers() {
        let (ctx, handle) = Context::new();
        handle.cancel();
        let result = CpuHogDataSource
            .read(&ctx, json!({"num_cores": 1, "duration": "1h"}))
            .await;
        assert!(matches!(result, Err(ProviderError::Cancelled)));
    }
}
