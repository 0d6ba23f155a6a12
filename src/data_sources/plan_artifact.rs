use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::context::Context;
use crate::provider::{DataSource, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

const CHUNK_SIZE: usize = 64 * 1024;

pub struct PlanArtifactDataSource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct PlanArtifactModel {
    file_size: i64,
    file_name: String,
    id: Option<String>,
}

#[async_trait]
impl DataSource for PlanArtifactDataSource {
    fn type_name(&self) -> &'static str {
        "plan_artifact"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Artifact with configurable size generated during the plan phase. \
             Useful for testing issues during the upload plan filesystem phase of a run.",
            vec![
                Attribute::required(
                    "file_size",
                    AttributeType::Int64,
                    "Size of the artifact file in bytes.",
                ),
                Attribute::required(
                    "file_name",
                    AttributeType::String,
                    "Name of the generated file.",
                ),
                Attribute::computed("id", AttributeType::String, "Sha256 hash of the generated file."),
            ],
        )
    }

    async fn read(&self, ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let mut data: PlanArtifactModel = decode(config)?;
        let path = Path::new(&data.file_name).to_path_buf();

        match tokio::fs::metadata(&path).await {
            Ok(existing) => {
                tracing::info!(file = %path.display(), "artifact already exists, reusing it");
                data.file_size = existing.len() as i64;
                data.id = Some(hash_file(&path).await.map_err(|e| {
                    ProviderError::diagnostic(
                        "Unable to hash existing file",
                        format!("An error occurred while hashing the existing file: {}", e),
                    )
                })?);
                data.file_name = base_name(&path);
                return Response::from_model(&data);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(file = %path.display(), "artifact does not exist, creating it");
            }
            Err(e) => {
                return Err(ProviderError::diagnostic(
                    "Unable to read existing file",
                    format!("An error occurred while checking the existing file: {}", e),
                ));
            }
        }

        if data.file_size <= 0 {
            return Err(ProviderError::diagnostic(
                "Invalid File Size",
                "File size must be greater than zero.",
            ));
        }

        let written = match write_random(ctx, &path, data.file_size as u64).await {
            Ok(written) => written,
            Err(e) => {
                // A partial artifact would be reused as-is on the next read.
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    if remove_err.kind() != ErrorKind::NotFound {
                        tracing::warn!(
                            file = %path.display(),
                            error = %remove_err,
                            "failed to remove partial artifact"
                        );
                    }
                }
                return Err(e);
            }
        };
        tracing::info!(bytes = written, file = %path.display(), "wrote artifact");

        data.file_size = written as i64;
        data.id = Some(hash_file(&path).await.map_err(|e| {
            ProviderError::diagnostic(
                "Unable to hash file",
                format!("An error occurred while hashing the file: {}", e),
            )
        })?);
        data.file_name = base_name(&path);

        Response::from_model(&data)
    }
}

async fn write_random(ctx: &Context, path: &Path, size: u64) -> Result<u64, ProviderError> {
    let mut file = File::create(path).await.map_err(|e| {
        ProviderError::diagnostic(
            "Unable to create file",
            format!("An error occurred while creating the file: {}", e),
        )
    })?;

    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    while written < size {
        if ctx.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let n = (size - written).min(CHUNK_SIZE as u64) as usize;
        rand::thread_rng().fill_bytes(&mut chunk[..n]);
        file.write_all(&chunk[..n]).await.map_err(|e| {
            ProviderError::diagnostic(
                "Unable to write to file",
                format!("An error occurred while writing to the file: {}", e),
            )
        })?;
        written += n as u64;
    }

    file.flush().await.map_err(|e| {
        ProviderError::diagnostic(
            "Unable to write to file",
            format!("An error occurred while writing to the file: {}", e),
        )
    })?;

    Ok(written)
}

async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_creates_artifact_of_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.bin");

        let response = PlanArtifactDataSource
            .read(
                &Context::background(),
                json!({"file_size": 200_000, "file_name": path.to_str().unwrap(), "id": null}),
            )
            .await
            .unwrap();

        assert_eq!(response.state["file_size"], 200_000);
        assert_eq!(response.state["file_name"], "artifact.bin");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 200_000);

        let expected = hex::encode(Sha256::digest(std::fs::read(&path).unwrap()));
        assert_eq!(response.state["id"], expected);
    }

    #[tokio::test]
    async fn test_reuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing.txt");
        std::fs::write(&path, b"hello").unwrap();

        let response = PlanArtifactDataSource
            .read(
                &Context::background(),
                json!({"file_size": 1024, "file_name": path.to_str().unwrap()}),
            )
            .await
            .unwrap();

        assert_eq!(response.state["file_size"], 5);
        assert_eq!(response.state["file_name"], "existing.txt");
        assert_eq!(
            response.state["id"],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_rejects_non_positive_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");

        let err = PlanArtifactDataSource
            .read(
                &Context::background(),
                json!({"file_size": 0, "file_name": path.to_str().unwrap()}),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid File Size"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cancelled_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        let (ctx, handle) = Context::new();
        handle.cancel();

        let result = PlanArtifactDataSource
            .read(
                &ctx,
                json!({"file_size": 1_000_000, "file_name": path.to_str().unwrap()}),
            )
            .await;

        assert!(matches!(result, Err(ProviderError::Cancelled)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("artifact.bin");

        let err = PlanArtifactDataSource
            .read(
                &Context::background(),
                json!({"file_size": 10, "file_name": path.to_str().unwrap()}),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Unable to create file"));
    }
}
