use std::io::ErrorKind;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::context::Context;
use crate::provider::{DataSource, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct FileContentDataSource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct FileContentModel {
    filename: String,
    content: Option<String>,
    content_base64: Option<String>,
    content_sha256: Option<String>,
}

#[async_trait]
impl DataSource for FileContentDataSource {
    fn type_name(&self) -> &'static str {
        "file_content"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Read a file from the run environment.",
            vec![
                Attribute::required("filename", AttributeType::String, "Name of the file to read"),
                Attribute::computed("content", AttributeType::String, "Content of the file"),
                Attribute::computed(
                    "content_base64",
                    AttributeType::String,
                    "Base64 encoded content of the file",
                ),
                Attribute::computed(
                    "content_sha256",
                    AttributeType::String,
                    "SHA256 hash of the file content",
                ),
            ],
        )
    }

    async fn read(&self, _ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let mut data: FileContentModel = decode(config)?;

        let len = data.filename.chars().count();
        if !(1..=256).contains(&len) {
            return Err(ProviderError::diagnostic(
                "Invalid Attribute Value Length",
                format!(
                    "Attribute filename string length must be between 1 and 256, got: {}",
                    len
                ),
            ));
        }

        let metadata = tokio::fs::metadata(&data.filename).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ProviderError::diagnostic(
                    "File Not Found",
                    format!("The file specified does not exist: {}", data.filename),
                )
            } else {
                ProviderError::diagnostic(
                    "Error Reading File",
                    format!("An error occurred while reading the file: {}", e),
                )
            }
        })?;

        if metadata.is_dir() {
            return Err(ProviderError::diagnostic(
                "Invalid File Type",
                format!(
                    "The specified path is a directory, not a file: {}",
                    data.filename
                ),
            ));
        }

        let content = tokio::fs::read(&data.filename).await.map_err(|e| {
            ProviderError::diagnostic(
                "Error Reading File",
                format!("An error occurred while reading the file: {}", e),
            )
        })?;

        tracing::debug!(filename = %data.filename, bytes = content.len(), "read file");

        data.content_sha256 = Some(hex::encode(Sha256::digest(&content)));
        data.content_base64 = Some(STANDARD.encode(&content));
        data.content = Some(String::from_utf8_lossy(&content).into_owned());

        Response::from_model(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "hello").unwrap();

        let response = FileContentDataSource
            .read(
                &Context::background(),
                json!({"filename": path.to_str().unwrap()}),
            )
            .await
            .unwrap();

        assert_eq!(response.state["content"], "hello");
        assert_eq!(response.state["content_base64"], "aGVsbG8=");
        assert_eq!(
            response.state["content_sha256"],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_binary_content_survives_in_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0xffu8, 0x00, 0x41]).unwrap();

        let response = FileContentDataSource
            .read(
                &Context::background(),
                json!({"filename": path.to_str().unwrap()}),
            )
            .await
            .unwrap();

        assert_eq!(response.state["content_base64"], "/wBB");
        assert_eq!(response.state["content"], "\u{fffd}\u{0}A");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");

        let err = FileContentDataSource
            .read(
                &Context::background(),
                json!({"filename": path.to_str().unwrap()}),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("File Not Found"));
    }

    #[tokio::test]
    async fn test_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let err = FileContentDataSource
            .read(
                &Context::background(),
                json!({"filename": dir.path().to_str().unwrap()}),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("Invalid File Type"));
    }
}
