use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::context::Context;
use crate::provider::{ProviderError, Resource, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

const DEFAULT_TIMEOUT_SECS: i64 = 5;

/// Errors raised while performing the GET request.
#[derive(Debug, Error)]
pub enum HttpGetError {
    #[error("invalid header {name}")]
    InvalidHeader { name: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<HttpGetError> for ProviderError {
    fn from(err: HttpGetError) -> Self {
        match err {
            HttpGetError::InvalidHeader { .. } => ProviderError::diagnostic(
                "HTTP Request Creation Failed",
                format!("An error occurred while creating the HTTP request: {}", err),
            ),
            HttpGetError::Network(_) => ProviderError::diagnostic(
                "HTTP Request Failed",
                format!(
                    "An error occurred while performing the HTTP GET request: {}",
                    err
                ),
            ),
        }
    }
}

pub struct HttpGetResource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct HttpGetModel {
    url: String,
    headers: Option<BTreeMap<String, String>>,
    #[serde(default = "default_timeout")]
    timeout: i64,
    response_body: Option<String>,
    response_status_code: Option<i64>,
    response_headers: Option<BTreeMap<String, String>>,
}

fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT_SECS
}

impl HttpGetModel {
    fn validate(&self) -> Result<(), ProviderError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ProviderError::diagnostic(
                "Invalid Attribute Value Match",
                format!(
                    "Attribute url must start with http:// or https://, got: {}",
                    self.url
                ),
            ));
        }

        for name in self.headers.iter().flat_map(|h| h.keys()) {
            let valid = (1..=256).contains(&name.len())
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(ProviderError::diagnostic(
                    "Invalid Attribute Value Match",
                    format!(
                        "Attribute headers key must be a valid HTTP header name, got: {}",
                        name
                    ),
                ));
            }
        }

        if !(1..=60).contains(&self.timeout) {
            return Err(ProviderError::diagnostic(
                "Invalid Attribute Value",
                format!(
                    "Attribute timeout value must be between 1 and 60, got: {}",
                    self.timeout
                ),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FetchedResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Option<String>,
}

async fn fetch(
    url: &str,
    headers: Option<&BTreeMap<String, String>>,
    timeout: Duration,
) -> Result<FetchedResponse, HttpGetError> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers.into_iter().flatten() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HttpGetError::InvalidHeader { name: name.clone() })?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| HttpGetError::InvalidHeader { name: name.clone() })?;
        header_map.insert(header_name, header_value);
    }

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).headers(header_map).send().await?;

    let status = response.status().as_u16();

    let mut response_headers = BTreeMap::new();
    for (name, value) in response.headers() {
        let key = canonical_header_key(name.as_str());
        if response_headers.contains_key(&key) {
            continue;
        }
        response_headers.insert(key, String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let bytes = response.bytes().await?;
    let body = if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    };

    Ok(FetchedResponse {
        status,
        headers: response_headers,
        body,
    })
}

/// `content-type` -> `Content-Type`.
fn canonical_header_key(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl Resource for HttpGetResource {
    fn type_name(&self) -> &'static str {
        "http_get"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Perform an HTTP GET request when the resource is created and record the response.",
            vec![
                Attribute::required(
                    "url",
                    AttributeType::String,
                    "The URL to perform the HTTP GET request on.",
                )
                .requires_replace(),
                Attribute::optional(
                    "headers",
                    AttributeType::MapOfString,
                    "HTTP headers to include in the request.",
                ),
                Attribute::optional(
                    "timeout",
                    AttributeType::Int64,
                    "Timeout for the HTTP request in seconds. Defaults to 5 seconds if not set.",
                )
                .with_default(json!(DEFAULT_TIMEOUT_SECS)),
                Attribute::computed(
                    "response_body",
                    AttributeType::String,
                    "The body of the HTTP response.",
                ),
                Attribute::computed(
                    "response_status_code",
                    AttributeType::Int64,
                    "The HTTP status code of the response.",
                ),
                Attribute::computed(
                    "response_headers",
                    AttributeType::MapOfString,
                    "HTTP headers returned in the response.",
                ),
            ],
        )
    }

    async fn create(&self, ctx: &Context, plan: Value) -> Result<Response, ProviderError> {
        let mut data: HttpGetModel = decode(plan)?;
        data.validate()?;

        tracing::info!(url = %data.url, timeout_secs = data.timeout, "performing HTTP GET");

        let timeout = Duration::from_secs(data.timeout as u64);
        let fetched = tokio::select! {
            result = fetch(&data.url, data.headers.as_ref(), timeout) => result?,
            _ = ctx.cancelled() => return Err(ProviderError::Cancelled),
        };

        tracing::info!(
            status = fetched.status,
            headers = fetched.headers.len(),
            "HTTP GET complete"
        );

        data.response_status_code = Some(fetched.status as i64);
        data.response_headers = Some(fetched.headers);
        data.response_body = fetched.body;
        Response::from_model(&data)
    }

    async fn read(&self, _ctx: &Context, state: Value) -> Result<Response, ProviderError> {
        let data: HttpGetModel = decode(state)?;
        Response::from_model(&data)
    }

    async fn update(
        &self,
        _ctx: &Context,
        _prior: Value,
        plan: Value,
    ) -> Result<Response, ProviderError> {
        let data: HttpGetModel = decode(plan)?;
        data.validate()?;
        Response::from_model(&data)
    }

    async fn delete(&self, _ctx: &Context, _state: Value) -> Result<Response, ProviderError> {
        Ok(Response::removed())
    }
}
