use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;

use super::dns_lookup::lookup_ip;
use crate::context::Context;
use crate::provider::{DataSource, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

const DEFAULT_TIMEOUT_SECS: i32 = 5;

pub struct TcpProbeDataSource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct TcpProbeModel {
    host: String,
    port: i32,
    timeout: Option<i32>,
    use_ipv4: Option<bool>,
    use_ipv6: Option<bool>,
    reachable: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Any,
    V4,
    V6,
}

impl Family {
    fn accepts(self, ip: &IpAddr) -> bool {
        match self {
            Family::Any => true,
            Family::V4 => ip.is_ipv4(),
            Family::V6 => ip.is_ipv6(),
        }
    }
}

impl TcpProbeModel {
    fn validate(&self) -> Result<Family, ProviderError> {
        let host_ok = !self.host.is_empty()
            && self
                .host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        if !host_ok {
            return Err(ProviderError::diagnostic(
                "Invalid Attribute Value Match",
                format!(
                    "Attribute host must be a valid hostname or IP address, got: {}",
                    self.host
                ),
            ));
        }

        if !(1..=65535).contains(&self.port) {
            return Err(ProviderError::diagnostic(
                "Invalid Attribute Value",
                format!("Attribute port value must be between 1 and 65535, got: {}", self.port),
            ));
        }

        if let Some(timeout) = self.timeout {
            if !(1..=60).contains(&timeout) {
                return Err(ProviderError::diagnostic(
                    "Invalid Attribute Value",
                    format!("Attribute timeout value must be between 1 and 60, got: {}", timeout),
                ));
            }
        }

        // Setting both flags conflicts, whatever their values.
        match (self.use_ipv4, self.use_ipv6) {
            (Some(_), Some(_)) => Err(ProviderError::diagnostic(
                "Invalid Attribute Combination",
                "Attribute \"use_ipv4\" cannot be specified when \"use_ipv6\" is specified",
            )),
            (Some(true), None) => Ok(Family::V4),
            (None, Some(true)) => Ok(Family::V6),
            _ => Ok(Family::Any),
        }
    }
}

#[async_trait]
impl DataSource for TcpProbeDataSource {
    fn type_name(&self) -> &'static str {
        "tcp_probe"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Check whether a TCP connection can be established to a host and port.",
            vec![
                Attribute::required(
                    "host",
                    AttributeType::String,
                    "Hostname or IP address to probe.",
                ),
                Attribute::required(
                    "port",
                    AttributeType::Int32,
                    "Port number to probe. Must be between 1 and 65535.",
                ),
                Attribute::optional(
                    "timeout",
                    AttributeType::Int32,
                    "Timeout for the probe in seconds. Must be between 1 and 60. Defaults to 5 seconds if not set.",
                ),
                Attribute::optional("use_ipv4", AttributeType::Bool, "Use IPv4 for the probe."),
                Attribute::optional("use_ipv6", AttributeType::Bool, "Use IPv6 for the probe."),
                Attribute::computed(
                    "reachable",
                    AttributeType::Bool,
                    "Indicates if the target is reachable",
                ),
            ],
        )
    }

    async fn read(&self, ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let mut data: TcpProbeModel = decode(config)?;
        let family = data.validate()?;

        let timeout = Duration::from_secs(data.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS) as u64);

        tracing::info!(
            host = %data.host,
            port = data.port,
            ?family,
            timeout_secs = timeout.as_secs(),
            "probing TCP connection"
        );

        let probe = tokio::select! {
            result = tokio::time::timeout(timeout, connect(&data.host, data.port as u16, family)) => {
                result.unwrap_or_else(|_| {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("dial tcp {}:{}: i/o timeout", data.host, data.port),
                    ))
                })
            }
            _ = ctx.cancelled() => return Err(ProviderError::Cancelled),
        };

        if let Err(e) = probe {
            return Err(ProviderError::diagnostic(
                "TCP Probe Failed",
                format!("Failed to connect to {}:{} - {}", data.host, data.port, e),
            ));
        }

        data.reachable = Some(true);
        Response::from_model(&data)
    }
}

/// Resolves `host` and tries each address of `family` in turn. The caller
/// bounds the whole attempt, lookup included, with one timeout.
async fn connect(host: &str, port: u16, family: Family) -> std::io::Result<SocketAddr> {
    let candidates: Vec<SocketAddr> = lookup_ip(host)
        .await?
        .into_iter()
        .filter(|ip| family.accepts(ip))
        .map(|ip| SocketAddr::new(ip, port))
        .collect();

    let mut last_error = std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        format!("no suitable address found for {:?} family", family),
    );

    for addr in candidates {
        match TcpStream::connect(addr).await {
            Ok(_stream) => return Ok(addr),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}
