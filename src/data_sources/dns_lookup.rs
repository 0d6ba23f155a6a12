use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::provider::{DataSource, ProviderError, Response, decode};
use crate::schema::{Attribute, AttributeType, Schema};

pub struct DnsLookupDataSource;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct DnsLookupModel {
    hostname: String,
    result: Option<Vec<String>>,
}

#[async_trait]
impl DataSource for DnsLookupDataSource {
    fn type_name(&self) -> &'static str {
        "dns_lookup"
    }

    fn schema(&self) -> Schema {
        Schema::new(
            "Resolve a hostname with the system resolver.",
            vec![
                Attribute::required("hostname", AttributeType::String, "Hostname to look up."),
                Attribute::computed(
                    "result",
                    AttributeType::ListOfString,
                    "Result of the DNS lookup.",
                ),
            ],
        )
    }

    async fn read(&self, ctx: &Context, config: Value) -> Result<Response, ProviderError> {
        let mut data: DnsLookupModel = decode(config)?;

        let len = data.hostname.chars().count();
        if !(1..=255).contains(&len) {
            return Err(ProviderError::diagnostic(
                "Invalid Attribute Value Length",
                format!(
                    "Attribute hostname string length must be between 1 and 255, got: {}",
                    len
                ),
            ));
        }

        let lookup = tokio::select! {
            ips = lookup_ip(&data.hostname) => ips,
            _ = ctx.cancelled() => return Err(ProviderError::Cancelled),
        };
        let ips = lookup.map_err(|e| {
            ProviderError::diagnostic(
                "Failed to look up IP addresses",
                format!(
                    "Could not look up IP addresses for hostname \"{}\": {}",
                    data.hostname, e
                ),
            )
        })?;

        tracing::info!(hostname = %data.hostname, count = ips.len(), "resolved hostname");

        data.result = Some(ips.iter().map(IpAddr::to_string).collect());
        Response::from_model(&data)
    }
}

/// Resolves `host` to its unique addresses in resolver order.
pub(crate) async fn lookup_ip(host: &str) -> std::io::Result<Vec<IpAddr>> {
    let ips = unique_ips(tokio::net::lookup_host((host, 0)).await?);

    if ips.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such host: {}", host),
        ));
    }

    Ok(ips)
}

fn unique_ips(addrs: impl IntoIterator<Item = SocketAddr>) -> Vec<IpAddr> {
    let mut ips: Vec<IpAddr> = Vec::new();
    for addr in addrs {
        if !ips.contains(&addr.ip()) {
            ips.push(addr.ip());
        }
    }
    ips
}
