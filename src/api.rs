use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use k8s_openapi::Resource;
use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;

const FETCH_FAILED: &str = "Failed to fetch details";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
pub enum ResourceScope {
    Cluster,
    Namespaced,
    #[serde(other)]
    Unknown,
}

/// Scope of every kind the gateway knows, keyed by lowercase kind.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
pub struct ScopeMap {
    #[serde(default)]
    scopes: BTreeMap<String, ResourceScope>,
}

impl ScopeMap {
    pub fn is_loaded(&self) -> bool {
        !self.scopes.is_empty()
    }

    pub fn scope(&self, kind: &str) -> Option<ResourceScope> {
        self.scopes.get(&kind.to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct EventSimple {
    #[serde(rename = "type")]
    pub event_type: String,
    pub reason: String,
    pub message: String,
    pub count: i64,
    pub last_seen: String,
    pub age: String,
}

impl EventSimple {
    pub fn is_warning(&self) -> bool {
        self.event_type.eq_ignore_ascii_case("warning")
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceDetails {
    pub manifest: String,
    pub events: Vec<EventSimple>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ResourceQuery {
    pub context: String,
    pub namespace: String,
    pub name: String,
    pub kind: String,
}

impl ResourceQuery {
    pub fn is_pod(&self) -> bool {
        self.kind.eq_ignore_ascii_case(Pod::KIND)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GatewayError {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DashboardApi {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl DashboardApi {
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kubeterm/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build http client")?;
        Ok(Self { client, endpoint })
    }

    pub async fn scopes(&self) -> Result<ScopeMap> {
        let url = self.endpoint.scopes_url();
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?
            .error_for_status()
            .context("failed to fetch scopes")?;
        let scopes = response
            .json::<ScopeMap>()
            .await
            .context("failed to decode scopes")?;
        debug!(kinds = scopes.len(), "scopes loaded");
        Ok(scopes)
    }

    pub async fn resource_details(&self, query: &ResourceQuery) -> Result<ResourceDetails> {
        let url = self.endpoint.resource_url(
            &query.context,
            &query.namespace,
            &query.name,
            &query.kind,
        );
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = gateway_error_message(&body);
            warn!(%status, kind = %query.kind, name = %query.name, error = %message, "details fetch failed");
            anyhow::bail!(message);
        }

        response
            .json::<ResourceDetails>()
            .await
            .context(FETCH_FAILED)
    }
}

fn gateway_error_message(body: &str) -> String {
    serde_json::from_str::<GatewayError>(body)
        .ok()
        .and_then(|payload| payload.error)
        .map(|error| error.trim().to_string())
        .filter(|error| !error.is_empty())
        .unwrap_or_else(|| FETCH_FAILED.to_string())
}

/// Details are only requested once scopes are known and the query is
/// complete for the kind's scope.
pub fn should_fetch_details(scopes: &ScopeMap, query: &ResourceQuery) -> bool {
    if !scopes.is_loaded() {
        return false;
    }
    if [&query.context, &query.name, &query.kind]
        .iter()
        .any(|value| value.trim().is_empty())
    {
        return false;
    }
    scopes.scope(&query.kind) == Some(ResourceScope::Cluster) || !query.namespace.trim().is_empty()
}

pub fn format_age(timestamp: &str, now: DateTime<Utc>) -> String {
    if timestamp.trim().is_empty() {
        return "-".to_string();
    }
    let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp.trim()) else {
        return "-".to_string();
    };

    let elapsed = now.signed_duration_since(parsed.with_timezone(&Utc));
    if elapsed.num_milliseconds() < 0 {
        return "0s".to_string();
    }

    let days = elapsed.num_days();
    let hours = elapsed.num_hours();
    let minutes = elapsed.num_minutes();
    if days > 0 {
        format!("{days}d")
    } else if hours > 0 {
        format!("{hours}h")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{}s", elapsed.num_seconds())
    }
}
