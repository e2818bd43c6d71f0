use anyhow::{Context, Result};
use url::Url;

use crate::model::{SessionKind, SessionTarget};

const EXEC_PATH: &str = "/api/v1/kube/exec";
const LOGS_PATH: &str = "/api/v1/kube/logs";
const SCOPES_PATH: &str = "/api/v1/kube/scopes";
const RESOURCE_PATH: &str = "/api/v1/kube/resource";

/// Gateway location. Socket and REST schemes are both derived from the
/// scheme of the configured base URL.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    pub fn parse(server: &str) -> Result<Self> {
        let trimmed = server.trim();
        let mut base =
            Url::parse(trimmed).with_context(|| format!("invalid gateway url `{trimmed}`"))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!(
                "unsupported gateway scheme `{}` (expected http or https)",
                base.scheme()
            );
        }
        if base.host_str().is_none() {
            anyhow::bail!("gateway url `{trimmed}` has no host");
        }

        base.set_path("/");
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    pub fn is_tls(&self) -> bool {
        self.base.scheme() == "https"
    }

    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or("-")
    }

    pub fn socket_url(&self, target: &SessionTarget) -> Url {
        let mut url = self.base.clone();
        let scheme = if self.is_tls() { "wss" } else { "ws" };
        // http(s) -> ws(s) never leaves the special schemes, so this cannot fail.
        let _ = url.set_scheme(scheme);

        match target.kind {
            SessionKind::Exec => {
                url.set_path(EXEC_PATH);
                {
                    let mut query = url.query_pairs_mut();
                    query
                        .append_pair("context", &target.context)
                        .append_pair("namespace", &target.namespace)
                        .append_pair("pod", &target.pod);
                    if let Some(container) = &target.container {
                        query.append_pair("container", container);
                    }
                }
            }
            SessionKind::Logs => {
                url.set_path(LOGS_PATH);
                url.query_pairs_mut()
                    .append_pair("context", &target.context)
                    .append_pair("namespace", &target.namespace)
                    .append_pair("pod", &target.pod)
                    .append_pair("container", target.container.as_deref().unwrap_or(""))
                    .append_pair(
                        "timestamps",
                        if target.show_timestamps {
                            "true"
                        } else {
                            "false"
                        },
                    );
            }
        }
        url
    }

    pub fn scopes_url(&self) -> Url {
        let mut url = self.base.clone();
        url.set_path(SCOPES_PATH);
        url
    }

    pub fn resource_url(&self, context: &str, namespace: &str, name: &str, kind: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(RESOURCE_PATH);
        url.query_pairs_mut()
            .append_pair("context", context)
            .append_pair("namespace", namespace)
            .append_pair("name", name)
            .append_pair("kind", kind);
        url
    }
}
