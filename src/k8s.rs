use kube::config::Kubeconfig;
use tracing::debug;

const DEFAULT_NAMESPACE: &str = "default";

/// Context and namespace picked up from the local kubeconfig. The gateway
/// resolves contexts by name, so only the names are needed here.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KubeDefaults {
    pub context: Option<String>,
    pub namespace: String,
}

impl Default for KubeDefaults {
    fn default() -> Self {
        Self {
            context: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl KubeDefaults {
    pub fn discover() -> Self {
        match Kubeconfig::read() {
            Ok(kubeconfig) => Self::from_kubeconfig(&kubeconfig),
            Err(error) => {
                debug!(error = %error, "kubeconfig not found, using built-in defaults");
                Self::default()
            }
        }
    }

    pub fn from_kubeconfig(kubeconfig: &Kubeconfig) -> Self {
        let context = kubeconfig
            .current_context
            .clone()
            .filter(|name| !name.trim().is_empty());
        let namespace = context
            .as_ref()
            .and_then(|current| {
                kubeconfig
                    .contexts
                    .iter()
                    .find(|named| &named.name == current)
            })
            .and_then(|named| named.context.as_ref())
            .and_then(|entry| entry.namespace.clone())
            .filter(|namespace| !namespace.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        Self { context, namespace }
    }

    /// Explicit arguments win; an unresolved context stays empty and is
    /// reported by the session as a missing parameter.
    pub fn resolve(&self, context: Option<String>, namespace: Option<String>) -> (String, String) {
        let context = context
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.context.clone())
            .unwrap_or_default();
        let namespace = namespace
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.namespace.clone());
        (context, namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::KubeDefaults;
    use kube::config::Kubeconfig;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: prod
contexts:
  - name: dev
    context:
      cluster: dev-cluster
      user: dev-user
  - name: prod
    context:
      cluster: prod-cluster
      user: prod-user
      namespace: shop
clusters: []
users: []
"#;

    #[test]
    fn current_context_and_namespace_are_used() {
        let kubeconfig = Kubeconfig::from_yaml(KUBECONFIG).expect("kubeconfig");
        let defaults = KubeDefaults::from_kubeconfig(&kubeconfig);
        assert_eq!(defaults.context.as_deref(), Some("prod"));
        assert_eq!(defaults.namespace, "shop");
    }

    #[test]
    fn context_without_namespace_falls_back_to_default() {
        let raw = KUBECONFIG.replace("current-context: prod", "current-context: dev");
        let kubeconfig = Kubeconfig::from_yaml(&raw).expect("kubeconfig");
        let defaults = KubeDefaults::from_kubeconfig(&kubeconfig);
        assert_eq!(defaults.context.as_deref(), Some("dev"));
        assert_eq!(defaults.namespace, "default");
    }

    #[test]
    fn explicit_arguments_override_defaults() {
        let defaults = KubeDefaults {
            context: Some("prod".to_string()),
            namespace: "shop".to_string(),
        };
        assert_eq!(
            defaults.resolve(Some("kind-dev".to_string()), None),
            ("kind-dev".to_string(), "shop".to_string())
        );
        assert_eq!(
            defaults.resolve(Some(" ".to_string()), Some("kube-system".to_string())),
            ("prod".to_string(), "kube-system".to_string())
        );
        assert_eq!(
            KubeDefaults::default().resolve(None, None),
            (String::new(), "default".to_string())
        );
    }
}
