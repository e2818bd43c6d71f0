use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SessionKind {
    Exec,
    Logs,
}

impl SessionKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Exec => "exec",
            Self::Logs => "logs",
        }
    }
}

/// Coordinates of one backend stream. A session never mutates its target;
/// any change goes through a full teardown and a new session.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SessionTarget {
    pub context: String,
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    pub kind: SessionKind,
    pub show_timestamps: bool,
}

impl SessionTarget {
    pub fn exec(
        context: impl Into<String>,
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: Option<String>,
    ) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
            pod: pod.into(),
            container: normalize_container(container),
            kind: SessionKind::Exec,
            show_timestamps: false,
        }
    }

    pub fn logs(
        context: impl Into<String>,
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: Option<String>,
        show_timestamps: bool,
    ) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
            pod: pod.into(),
            container: normalize_container(container),
            kind: SessionKind::Logs,
            show_timestamps,
        }
    }

    pub fn with_timestamps(&self, show_timestamps: bool) -> Self {
        Self {
            show_timestamps,
            ..self.clone()
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("context", self.context.as_str()),
            ("namespace", self.namespace.as_str()),
            ("pod", self.pod.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn container_label(&self) -> &str {
        self.container.as_deref().unwrap_or("default")
    }
}

impl Display for SessionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.pod,
            self.container_label(),
            self.context
        )
    }
}

fn normalize_container(container: Option<String>) -> Option<String> {
    container
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ViewPreferences {
    pub wrap_enabled: bool,
    pub show_timestamps: bool,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            wrap_enabled: false,
            show_timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionState, SessionKind, SessionTarget};

    #[test]
    fn missing_fields_lists_blank_coordinates() {
        let target = SessionTarget::exec("", " ", "web-1", None);
        assert_eq!(target.missing_fields(), vec!["context", "namespace"]);

        let target = SessionTarget::exec("prod", "default", "", None);
        assert_eq!(target.missing_fields(), vec!["pod"]);

        let target = SessionTarget::exec("prod", "default", "web-1", None);
        assert!(target.missing_fields().is_empty());
    }

    #[test]
    fn blank_container_is_treated_as_unset() {
        let target = SessionTarget::logs("prod", "default", "web-1", Some("  ".to_string()), true);
        assert_eq!(target.container, None);
        assert_eq!(target.container_label(), "default");
        assert_eq!(target.kind, SessionKind::Logs);
    }

    #[test]
    fn with_timestamps_only_changes_the_flag() {
        let target = SessionTarget::logs("prod", "default", "web-1", Some("app".to_string()), true);
        let toggled = target.with_timestamps(false);
        assert!(!toggled.show_timestamps);
        assert_eq!(toggled.pod, target.pod);
        assert_ne!(toggled, target);
    }

    #[test]
    fn terminal_states_are_disconnected_and_error() {
        assert!(ConnectionState::Disconnected.is_terminal());
        assert!(ConnectionState::Error.is_terminal());
        assert!(!ConnectionState::Connecting.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
        assert!(!ConnectionState::Idle.is_terminal());
    }

    #[test]
    fn target_display_uses_default_container_label() {
        let target = SessionTarget::exec("prod", "default", "web-1", None);
        assert_eq!(target.to_string(), "web-1/default@prod");
    }
}
