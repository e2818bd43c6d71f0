use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::context::Theme;
use crate::logs::LogViewerSettings;
use crate::surface::{CellMetrics, DEFAULT_SCROLLBACK, NO_WRAP_COLUMNS, SurfaceOptions};

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct RuntimeConfigSnapshot {
    pub source: Option<String>,
    pub server: Option<String>,
    pub theme: Option<Theme>,
    pub terminal: TerminalSettings,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerminalSettings {
    pub no_wrap_columns: u16,
    pub attach_delay_ms: u64,
    pub scrollback: usize,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            no_wrap_columns: NO_WRAP_COLUMNS,
            attach_delay_ms: 100,
            scrollback: DEFAULT_SCROLLBACK,
            cell_width: 1,
            cell_height: 1,
        }
    }
}

impl TerminalSettings {
    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            metrics: CellMetrics {
                cell_width: self.cell_width.max(1),
                cell_height: self.cell_height.max(1),
                padding: 0,
            },
            scrollback: self.scrollback,
            convert_eol: false,
        }
    }

    pub fn log_viewer(&self) -> LogViewerSettings {
        LogViewerSettings {
            attach_delay: Duration::from_millis(self.attach_delay_ms),
            no_wrap_columns: self.no_wrap_columns.max(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfigWatcher {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct KubetermConfigFile {
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    theme: Option<Theme>,
    #[serde(default)]
    terminal: TerminalSettings,
}

impl RuntimeConfigWatcher {
    pub fn discover() -> Self {
        Self {
            path: discover_config_path(),
            modified: None,
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            modified: None,
        }
    }

    pub fn load_current(&mut self) -> Result<RuntimeConfigSnapshot> {
        let Some(path) = self.path.clone() else {
            return Ok(RuntimeConfigSnapshot::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let mut snapshot = parse_config(&raw)
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        self.modified = modified_at(&path);
        snapshot.source = Some(path.display().to_string());
        Ok(snapshot)
    }

    pub fn reload_if_changed(&mut self) -> Result<Option<RuntimeConfigSnapshot>> {
        let Some(current_path) = self.path.clone() else {
            self.path = discover_config_path();
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(None);
        };

        if !current_path.exists() {
            self.path = discover_config_path();
            self.modified = None;
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(Some(RuntimeConfigSnapshot::default()));
        }

        if modified_at(&current_path) != self.modified {
            return self.load_current().map(Some);
        }

        Ok(None)
    }
}

fn parse_config(raw: &str) -> Result<RuntimeConfigSnapshot> {
    if raw.trim().is_empty() {
        return Ok(RuntimeConfigSnapshot::default());
    }
    let parsed: KubetermConfigFile = serde_yaml::from_str(raw)?;
    Ok(RuntimeConfigSnapshot {
        source: None,
        server: parsed
            .server
            .map(|server| server.trim().to_string())
            .filter(|server| !server.is_empty()),
        theme: parsed.theme,
        terminal: parsed.terminal,
    })
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|meta| meta.modified().ok())
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBETERM_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kubeterm.yaml"),
        PathBuf::from("kubeterm.yml"),
        PathBuf::from(".kubeterm.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/kubeterm/config.yaml"),
            PathBuf::from(&home).join(".config/kubeterm/config.yml"),
            PathBuf::from(&home).join(".kubeterm.yaml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{RuntimeConfigWatcher, TerminalSettings, parse_config};
    use crate::context::Theme;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn full_config_parses() {
        let snapshot = parse_config(
            r#"
server: " https://dash.example.com "
theme: light
terminal:
  no_wrap_columns: 400
  attach_delay_ms: 250
  scrollback: 200
"#,
        )
        .expect("config");

        assert_eq!(snapshot.server.as_deref(), Some("https://dash.example.com"));
        assert_eq!(snapshot.theme, Some(Theme::Light));
        assert_eq!(snapshot.terminal.no_wrap_columns, 400);
        assert_eq!(snapshot.terminal.cell_width, 1);

        let viewer = snapshot.terminal.log_viewer();
        assert_eq!(viewer.attach_delay, Duration::from_millis(250));
        assert_eq!(viewer.no_wrap_columns, 400);
        assert_eq!(snapshot.terminal.surface_options().scrollback, 200);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let snapshot = parse_config("").expect("config");
        assert_eq!(snapshot.server, None);
        assert_eq!(snapshot.theme, None);
        assert_eq!(snapshot.terminal, TerminalSettings::default());
        assert_eq!(snapshot.terminal.no_wrap_columns, 1000);
        assert_eq!(snapshot.terminal.surface_options().scrollback, 1_000);
    }

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(parse_config("theme: neon\n").is_err());
    }

    #[test]
    fn watcher_reloads_only_after_changes() {
        let path = std::env::temp_dir().join(format!(
            "kubeterm-config-test-{}.yaml",
            std::process::id()
        ));
        fs::write(&path, "theme: dark\n").expect("write config");

        let mut watcher = RuntimeConfigWatcher::at(&path);
        let first = watcher.load_current().expect("load");
        assert_eq!(first.theme, Some(Theme::Dark));
        assert_eq!(first.source.as_deref(), Some(path.display().to_string().as_str()));
        assert!(watcher.reload_if_changed().expect("reload").is_none());

        fs::remove_file(&path).expect("remove config");
        let removed = watcher.reload_if_changed().expect("reload");
        if let Some(snapshot) = removed {
            assert_ne!(snapshot.source.as_deref(), Some(path.display().to_string().as_str()));
        }
    }
}
