use ratatui::layout::Rect;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{ResourceDetails, ResourceQuery, ScopeMap, should_fetch_details};
use crate::config::RuntimeConfigSnapshot;
use crate::context::{Theme, UiContext};
use crate::endpoint::Endpoint;
use crate::input::Action;
use crate::logs::{LogViewer, LogViewerSettings};
use crate::model::{ConnectionState, SessionTarget, ViewPreferences};
use crate::session::{Connector, SessionController, Teardown};
use crate::surface::{ContainerSize, FitMode, SurfaceOptions};
use crate::ui;
use crate::ws::SocketEnvelope;

const HORIZONTAL_STEP: u16 = 8;
const DETAILS_PAGE: u16 = 10;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Terminal,
    LogViewer,
    Details,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    LoadScopes,
    LoadDetails(ResourceQuery),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Exec(SessionTarget),
    Logs {
        target: SessionTarget,
        prefs: ViewPreferences,
    },
    Describe(ResourceQuery),
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub endpoint: Endpoint,
    pub surface: SurfaceOptions,
    pub log_viewer: LogViewerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailsLoad {
    WaitingForScopes,
    Loading,
    Loaded(ResourceDetails),
    Failed(String),
    Incomplete,
}

#[derive(Debug, Clone)]
pub struct DetailsPanel {
    pub query: ResourceQuery,
    pub scopes: ScopeMap,
    pub load: DetailsLoad,
    pub scroll: u16,
}

pub struct App<C: Connector + Clone> {
    ctx: UiContext,
    connector: C,
    settings: AppSettings,
    running: bool,
    status: String,
    viewport: Option<Rect>,
    exec: Option<SessionController<C>>,
    logs: Option<LogViewer<C>>,
    details: Option<DetailsPanel>,
}

impl<C: Connector + Clone> App<C> {
    pub fn new(connector: C, settings: AppSettings, theme: Theme) -> Self {
        Self {
            ctx: UiContext::new(theme),
            connector,
            settings,
            running: true,
            status: "Ready".to_string(),
            viewport: None,
            exec: None,
            logs: None,
            details: None,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn ctx(&self) -> &UiContext {
        &self.ctx
    }

    pub fn exec(&self) -> Option<&SessionController<C>> {
        self.exec.as_ref()
    }

    pub fn logs(&self) -> Option<&LogViewer<C>> {
        self.logs.as_ref()
    }

    pub fn details(&self) -> Option<&DetailsPanel> {
        self.details.as_ref()
    }

    pub fn mode(&self) -> InputMode {
        if self.logs.as_ref().is_some_and(LogViewer::is_open) {
            InputMode::LogViewer
        } else if self.exec.is_some() {
            InputMode::Terminal
        } else {
            InputMode::Details
        }
    }

    /// Whether the exec program switched the cursor keys to application
    /// mode (DECCKM).
    pub fn application_cursor(&self) -> bool {
        self.exec
            .as_ref()
            .and_then(|exec| exec.surface())
            .and_then(|surface| surface.screen())
            .is_some_and(|screen| screen.application_cursor())
    }

    pub fn launch(&mut self, launch: Launch, now: Instant) -> AppCommand {
        match launch {
            Launch::Exec(target) => {
                self.open_exec(target);
                AppCommand::None
            }
            Launch::Logs { target, prefs } => {
                self.open_logs(target, prefs, now);
                AppCommand::None
            }
            Launch::Describe(query) => {
                self.status = format!("Loading {} {}", query.kind, query.name);
                self.details = Some(DetailsPanel {
                    query,
                    scopes: ScopeMap::default(),
                    load: DetailsLoad::WaitingForScopes,
                    scroll: 0,
                });
                AppCommand::LoadScopes
            }
        }
    }

    pub fn apply_action(&mut self, action: Action, now: Instant) -> AppCommand {
        if self.ctx.show_help && !matches!(action, Action::ToggleHelp | Action::ToggleTheme) {
            self.ctx.show_help = false;
            if matches!(action, Action::Dismiss) {
                return AppCommand::None;
            }
        }

        match self.mode() {
            InputMode::LogViewer => self.apply_log_viewer_action(action, now),
            InputMode::Terminal => self.apply_terminal_action(action),
            InputMode::Details => self.apply_details_action(action, now),
        }
    }

    fn apply_terminal_action(&mut self, action: Action) -> AppCommand {
        let Some(exec) = self.exec.as_mut() else {
            return AppCommand::None;
        };
        match action {
            Action::TerminateSession => self.close_exec(),
            Action::SendInput(_) if exec.parameter_error().is_some() => self.close_exec(),
            Action::SendInput(data) => {
                if !exec.handle_input(&data) {
                    debug!(bytes = data.len(), state = %exec.state(), "input dropped");
                }
            }
            _ => {}
        }
        AppCommand::None
    }

    fn apply_log_viewer_action(&mut self, action: Action, now: Instant) -> AppCommand {
        let page = self.log_page_rows();
        let Some(viewer) = self.logs.as_mut() else {
            return AppCommand::None;
        };
        match action {
            Action::ToggleWrap => {
                viewer.toggle_wrap();
                self.status = if viewer.prefs().wrap_enabled {
                    "Line wrap on".to_string()
                } else {
                    "Line wrap off".to_string()
                };
            }
            Action::ToggleTimestamps => {
                let teardown = viewer.toggle_timestamps(&mut self.ctx, now);
                log_teardown("logs", &teardown);
                self.status = if viewer.prefs().show_timestamps {
                    "Reconnecting with timestamps".to_string()
                } else {
                    "Reconnecting without timestamps".to_string()
                };
            }
            Action::ScrollLeft => viewer.scroll_left(HORIZONTAL_STEP),
            Action::ScrollRight => viewer.scroll_right(HORIZONTAL_STEP),
            Action::Up => viewer.scroll_up(1),
            Action::Down => viewer.scroll_down(1),
            Action::PageUp => viewer.scroll_up(page),
            Action::PageDown => viewer.scroll_down(page),
            Action::ScrollBottom => viewer.scroll_down(usize::MAX),
            Action::ToggleTheme => self.toggle_theme(),
            Action::CloseLogs => self.close_logs(),
            _ => {}
        }
        AppCommand::None
    }

    fn apply_details_action(&mut self, action: Action, now: Instant) -> AppCommand {
        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
            }
            Action::ToggleHelp => self.ctx.show_help = !self.ctx.show_help,
            Action::ToggleTheme => self.toggle_theme(),
            Action::Down => self.scroll_details(1),
            Action::Up => self.scroll_details(-1),
            Action::PageDown => self.scroll_details(i32::from(DETAILS_PAGE)),
            Action::PageUp => self.scroll_details(-i32::from(DETAILS_PAGE)),
            Action::Top => {
                if let Some(details) = self.details.as_mut() {
                    details.scroll = 0;
                }
            }
            Action::Refresh => return self.refresh_details(),
            Action::OpenLogs => {
                if let Some(target) = self.pod_target_from_details("logs") {
                    let target = SessionTarget::logs(
                        target.context,
                        target.namespace,
                        target.pod,
                        None,
                        ViewPreferences::default().show_timestamps,
                    );
                    self.open_logs(target, ViewPreferences::default(), now);
                }
            }
            Action::OpenExec => {
                if let Some(target) = self.pod_target_from_details("exec") {
                    self.open_exec(target);
                }
            }
            _ => {}
        }
        AppCommand::None
    }

    fn pod_target_from_details(&mut self, what: &str) -> Option<SessionTarget> {
        let details = self.details.as_ref()?;
        if !details.query.is_pod() {
            self.status = format!("{what} is only available for pods");
            return None;
        }
        Some(SessionTarget::exec(
            details.query.context.clone(),
            details.query.namespace.clone(),
            details.query.name.clone(),
            None,
        ))
    }

    fn scroll_details(&mut self, delta: i32) {
        if let Some(details) = self.details.as_mut() {
            let next = i32::from(details.scroll) + delta;
            details.scroll = next.clamp(0, i32::from(u16::MAX)) as u16;
        }
    }

    fn toggle_theme(&mut self) {
        self.ctx.theme = self.ctx.theme.toggled();
        self.status = format!("Theme: {:?}", self.ctx.theme).to_lowercase();
    }

    fn open_exec(&mut self, target: SessionTarget) {
        let container = self.exec_container();
        let mut exec = SessionController::new(
            self.connector.clone(),
            self.settings.endpoint.clone(),
            self.settings.surface,
            FitMode::Wrap,
        );
        let state = exec.mount(&mut self.ctx, target.clone(), container);
        self.status = match exec.parameter_error() {
            Some(error) => error.to_string(),
            None => format!("Exec {target}: {state}"),
        };
        self.exec = Some(exec);
    }

    fn close_exec(&mut self) {
        let Some(mut exec) = self.exec.take() else {
            return;
        };
        let teardown = exec.unmount(&mut self.ctx);
        log_teardown("exec", &teardown);
        if self.details.is_some() {
            self.status = "Exec session closed".to_string();
        } else {
            self.running = false;
        }
    }

    fn open_logs(&mut self, target: SessionTarget, prefs: ViewPreferences, now: Instant) {
        let container = self.log_container();
        let mut viewer = LogViewer::new(
            self.connector.clone(),
            self.settings.endpoint.clone(),
            self.settings.surface,
            self.settings.log_viewer,
            target,
            prefs,
        );
        if let Some(container) = container {
            viewer.observe_container(container);
        }
        viewer.open(now);
        self.status = format!("Logs {}", viewer.target());
        self.logs = Some(viewer);
    }

    fn close_logs(&mut self) {
        let Some(mut viewer) = self.logs.take() else {
            return;
        };
        let teardown = viewer.close(&mut self.ctx);
        log_teardown("logs", &teardown);
        if self.details.is_some() || self.exec.is_some() {
            self.status = "Log viewer closed".to_string();
        } else {
            self.running = false;
        }
    }

    /// Deferred log attach; returns true when a session was started.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(viewer) = self.logs.as_mut() else {
            return false;
        };
        let attached = viewer.poll(&mut self.ctx, now);
        if attached && let Some(error) = viewer.session().parameter_error() {
            self.status = error.to_string();
        }
        attached
    }

    pub fn handle_socket(&mut self, envelope: SocketEnvelope) -> bool {
        let SocketEnvelope { session, event } = envelope;
        if let Some(exec) = self.exec.as_mut()
            && exec.session_id() == Some(session)
        {
            let before = exec.state();
            exec.handle_event(session, event);
            let after = exec.state();
            if before != after {
                info!(session, state = %after, "exec session state changed");
                self.status = format!("Exec: {after}");
            }
            return true;
        }

        if let Some(viewer) = self.logs.as_mut()
            && viewer.session().session_id() == Some(session)
        {
            let before = viewer.state();
            viewer.handle_event(session, event);
            let after = viewer.state();
            if before != after {
                info!(session, state = %after, "log stream state changed");
                self.status = format!("Logs: {after}");
            }
            return true;
        }

        debug!(session, "dropping event for a closed session");
        false
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        let area = Rect::new(0, 0, width, height);
        if self.viewport == Some(area) {
            return;
        }
        self.viewport = Some(area);
        let listeners = self.ctx.resize.dispatch(area);
        debug!(width, height, listeners, "viewport changed");

        if let Some(exec) = self.exec.as_mut() {
            if exec.is_mounted() {
                if let Some(container) = exec
                    .take_resize(&mut self.ctx)
                    .and_then(exec_container_of)
                {
                    exec.handle_resize(container);
                }
            } else if exec.state() == ConnectionState::Idle
                && let Some(container) = exec_container_of(area)
                && let Some(target) = exec.target().cloned()
            {
                exec.retarget(&mut self.ctx, target, Some(container));
            }
        }

        if let Some(viewer) = self.logs.as_mut() {
            viewer.handle_viewport(&mut self.ctx, area, log_container_of);
        }
    }

    pub fn apply_config(&mut self, snapshot: &RuntimeConfigSnapshot) {
        if let Some(theme) = snapshot.theme
            && theme != self.ctx.theme
        {
            self.ctx.theme = theme;
            self.status = format!(
                "Config reloaded from {}",
                snapshot.source.as_deref().unwrap_or("defaults")
            );
        }
    }

    pub fn set_scopes(&mut self, scopes: ScopeMap) -> AppCommand {
        let Some(details) = self.details.as_mut() else {
            return AppCommand::None;
        };
        details.scopes = scopes;
        if should_fetch_details(&details.scopes, &details.query) {
            details.load = DetailsLoad::Loading;
            AppCommand::LoadDetails(details.query.clone())
        } else {
            details.load = if details.scopes.is_loaded() {
                DetailsLoad::Incomplete
            } else {
                DetailsLoad::WaitingForScopes
            };
            AppCommand::None
        }
    }

    pub fn scopes_failed(&mut self, error: &str) {
        warn!(error, "failed to fetch scopes");
        self.status = format!("Failed to fetch scopes: {error}");
        if let Some(details) = self.details.as_mut() {
            details.load = DetailsLoad::Failed(error.to_string());
        }
    }

    pub fn set_details(&mut self, query: &ResourceQuery, result: Result<ResourceDetails, String>) {
        let Some(details) = self.details.as_mut() else {
            return;
        };
        if &details.query != query {
            debug!(kind = %query.kind, name = %query.name, "dropping stale details response");
            return;
        }
        match result {
            Ok(loaded) => {
                self.status = format!(
                    "{} {}: {} events",
                    query.kind,
                    query.name,
                    loaded.events.len()
                );
                details.load = DetailsLoad::Loaded(loaded);
            }
            Err(error) => {
                self.status = format!("Error: {error}");
                details.load = DetailsLoad::Failed(error);
            }
        }
    }

    fn refresh_details(&mut self) -> AppCommand {
        let Some(details) = self.details.as_mut() else {
            return AppCommand::None;
        };
        if !details.scopes.is_loaded() {
            details.load = DetailsLoad::WaitingForScopes;
            return AppCommand::LoadScopes;
        }
        if should_fetch_details(&details.scopes, &details.query) {
            details.load = DetailsLoad::Loading;
            self.status = format!("Refreshing {} {}", details.query.kind, details.query.name);
            return AppCommand::LoadDetails(details.query.clone());
        }
        AppCommand::None
    }

    fn exec_container(&self) -> Option<ContainerSize> {
        self.viewport.and_then(exec_container_of)
    }

    fn log_container(&self) -> Option<ContainerSize> {
        self.viewport.and_then(log_container_of)
    }

    fn log_page_rows(&self) -> usize {
        self.log_container()
            .map(|container| container.height.saturating_sub(1).max(1) as usize)
            .unwrap_or(10)
    }

    /// Tears down every open session, mirroring a view unmount.
    pub fn shutdown(&mut self) {
        if let Some(mut viewer) = self.logs.take() {
            log_teardown("logs", &viewer.close(&mut self.ctx));
        }
        if let Some(mut exec) = self.exec.take() {
            log_teardown("exec", &exec.unmount(&mut self.ctx));
        }
    }
}

fn exec_container_of(viewport: Rect) -> Option<ContainerSize> {
    container_of(ui::exec_terminal_area(viewport))
}

fn log_container_of(viewport: Rect) -> Option<ContainerSize> {
    container_of(ui::log_terminal_area(viewport))
}

fn container_of(area: Rect) -> Option<ContainerSize> {
    (area.width > 0 && area.height > 0)
        .then(|| ContainerSize::new(u32::from(area.width), u32::from(area.height)))
}

fn log_teardown(view: &str, teardown: &Teardown) {
    if !teardown.is_empty() {
        debug!(view, steps = ?teardown.steps, "view torn down");
    }
}
