use ratatui::layout::Rect;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::context::UiContext;
use crate::endpoint::Endpoint;
use crate::model::{ConnectionState, SessionTarget, ViewPreferences};
use crate::session::{Connector, SessionController, SessionId, Teardown};
use crate::socket::SocketEvent;
use crate::surface::{ContainerSize, FitMode, SurfaceOptions, TerminalSurface};

pub const DEFAULT_ATTACH_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LogViewerSettings {
    pub attach_delay: Duration,
    pub no_wrap_columns: u16,
}

impl Default for LogViewerSettings {
    fn default() -> Self {
        Self {
            attach_delay: DEFAULT_ATTACH_DELAY,
            no_wrap_columns: crate::surface::NO_WRAP_COLUMNS,
        }
    }
}

/// Read-only log stream shown as a dialog. The terminal is attached a short
/// moment after opening so the dialog layout settles before it is measured.
pub struct LogViewer<C: Connector> {
    session: SessionController<C>,
    target: SessionTarget,
    prefs: ViewPreferences,
    settings: LogViewerSettings,
    attach_at: Option<Instant>,
    container: Option<ContainerSize>,
    open: bool,
}

impl<C: Connector> LogViewer<C> {
    pub fn new(
        connector: C,
        endpoint: Endpoint,
        options: SurfaceOptions,
        settings: LogViewerSettings,
        target: SessionTarget,
        prefs: ViewPreferences,
    ) -> Self {
        let target = target.with_timestamps(prefs.show_timestamps);
        let fit_mode = fit_mode_for(prefs, settings);
        Self {
            session: SessionController::new(connector, endpoint, options, fit_mode),
            target,
            prefs,
            settings,
            attach_at: None,
            container: None,
            open: false,
        }
    }

    pub fn open(&mut self, now: Instant) {
        self.open = true;
        self.attach_at = Some(now + self.settings.attach_delay);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn poll(&mut self, ctx: &mut UiContext, now: Instant) -> bool {
        let Some(attach_at) = self.attach_at else {
            return false;
        };
        if !self.open || now < attach_at {
            return false;
        }
        if self.container.is_none() {
            return false;
        }

        self.attach_at = None;
        self.session.mount(ctx, self.target.clone(), self.container);
        debug!(target = %self.target, state = %self.session.state(), "log viewer attached");
        true
    }

    /// Resize observer callback: every container change re-runs the fit in
    /// the current wrap mode.
    pub fn observe_container(&mut self, container: ContainerSize) {
        if self.container == Some(container) {
            return;
        }
        self.container = Some(container);
        self.session.handle_resize(container);
    }

    /// Window viewport change. An attached stream refits only through its
    /// registered resize listener; before attach the measured container is
    /// just remembered for the upcoming mount.
    pub fn handle_viewport(
        &mut self,
        ctx: &mut UiContext,
        viewport: Rect,
        layout: impl Fn(Rect) -> Option<ContainerSize>,
    ) -> bool {
        if self.session.is_mounted() {
            let Some(container) = self.session.take_resize(ctx).and_then(layout) else {
                return false;
            };
            self.observe_container(container);
            return true;
        }
        if let Some(container) = layout(viewport) {
            self.container = Some(container);
        }
        false
    }

    pub fn toggle_wrap(&mut self) {
        self.prefs.wrap_enabled = !self.prefs.wrap_enabled;
        self.session
            .set_fit_mode(fit_mode_for(self.prefs, self.settings));
    }

    pub fn toggle_timestamps(&mut self, ctx: &mut UiContext, now: Instant) -> Teardown {
        self.prefs.show_timestamps = !self.prefs.show_timestamps;
        self.target = self.target.with_timestamps(self.prefs.show_timestamps);
        let teardown = self.session.unmount(ctx);
        if self.open {
            self.attach_at = Some(now + self.settings.attach_delay);
        }
        teardown
    }

    pub fn close(&mut self, ctx: &mut UiContext) -> Teardown {
        self.open = false;
        self.attach_at = None;
        self.session.unmount(ctx)
    }

    pub fn handle_event(&mut self, session: SessionId, event: SocketEvent) -> bool {
        self.session.handle_event(session, event)
    }

    pub fn scroll_up(&mut self, lines: usize) {
        if let Some(surface) = self.session.surface_mut() {
            surface.scroll_up(lines);
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        if let Some(surface) = self.session.surface_mut() {
            surface.scroll_down(lines);
        }
    }

    pub fn scroll_left(&mut self, columns: u16) {
        if let Some(surface) = self.session.surface_mut() {
            surface.scroll_left(columns);
        }
    }

    pub fn scroll_right(&mut self, columns: u16) {
        let width = self
            .container
            .map(|container| container.width.min(u32::from(u16::MAX)) as u16)
            .unwrap_or(0);
        if let Some(surface) = self.session.surface_mut() {
            surface.scroll_right(columns, width);
        }
    }

    pub fn prefs(&self) -> ViewPreferences {
        self.prefs
    }

    pub fn target(&self) -> &SessionTarget {
        &self.target
    }

    pub fn state(&self) -> ConnectionState {
        if self.attach_at.is_some() {
            ConnectionState::Connecting
        } else {
            self.session.state()
        }
    }

    pub fn session(&self) -> &SessionController<C> {
        &self.session
    }

    pub fn surface(&self) -> Option<&TerminalSurface> {
        self.session.surface()
    }
}

fn fit_mode_for(prefs: ViewPreferences, settings: LogViewerSettings) -> FitMode {
    if prefs.wrap_enabled {
        FitMode::Wrap
    } else {
        FitMode::NoWrap {
            columns: settings.no_wrap_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogViewer, LogViewerSettings};
    use crate::context::{Theme, UiContext};
    use crate::endpoint::Endpoint;
    use crate::model::{ConnectionState, SessionTarget, ViewPreferences};
    use crate::session::testing::FakeConnector;
    use crate::session::TeardownStep;
    use crate::socket::{Frame, ReadyState, SocketEvent};
    use crate::surface::{ContainerSize, Dimensions, SurfaceOptions};
    use ratatui::layout::Rect;
    use std::time::{Duration, Instant};

    fn full_area(area: Rect) -> Option<ContainerSize> {
        Some(ContainerSize::new(u32::from(area.width), u32::from(area.height)))
    }

    fn contents(viewer: &LogViewer<FakeConnector>) -> String {
        viewer
            .surface()
            .and_then(|surface| surface.screen())
            .expect("screen")
            .contents()
    }

    fn viewer(connector: &FakeConnector) -> LogViewer<FakeConnector> {
        LogViewer::new(
            connector.clone(),
            Endpoint::parse("https://host").expect("endpoint"),
            SurfaceOptions::default(),
            LogViewerSettings::default(),
            SessionTarget::logs("prod", "default", "web-1", Some("app".to_string()), true),
            ViewPreferences::default(),
        )
    }

    fn attached(connector: &FakeConnector, ctx: &mut UiContext) -> (LogViewer<FakeConnector>, Instant) {
        let mut viewer = viewer(connector);
        let now = Instant::now();
        viewer.observe_container(ContainerSize::new(100, 30));
        viewer.open(now);
        assert!(viewer.poll(ctx, now + Duration::from_millis(100)));
        (viewer, now)
    }

    #[test]
    fn attach_waits_for_the_settle_delay() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let mut viewer = viewer(&connector);
        let now = Instant::now();
        viewer.observe_container(ContainerSize::new(100, 30));
        viewer.open(now);

        assert!(!viewer.poll(&mut ctx, now + Duration::from_millis(50)));
        assert!(connector.opened().is_empty());
        assert_eq!(viewer.state(), ConnectionState::Connecting);

        assert!(viewer.poll(&mut ctx, now + Duration::from_millis(100)));
        assert_eq!(connector.opened().len(), 1);
        assert!(!viewer.poll(&mut ctx, now + Duration::from_millis(200)));
        assert_eq!(connector.opened().len(), 1);
    }

    #[test]
    fn attach_waits_for_a_measured_container() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let mut viewer = viewer(&connector);
        let now = Instant::now();
        viewer.open(now);

        assert!(!viewer.poll(&mut ctx, now + Duration::from_secs(1)));
        viewer.observe_container(ContainerSize::new(80, 20));
        assert!(viewer.poll(&mut ctx, now + Duration::from_secs(1)));
    }

    #[test]
    fn default_view_is_no_wrap_with_timestamps() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (viewer, _) = attached(&connector, &mut ctx);

        assert_eq!(
            viewer.surface().and_then(|surface| surface.dimensions()),
            Some(Dimensions { rows: 30, cols: 1000 })
        );
        assert!(connector.opened()[0].1.ends_with("&timestamps=true"));
        let contents = viewer
            .surface()
            .and_then(|surface| surface.screen())
            .expect("screen")
            .contents();
        assert!(contents.contains("Connecting to logs for web-1..."));
    }

    #[test]
    fn wrap_toggle_never_touches_the_socket() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, _) = attached(&connector, &mut ctx);
        let id = viewer.session().session_id().expect("id");

        viewer.toggle_wrap();
        assert!(viewer.prefs().wrap_enabled);
        assert_eq!(
            viewer.surface().and_then(|surface| surface.dimensions()),
            Some(Dimensions { rows: 30, cols: 100 })
        );
        viewer.toggle_wrap();
        assert_eq!(
            viewer.surface().and_then(|surface| surface.dimensions()),
            Some(Dimensions { rows: 30, cols: 1000 })
        );

        assert_eq!(connector.opened().len(), 1);
        assert_eq!(connector.transport(0).closes(), 0);
        assert_eq!(viewer.session().session_id(), Some(id));
    }

    #[test]
    fn timestamp_toggle_reconnects_with_updated_query() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, now) = attached(&connector, &mut ctx);

        let later = now + Duration::from_secs(1);
        let teardown = viewer.toggle_timestamps(&mut ctx, later);
        assert!(teardown.steps.contains(&TeardownStep::CloseSocket));
        assert_eq!(connector.transport(0).closes(), 1);

        assert!(viewer.poll(&mut ctx, later + Duration::from_millis(100)));
        let opened = connector.opened();
        assert_eq!(opened.len(), 2);
        assert!(opened[1].1.ends_with("&timestamps=false"));
        assert_eq!(connector.transport(1).closes(), 0);
        assert_eq!(ctx.resize.len(), 1);
    }

    #[test]
    fn log_input_is_never_forwarded() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, _) = attached(&connector, &mut ctx);
        let id = viewer.session().session_id().expect("id");
        connector.transport(0).set_ready(ReadyState::Open);
        viewer.handle_event(id, SocketEvent::Open);
        assert_eq!(viewer.state(), ConnectionState::Connected);

        let surface = viewer.surface().expect("surface");
        assert!(!surface.input_enabled());
        assert_eq!(surface.input("q"), None);
        assert!(connector.transport(0).sent().is_empty());
    }

    #[test]
    fn close_cancels_pending_attach() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let mut viewer = viewer(&connector);
        let now = Instant::now();
        viewer.observe_container(ContainerSize::new(100, 30));
        viewer.open(now);

        let teardown = viewer.close(&mut ctx);
        assert!(teardown.is_empty());
        assert!(!viewer.poll(&mut ctx, now + Duration::from_secs(1)));
        assert!(connector.opened().is_empty());
    }

    #[test]
    fn close_tears_down_an_attached_stream() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, _) = attached(&connector, &mut ctx);

        let teardown = viewer.close(&mut ctx);
        assert_eq!(teardown.steps.len(), 3);
        assert_eq!(connector.transport(0).closes(), 1);
        assert_eq!(ctx.resize.len(), 0);
        assert!(!viewer.is_open());
    }

    #[test]
    fn resize_observer_refits_in_current_mode() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, _) = attached(&connector, &mut ctx);

        viewer.observe_container(ContainerSize::new(140, 12));
        assert_eq!(
            viewer.surface().and_then(|surface| surface.dimensions()),
            Some(Dimensions { rows: 12, cols: 1000 })
        );
        viewer.toggle_wrap();
        viewer.observe_container(ContainerSize::new(90, 18));
        assert_eq!(
            viewer.surface().and_then(|surface| surface.dimensions()),
            Some(Dimensions { rows: 18, cols: 90 })
        );
    }

    #[test]
    fn wrap_toggle_keeps_the_tail_of_long_lines() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, _) = attached(&connector, &mut ctx);
        let id = viewer.session().session_id().expect("id");
        let line = format!("{}TAIL-MARKER", "x".repeat(150));
        viewer.handle_event(id, SocketEvent::Message(Frame::Text(format!("{line}\n"))));

        assert!(contents(&viewer).contains(&line));
        viewer.toggle_wrap();
        assert!(contents(&viewer).contains("TAIL-MARKER"));
        viewer.toggle_wrap();
        assert!(contents(&viewer).contains(&line));
    }

    #[test]
    fn viewport_changes_refit_through_the_resize_listener() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, _) = attached(&connector, &mut ctx);
        viewer.toggle_wrap();

        let viewport = Rect::new(0, 0, 70, 16);
        assert_eq!(ctx.resize.dispatch(viewport), 1);
        assert!(viewer.handle_viewport(&mut ctx, viewport, full_area));
        assert_eq!(
            viewer.surface().and_then(|surface| surface.dimensions()),
            Some(Dimensions { rows: 16, cols: 70 })
        );
        assert!(!viewer.handle_viewport(&mut ctx, viewport, full_area));
    }

    #[test]
    fn closed_viewer_receives_no_refit() {
        let connector = FakeConnector::default();
        let mut ctx = UiContext::new(Theme::Dark);
        let (mut viewer, _) = attached(&connector, &mut ctx);
        viewer.close(&mut ctx);

        let viewport = Rect::new(0, 0, 70, 16);
        assert_eq!(ctx.resize.dispatch(viewport), 0);
        assert!(!viewer.handle_viewport(&mut ctx, viewport, full_area));
        assert!(viewer.surface().is_none());
    }
}
