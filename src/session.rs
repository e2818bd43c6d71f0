use ratatui::layout::Rect;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::context::{ListenerId, UiContext};
use crate::endpoint::Endpoint;
use crate::model::{ConnectionState, SessionKind, SessionTarget};
use crate::socket::{SessionSocket, SocketEvent, Transport};
use crate::surface::{ContainerSize, Dimensions, FitMode, SurfaceOptions, TerminalSurface};

pub type SessionId = u64;

const EXEC_CONNECTED_BANNER: &str = "\r\n\x1b[32mConnected to terminal.\x1b[0m\r\n";
const LOGS_CONNECTED_BANNER: &str = "\x1b[32mConnected.\x1b[0m\r\n";

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SessionError {
    #[error("Missing required parameters: {}.", .0.join(", "))]
    MissingParameters(Vec<&'static str>),
    #[error("WebSocket error occurred.")]
    Transport,
}

/// Opens sockets. Implementations report inbound traffic out of band,
/// tagged with the session id they were given.
pub trait Connector {
    type Transport: Transport;

    fn connect(&mut self, session: SessionId, url: &Url) -> Self::Transport;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TeardownStep {
    RemoveResizeListener,
    CloseSocket,
    DisposeSurface,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Teardown {
    pub steps: Vec<TeardownStep>,
}

impl Teardown {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

struct LiveSession<T: Transport> {
    id: SessionId,
    socket: SessionSocket<T>,
}

/// Owns the surface and socket of one mounted view and guarantees they are
/// created together and torn down together.
pub struct SessionController<C: Connector> {
    connector: C,
    endpoint: Endpoint,
    options: SurfaceOptions,
    fit_mode: FitMode,
    target: Option<SessionTarget>,
    state: ConnectionState,
    error: Option<SessionError>,
    surface: Option<TerminalSurface>,
    live: Option<LiveSession<C::Transport>>,
    resize_listener: Option<ListenerId>,
}

impl<C: Connector> SessionController<C> {
    pub fn new(connector: C, endpoint: Endpoint, options: SurfaceOptions, fit_mode: FitMode) -> Self {
        Self {
            connector,
            endpoint,
            options,
            fit_mode,
            target: None,
            state: ConnectionState::Idle,
            error: None,
            surface: None,
            live: None,
            resize_listener: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn parameter_error(&self) -> Option<&SessionError> {
        self.error
            .as_ref()
            .filter(|error| matches!(error, SessionError::MissingParameters(_)))
    }

    pub fn target(&self) -> Option<&SessionTarget> {
        self.target.as_ref()
    }

    pub fn surface(&self) -> Option<&TerminalSurface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut TerminalSurface> {
        self.surface.as_mut()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.live.as_ref().map(|live| live.id)
    }

    pub fn is_mounted(&self) -> bool {
        self.surface
            .as_ref()
            .is_some_and(|surface| !surface.is_disposed())
            || self.live.is_some()
    }

    pub fn mount(
        &mut self,
        ctx: &mut UiContext,
        target: SessionTarget,
        container: Option<ContainerSize>,
    ) -> ConnectionState {
        let missing = target.missing_fields();
        self.target = Some(target.clone());
        if !missing.is_empty() {
            let error = SessionError::MissingParameters(missing);
            info!(%target, error = %error, "session rejected");
            self.state = ConnectionState::Error;
            self.error = Some(error);
            return self.state;
        }
        self.error = None;

        let mut surface = TerminalSurface::new(SurfaceOptions {
            convert_eol: target.kind == SessionKind::Logs,
            ..self.options
        });
        if !surface.initialize(container) {
            debug!(%target, "no container yet, session not started");
            self.state = ConnectionState::Idle;
            return self.state;
        }
        surface.fit(self.fit_mode);
        if target.kind == SessionKind::Logs {
            surface.write_text(&format!(
                "\x1b[33mConnecting to logs for {}...\x1b[0m\r\n",
                target.pod
            ));
        }

        let id = ctx.allocate_session();
        self.resize_listener = Some(ctx.resize.subscribe(id));
        let url = self.endpoint.socket_url(&target);
        info!(session = id, %target, %url, kind = target.kind.title(), "connecting session");
        let transport = self.connector.connect(id, &url);

        self.surface = Some(surface);
        self.live = Some(LiveSession {
            id,
            socket: SessionSocket::new(transport),
        });
        self.state = ConnectionState::Connecting;
        self.state
    }

    /// Re-initializes the session when any coordinate changed.
    pub fn retarget(
        &mut self,
        ctx: &mut UiContext,
        target: SessionTarget,
        container: Option<ContainerSize>,
    ) -> Teardown {
        if self.target.as_ref() == Some(&target) && self.state != ConnectionState::Idle {
            return Teardown::default();
        }
        let teardown = self.unmount(ctx);
        self.mount(ctx, target, container);
        teardown
    }

    pub fn handle_event(&mut self, session: SessionId, event: SocketEvent) -> bool {
        let (Some(live), Some(surface)) = (self.live.as_mut(), self.surface.as_mut()) else {
            return false;
        };
        if live.id != session {
            return false;
        }

        let was_connecting = live.socket.state() == ConnectionState::Connecting;
        let is_open = event == SocketEvent::Open;
        self.state = live.socket.handle(event, surface);

        if is_open && was_connecting && self.state == ConnectionState::Connected {
            let kind = self.target.as_ref().map(|target| target.kind);
            match kind {
                Some(SessionKind::Exec) => {
                    surface.write_text(EXEC_CONNECTED_BANNER);
                    surface.set_input_enabled(true);
                }
                Some(SessionKind::Logs) | None => {
                    surface.write_text(LOGS_CONNECTED_BANNER);
                }
            }
        }
        if self.state == ConnectionState::Error {
            self.error = Some(SessionError::Transport);
        }
        if self.state.is_terminal() {
            surface.set_input_enabled(false);
        }
        true
    }

    /// Forwards one unit of keyboard input verbatim. The remote side owns
    /// echo.
    pub fn handle_input(&mut self, data: &str) -> bool {
        let (Some(live), Some(surface)) = (self.live.as_mut(), self.surface.as_mut()) else {
            return false;
        };
        let Some(data) = surface.input(data) else {
            return false;
        };
        surface.scroll_to_bottom();
        live.socket.send(data)
    }

    /// Local refit only. The gateway has no resize channel, so the remote
    /// pty keeps its original size.
    pub fn handle_resize(&mut self, container: ContainerSize) -> Option<Dimensions> {
        let surface = self.surface.as_mut()?;
        surface.set_container(container);
        surface.fit(self.fit_mode)
    }

    /// Window viewport queued for this session's resize listener since the
    /// last call. Nothing arrives once the listener is gone.
    pub fn take_resize(&mut self, ctx: &mut UiContext) -> Option<Rect> {
        ctx.resize.take(self.resize_listener?)
    }

    pub fn set_fit_mode(&mut self, mode: FitMode) -> Option<Dimensions> {
        self.fit_mode = mode;
        self.surface.as_mut()?.fit(mode)
    }

    pub fn unmount(&mut self, ctx: &mut UiContext) -> Teardown {
        let mut teardown = Teardown::default();

        if let Some(listener) = self.resize_listener.take()
            && ctx.resize.unsubscribe(listener)
        {
            teardown.steps.push(TeardownStep::RemoveResizeListener);
        }
        if let Some(mut live) = self.live.take() {
            if live.socket.close() {
                teardown.steps.push(TeardownStep::CloseSocket);
            }
            let writes = self
                .surface
                .as_ref()
                .map_or(0, TerminalSurface::write_count);
            info!(session = live.id, state = %self.state, writes, "session closed");
        }
        if let Some(mut surface) = self.surface.take()
            && surface.dispose()
        {
            teardown.steps.push(TeardownStep::DisposeSurface);
        }

        self.state = ConnectionState::Idle;
        self.error = None;
        teardown
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{Connector, SessionId};
    use crate::socket::testing::FakeTransport;
    use std::cell::RefCell;
    use std::rc::Rc;
    use url::Url;

    #[derive(Debug, Default)]
    pub struct ConnectorLog {
        pub opened: Vec<(SessionId, String)>,
        pub transports: Vec<FakeTransport>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct FakeConnector {
        pub log: Rc<RefCell<ConnectorLog>>,
    }

    impl FakeConnector {
        pub fn opened(&self) -> Vec<(SessionId, String)> {
            self.log.borrow().opened.clone()
        }

        pub fn transport(&self, idx: usize) -> FakeTransport {
            self.log.borrow().transports[idx].clone()
        }

        pub fn last_transport(&self) -> FakeTransport {
            let log = self.log.borrow();
            log.transports[log.transports.len() - 1].clone()
        }
    }

    impl Connector for FakeConnector {
        type Transport = FakeTransport;

        fn connect(&mut self, session: SessionId, url: &Url) -> FakeTransport {
            let transport = FakeTransport::new();
            let mut log = self.log.borrow_mut();
            log.opened.push((session, url.to_string()));
            log.transports.push(transport.clone());
            transport
        }
    }
}
