use anyhow::Result;
use tracing::{debug, warn};

use crate::model::ConnectionState;
use crate::surface::TerminalSurface;

const CLOSED_MESSAGE: &str = "\r\n\x1b[33mConnection closed.\x1b[0m\r\n";

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SocketEvent {
    Open,
    Message(Frame),
    Error(String),
    Close,
}

/// The outbound half of a socket. Inbound events arrive separately as
/// [`SocketEvent`]s and are fed to [`SessionSocket::handle`].
pub trait Transport {
    fn ready_state(&self) -> ReadyState;
    fn send(&mut self, frame: Frame) -> Result<()>;
    fn close(&mut self);
}

pub struct SessionSocket<T: Transport> {
    transport: T,
    state: ConnectionState,
    closed: bool,
}

impl<T: Transport> SessionSocket<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Connecting,
            closed: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn handle(&mut self, event: SocketEvent, surface: &mut TerminalSurface) -> ConnectionState {
        match event {
            SocketEvent::Open => self.on_open(),
            SocketEvent::Message(frame) => self.on_message(frame, surface),
            SocketEvent::Error(message) => self.on_error(&message, surface),
            SocketEvent::Close => self.on_close(surface),
        }
        self.state
    }

    pub fn on_open(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
            debug!("socket open");
        }
    }

    pub fn on_message(&mut self, frame: Frame, surface: &mut TerminalSurface) {
        match &frame {
            Frame::Text(text) => surface.write_text(text),
            Frame::Binary(bytes) => surface.write_bytes(bytes),
        }
    }

    pub fn on_error(&mut self, message: &str, surface: &mut TerminalSurface) {
        warn!(error = message, "socket error");
        self.state = ConnectionState::Error;
        surface.write_text(&format!("\r\n\x1b[31mWebSocket error: {message}\x1b[0m\r\n"));
    }

    pub fn on_close(&mut self, surface: &mut TerminalSurface) {
        if self.state != ConnectionState::Error {
            self.state = ConnectionState::Disconnected;
        }
        debug!(state = %self.state, "socket closed");
        surface.write_text(CLOSED_MESSAGE);
    }

    /// Transmits `data` as one text frame. Nothing is queued: when the
    /// socket is not open the data is dropped.
    pub fn send(&mut self, data: &str) -> bool {
        if self.state != ConnectionState::Connected
            || self.transport.ready_state() != ReadyState::Open
        {
            return false;
        }

        match self.transport.send(Frame::Text(data.to_string())) {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "socket send failed");
                false
            }
        }
    }

    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.transport.close();
        true
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::{Frame, ReadyState, SessionSocket, SocketEvent};
    use crate::model::ConnectionState;
    use crate::surface::{ContainerSize, SurfaceOptions, TerminalSurface};

    fn surface() -> TerminalSurface {
        let mut surface = TerminalSurface::new(SurfaceOptions::default());
        surface.initialize(Some(ContainerSize::new(80, 24)));
        surface
    }

    #[test]
    fn open_then_close_reaches_disconnected() {
        let mut surface = surface();
        let mut socket = SessionSocket::new(FakeTransport::new());
        assert_eq!(socket.state(), ConnectionState::Connecting);

        assert_eq!(
            socket.handle(SocketEvent::Open, &mut surface),
            ConnectionState::Connected
        );
        assert_eq!(
            socket.handle(SocketEvent::Close, &mut surface),
            ConnectionState::Disconnected
        );
        let contents = surface.screen().expect("screen").contents();
        assert!(contents.contains("Connection closed."));
    }

    #[test]
    fn close_after_error_keeps_error_state() {
        let mut surface = surface();
        let mut socket = SessionSocket::new(FakeTransport::new());
        socket.handle(SocketEvent::Error("connection refused".to_string()), &mut surface);
        assert_eq!(socket.state(), ConnectionState::Error);

        socket.handle(SocketEvent::Close, &mut surface);
        assert_eq!(socket.state(), ConnectionState::Error);
        let contents = surface.screen().expect("screen").contents();
        assert!(contents.contains("WebSocket error: connection refused"));
        assert!(contents.contains("Connection closed."));
    }

    #[test]
    fn every_frame_produces_exactly_one_write_in_order() {
        let mut surface = surface();
        let mut socket = SessionSocket::new(FakeTransport::new());
        socket.handle(SocketEvent::Open, &mut surface);

        let frames = (0..12)
            .map(|idx| {
                if idx % 2 == 0 {
                    Frame::Text(format!("line-{idx:02}\r\n"))
                } else {
                    Frame::Binary(format!("line-{idx:02}\r\n").into_bytes())
                }
            })
            .collect::<Vec<_>>();
        let before = surface.write_count();
        for frame in frames {
            socket.handle(SocketEvent::Message(frame), &mut surface);
        }
        assert_eq!(surface.write_count() - before, 12);

        let contents = surface.screen().expect("screen").contents();
        let positions = (0..12)
            .map(|idx| contents.find(&format!("line-{idx:02}")).expect("line"))
            .collect::<Vec<_>>();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn send_is_a_no_op_until_connected() {
        let mut surface = surface();
        let transport = FakeTransport::new();
        let mut socket = SessionSocket::new(transport.clone());

        assert!(!socket.send("l"));
        transport.set_ready(ReadyState::Open);
        assert!(!socket.send("l"), "state is still connecting");

        socket.handle(SocketEvent::Open, &mut surface);
        assert!(socket.send("l"));
        assert_eq!(transport.sent(), vec![Frame::Text("l".to_string())]);

        transport.set_ready(ReadyState::Closing);
        assert!(!socket.send("s"));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn send_after_disconnect_is_dropped() {
        let mut surface = surface();
        let transport = FakeTransport::new();
        transport.set_ready(ReadyState::Open);
        let mut socket = SessionSocket::new(transport.clone());
        socket.handle(SocketEvent::Open, &mut surface);
        socket.handle(SocketEvent::Close, &mut surface);

        assert!(!socket.send("exit\r"));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn close_reaches_the_transport_once() {
        let transport = FakeTransport::new();
        let mut socket = SessionSocket::new(transport.clone());
        assert!(socket.close());
        assert!(!socket.close());
        assert_eq!(transport.closes(), 1);
    }
}
