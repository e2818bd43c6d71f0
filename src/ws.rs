use anyhow::Result;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::session::{Connector, SessionId};
use crate::socket::{Frame, ReadyState, SocketEvent, Transport};

const STATE_CONNECTING: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_CLOSING: u8 = 2;
const STATE_CLOSED: u8 = 3;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SocketEnvelope {
    pub session: SessionId,
    pub event: SocketEvent,
}

#[derive(Debug)]
enum Outbound {
    Frame(Frame),
    Close,
}

#[derive(Debug, Clone)]
pub struct WsConnector {
    events: mpsc::UnboundedSender<SocketEnvelope>,
}

impl WsConnector {
    pub fn new(events: mpsc::UnboundedSender<SocketEnvelope>) -> Self {
        Self { events }
    }
}

impl Connector for WsConnector {
    type Transport = WsTransport;

    fn connect(&mut self, session: SessionId, url: &Url) -> WsTransport {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let state = Arc::new(AtomicU8::new(STATE_CONNECTING));
        info!(session, url = %url, "opening socket");
        tokio::spawn(drive_socket(
            session,
            url.to_string(),
            outbound_rx,
            state.clone(),
            self.events.clone(),
        ));
        WsTransport {
            outbound: outbound_tx,
            state,
        }
    }
}

pub struct WsTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
    state: Arc<AtomicU8>,
}

impl Transport for WsTransport {
    fn ready_state(&self) -> ReadyState {
        match self.state.load(Ordering::Acquire) {
            STATE_CONNECTING => ReadyState::Connecting,
            STATE_OPEN => ReadyState::Open,
            STATE_CLOSING => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }

    fn send(&mut self, frame: Frame) -> Result<()> {
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| anyhow::anyhow!("socket task has already exited"))
    }

    fn close(&mut self) {
        if self.state.load(Ordering::Acquire) < STATE_CLOSING {
            self.state.store(STATE_CLOSING, Ordering::Release);
        }
        let _ = self.outbound.send(Outbound::Close);
    }
}

async fn drive_socket(
    session: SessionId,
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<AtomicU8>,
    events: mpsc::UnboundedSender<SocketEnvelope>,
) {
    let emit = |event: SocketEvent| {
        let _ = events.send(SocketEnvelope { session, event });
    };

    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = outbound.recv() => {
            debug!(session, "socket closed before the handshake completed");
            state.store(STATE_CLOSED, Ordering::Release);
            emit(SocketEvent::Close);
            return;
        }
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(error) => {
            warn!(session, error = %error, "socket handshake failed");
            state.store(STATE_CLOSED, Ordering::Release);
            emit(SocketEvent::Error(error.to_string()));
            emit(SocketEvent::Close);
            return;
        }
    };

    state.store(STATE_OPEN, Ordering::Release);
    emit(SocketEvent::Open);

    let (mut sink, mut source) = stream.split();
    let mut failure = None;
    loop {
        tokio::select! {
            inbound = source.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    emit(SocketEvent::Message(Frame::Text(text.to_string())));
                }
                Some(Ok(Message::Binary(data))) => {
                    emit(SocketEvent::Message(Frame::Binary(data.to_vec())));
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    failure = Some(error.to_string());
                    break;
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => {
                    let message = match frame {
                        Frame::Text(text) => Message::text(text),
                        Frame::Binary(data) => Message::binary(data),
                    };
                    if let Err(error) = sink.send(message).await {
                        failure = Some(error.to_string());
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    state.store(STATE_CLOSING, Ordering::Release);
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    state.store(STATE_CLOSED, Ordering::Release);
    if let Some(error) = failure {
        warn!(session, error = %error, "socket failed");
        emit(SocketEvent::Error(error));
    }
    debug!(session, "socket task finished");
    emit(SocketEvent::Close);
}

#[cfg(test)]
mod tests {
    use super::{SocketEnvelope, WsConnector};
    use crate::session::Connector;
    use crate::socket::{Frame, ReadyState, SocketEvent, Transport};
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;
    use url::Url;

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SocketEnvelope>) -> SocketEnvelope {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("socket event in time")
            .expect("event channel open")
    }

    #[tokio::test]
    async fn loopback_session_delivers_frames_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(tcp).await.expect("handshake");
            ws.send(Message::text("hello\r\n")).await.expect("text");
            ws.send(Message::binary(vec![0x1b, b'[', b'H'])).await.expect("binary");
            let received = loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => break text.to_string(),
                    Some(Ok(_)) => continue,
                    other => panic!("unexpected {other:?}"),
                }
            };
            ws.close(None).await.expect("close");
            received
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut connector = WsConnector::new(tx);
        let url = Url::parse(&format!("ws://{addr}/api/v1/kube/exec?context=a&namespace=b&pod=c"))
            .expect("url");
        let mut transport = connector.connect(7, &url);

        assert_eq!(next_event(&mut rx).await.event, SocketEvent::Open);
        assert_eq!(transport.ready_state(), ReadyState::Open);
        assert_eq!(
            next_event(&mut rx).await.event,
            SocketEvent::Message(Frame::Text("hello\r\n".to_string()))
        );
        assert_eq!(
            next_event(&mut rx).await.event,
            SocketEvent::Message(Frame::Binary(vec![0x1b, b'[', b'H']))
        );

        transport.send(Frame::Text("l".to_string())).expect("send");
        assert_eq!(server.await.expect("server"), "l");

        let closed = next_event(&mut rx).await;
        assert_eq!(closed.session, 7);
        assert_eq!(closed.event, SocketEvent::Close);
        assert_eq!(transport.ready_state(), ReadyState::Closed);
    }

    #[tokio::test]
    async fn refused_connection_reports_error_then_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut connector = WsConnector::new(tx);
        let url = Url::parse(&format!("ws://{addr}/api/v1/kube/logs")).expect("url");
        let transport = connector.connect(3, &url);

        assert!(matches!(next_event(&mut rx).await.event, SocketEvent::Error(_)));
        assert_eq!(next_event(&mut rx).await.event, SocketEvent::Close);
        assert_eq!(transport.ready_state(), ReadyState::Closed);
    }
}
