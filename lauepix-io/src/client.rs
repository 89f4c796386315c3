//! Backend channel client.
//!
//! One worker thread owns the WebSocket. It connects, registers this console,
//! then alternates between writing queued outgoing frames and reading with a
//! short timeout. When the connection drops or cannot be made, the worker
//! waits the configured delay and tries again, forever.
//!
//! Outgoing frames are only accepted while a connection is up. Frames still
//! queued when the connection drops are discarded with it; frames queued
//! before a shutdown are written before the socket is closed.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lauepix_core::{ChannelMessage, Command, Inbound, Transport};
use tungstenite::client::IntoClientRequest;
use tungstenite::error::UrlError;
use tungstenite::http::Uri;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{HandshakeError, Message, WebSocket};

use crate::config::ChannelConfig;
use crate::error::Result;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// What the worker reports to the owner of the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Connected and registered.
    Connected,
    /// An established connection was lost.
    Disconnected(String),
    /// A connection attempt failed; another follows after the reconnect delay.
    ConnectFailed(String),
    /// A decoded message for this console.
    Message(Box<Inbound>),
}

/// Cloneable sending side of the channel.
#[derive(Clone, Debug, Default)]
pub struct ChannelHandle {
    outbox: Arc<Mutex<Option<Sender<String>>>>,
}

impl ChannelHandle {
    /// Whether a connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.outbox.lock().map(|o| o.is_some()).unwrap_or(false)
    }

    fn attach(&self, sender: Sender<String>) {
        if let Ok(mut outbox) = self.outbox.lock() {
            *outbox = Some(sender);
        }
    }

    fn detach(&self) {
        if let Ok(mut outbox) = self.outbox.lock() {
            *outbox = None;
        }
    }
}

impl Transport for ChannelHandle {
    fn send(&self, message: &ChannelMessage) -> lauepix_core::Result<()> {
        let text = message.to_text()?;
        let outbox = self
            .outbox
            .lock()
            .map_err(|_| lauepix_core::Error::NotConnected)?;
        match outbox.as_ref() {
            Some(sender) => sender
                .send(text)
                .map_err(|_| lauepix_core::Error::NotConnected),
            None => Err(lauepix_core::Error::NotConnected),
        }
    }
}

/// Running channel client. Dropping it stops and joins the worker.
pub struct ChannelClient {
    handle: ChannelHandle,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ChannelClient {
    /// Start the worker thread.
    ///
    /// Events are converted with `From<ChannelEvent>` so the caller can
    /// receive them on its own message channel. The worker exits on its own
    /// once the receiving side of `events` is gone.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn spawn<T>(config: ChannelConfig, events: Sender<T>) -> Result<Self>
    where
        T: From<ChannelEvent> + Send + 'static,
    {
        let handle = ChannelHandle::default();
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let handle = handle.clone();
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("lauepix-channel".to_string())
                .spawn(move || run_worker(&config, &handle, &shutdown, &events))?
        };

        Ok(Self {
            handle,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Sending side, usable as a [`Transport`].
    #[must_use]
    pub fn handle(&self) -> ChannelHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Stop the worker and wait for it.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("channel worker panicked");
            }
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<T: From<ChannelEvent>>(
    config: &ChannelConfig,
    handle: &ChannelHandle,
    shutdown: &AtomicBool,
    events: &Sender<T>,
) {
    let emit = |event: ChannelEvent| events.send(T::from(event)).is_ok();

    while !shutdown.load(Ordering::SeqCst) {
        log::debug!("connecting to {}", config.url);
        let keep_going = match connect(config) {
            Ok(mut socket) => {
                let (sender, outgoing) = channel();
                handle.attach(sender);
                log::info!("connected to {}", config.url);

                let reason = if emit(ChannelEvent::Connected) {
                    pump(&mut socket, &outgoing, shutdown, &emit)
                } else {
                    None
                };
                handle.detach();
                let _ = socket.close(None);
                let _ = socket.flush();

                match reason {
                    Some(reason) => {
                        log::warn!("connection to {} lost: {reason}", config.url);
                        emit(ChannelEvent::Disconnected(reason))
                    }
                    None => false,
                }
            }
            Err(e) => {
                log::warn!("could not connect to {}: {e}", config.url);
                emit(ChannelEvent::ConnectFailed(e.to_string()))
            }
        };
        if !keep_going {
            break;
        }
        wait(config.reconnect_delay, config.poll_interval, shutdown);
    }
    log::debug!("channel worker stopped");
}

/// Open the socket, register, and arm the read timeout.
fn connect(config: &ChannelConfig) -> Result<Socket> {
    let request = config.url.as_str().into_client_request()?;
    if request.uri().scheme_str() == Some("wss") {
        return Err(tungstenite::Error::Url(UrlError::TlsFeatureNotEnabled).into());
    }
    let stream = open_stream(request.uri(), config.connect_timeout)?;
    stream.set_read_timeout(Some(config.connect_timeout))?;
    stream.set_write_timeout(Some(config.connect_timeout))?;

    let (mut socket, _response) = match tungstenite::client(request, MaybeTlsStream::Plain(stream))
    {
        Ok(connected) => connected,
        Err(HandshakeError::Failure(e)) => return Err(e.into()),
        Err(HandshakeError::Interrupted(_)) => {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "handshake timed out").into())
        }
    };
    if let MaybeTlsStream::Plain(stream) = socket.get_mut() {
        stream.set_read_timeout(Some(config.poll_interval))?;
        stream.set_write_timeout(None)?;
    }

    let register = Command::RecordConnection {
        id: config.client_id.clone(),
    }
    .to_message()
    .to_text()
    .map_err(lauepix_core::Error::from)?;
    socket.send(Message::Text(register))?;
    Ok(socket)
}

/// Resolve the URL's host and open a TCP stream, giving each address at most
/// `timeout`.
fn open_stream(uri: &Uri, timeout: Duration) -> Result<TcpStream> {
    let host = uri
        .host()
        .ok_or(tungstenite::Error::Url(UrlError::NoHostName))?
        .trim_start_matches('[')
        .trim_end_matches(']');
    let port = uri.port_u16().unwrap_or(80);

    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                log::debug!("connect to {addr} failed: {e}");
                last_error = Some(e);
            }
        }
    }
    Err(match last_error {
        Some(e) => e.into(),
        None => tungstenite::Error::Url(UrlError::UnableToConnect(uri.to_string())).into(),
    })
}

/// Move traffic until the connection ends.
///
/// Returns the reason the connection was lost, or `None` when the worker was
/// asked to stop.
fn pump(
    socket: &mut Socket,
    outgoing: &Receiver<String>,
    shutdown: &AtomicBool,
    emit: &impl Fn(ChannelEvent) -> bool,
) -> Option<String> {
    loop {
        if let Err(e) = flush_outgoing(socket, outgoing) {
            return Some(e.to_string());
        }

        if shutdown.load(Ordering::SeqCst) {
            // frames queued before shutdown was requested still go out
            if let Err(e) = flush_outgoing(socket, outgoing) {
                log::warn!("could not flush outgoing frames on shutdown: {e}");
            }
            return None;
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if let Some(inbound) = decode(&text) {
                    if !emit(ChannelEvent::Message(Box::new(inbound))) {
                        return None;
                    }
                }
            }
            Ok(Message::Close(_)) => return Some("closed by server".to_string()),
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => return Some(e.to_string()),
        }
    }
}

/// Write every frame queued so far.
fn flush_outgoing(socket: &mut Socket, outgoing: &Receiver<String>) -> tungstenite::Result<()> {
    while let Ok(text) = outgoing.try_recv() {
        socket.send(Message::Text(text))?;
    }
    Ok(())
}

fn decode(text: &str) -> Option<Inbound> {
    match Inbound::decode(text) {
        Ok(Some(inbound)) => Some(inbound),
        Ok(None) => {
            log::trace!("ignoring message for another channel");
            None
        }
        Err(e) => {
            log::warn!("dropping message: {e}");
            None
        }
    }
}

/// Sleep for `delay`, waking every `slice` to honour shutdown.
fn wait(delay: Duration, slice: Duration, shutdown: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(slice.min(deadline - now));
    }
}
