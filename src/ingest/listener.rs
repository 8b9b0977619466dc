//! Blocking line listeners that feed the ingest session.

use crate::config::ListenerConfig;
use crate::worker::CancelToken;
use anyhow::Context;
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

/// Source of decoded text lines
///
/// `listen` runs on a worker thread and blocks for as long as the source
/// is alive. It must call `on_line` once per message, in arrival order,
/// and return once `cancel` is set.
pub trait Listener: Send + 'static {
    fn listen(
        &mut self,
        on_line: &mut dyn FnMut(String),
        cancel: &CancelToken,
    ) -> anyhow::Result<()>;
}

/// Newline-framed TCP listener
///
/// Serves one peer at a time; when a peer disconnects it goes back to
/// accepting. Cancellation is checked between accept polls and whenever a
/// read times out.
pub struct TcpLineListener {
    host: String,
    port: u16,
    socket: Option<TcpListener>,
    poll_interval: Duration,
    read_timeout: Duration,
    max_line_bytes: usize,
}

impl TcpLineListener {
    /// Listener that binds lazily when `listen` starts
    pub fn new(config: &ListenerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            socket: None,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            max_line_bytes: config.max_line_bytes,
        }
    }

    /// Listener on an already bound socket
    pub fn from_socket(socket: TcpListener, config: &ListenerConfig) -> std::io::Result<Self> {
        let addr = socket.local_addr()?;
        let mut listener = Self::new(config);
        listener.host = addr.ip().to_string();
        listener.port = addr.port();
        listener.socket = Some(socket);
        Ok(listener)
    }

    fn acquire(&mut self) -> anyhow::Result<(TcpListener, SocketAddr)> {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => TcpListener::bind((self.host.as_str(), self.port))
                .with_context(|| format!("Failed to bind {}:{}", self.host, self.port))?,
        };
        socket
            .set_nonblocking(true)
            .context("Failed to make listener non-blocking")?;
        let addr = socket.local_addr().context("Listener has no local address")?;
        Ok((socket, addr))
    }

    fn serve(
        &self,
        mut stream: TcpStream,
        on_line: &mut dyn FnMut(String),
        cancel: &CancelToken,
    ) -> anyhow::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.read_timeout))?;

        let mut framer = LineFramer::new(self.max_line_bytes);
        let mut buf = [0u8; 4096];

        while !cancel.is_cancelled() {
            match stream.read(&mut buf) {
                Ok(0) => {
                    framer.finish(on_line);
                    return Ok(());
                }
                Ok(n) => framer.push(&buf[..n], on_line),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::warn!("Peer connection lost: {}", e);
                    framer.finish(on_line);
                    return Ok(());
                }
                Err(e) => return Err(e).context("Failed to read from peer"),
            }
        }
        Ok(())
    }
}

impl Listener for TcpLineListener {
    fn listen(
        &mut self,
        on_line: &mut dyn FnMut(String),
        cancel: &CancelToken,
    ) -> anyhow::Result<()> {
        let (socket, addr) = self.acquire()?;
        tracing::info!(%addr, "Listening for instrument connections");

        while !cancel.is_cancelled() {
            match socket.accept() {
                Ok((stream, peer)) => {
                    tracing::info!(%peer, "Instrument connected");
                    self.serve(stream, on_line, cancel)?;
                    tracing::info!(%peer, "Instrument disconnected");
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(self.poll_interval)
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e).context("Failed to accept connection"),
            }
        }

        tracing::info!(%addr, "Listener cancelled");
        Ok(())
    }
}

/// Splits a byte stream on `\n`, dropping `\r` and empty lines
///
/// A line longer than `max_line_bytes` is dropped whole; framing picks up
/// again after its terminating newline.
#[derive(Debug)]
struct LineFramer {
    pending: Vec<u8>,
    max_line_bytes: usize,
    discarding: bool,
}

impl LineFramer {
    fn new(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    fn push(&mut self, bytes: &[u8], on_line: &mut dyn FnMut(String)) {
        for &byte in bytes {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                } else {
                    self.emit(on_line);
                }
            } else if !self.discarding {
                if self.pending.len() >= self.max_line_bytes {
                    tracing::warn!(
                        limit = self.max_line_bytes,
                        "Line exceeds size limit, dropping it"
                    );
                    self.pending = Vec::new();
                    self.discarding = true;
                } else {
                    self.pending.push(byte);
                }
            }
        }
    }

    /// Flush a trailing line that had no terminator
    fn finish(&mut self, on_line: &mut dyn FnMut(String)) {
        if self.discarding {
            self.discarding = false;
        } else {
            self.emit(on_line);
        }
    }

    fn emit(&mut self, on_line: &mut dyn FnMut(String)) {
        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches('\r')
            .to_string();
        self.pending.clear();
        if !line.trim().is_empty() {
            on_line(line);
        }
    }
}
