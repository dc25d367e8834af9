//! Poll-driven TCP server for throttle apps.
//!
//! The server never blocks: each [`ThrottleServer::poll`] accepts pending
//! connections, reads whatever bytes each client has sent, decodes
//! complete lines through the shared [`ThrottleProtocol`] and writes the
//! replies back to the sender. Call it once per main-loop tick.
//!
//! When all slots are taken, a new connection is accepted and closed
//! straight away.
//!
//! Replies a client is not ready to take stay queued on that client, and
//! its input is not read again until the queue has drained.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};

use tracing::{debug, info, trace, warn};

use crate::config::ThrottleServerConfig;
use crate::withrottle::{LineBuffer, ThrottleProtocol, LINE_BUFFER_SIZE};

struct ThrottleClient {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: LineBuffer,
    pending: Vec<u8>,
}

impl ThrottleClient {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            buffer: LineBuffer::new(),
            pending: Vec::new(),
        }
    }

    /// Flush, then read until input runs dry or output backs up.
    /// Returns `false` once the client is gone.
    fn service(&mut self, protocol: &mut ThrottleProtocol) -> bool {
        if !self.flush() {
            return false;
        }
        let mut chunk = [0u8; LINE_BUFFER_SIZE];
        while self.pending.is_empty() {
            match self.stream.read(&mut chunk) {
                Ok(0) => return false,
                Ok(n) => {
                    for &byte in &chunk[..n] {
                        if let Some(line) = self.buffer.push(byte) {
                            if !self.answer(&line, protocol) {
                                return false;
                            }
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return true,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(peer = %self.peer, error = %e, "throttle read failed");
                    return false;
                }
            }
        }
        true
    }

    fn answer(&mut self, line: &[u8], protocol: &mut ThrottleProtocol) -> bool {
        debug!(peer = %self.peer, line = %String::from_utf8_lossy(line).trim_end(), "throttle line");
        let mut reply = String::new();
        protocol.handle_line(line, &mut reply);
        self.pending.extend_from_slice(reply.as_bytes());
        self.flush()
    }

    /// Write queued output. Returns `false` once the client is gone.
    fn flush(&mut self) -> bool {
        while !self.pending.is_empty() {
            match self.stream.write(&self.pending) {
                Ok(0) => return false,
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    trace!(peer = %self.peer, queued = self.pending.len(), "throttle client busy");
                    return true;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!(peer = %self.peer, error = %e, "throttle write failed");
                    return false;
                }
            }
        }
        true
    }
}

/// Non-blocking multi-client throttle server.
pub struct ThrottleServer {
    listener: TcpListener,
    clients: Vec<Option<ThrottleClient>>,
}

impl ThrottleServer {
    /// Bind to `addr` with room for `max_clients` concurrent clients.
    pub fn bind(addr: impl ToSocketAddrs, max_clients: usize) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let mut clients = Vec::with_capacity(max_clients);
        clients.resize_with(max_clients, || None);
        info!(addr = %listener.local_addr()?, max_clients, "throttle server listening");
        Ok(Self { listener, clients })
    }

    /// Bind on all interfaces using `config`.
    pub fn from_config(config: &ThrottleServerConfig) -> io::Result<Self> {
        Self::bind(("0.0.0.0", config.port), config.max_clients)
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.iter().filter(|c| c.is_some()).count()
    }

    /// Accept, read and answer. Disconnected clients free their slot.
    pub fn poll(&mut self, protocol: &mut ThrottleProtocol) -> io::Result<()> {
        self.accept_pending()?;
        for slot in self.clients.iter_mut() {
            let Some(client) = slot else {
                continue;
            };
            if !client.service(protocol) {
                info!(peer = %client.peer, "throttle client disconnected");
                *slot = None;
            }
        }
        Ok(())
    }

    fn accept_pending(&mut self) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let Some(slot) = self.clients.iter_mut().find(|c| c.is_none()) else {
                warn!(%peer, "throttle server full, rejecting client");
                let _ = stream.shutdown(Shutdown::Both);
                continue;
            };
            stream.set_nonblocking(true)?;
            stream.set_nodelay(true)?;
            info!(%peer, "throttle client connected");
            *slot = Some(ThrottleClient::new(stream, peer));
        }
    }
}

impl core::fmt::Debug for ThrottleServer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThrottleServer")
            .field("addr", &self.listener.local_addr().ok())
            .field("clients", &self.client_count())
            .field("slots", &self.clients.len())
            .finish()
    }
}
