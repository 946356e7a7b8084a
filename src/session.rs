//! FINS/TCP sessions.
//!
//! A [`Session`] owns one TCP connection to a PLC. It performs the node
//! address handshake, frames commands, checks that every response belongs to
//! the request just sent and keeps count of consecutive failures.
//!
//! # Error accounting
//!
//! After every command the session updates its error bookkeeping:
//!
//! - success, a closed transport or disabled accounting resets the counter
//!   and records the result as the last error;
//! - any other result increments the counter, and once it exceeds the
//!   configured threshold the result becomes [`FinsError::MaxErrorCount`];
//! - fatal results (see [`FinsError::is_fatal`]) close the transport.
//!
//! Errors detected before any I/O, such as a malformed address, bypass the
//! bookkeeping entirely.
//!
//! # Example
//!
//! ```no_run
//! use fins_engine::{Session, SessionConfig};
//!
//! let config = SessionConfig::new("192.168.1.250", 0, 0).with_error_threshold(Some(5));
//! let mut session = Session::connect(config)?;
//!
//! let cpu = session.identify()?;
//! println!("connected to {} ({})", cpu.model, cpu.version);
//!
//! let words = session.read_u16("D100", 10)?;
//! # Ok::<(), fins_engine::FinsError>(())
//! ```
//!
//! # Thread Safety
//!
//! A session is not internally synchronized. Commands block the calling
//! thread for the full round trip; share a session between threads only
//! behind a lock.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tracing::{debug, info, trace, warn};

use crate::area::PlcFamily;
use crate::command::Command;
use crate::error::{codes, FinsError, Result};
use crate::header::{FinsHeader, NodeAddress, FINS_HEADER_SIZE};
use crate::response::FinsResponse;
use crate::tcp::{self, TcpHeader, DEFAULT_FINS_PORT, HANDSHAKE_RESPONSE_SIZE, MAX_BODY_LEN, TCP_HEADER_SIZE};
use crate::transfer::TransferCapacity;

/// Default send, receive and connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait between a close and the next connect attempt.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(60);

/// Default number of consecutive errors tolerated before closing.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 10;

/// Lowest port accepted as-is; lower ports fall back to 9600.
const MIN_PORT: u16 = 1024;

/// Read size and read limit while discarding unsolicited data.
const DRAIN_CHUNK: usize = 1024;
const DRAIN_MAX_READS: usize = 64;

/// CPU unit data block layout.
const MODEL_RANGE: std::ops::Range<usize> = 0..20;
const VERSION_RANGE: std::ops::Range<usize> = 20..40;

/// Configuration for opening a FINS session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionConfig {
    /// PLC host name or IP address.
    pub host: String,
    /// PLC port. Ports outside 1024..65535 use 9600.
    pub port: u16,
    /// Address of this client. Node 0 lets the PLC assign one.
    pub local: NodeAddress,
    /// Address of the PLC. Node 0 takes the node reported by the PLC.
    pub remote: NodeAddress,
    /// Consecutive errors tolerated before the session is closed.
    /// `None` disables error accounting.
    pub error_threshold: Option<u32>,
    /// Socket send timeout.
    pub send_timeout: Duration,
    /// Socket receive timeout.
    pub recv_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Minimum time between a close and the next connect attempt.
    pub reconnect_backoff: Duration,
    /// PLC family used for area lookups until [`Session::identify`] runs.
    pub plc_family: PlcFamily,
    /// Per-message element limits.
    pub capacity: TransferCapacity,
}

impl SessionConfig {
    /// Creates a configuration with default timeouts and limits.
    ///
    /// # Arguments
    ///
    /// * `host` - PLC host name or IP address (port defaults to 9600)
    /// * `local_node` - Node number of this client, 0 for automatic assignment
    /// * `remote_node` - Node number of the PLC, 0 to use the one it reports
    ///
    /// # Example
    ///
    /// ```
    /// use fins_engine::SessionConfig;
    ///
    /// let config = SessionConfig::new("192.168.1.250", 0, 0);
    /// assert_eq!(config.effective_port(), 9600);
    /// ```
    pub fn new(host: impl Into<String>, local_node: u8, remote_node: u8) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_FINS_PORT,
            local: NodeAddress::new(0, local_node, 0),
            remote: NodeAddress::new(0, remote_node, 0),
            error_threshold: Some(DEFAULT_ERROR_THRESHOLD),
            send_timeout: DEFAULT_TIMEOUT,
            recv_timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_TIMEOUT,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            plc_family: PlcFamily::Unknown,
            capacity: TransferCapacity::default(),
        }
    }

    /// Sets a custom PLC port (default is 9600).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the full local network/node/unit address.
    pub fn with_local_address(mut self, local: NodeAddress) -> Self {
        self.local = local;
        self
    }

    /// Sets the full remote network/node/unit address.
    pub fn with_remote_address(mut self, remote: NodeAddress) -> Self {
        self.remote = remote;
        self
    }

    /// Sets the error threshold. `None` disables error accounting.
    pub fn with_error_threshold(mut self, threshold: Option<u32>) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Sets the send timeout (default is 10 seconds).
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Sets the receive timeout (default is 10 seconds).
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Sets the connect timeout (default is 10 seconds).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the reconnect back-off (default is 60 seconds).
    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Fixes the PLC family instead of learning it from the PLC.
    pub fn with_plc_family(mut self, family: PlcFamily) -> Self {
        self.plc_family = family;
        self
    }

    /// Sets the per-message element limits.
    pub fn with_capacity(mut self, capacity: TransferCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Port actually used for connecting.
    ///
    /// ```
    /// use fins_engine::SessionConfig;
    ///
    /// assert_eq!(SessionConfig::new("plc", 0, 0).with_port(80).effective_port(), 9600);
    /// assert_eq!(SessionConfig::new("plc", 0, 0).with_port(9601).effective_port(), 9601);
    /// ```
    pub fn effective_port(&self) -> u16 {
        if self.port < MIN_PORT || self.port == u16::MAX {
            DEFAULT_FINS_PORT
        } else {
            self.port
        }
    }
}

/// Identification returned by the CPU unit data read command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpuUnitData {
    /// CPU unit model, for example `CJ2M-CPU31`.
    pub model: String,
    /// CPU unit version.
    pub version: String,
    /// Family derived from the model.
    pub family: PlcFamily,
}

impl CpuUnitData {
    /// Parses the data following the end code.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::BodyTooShort` if model and version are not both present.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < VERSION_RANGE.end {
            return Err(FinsError::BodyTooShort);
        }
        let model = text_field(&data[MODEL_RANGE]);
        let family = PlcFamily::from_model(&model);
        Ok(Self {
            version: text_field(&data[VERSION_RANGE]),
            model,
            family,
        })
    }
}

/// Decodes a fixed width ASCII field padded with spaces or NULs.
fn text_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// A FINS/TCP session with one PLC.
pub struct Session {
    config: SessionConfig,
    stream: Option<TcpStream>,
    peer: Option<SocketAddr>,
    local: NodeAddress,
    remote: NodeAddress,
    sid: u8,
    error_count: u32,
    last_error: u16,
    error_changed: bool,
    family: PlcFamily,
    next_connect_at: Option<Instant>,
}

impl Session {
    /// Creates an unconnected session. Use [`reconnect`](Self::reconnect)
    /// to open it.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            local: config.local,
            remote: config.remote,
            family: config.plc_family,
            config,
            stream: None,
            peer: None,
            sid: 0,
            error_count: 0,
            last_error: codes::SUCCESS,
            error_changed: false,
            next_connect_at: None,
        }
    }

    /// Opens a session: connects and performs the node address handshake.
    ///
    /// # Errors
    ///
    /// - `FinsError::InvalidAddress` if the host is empty
    /// - `FinsError::InvalidIpAddress` if the host cannot be resolved
    /// - `FinsError::Transport` if the PLC rejects the handshake
    /// - `FinsError::Io` for socket level failures
    pub fn connect(config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(config);
        session.open()?;
        Ok(session)
    }

    /// Reopens a closed session.
    ///
    /// Does nothing if the session is connected.
    ///
    /// # Errors
    ///
    /// Returns `FinsError::TryLater` if the reconnect back-off that started
    /// when the session was last closed has not elapsed, and otherwise the
    /// errors of [`connect`](Self::connect).
    pub fn reconnect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        if let Some(at) = self.next_connect_at {
            let now = Instant::now();
            if now < at {
                return Err(FinsError::TryLater {
                    retry_in: at - now,
                });
            }
        }
        self.open().inspect_err(|_| {
            self.next_connect_at = Some(Instant::now() + self.config.reconnect_backoff);
        })
    }

    /// Closes the session. Closing a closed session does nothing.
    ///
    /// The socket is closed without lingering, so this call does not block
    /// on unsent data.
    pub fn disconnect(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };

        let socket = SockRef::from(&stream);
        if let Err(e) = socket.set_linger(None) {
            trace!(error = %e, "failed to clear linger");
        }
        // no timeouts while closing
        if let Err(e) = socket.set_read_timeout(None) {
            trace!(error = %e, "failed to clear receive timeout");
        }
        if let Err(e) = socket.set_write_timeout(None) {
            trace!(error = %e, "failed to clear send timeout");
        }
        drop(stream);

        self.error_count = 0;
        self.next_connect_at = Some(Instant::now() + self.config.reconnect_backoff);
        info!(peer = ?self.peer, "FINS session closed");
    }

    fn open(&mut self) -> Result<()> {
        let host = self.config.host.trim();
        if host.is_empty() {
            return Err(FinsError::invalid_address("", "no PLC host given"));
        }

        let port = self.config.effective_port();
        let peer = (host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| FinsError::InvalidIpAddress {
                host: host.to_string(),
            })?;

        let mut stream = open_stream(peer, &self.config)?;
        let nodes = handshake(&mut stream, self.config.recv_timeout)?;

        // an automatic client node takes the number assigned by the PLC
        self.local = NodeAddress {
            node: nodes.client_node,
            ..self.config.local
        };
        self.remote = NodeAddress {
            node: nodes.server_node,
            ..self.config.remote
        };
        self.stream = Some(stream);
        self.peer = Some(peer);
        self.error_count = 0;

        info!(
            %peer,
            client_node = nodes.client_node,
            server_node = nodes.server_node,
            "FINS session opened"
        );
        Ok(())
    }

    /// Sends a command and returns the validated response.
    ///
    /// The service ID is stamped into the header and advanced. The response
    /// must mirror the request, otherwise unread data is discarded and
    /// `FinsError::SyncError` is returned. A non-zero end code is returned as
    /// `FinsError::PlcError`. Every outcome except local precondition
    /// failures passes through the error accounting.
    ///
    /// # Errors
    ///
    /// - `FinsError::BodyTooLong` if the body exceeds 2000 bytes (no I/O)
    /// - `FinsError::NotConnected` if the session is closed
    /// - transport, correlation and PLC errors as described in [`FinsError`]
    pub fn execute(&mut self, command: &Command) -> Result<FinsResponse> {
        if command.body.len() > MAX_BODY_LEN {
            return Err(FinsError::BodyTooLong {
                length: command.body.len(),
            });
        }
        let result = self.transact(command);
        self.account(result)
    }

    /// Sends a raw command and returns the data following the end code.
    ///
    /// ```no_run
    /// use fins_engine::{Session, SessionConfig};
    ///
    /// let mut session = Session::connect(SessionConfig::new("192.168.1.250", 0, 0))?;
    /// // Clock read
    /// let clock = session.send_command(0x07, 0x01, &[])?;
    /// # Ok::<(), fins_engine::FinsError>(())
    /// ```
    pub fn send_command(&mut self, mrc: u8, src: u8, body: &[u8]) -> Result<Vec<u8>> {
        let response = self.execute(&Command::new(mrc, src, body.to_vec()))?;
        Ok(response.data)
    }

    /// Reads the CPU unit data and sets the PLC family from the model.
    pub fn identify(&mut self) -> Result<CpuUnitData> {
        let response = self.execute(&Command::cpu_unit_data_read())?;
        let cpu = CpuUnitData::from_bytes(&response.data)?;
        debug!(model = %cpu.model, version = %cpu.version, family = ?cpu.family, "CPU identified");
        self.family = cpu.family;
        Ok(cpu)
    }

    fn next_sid(&mut self) -> u8 {
        let sid = self.sid;
        self.sid = self.sid.wrapping_add(1);
        sid
    }

    fn transact(&mut self, command: &Command) -> Result<FinsResponse> {
        if self.stream.is_none() {
            return Err(FinsError::NotConnected);
        }
        let sid = self.next_sid();
        let request = FinsHeader::new_command(self.remote, self.local, sid, command.mrc, command.src);
        let recv_timeout = self.config.recv_timeout;
        let stream = self.stream.as_mut().ok_or(FinsError::NotConnected)?;

        debug!(
            mrc = command.mrc,
            src = command.src,
            sid,
            body_len = command.body.len(),
            "sending FINS command"
        );

        let wrapper = TcpHeader::frame(FINS_HEADER_SIZE + command.body.len()).to_bytes();
        send(stream, &wrapper, FinsError::HeaderSend)?;

        let mut frame = Vec::with_capacity(FINS_HEADER_SIZE + command.body.len());
        frame.extend_from_slice(&request.to_bytes());
        frame.extend_from_slice(&command.body);
        trace!(frame = ?frame, "request frame");
        send(stream, &frame, FinsError::CommandSend)?;

        let deadline = Instant::now() + recv_timeout;
        let mut wrapper = [0u8; TCP_HEADER_SIZE];
        if tcp::recv_full(stream, &mut wrapper, deadline)? < TCP_HEADER_SIZE {
            return Err(FinsError::ResponseHeaderIncomplete);
        }
        let length = match TcpHeader::from_bytes(&wrapper).payload_len() {
            Ok(length) => length,
            Err(err) => {
                let drained = drain(stream);
                warn!(sid, error = %err, drained, "unusable response wrapper");
                return Err(err);
            }
        };

        let mut frame = vec![0u8; length];
        if tcp::recv_full(stream, &mut frame, deadline)? < length {
            return Err(FinsError::ResponseIncomplete);
        }
        trace!(frame = ?frame, "response frame");

        let header = FinsHeader::from_bytes(&frame)?;
        if !header.is_response_to(&request) {
            let drained = drain(stream);
            warn!(
                sid,
                received_sid = header.sid,
                drained,
                "response does not match request"
            );
            return Err(FinsError::SyncError);
        }

        let response = FinsResponse::from_bytes(&frame)?;
        response.check_error()?;
        Ok(response)
    }

    fn account<T>(&mut self, result: Result<T>) -> Result<T> {
        let err = match result {
            Err(err) if !err.is_local() => err,
            other => {
                if other.is_ok() {
                    self.record(codes::SUCCESS);
                }
                return other;
            }
        };

        let threshold = match self.config.error_threshold {
            Some(threshold) if self.stream.is_some() => threshold,
            _ => {
                self.record(err.code());
                return Err(self.close_if_fatal(err));
            }
        };

        self.error_count += 1;
        let err = if self.error_count > threshold {
            FinsError::MaxErrorCount
        } else {
            err
        };
        // a forced close is reported through the last error
        if err.is_fatal() {
            self.record(err.code());
        }
        Err(self.close_if_fatal(err))
    }

    fn record(&mut self, code: u16) {
        self.error_count = 0;
        self.error_changed = code != self.last_error;
        self.last_error = code;
    }

    fn close_if_fatal(&mut self, err: FinsError) -> FinsError {
        if err.is_fatal() && self.stream.is_some() {
            warn!(error = %err, code = err.code(), "closing FINS session");
            self.disconnect();
        }
        err
    }

    /// Whether the transport is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// The configuration the session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Socket address of the PLC, once connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Address of this client, with the node assigned in the handshake.
    pub fn local_address(&self) -> NodeAddress {
        self.local
    }

    /// Address of the PLC, with the node reported in the handshake.
    pub fn remote_address(&self) -> NodeAddress {
        self.remote
    }

    /// Service ID the next command will carry.
    pub fn next_service_id(&self) -> u8 {
        self.sid
    }

    /// Consecutive failed commands.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Result code recorded by the last reset of the error counter.
    pub fn last_error(&self) -> u16 {
        self.last_error
    }

    /// Whether the last recorded result differs from the one before it.
    pub fn error_changed(&self) -> bool {
        self.error_changed
    }

    /// PLC family used for area lookups.
    pub fn plc_family(&self) -> PlcFamily {
        self.family
    }

    /// Overrides the PLC family.
    pub fn set_plc_family(&mut self, family: PlcFamily) {
        self.family = family;
    }

    /// Per-message element limits.
    pub fn capacity(&self) -> TransferCapacity {
        self.config.capacity
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.peer)
            .field("connected", &self.is_connected())
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("family", &self.family)
            .field("error_count", &self.error_count)
            .finish()
    }
}

fn open_stream(peer: SocketAddr, config: &SessionConfig) -> Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(peer), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_keepalive(true)?;
    socket.set_write_timeout(Some(config.send_timeout))?;
    socket.set_read_timeout(Some(config.recv_timeout))?;

    let any: SocketAddr = if peer.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    socket.bind(&any.into())?;
    socket.connect_timeout(&peer.into(), config.connect_timeout)?;
    Ok(socket.into())
}

fn handshake(stream: &mut TcpStream, recv_timeout: Duration) -> Result<tcp::NodeAssignment> {
    send(stream, &tcp::handshake_request(0), FinsError::HeaderSend)?;

    let mut response = [0u8; HANDSHAKE_RESPONSE_SIZE];
    let deadline = Instant::now() + recv_timeout;
    if tcp::recv_full(stream, &mut response, deadline)? < HANDSHAKE_RESPONSE_SIZE {
        return Err(FinsError::ResponseHeaderIncomplete);
    }
    tcp::parse_handshake_response(&response).inspect_err(|err| {
        warn!(error = %err, "FINS handshake rejected");
    })
}

/// Writes `bytes` completely. A write that makes no progress becomes `short`.
fn send(stream: &mut TcpStream, bytes: &[u8], short: FinsError) -> Result<()> {
    match stream.write_all(bytes) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::WriteZero => Err(short),
        Err(e) => Err(e.into()),
    }
}

/// Discards whatever the PLC has already sent. Returns the byte count.
fn drain(stream: &mut TcpStream) -> usize {
    if stream.set_nonblocking(true).is_err() {
        return 0;
    }
    let mut waste = [0u8; DRAIN_CHUNK];
    let mut total = 0;
    for _ in 0..DRAIN_MAX_READS {
        match stream.read(&mut waste) {
            Ok(0) | Err(_) => break,
            Ok(n) => total += n,
        }
    }
    if let Err(e) = stream.set_nonblocking(false) {
        trace!(error = %e, "failed to restore blocking mode");
    }
    total
}
