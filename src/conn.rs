//! Serial connection to the modem's AT command port.
//!
//! Handles serial I/O and reply splitting. No modem logic here; callers decide
//! what a reply means.

use std::io::{self, Read, Write};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;
use tracing::{debug, trace};

use crate::command::Command;
use crate::config::SerialConfig;
use crate::response::Response;

/// Errors from connection operations.
#[derive(Debug, Error)]
pub enum ConnError {
    /// The serial device could not be opened or configured.
    #[error("cannot open serial device {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },
    /// Serial I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Command/response channel to the modem.
///
/// Synchronous, single owner. Each [`exchange()`](Self::exchange) writes one
/// command and collects everything the modem says until it goes quiet for one
/// read timeout.
///
/// # Example
///
/// ```no_run
/// use kredit::command::Command;
/// use kredit::config::SerialConfig;
/// use kredit::conn::{ConnError, Connection};
///
/// let mut conn = Connection::open(&SerialConfig::default())?;
/// let reply = conn.exchange(&Command::Attention);
/// println!("{reply:?}");
/// # Ok::<(), ConnError>(())
/// ```
pub struct Connection<P> {
    port: P,
    read_buf: [u8; 256],
    /// Called with the encoded bytes before every write.
    on_send: Option<Box<dyn FnMut(&[u8]) + Send>>,
    /// Called with every reply after splitting.
    on_recv: Option<Box<dyn FnMut(&Response) + Send>>,
}

impl Connection<Box<dyn SerialPort>> {
    /// Open the serial device: 8N1, no flow control.
    pub fn open(config: &SerialConfig) -> Result<Self, ConnError> {
        let open_err = |source| ConnError::Open {
            device: config.device.clone(),
            source,
        };
        let mut port = serialport::new(&config.device, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(open_err)?;
        // serialport has a single timeout for both directions; the read
        // timeout is the one that defines "modem went quiet".
        if config.write_timeout > config.read_timeout {
            port.set_timeout(config.write_timeout).map_err(open_err)?;
        }
        debug!(device = %config.device, baud = config.baud_rate, "opened serial port");
        Ok(Self::from_port(port))
    }
}

impl<P: Read + Write> Connection<P> {
    /// Wrap an already-open port.
    pub fn from_port(port: P) -> Self {
        Self {
            port,
            read_buf: [0u8; 256],
            on_send: None,
            on_recv: None,
        }
    }

    /// Register a callback invoked with the raw bytes of every command.
    pub fn set_on_send(&mut self, f: impl FnMut(&[u8]) + Send + 'static) {
        self.on_send = Some(Box::new(f));
    }

    /// Register a callback invoked with every split reply.
    pub fn set_on_recv(&mut self, f: impl FnMut(&Response) + Send + 'static) {
        self.on_recv = Some(Box::new(f));
    }

    /// Send a command and collect the reply.
    ///
    /// Never fails: a write error yields whatever was read (usually nothing),
    /// a read error ends the reply. Callers inspect the returned lines.
    pub fn exchange(&mut self, cmd: &Command) -> Response {
        let wire = cmd.encode();
        if let Err(e) = self.send_raw(&wire) {
            debug!(error = %e, "write failed");
        }
        let raw = self.read_until_quiet();
        let resp = Response::parse(&raw);
        debug!(command = %String::from_utf8_lossy(&wire).trim_end(), reply = ?resp, "exchange");
        if let Some(cb) = self.on_recv.as_mut() {
            cb(&resp);
        }
        resp
    }

    /// Write raw bytes and flush.
    pub fn send_raw(&mut self, wire: &[u8]) -> Result<(), ConnError> {
        if let Some(cb) = self.on_send.as_mut() {
            cb(wire);
        }
        self.port.write_all(wire)?;
        self.port.flush()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    /// Accumulate bytes until a read returns nothing within the port timeout.
    fn read_until_quiet(&mut self) -> Vec<u8> {
        let mut raw = Vec::new();
        loop {
            match self.port.read(&mut self.read_buf) {
                Ok(0) => break,
                Ok(n) => raw.extend_from_slice(&self.read_buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if !matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                        trace!(error = %e, "read failed, treating as end of reply");
                    }
                    break;
                }
            }
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::testing::ScriptedPort;

    #[test]
    fn exchange_splits_reply() {
        let port = ScriptedPort::new().reply(b"AT+CPIN?\r", b"AT+CPIN?\r\r\n+CPIN: READY\r\n\r\nOK\r\n");
        let mut conn = Connection::from_port(port);
        let resp = conn.exchange(&Command::PinStatus);
        assert!(resp.is(&[b"+CPIN: READY", b"OK"]));
    }

    #[test]
    fn reply_arriving_in_chunks_is_joined() {
        let port = ScriptedPort::new()
            .reply_chunked(b"AT\r", &[b"AT\r\r", b"\nO", b"K\r\n"]);
        let mut conn = Connection::from_port(port);
        assert!(conn.exchange(&Command::Attention).is(&[b"OK"]));
    }

    #[test]
    fn silent_modem_gives_empty_reply() {
        let mut conn = Connection::from_port(ScriptedPort::new());
        assert!(conn.exchange(&Command::Attention).is_empty());
    }

    #[test]
    fn read_error_ends_reply_without_failing() {
        let port = ScriptedPort::new()
            .reply(b"AT\r", b"AT\r\r\nOK\r\n")
            .fail_reads();
        let mut conn = Connection::from_port(port);
        assert!(conn.exchange(&Command::Attention).is_empty());
    }

    #[test]
    fn write_error_gives_empty_reply() {
        let port = ScriptedPort::new().reply(b"AT\r", b"AT\r\r\nOK\r\n").fail_writes();
        let mut conn = Connection::from_port(port);
        assert!(conn.exchange(&Command::Attention).is_empty());
    }

    #[test]
    fn hooks_observe_traffic() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let received = Arc::new(Mutex::new(Vec::new()));

        let port = ScriptedPort::new().reply(b"AT\r", b"AT\r\r\nOK\r\n");
        let mut conn = Connection::from_port(port);
        let s = sent.clone();
        conn.set_on_send(move |wire| s.lock().unwrap().push(wire.to_vec()));
        let r = received.clone();
        conn.set_on_recv(move |resp| r.lock().unwrap().push(resp.clone()));

        conn.exchange(&Command::Attention);

        assert_eq!(*sent.lock().unwrap(), vec![b"AT\r".to_vec()]);
        assert_eq!(*received.lock().unwrap(), vec![Response::from_lines(["OK"])]);
    }
}
