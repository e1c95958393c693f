//! Modem driver: atomic checks and composite initialization.
//!
//! Two layers:
//!
//! 1. **Checks**: one AT command each, reply compared byte for byte against
//!    the known-good response. A check reports `false` (or `None` for the
//!    message count) on any other reply; it never errors.
//! 2. **Composites**: [`Modem::init_cellular`] and [`Modem::init_sms`] poll
//!    each check in order within a [`Budget`], so a modem that is still
//!    settling after power-on or a radio change gets time to come around.

use std::fmt;
use std::io::{Read, Write};

use serialport::SerialPort;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec;
use crate::command::Command;
use crate::config::{Budget, SerialConfig};
use crate::conn::{ConnError, Connection};
use crate::error::ParseError;
use crate::number::PhoneNumber;
use crate::response::{OK, Response};
use crate::sms::{self, SmsRecord};

/// Prefix of the line acknowledging a submitted SMS (`+CMGS: <mr>`).
const SENT_PREFIX: &[u8] = b"+CMGS:";

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// An atomic check or setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Modem answers `AT`.
    Alive,
    /// SIM is unlocked.
    PinReady,
    /// Transmitter switched on.
    RadioOn,
    /// Registered on the home network with automatic selection.
    Registered,
    /// Text mode is already active.
    TextModeActive,
    /// Switch to text mode.
    SetTextMode,
    /// Switch character set to IRA.
    SetEncodingIra,
    /// Switch message storage to the SIM.
    SetStorageSim,
    /// Delete every stored message.
    DeleteAll,
}

/// Checks that bring the modem onto the cellular network.
pub const CELLULAR_CHECKS: &[Check] = &[Check::Alive, Check::PinReady, Check::RadioOn, Check::Registered];

/// Checks that prepare the SMS subsystem.
pub const SMS_CHECKS: &[Check] = &[
    Check::Alive,
    Check::SetTextMode,
    Check::SetEncodingIra,
    Check::SetStorageSim,
    Check::DeleteAll,
];

impl Check {
    pub fn command(self) -> Command {
        match self {
            Self::Alive => Command::Attention,
            Self::PinReady => Command::PinStatus,
            Self::RadioOn => Command::RadioOn,
            Self::Registered => Command::RegistrationStatus,
            Self::TextModeActive => Command::MessageFormat,
            Self::SetTextMode => Command::SetTextMode,
            Self::SetEncodingIra => Command::SetCharsetIra,
            Self::SetStorageSim => Command::SetStorageSim,
            Self::DeleteAll => Command::DeleteAll,
        }
    }

    /// Whether `resp` is the known-good reply.
    pub fn accepts(self, resp: &Response) -> bool {
        match self {
            Self::PinReady => resp.is(&[b"+CPIN: READY", OK]),
            Self::Registered => resp.is(&[b"+CREG: 0,1", OK]),
            Self::TextModeActive => resp.is(&[b"+CMGF: 1", OK]),
            // First line reports storage counts, which vary.
            Self::SetStorageSim => resp.line(1) == Some(OK),
            Self::Alive | Self::RadioOn | Self::SetTextMode | Self::SetEncodingIra | Self::DeleteAll => {
                resp.is(&[OK])
            }
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alive => "modem alive",
            Self::PinReady => "SIM unlocked",
            Self::RadioOn => "radio on",
            Self::Registered => "network registration",
            Self::TextModeActive => "text mode active",
            Self::SetTextMode => "set text mode",
            Self::SetEncodingIra => "set IRA encoding",
            Self::SetStorageSim => "set SIM storage",
            Self::DeleteAll => "delete all messages",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a composite initialization did not complete.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("{check} did not succeed within {attempts} attempts")]
    CheckExhausted { check: Check, attempts: u32 },

    #[error("message count could not be read within {attempts} attempts")]
    CountUnavailable { attempts: u32 },

    #[error("message storage still holds {count} message(s)")]
    MailboxNotEmpty { count: u32 },
}

// ---------------------------------------------------------------------------
// Modem
// ---------------------------------------------------------------------------

/// A USB broadband modem driven over its AT command port.
///
/// Owns the serial channel for its whole lifetime. Nothing verified earlier
/// is assumed to still hold; composites re-check from the start every time.
pub struct Modem<P> {
    conn: Connection<P>,
    init: Budget,
}

impl Modem<Box<dyn SerialPort>> {
    /// Open the serial device.
    pub fn open(serial: &SerialConfig, init: Budget) -> Result<Self, ConnError> {
        Ok(Self::new(Connection::open(serial)?, init))
    }
}

impl<P: Read + Write> Modem<P> {
    pub fn new(conn: Connection<P>, init: Budget) -> Self {
        Self { conn, init }
    }

    /// One raw exchange.
    pub fn chat(&mut self, cmd: &Command) -> Response {
        self.conn.exchange(cmd)
    }

    /// Run one atomic check.
    pub fn check(&mut self, check: Check) -> bool {
        let resp = self.chat(&check.command());
        check.accepts(&resp)
    }

    pub fn is_ok(&mut self) -> bool {
        self.check(Check::Alive)
    }

    pub fn is_pin_ok(&mut self) -> bool {
        self.check(Check::PinReady)
    }

    pub fn radio_on(&mut self) -> bool {
        self.check(Check::RadioOn)
    }

    pub fn is_registered(&mut self) -> bool {
        self.check(Check::Registered)
    }

    pub fn is_mode_text(&mut self) -> bool {
        self.check(Check::TextModeActive)
    }

    pub fn set_mode_text(&mut self) -> bool {
        self.check(Check::SetTextMode)
    }

    pub fn set_encoding_ira(&mut self) -> bool {
        self.check(Check::SetEncodingIra)
    }

    pub fn set_storage_sm(&mut self) -> bool {
        self.check(Check::SetStorageSim)
    }

    pub fn delete_all(&mut self) -> bool {
        self.check(Check::DeleteAll)
    }

    /// Number of messages in storage, or `None` when the query fails.
    pub fn count_sms(&mut self) -> Option<u32> {
        let resp = self.chat(&Command::StorageStatus);
        if resp.line(1) != Some(OK) {
            return None;
        }
        resp.line(0).and_then(codec::read_storage_used)
    }

    /// Compose and submit one SMS.
    ///
    /// `true` once the modem acknowledges with `+CMGS: <mr>` followed by `OK`.
    /// The body must be ASCII; text mode with IRA cannot carry anything else.
    pub fn send_sms(&mut self, to: PhoneNumber, text: &str) -> bool {
        let resp = self.chat(&Command::Compose { to });
        if !resp.is_prompt() {
            debug!(reply = ?resp, "no input prompt");
            return false;
        }
        let resp = self.chat(&Command::Body { text: text.to_owned() });
        resp.ok_after(SENT_PREFIX)
    }

    /// List every stored message.
    pub fn read_sms(&mut self) -> Result<Vec<SmsRecord>, ParseError> {
        let resp = self.chat(&Command::ListAll);
        sms::parse_listing(&resp)
    }

    // -----------------------------------------------------------------------
    // Composites
    // -----------------------------------------------------------------------

    /// Bring the modem onto the cellular network.
    pub fn init_cellular(&mut self) -> Result<(), InitError> {
        self.run_checks(CELLULAR_CHECKS)?;
        info!("modem registered on cellular network");
        Ok(())
    }

    /// Prepare text-mode SMS with SIM storage and an empty mailbox.
    ///
    /// Leftover mail is not retried away: a non-zero count after deletion
    /// fails initialization.
    pub fn init_sms(&mut self) -> Result<(), InitError> {
        self.run_checks(SMS_CHECKS)?;

        let budget = self.init;
        let count = budget
            .poll(|| self.count_sms())
            .ok_or(InitError::CountUnavailable { attempts: budget.attempts })?;
        if count > 0 {
            warn!(count, "message storage not empty after delete");
            return Err(InitError::MailboxNotEmpty { count });
        }
        info!("SMS subsystem ready");
        Ok(())
    }

    /// Poll each check in order; every check gets the full budget.
    fn run_checks(&mut self, checks: &[Check]) -> Result<(), InitError> {
        let budget = self.init;
        for &check in checks {
            if !budget.poll_until(|| self.check(check)) {
                warn!(%check, attempts = budget.attempts, "check exhausted its budget");
                return Err(InitError::CheckExhausted { check, attempts: budget.attempts });
            }
            debug!(%check, "check passed");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
