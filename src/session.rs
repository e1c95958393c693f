//! One balance query: configure → send → await reply → validate → report.
//!
//! A single forward pass. Each step either succeeds or ends the session with
//! a [`SessionError`]; the front-end sees one generic notice for all of them.

use std::io::{Read, Write};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::datetime::Datetime;
use crate::driver::{InitError, Modem};
use crate::host::{self, Clock};
use crate::number::PhoneNumber;
use crate::sms::SmsRecord;
use crate::status::StatusSink;

/// Payload asking for the remaining credit and usage.
pub const USAGE_TEXT: &str = "SPOTREBA";

/// Payload asking for the remaining data allowance.
pub const DATA_TEXT: &str = "GIGA";

/// The two queries the front-end offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Query {
    /// Credit and usage.
    Usage,
    /// Data allowance.
    Data,
}

impl Query {
    pub fn text(self) -> &'static str {
        match self {
            Self::Usage => USAGE_TEXT,
            Self::Data => DATA_TEXT,
        }
    }
}

/// Where to send what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub to: PhoneNumber,
    /// ASCII message text.
    pub text: String,
}

impl Request {
    pub fn new(to: PhoneNumber, text: impl Into<String>) -> Self {
        Self { to, text: text.into() }
    }

    /// A predefined query to the configured service number.
    pub fn query(config: &Config, query: Query) -> Self {
        Self::new(config.service_number, query.text())
    }
}

/// Why a session ended without a usable reply.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message text must be ASCII")]
    NonAscii,

    #[error("SMS configuration failed: {0}")]
    Init(#[from] InitError),

    #[error("SMS not accepted after {attempts} attempts")]
    SendFailed { attempts: u32 },

    #[error("no reply within {attempts} polls")]
    NoReply { attempts: u32 },

    #[error("reply could not be read back")]
    NoMessage,

    #[error("reply came from {got}, expected {expected}")]
    WrongSender { expected: PhoneNumber, got: String },

    #[error("reply dated {got}, today is {expected}")]
    WrongDate { expected: Datetime, got: Datetime },
}

/// Run one session and report the outcome through `status`.
///
/// Input is disabled for the duration and re-enabled at the end. Returns the
/// reply text on success.
pub fn check_balance<P: Read + Write>(
    modem: &mut Modem<P>,
    clock: &dyn Clock,
    status: &mut dyn StatusSink,
    config: &Config,
    request: &Request,
) -> Option<String> {
    status.set_input_enabled(false);
    match run(modem, clock, status, config, request) {
        Ok(reply) => {
            status.display(&reply.body);
            status.set_input_enabled(true);
            Some(reply.body)
        }
        Err(e) => {
            warn!(error = %e, "session aborted");
            status.fail();
            None
        }
    }
}

/// Run the session steps without the final report.
pub fn run<P: Read + Write>(
    modem: &mut Modem<P>,
    clock: &dyn Clock,
    status: &mut dyn StatusSink,
    config: &Config,
    request: &Request,
) -> Result<SmsRecord, SessionError> {
    if !request.text.is_ascii() {
        return Err(SessionError::NonAscii);
    }

    status.display("Configuring modem...");
    modem.init_sms()?;

    status.display("Sending SMS...");
    send(modem, config, request)?;

    status.display("SMS sent, waiting for reply...");
    await_reply(modem, config)?;

    let reply = fetch(modem)?;
    validate(&reply, clock, config, request)?;
    info!(sender = %reply.sender, at = %reply.timestamp, "reply received");
    Ok(reply)
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn send<P: Read + Write>(modem: &mut Modem<P>, config: &Config, request: &Request) -> Result<(), SessionError> {
    let budget = config.send;
    if budget.poll_until(|| modem.send_sms(request.to, &request.text)) {
        debug!(to = %request.to, "SMS accepted");
        Ok(())
    } else {
        Err(SessionError::SendFailed { attempts: budget.attempts })
    }
}

/// Wait until exactly one message is in storage.
fn await_reply<P: Read + Write>(modem: &mut Modem<P>, config: &Config) -> Result<(), SessionError> {
    let budget = config.reply;
    if budget.poll_until(|| modem.count_sms() == Some(1)) {
        Ok(())
    } else {
        Err(SessionError::NoReply { attempts: budget.attempts })
    }
}

/// Read back the one stored message.
fn fetch<P: Read + Write>(modem: &mut Modem<P>) -> Result<SmsRecord, SessionError> {
    let mut records = modem
        .read_sms()
        .inspect_err(|e| warn!(error = %e, "message listing unreadable"))
        .map_err(|_| SessionError::NoMessage)?;
    if records.is_empty() {
        return Err(SessionError::NoMessage);
    }
    Ok(records.swap_remove(0))
}

/// The reply must come from the number we wrote to, today.
fn validate(reply: &SmsRecord, clock: &dyn Clock, config: &Config, request: &Request) -> Result<(), SessionError> {
    let from_service = reply
        .sender
        .parse::<PhoneNumber>()
        .is_ok_and(|sender| sender == request.to);
    if !from_service {
        return Err(SessionError::WrongSender {
            expected: request.to,
            got: reply.sender.clone(),
        });
    }

    match host::current_datetime(clock, config.clock) {
        Ok(today) if today != reply.timestamp => Err(SessionError::WrongDate {
            expected: today,
            got: reply.timestamp,
        }),
        Ok(_) => Ok(()),
        Err(e) => {
            debug!(error = %e, "host date unknown, skipping date check");
            Ok(())
        }
    }
}
