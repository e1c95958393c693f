//! AT commands sent to the modem.
//!
//! Every command is ASCII terminated by `\r`, except the SMS body which is
//! committed with `\r` followed by Ctrl-Z.

use crate::number::PhoneNumber;

/// Ctrl-Z, commits the SMS body typed after the `>` prompt.
pub const CTRL_Z: u8 = 0x1A;

/// Commands we send to the modem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `AT`: liveness check.
    Attention,
    /// `AT+CPIN?`: SIM lock state.
    PinStatus,
    /// `AT+CFUN=1`: full functionality, transmitter on.
    RadioOn,
    /// `AT+CREG?`: network registration state.
    RegistrationStatus,
    /// `AT+CMGF?`: current SMS message format.
    MessageFormat,
    /// `AT+CMGF=1`: text mode.
    SetTextMode,
    /// `AT+CSCS="IRA"`: 7-bit ASCII character set.
    SetCharsetIra,
    /// `AT+CPMS="SM"`: SIM card message storage.
    SetStorageSim,
    /// `AT+CPMS?`: storage occupancy.
    StorageStatus,
    /// `AT+CMGD=0,4`: delete every stored message.
    DeleteAll,
    /// `AT+CMGL="ALL"`: list every stored message.
    ListAll,
    /// `AT+CMGS="<number>"`: start composing an SMS.
    Compose { to: PhoneNumber },
    /// Message text typed after the prompt, committed by Ctrl-Z.
    Body { text: String },
    /// Any other command line, sent verbatim with a trailing `\r`.
    Raw(String),
}

impl Command {
    /// Encode the command into the bytes written to the port.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Body { text } => {
                let mut buf = Vec::with_capacity(text.len() + 2);
                buf.extend_from_slice(text.as_bytes());
                buf.push(b'\r');
                buf.push(CTRL_Z);
                buf
            }
            Self::Compose { to } => format!("AT+CMGS=\"{to}\"\r").into_bytes(),
            Self::Raw(line) => format!("{line}\r").into_bytes(),
            other => {
                let mut buf = other.line().as_bytes().to_vec();
                buf.push(b'\r');
                buf
            }
        }
    }

    /// Fixed command text, without terminator.
    fn line(&self) -> &'static str {
        match self {
            Self::Attention => "AT",
            Self::PinStatus => "AT+CPIN?",
            Self::RadioOn => "AT+CFUN=1",
            Self::RegistrationStatus => "AT+CREG?",
            Self::MessageFormat => "AT+CMGF?",
            Self::SetTextMode => "AT+CMGF=1",
            Self::SetCharsetIra => "AT+CSCS=\"IRA\"",
            Self::SetStorageSim => "AT+CPMS=\"SM\"",
            Self::StorageStatus => "AT+CPMS?",
            Self::DeleteAll => "AT+CMGD=0,4",
            Self::ListAll => "AT+CMGL=\"ALL\"",
            Self::Compose { .. } | Self::Body { .. } | Self::Raw(_) => "",
        }
    }
}
