//! Stored SMS messages and the `AT+CMGL="ALL"` listing.
//!
//! Each stored message occupies two lines: a metadata header followed by the
//! body text.
//! ```text
//! +CMGL: 1,"REC UNREAD","950",,"24/05/01,10:00:00+08"
//! Credit: 5 EUR
//! OK
//! ```

use tracing::warn;

use crate::codec;
use crate::datetime::Datetime;
use crate::error::{ParseError, Result};
use crate::response::{OK, Response};

/// One stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SmsRecord {
    /// Sender number as reported, digits and an optional leading `+`.
    pub sender: String,
    pub timestamp: Datetime,
    pub body: String,
}

/// Metadata header of a listed message.
#[derive(Debug)]
struct Header {
    sender: String,
    timestamp: Datetime,
}

impl Header {
    /// Decode `+CMGL: <idx>,"<stat>","<oa>",[<alpha>],"<scts>"`.
    ///
    /// The sender is the 2nd quoted field. The timestamp is the last quoted
    /// field; the alpha field before it is unquoted when empty but quoted
    /// when the modem knows a phonebook name.
    fn decode(line: &[u8]) -> Result<Self> {
        if !line.starts_with(b"+CMGL:") {
            return Err(ParseError::ListingLine { line: line.to_vec() });
        }
        let sender = codec::quoted_field(line, 1)
            .ok_or_else(|| ParseError::missing_field("sender", line))?;
        let timestamp = (2..)
            .map_while(|i| codec::quoted_field(line, i))
            .last()
            .ok_or_else(|| ParseError::missing_field("timestamp", line))?;
        Ok(Self {
            sender: String::from_utf8_lossy(sender).into_owned(),
            timestamp: Datetime::parse(&String::from_utf8_lossy(timestamp))?,
        })
    }
}

/// Decode a message listing into records.
///
/// Lines alternate header/body and stop at the first `OK`. A trailing header
/// with no body is dropped.
pub fn parse_listing(resp: &Response) -> Result<Vec<SmsRecord>> {
    let mut records = Vec::new();
    let mut pending: Option<Header> = None;

    for line in resp.lines().iter().take_while(|l| l.as_slice() != OK) {
        match pending.take() {
            None => pending = Some(Header::decode(line)?),
            Some(header) => records.push(SmsRecord {
                sender: header.sender,
                timestamp: header.timestamp,
                body: String::from_utf8_lossy(line).into_owned(),
            }),
        }
    }

    if let Some(header) = pending {
        warn!(sender = %header.sender, "message listing ended without a body line");
    }
    Ok(records)
}
