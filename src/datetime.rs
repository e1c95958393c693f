//! Modem timestamps in text mode: `YY/MM/DD,HH:MM:SS+TZ`.
//!
//! Only the calendar date takes part in comparisons. A reply that arrives a
//! few seconds after the request, or hours later on the same day, is still
//! "today's" reply.

use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, Result};

/// Year, month, day, hour, minute and second as reported by the modem.
///
/// The year is the modem's native two-digit year. The timezone suffix is
/// discarded at parse time.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Datetime {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl Datetime {
    /// Parse `YY/MM/DD,HH:MM:SS+TZ`. The `TZ` part may be empty.
    pub fn parse(text: &str) -> Result<Self> {
        let err = || ParseError::timestamp(text);

        let (date, time) = split_exact(text.trim(), ',').ok_or_else(err)?;
        // The zone is signed; "-" appears west of UTC.
        let time = time
            .split_once(['+', '-'])
            .map(|(clock, _zone)| clock)
            .ok_or_else(err)?;

        let [year, month, day] = fields::<3>(date, '/').ok_or_else(err)?;
        let [hour, minute, second] = fields::<3>(time, ':').ok_or_else(err)?;

        Ok(Self { year, month, day, hour, minute, second })
    }

    /// `(year, month, day)`, the part that takes part in equality.
    pub fn date(&self) -> (u8, u8, u8) {
        (self.year, self.month, self.day)
    }
}

impl FromStr for Datetime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Equal when the dates match; time of day is irrelevant.
impl PartialEq for Datetime {
    fn eq(&self, other: &Self) -> bool {
        self.date() == other.date()
    }
}

impl Eq for Datetime {}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // "01.05.24 - 10:00:00"
        write!(
            f,
            "{:02}.{:02}.{:02} - {:02}:{:02}:{:02}",
            self.day, self.month, self.year, self.hour, self.minute, self.second
        )
    }
}

/// Split into exactly two parts on `sep`.
fn split_exact(s: &str, sep: char) -> Option<(&str, &str)> {
    let (a, b) = s.split_once(sep)?;
    if b.contains(sep) {
        return None;
    }
    Some((a, b))
}

/// Split into exactly `N` two-digit decimal fields.
fn fields<const N: usize>(s: &str, sep: char) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    let mut parts = s.split(sep);
    for slot in out.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}
