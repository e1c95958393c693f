//! Splitting a raw modem reply into response lines.
//!
//! Wire format of one exchange, as read back from the port:
//! ```text
//! AT+CPIN?\r \r\n +CPIN: READY \r\n \r\n OK \r\n
//! ^ echo       ^ info line          ^ blank  ^ final result
//! ```
//! The segment before the first CRLF is the command echo (or an empty leading
//! separator when echo is off) and is discarded. Blank segments are
//! discarded. Everything else is kept in order, byte for byte.

use std::fmt;

const CRLF: &[u8] = b"\r\n";

/// The prompt the modem sends when it is ready for the SMS body.
pub const PROMPT: &[u8] = b">";

/// Final result line of a successful command.
pub const OK: &[u8] = b"OK";

/// Ordered response lines from one command/response exchange.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Response {
    lines: Vec<Vec<u8>>,
}

impl Response {
    /// Split accumulated reply bytes into lines.
    pub fn parse(raw: &[u8]) -> Self {
        let lines = split_crlf(raw)
            .skip(1)
            .filter(|line| !line.is_empty())
            .map(<[u8]>::to_vec)
            .collect();
        Self { lines }
    }

    /// Build a response from already-split lines.
    pub fn from_lines<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        Self {
            lines: lines.into_iter().map(|l| l.as_ref().to_vec()).collect(),
        }
    }

    pub fn lines(&self) -> &[Vec<u8>] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&[u8]> {
        self.lines.get(index).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Exact, ordered, byte-for-byte comparison with `expected`.
    pub fn is(&self, expected: &[&[u8]]) -> bool {
        self.lines.len() == expected.len()
            && self.lines.iter().zip(expected).all(|(got, want)| got.as_slice() == *want)
    }

    /// Whether the first line is the SMS input prompt (`"> "`).
    pub fn is_prompt(&self) -> bool {
        self.line(0).is_some_and(|l| l.trim_ascii_end() == PROMPT)
    }

    /// Whether some `OK` line immediately follows a line starting with `prefix`.
    pub fn ok_after(&self, prefix: &[u8]) -> bool {
        self.lines
            .windows(2)
            .any(|pair| pair[1] == OK && pair[0].starts_with(prefix))
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ["+CPIN: READY", "OK"]
        f.debug_list()
            .entries(self.lines.iter().map(|l| String::from_utf8_lossy(l)))
            .finish()
    }
}

fn split_crlf(raw: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(raw);
    std::iter::from_fn(move || {
        let buf = rest?;
        match buf.windows(CRLF.len()).position(|w| w == CRLF) {
            Some(pos) => {
                rest = Some(&buf[pos + CRLF.len()..]);
                Some(&buf[..pos])
            }
            None => {
                rest = None;
                Some(buf)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_echo_and_blank_lines() {
        let resp = Response::parse(b"AT+CPIN?\r\r\n+CPIN: READY\r\n\r\nOK\r\n");
        assert!(resp.is(&[b"+CPIN: READY", b"OK"]));
    }

    #[test]
    fn leading_separator_counts_as_first_line() {
        // Echo disabled: reply starts straight with CRLF.
        let resp = Response::parse(b"\r\nOK\r\n");
        assert!(resp.is(&[b"OK"]));
    }

    #[test]
    fn empty_read_is_empty_response() {
        assert!(Response::parse(b"").is_empty());
        assert!(Response::parse(b"AT\r").is_empty());
    }

    #[test]
    fn lone_cr_is_not_a_separator() {
        let resp = Response::parse(b"AT\r\r\nOK\rjunk\r\n");
        assert_eq!(resp.lines(), &[b"OK\rjunk".to_vec()]);
    }

    #[test]
    fn prompt_keeps_trailing_space() {
        let resp = Response::parse(b"AT+CMGS=\"950\"\r\r\n> ");
        assert_eq!(resp.lines(), &[b"> ".to_vec()]);
        assert!(resp.is_prompt());
    }

    #[test]
    fn exact_comparison() {
        let resp = Response::from_lines(["+CREG: 0,1", "OK"]);
        assert!(resp.is(&[b"+CREG: 0,1", b"OK"]));
        assert!(!resp.is(&[b"+CREG: 0,1"]));
        assert!(!resp.is(&[b"+CREG: 0,5", b"OK"]));
        assert!(!resp.is(&[b"OK", b"+CREG: 0,1"]));
    }

    #[test]
    fn ok_after_prefix() {
        let sent = Response::from_lines(["Credit?", "+CMGS: 12", "OK"]);
        assert!(sent.ok_after(b"+CMGS:"));

        let error = Response::from_lines(["+CMS ERROR: 500"]);
        assert!(!error.ok_after(b"+CMGS:"));

        // OK in first position has no predecessor.
        let bare = Response::from_lines(["OK", "+CMGS: 12"]);
        assert!(!bare.ok_after(b"+CMGS:"));
    }
}
