use thiserror::Error;

/// Errors arising from parsing modem response fields.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed timestamp {text:?} (expected YY/MM/DD,HH:MM:SS+TZ)")]
    Timestamp { text: String },

    #[error("malformed phone number {text:?}")]
    Number { text: String },

    #[error("malformed message listing line {}", format_line(line))]
    ListingLine { line: Vec<u8> },

    #[error("{field} field missing from {}", format_line(line))]
    MissingField { field: &'static str, line: Vec<u8> },
}

impl ParseError {
    pub(crate) fn timestamp(text: &str) -> Self {
        Self::Timestamp { text: text.to_owned() }
    }

    pub(crate) fn missing_field(field: &'static str, line: &[u8]) -> Self {
        Self::MissingField { field, line: line.to_vec() }
    }
}

/// Render a response line for diagnostics, escaping control bytes.
fn format_line(line: &[u8]) -> String {
    let limit = 80;
    let text: String = line.iter().take(limit).flat_map(|&b| std::ascii::escape_default(b)).map(char::from).collect();
    let ellipsis = if line.len() > limit { "..." } else { "" };
    format!("\"{text}{ellipsis}\"")
}

pub type Result<T> = std::result::Result<T, ParseError>;
