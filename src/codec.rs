//! Field readers for text-mode response lines.
//!
//! Information lines look like `+CMD: a,"b",,"c"`. Fields are separated by
//! commas, strings are double-quoted, and no escaping is ever used by the
//! modem in IRA mode.

// ---------------------------------------------------------------------------
// Read helpers
// ---------------------------------------------------------------------------

/// Read the `index`-th comma-separated field (0-based), surrounding
/// whitespace removed.
///
/// The prefix before the first comma includes the `+CMD:` tag.
pub fn comma_field(line: &[u8], index: usize) -> Option<&[u8]> {
    line.split(|&b| b == b',').nth(index).map(<[u8]>::trim_ascii)
}

/// Read the `index`-th double-quoted string (0-based).
pub fn quoted_field(line: &[u8], index: usize) -> Option<&[u8]> {
    // Splitting on '"' puts quoted contents at odd positions.
    line.split(|&b| b == b'"').nth(2 * index + 1)
}

/// Read a decimal integer field.
pub fn read_uint(field: &[u8]) -> Option<u32> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(field).ok()?.parse().ok()
}

/// Read the "used" count from a `+CPMS: "SM",<used>,<total>,...` line.
pub fn read_storage_used(line: &[u8]) -> Option<u32> {
    comma_field(line, 1).and_then(read_uint)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_fields() {
        let line = b"+CPMS: \"SM\", 3,20,\"SM\",3,20";
        assert_eq!(comma_field(line, 0), Some(&b"+CPMS: \"SM\""[..]));
        assert_eq!(comma_field(line, 1), Some(&b"3"[..]));
        assert_eq!(comma_field(line, 6), None);
    }

    #[test]
    fn quoted_fields() {
        let line = b"+CMGL: 1,\"REC UNREAD\",\"950\",,\"24/05/01,10:00:00+08\"";
        assert_eq!(quoted_field(line, 0), Some(&b"REC UNREAD"[..]));
        assert_eq!(quoted_field(line, 1), Some(&b"950"[..]));
        assert_eq!(quoted_field(line, 2), Some(&b"24/05/01,10:00:00+08"[..]));
        assert_eq!(quoted_field(line, 3), None);
    }

    #[test]
    fn storage_used_counts() {
        for (line, used) in [
            (&b"+CPMS: \"SM\",0,20,\"SM\",0,20,\"SM\",0,20"[..], Some(0)),
            (&b"+CPMS: \"SM\",1,20,\"SM\",1,20,\"SM\",1,20"[..], Some(1)),
            (&b"+CPMS: \"ME\",17,255,\"ME\",17,255"[..], Some(17)),
        ] {
            assert_eq!(read_storage_used(line), used, "{}", String::from_utf8_lossy(line));
        }
    }

    #[test]
    fn storage_used_malformed() {
        assert_eq!(read_storage_used(b"+CPMS: \"SM\""), None);
        assert_eq!(read_storage_used(b"+CPMS: \"SM\",x,20"), None);
        assert_eq!(read_storage_used(b"+CPMS: \"SM\",-1,20"), None);
        assert_eq!(read_storage_used(b"ERROR"), None);
    }
}
