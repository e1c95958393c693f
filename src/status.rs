//! Status reporting to whatever front-end drives the modem.

/// The single notice shown for every failed operation.
pub const FAILURE_NOTICE: &str = "Modem is not responding! Please try again later.";

/// Front-end collaborator: a status line and an input lock.
///
/// Input is disabled while an operation owns the modem and re-enabled when
/// it finishes, successfully or not.
pub trait StatusSink {
    fn display(&mut self, text: &str);

    fn set_input_enabled(&mut self, enabled: bool);

    /// Report a failed operation and hand control back to the user.
    fn fail(&mut self) {
        self.display(FAILURE_NOTICE);
        self.set_input_enabled(true);
    }
}

/// Wrap `text` into lines shorter than `width` characters, breaking at spaces.
///
/// Text already shorter than `width` is returned unchanged. A single word
/// longer than `width` gets a line of its own.
pub fn wrap(text: &str, width: usize) -> String {
    if text.chars().count() < width {
        return text.to_owned();
    }
    let mut lines: Vec<String> = vec![String::new()];
    for word in text.split_whitespace() {
        let Some(current) = lines.last_mut() else { break };
        let len = current.chars().count();
        if len == 0 {
            current.push_str(word);
        } else if len + 1 + word.chars().count() < width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(word.to_owned());
        }
    }
    lines.join("\n")
}

/// Records every call; used by tests across the crate.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub messages: Vec<String>,
    pub input: Vec<bool>,
}

#[cfg(test)]
impl StatusSink for Recorder {
    fn display(&mut self, text: &str) {
        self.messages.push(text.to_owned());
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input.push(enabled);
    }
}
