//! Scripted serial port for driver and session tests.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::command::Command;

/// A `Read + Write` port that answers each written command from a script.
///
/// Replies for a command are consumed in order; the last one repeats. A
/// command with no script gets no reply, like a modem that ignores it. An
/// exhausted read behaves like a serial timeout.
#[derive(Default)]
pub struct ScriptedPort {
    script: HashMap<Vec<u8>, VecDeque<Vec<Vec<u8>>>>,
    written: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
    log: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_reads: bool,
    fail_writes: bool,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `cmd` with an echo followed by `lines`.
    pub fn answer(self, cmd: Command, lines: &[&str]) -> Self {
        let wire = cmd.encode();
        let raw = modem_reply(&wire, lines);
        self.reply(&wire, &raw)
    }

    /// Answer successive `cmd` writes with successive line sets.
    pub fn answers(mut self, cmd: Command, replies: &[&[&str]]) -> Self {
        let wire = cmd.encode();
        for lines in replies {
            let raw = modem_reply(&wire, lines);
            self = self.reply(&wire, &raw);
        }
        self
    }

    /// Answer `wire` with raw bytes, delivered in one read.
    pub fn reply(self, wire: &[u8], raw: &[u8]) -> Self {
        self.reply_chunked(wire, &[raw])
    }

    /// Answer `wire` with raw bytes split across several reads.
    pub fn reply_chunked(mut self, wire: &[u8], chunks: &[&[u8]]) -> Self {
        self.script
            .entry(wire.to_vec())
            .or_default()
            .push_back(chunks.iter().map(|c| c.to_vec()).collect());
        self
    }

    pub fn fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Shared record of every command written, in order.
    pub fn log(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.log.clone()
    }

    fn next_reply(&mut self, wire: &[u8]) -> Vec<Vec<u8>> {
        match self.script.get_mut(wire) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"));
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let wire = std::mem::take(&mut self.written);
        if wire.is_empty() {
            return Ok(());
        }
        let reply = self.next_reply(&wire);
        self.pending.extend(reply);
        self.log.lock().unwrap().push(wire);
        Ok(())
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"));
        }
        let Some(mut chunk) = self.pending.pop_front() else {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            chunk.drain(..n);
            self.pending.push_front(chunk);
        }
        Ok(n)
    }
}

/// Raw bytes of a modem reply: echo, then each line framed by CRLF.
pub fn modem_reply(echo: &[u8], lines: &[&str]) -> Vec<u8> {
    let mut raw = echo.to_vec();
    for line in lines {
        raw.extend_from_slice(b"\r\n");
        raw.extend_from_slice(line.as_bytes());
        raw.extend_from_slice(b"\r\n");
    }
    raw
}
