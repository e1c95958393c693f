//! Host collaborators: the clock and the OS network manager.
//!
//! The data connection (NetworkManager via `nmcli`) keeps the modem's serial
//! port busy, so it is switched off before the port is opened and back on
//! after the last session.

use std::process::{Command, Stdio};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Budget;
use crate::datetime::Datetime;
use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the host's current date and time.
pub trait Clock {
    /// Current local time in modem format. May fail transiently.
    fn now(&self) -> Result<Datetime, ParseError>;
}

/// Current time, retrying a failing clock within `budget`.
pub fn current_datetime(clock: &dyn Clock, budget: Budget) -> Result<Datetime, ParseError> {
    budget.retry(|| clock.now())
}

/// Local system time.
///
/// Formatted the way the modem prints timestamps, then parsed back, so a
/// clock that cannot be represented fails the same way a modem timestamp
/// would.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<Datetime, ParseError> {
        let text = Local::now().format("%y/%m/%d,%H:%M:%S+").to_string();
        Datetime::parse(&text)
    }
}

// ---------------------------------------------------------------------------
// Network manager
// ---------------------------------------------------------------------------

/// An external command that did not succeed.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    Failed { command: String, status: std::process::ExitStatus },
}

/// OS collaborator owning the modem while it is not used for SMS.
pub trait NetworkControl {
    /// Stop the OS from using the modem, freeing its serial port.
    fn release_port(&mut self) -> Result<(), NetError>;

    /// Bring the normal data connection back. The port must be closed.
    fn restore(&mut self) -> Result<(), NetError>;
}

/// NetworkManager through the `nmcli` command-line tool.
#[derive(Debug, Clone)]
pub struct Nmcli {
    /// Connection profile brought up on restore.
    pub connection: String,
    pub budget: Budget,
}

impl Nmcli {
    pub fn new(connection: impl Into<String>, budget: Budget) -> Self {
        Self { connection: connection.into(), budget }
    }

    fn run(args: &[&str]) -> Result<(), NetError> {
        let command = format!("nmcli {}", args.join(" "));
        debug!(%command, "running");
        let status = Command::new("nmcli")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| NetError::Spawn { command: command.clone(), source })?;
        if status.success() {
            Ok(())
        } else {
            Err(NetError::Failed { command, status })
        }
    }

    fn run_retried(&self, args: &[&str]) -> Result<(), NetError> {
        self.budget.retry(|| {
            Self::run(args).inspect_err(|e| warn!(error = %e, "nmcli failed"))
        })
    }
}

impl NetworkControl for Nmcli {
    fn release_port(&mut self) -> Result<(), NetError> {
        // Taking only the connection down leaves ModemManager holding the
        // port; the whole WWAN radio has to go.
        self.run_retried(&["radio", "wwan", "off"])
    }

    fn restore(&mut self) -> Result<(), NetError> {
        self.run_retried(&["radio", "wwan", "on"])?;
        // The radio takes a few seconds to come back before the connection
        // can be activated.
        self.run_retried(&["connection", "up", &self.connection])
    }
}
