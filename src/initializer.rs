//! Startup: take the modem away from the OS and bring it onto the network.

use std::io::{Read, Write};

use thiserror::Error;
use tracing::{info, warn};

use crate::conn::ConnError;
use crate::driver::{InitError, Modem};
use crate::host::{NetError, NetworkControl};
use crate::status::StatusSink;

/// Why startup did not produce a usable modem.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("network connection could not be released: {0}")]
    Net(#[from] NetError),

    #[error(transparent)]
    Conn(#[from] ConnError),

    #[error("cellular initialization failed: {0}")]
    Init(#[from] InitError),
}

/// Run startup and report the outcome through `status`.
///
/// Input stays disabled until the modem is registered. `open` is called only
/// after the OS has let go of the port.
pub fn initialize<P, N, F>(net: &mut N, open: F, status: &mut dyn StatusSink) -> Option<Modem<P>>
where
    P: Read + Write,
    N: NetworkControl + ?Sized,
    F: FnOnce() -> Result<Modem<P>, ConnError>,
{
    status.set_input_enabled(false);
    match start(net, open, status) {
        Ok(modem) => {
            status.display("Initialization complete. You can send SMS.");
            status.set_input_enabled(true);
            Some(modem)
        }
        Err(e) => {
            warn!(error = %e, "startup failed");
            status.fail();
            None
        }
    }
}

/// Startup steps without the final report.
pub fn start<P, N, F>(net: &mut N, open: F, status: &mut dyn StatusSink) -> Result<Modem<P>, StartupError>
where
    P: Read + Write,
    N: NetworkControl + ?Sized,
    F: FnOnce() -> Result<Modem<P>, ConnError>,
{
    status.display("Releasing network connection...");
    net.release_port()?;

    let mut modem = open()?;

    status.display("Connecting to cellular network...");
    modem.init_cellular()?;
    info!("modem ready");
    Ok(modem)
}
