pub mod codec;
pub mod command;
pub mod config;
pub mod conn;
pub mod datetime;
pub mod driver;
pub mod error;
pub mod host;
pub mod initializer;
pub mod number;
pub mod response;
pub mod session;
pub mod sms;
pub mod status;
pub mod worker;

#[cfg(test)]
mod testing;

pub use command::Command;
pub use config::{Budget, Config, SerialConfig};
pub use conn::{ConnError, Connection};
pub use datetime::Datetime;
pub use driver::{Check, InitError, Modem};
pub use error::ParseError;
pub use host::{Clock, NetError, NetworkControl, Nmcli, SystemClock};
pub use initializer::StartupError;
pub use number::PhoneNumber;
pub use response::Response;
pub use session::{Query, Request, SessionError};
pub use sms::SmsRecord;
pub use status::StatusSink;
pub use worker::{Worker, WorkerError};
