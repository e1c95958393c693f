//! Runtime configuration: serial parameters, retry budgets, service number.
//!
//! Every wait in the crate is a number of attempts times a fixed delay, so
//! the worst-case duration of each step is visible here.

use std::thread;
use std::time::Duration;

use crate::number::PhoneNumber;

/// Default modem command port.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Default balance service short code.
pub const DEFAULT_SERVICE_NUMBER: PhoneNumber = PhoneNumber::new(950);

/// NetworkManager connection that uses the modem for data.
pub const DEFAULT_CONNECTION: &str = "4ka";

/// Serial line parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    /// A read that stays empty this long ends a reply.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_owned(),
            baud_rate: 9600,
            read_timeout: Duration::from_millis(200),
            write_timeout: Duration::from_millis(200),
        }
    }
}

/// A bounded number of attempts with a fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Budget {
    pub attempts: u32,
    pub delay: Duration,
}

impl Budget {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Call `f` until it returns `Some`, at most `attempts` times.
    ///
    /// Sleeps `delay` between attempts, not after the last one.
    pub fn poll<T>(&self, mut f: impl FnMut() -> Option<T>) -> Option<T> {
        for attempt in 1..=self.attempts {
            if let Some(value) = f() {
                return Some(value);
            }
            if attempt < self.attempts {
                thread::sleep(self.delay);
            }
        }
        None
    }

    /// Call `f` until it returns `true`, at most `attempts` times.
    pub fn poll_until(&self, mut f: impl FnMut() -> bool) -> bool {
        self.poll(|| f().then_some(())).is_some()
    }

    /// Call `f` until it succeeds, returning the last error if none does.
    ///
    /// A budget of zero attempts still calls `f` once.
    pub fn retry<T, E>(&self, mut f: impl FnMut() -> Result<T, E>) -> Result<T, E> {
        let mut attempt = 1;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.attempts => return Err(e),
                Err(_) => {
                    attempt += 1;
                    thread::sleep(self.delay);
                }
            }
        }
    }
}

/// Everything the initializer and SMS sessions need to know.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub serial: SerialConfig,
    /// Per-step polling of the composite initializations.
    pub init: Budget,
    /// Whole compose+body send step.
    pub send: Budget,
    /// Waiting for the reply to land in storage.
    pub reply: Budget,
    /// Host date query.
    pub clock: Budget,
    /// Releasing and restoring the OS network connection.
    pub net: Budget,
    pub service_number: PhoneNumber,
    pub connection_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            init: Budget::new(100, Duration::from_millis(100)),
            send: Budget::new(5, Duration::ZERO),
            reply: Budget::new(400, Duration::from_millis(250)),
            clock: Budget::new(3, Duration::ZERO),
            net: Budget::new(10, Duration::from_millis(500)),
            service_number: DEFAULT_SERVICE_NUMBER,
            connection_name: DEFAULT_CONNECTION.to_owned(),
        }
    }
}

impl Config {
    /// Same budgets with every delay removed. For tests and simulations.
    pub fn without_delays(mut self) -> Self {
        for budget in [
            &mut self.init,
            &mut self.send,
            &mut self.reply,
            &mut self.clock,
            &mut self.net,
        ] {
            budget.delay = Duration::ZERO;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANT: Budget = Budget::new(5, Duration::ZERO);

    #[test]
    fn poll_stops_at_first_success() {
        let mut calls = 0;
        let got = INSTANT.poll(|| {
            calls += 1;
            (calls == 3).then_some(calls)
        });
        assert_eq!(got, Some(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn poll_exhausts_budget() {
        let mut calls = 0;
        assert!(!INSTANT.poll_until(|| {
            calls += 1;
            false
        }));
        assert_eq!(calls, 5);
    }

    #[test]
    fn retry_returns_last_error() {
        let mut calls = 0;
        let got: Result<(), u32> = INSTANT.retry(|| {
            calls += 1;
            Err(calls)
        });
        assert_eq!(got, Err(5));
    }

    #[test]
    fn retry_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let got = Budget::new(0, Duration::ZERO).retry(|| {
            calls += 1;
            Ok::<_, ()>(calls)
        });
        assert_eq!(got, Ok(1));
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.device, "/dev/ttyUSB0");
        assert_eq!(config.send.attempts, 5);
        assert_eq!(config.reply.attempts, 400);
        assert_eq!(config.service_number, PhoneNumber::new(950));
        assert_eq!(config.without_delays().reply.delay, Duration::ZERO);
    }
}
