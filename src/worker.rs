//! Background thread owning the modem.
//!
//! Front-ends stay responsive while a session blocks on the serial port for
//! minutes. One job runs at a time; a job submitted while another is running
//! is refused rather than queued.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error};

/// Hands a finished job's result to its submitter.
type Delivery = Box<dyn FnOnce() + Send>;

/// Runs against the state and returns the delivery of its result.
type Job<T> = Box<dyn FnOnce(&mut T) -> Delivery + Send>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("another operation is still running")]
    Busy,

    #[error("worker thread has stopped")]
    Stopped,
}

/// A thread that owns `T` and runs submitted jobs against it, one at a time.
pub struct Worker<T> {
    jobs: Option<Sender<Job<T>>>,
    busy: Arc<AtomicBool>,
    /// Yields `None` when a job panicked.
    handle: Option<JoinHandle<Option<T>>>,
}

impl<T: Send + 'static> Worker<T> {
    /// Start the thread with `state`.
    pub fn spawn(name: &str, mut state: T) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job<T>>();
        let busy = Arc::new(AtomicBool::new(false));
        let flag = busy.clone();
        let handle = thread::Builder::new().name(name.to_owned()).spawn(move || {
            while let Ok(job) = rx.recv() {
                match panic::catch_unwind(AssertUnwindSafe(|| job(&mut state))) {
                    Ok(deliver) => {
                        // Cleared before delivery, so a submitter woken by
                        // the result can submit again straight away.
                        flag.store(false, Ordering::Release);
                        deliver();
                    }
                    Err(_) => {
                        error!("job panicked, stopping worker");
                        // Refuse new jobs before the slot is freed.
                        drop(rx);
                        flag.store(false, Ordering::Release);
                        return None;
                    }
                }
            }
            debug!("worker exiting");
            Some(state)
        })?;
        Ok(Self {
            jobs: Some(tx),
            busy,
            handle: Some(handle),
        })
    }

    /// Whether a job is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `f` on the worker thread. Its result arrives on the returned
    /// channel.
    pub fn submit<R, F>(&self, f: F) -> Result<Receiver<R>, WorkerError>
    where
        R: Send + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }
        let (tx, rx) = mpsc::channel();
        let job: Job<T> = Box::new(move |state: &mut T| -> Delivery {
            let result = f(state);
            Box::new(move || {
                // The submitter may have stopped listening.
                let _ = tx.send(result);
            })
        });
        let sent = self.jobs.as_ref().is_some_and(|jobs| jobs.send(job).is_ok());
        if !sent {
            self.busy.store(false, Ordering::Release);
            return Err(WorkerError::Stopped);
        }
        Ok(rx)
    }

    /// Stop the thread after the running job and hand the state back.
    ///
    /// `None` if a job panicked.
    pub fn shutdown(mut self) -> Option<T> {
        self.join()
    }

    fn join(&mut self) -> Option<T> {
        drop(self.jobs.take());
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(state) => state,
            Err(_) => {
                error!("worker thread panicked");
                None
            }
        }
    }
}

impl<T> Drop for Worker<T> {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
