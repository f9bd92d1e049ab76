//! Fixed-interval background refetching.
//!
//! A [`Poller`] runs its tick immediately and then once per interval on a
//! dedicated thread until it is stopped or dropped. Dropping is the
//! "unmount": the thread is woken, exits, and is joined.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

#[derive(Debug)]
pub struct Poller {
    name: String,
    signal: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);
        let thread_name = name.clone();

        let handle = thread::Builder::new()
            .name(format!("poll-{name}"))
            .spawn(move || {
                log::debug!("poll.start name={thread_name} interval_ms={}", interval.as_millis());
                loop {
                    tick();

                    let mut stopped = thread_signal.stopped.lock();
                    if !*stopped {
                        thread_signal.wake.wait_for(&mut stopped, interval);
                    }
                    if *stopped {
                        break;
                    }
                }
                log::debug!("poll.stop name={thread_name}");
            })?;

        Ok(Self {
            name,
            signal,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop polling and wait for an in-progress tick to finish.
    pub fn stop(&mut self) {
        *self.signal.stopped.lock() = true;
        self.signal.wake.notify_all();

        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("poll.panicked name={}", self.name);
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
