use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

/// Handle to work running on a background thread. The owner polls it from
/// its event loop; dropping it abandons the result.
pub struct PendingRequest<T> {
    ticket: u64,
    rx: Receiver<T>,
}

impl<T: Send + 'static> PendingRequest<T> {
    /// Run `work` after `latency` on a worker thread.
    pub fn spawn<F>(ticket: u64, latency: Duration, work: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if !latency.is_zero() {
                thread::sleep(latency);
            }
            // Receiver gone means the request was abandoned.
            let _ = tx.send(work());
        });
        Self { ticket, rx }
    }
}

impl<T> PendingRequest<T> {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Non-blocking: `Some` once the worker has delivered.
    pub fn try_take(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Request {} worker exited without a result", self.ticket);
                None
            }
        }
    }

    /// Block until the worker delivers. `None` if it died.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }
}

/// Monotonic ticket source. Bumping it invalidates every outstanding ticket.
#[derive(Debug, Default)]
pub struct TicketCounter {
    current: u64,
}

impl TicketCounter {
    pub fn next(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        ticket == self.current
    }
}
