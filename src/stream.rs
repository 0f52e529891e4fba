//! Streaming loop and its cancellation.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use log::{error, info};

use crate::backend::Backend;
use crate::stats::{throughput_msps, Telemetry};
use crate::{Error, RxStream};

/// Lifecycle of a receive stream.
#[atomic_enum::atomic_enum]
#[derive(PartialEq)]
pub enum StreamState {
    /// Refilling and reporting.
    Running,
    /// Cancellation requested or refill failed; the loop exits at its next check.
    Stopping,
    /// Buffer destroyed and channels disabled.
    Teardown,
}

/// Cloneable handle used to stop a running stream from another thread or a signal handler.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<AtomicStreamState>,
}

impl CancelToken {
    /// Creates a token in the running state.
    pub fn new() -> Self {
        CancelToken {
            state: Arc::new(AtomicStreamState::new(StreamState::Running)),
        }
    }

    /// Requests the stream to stop. Has no effect once the stream stopped.
    pub fn cancel(&self) {
        let _ = self.state.compare_exchange(
            StreamState::Running,
            StreamState::Stopping,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Returns `true` once a stop was requested.
    pub fn is_cancelled(&self) -> bool {
        self.state() != StreamState::Running
    }

    /// Current state of the stream.
    pub fn state(&self) -> StreamState {
        self.state.load(Ordering::SeqCst)
    }

    fn finish(&self) {
        self.state.store(StreamState::Teardown, Ordering::SeqCst);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the streaming loop ended.
#[derive(Debug)]
pub enum StopReason {
    /// The cancel token was tripped.
    Cancelled,
    /// Refilling the buffer failed.
    RefillFailed(Error),
}

/// Outcome of [`run`].
#[derive(Debug)]
pub struct Summary {
    /// Successful refills.
    pub refills: u64,
    /// Complex samples received over all refills.
    pub samples: u64,
    /// Why streaming stopped.
    pub reason: StopReason,
}

/// Refills `stream` until `cancel` is tripped or a refill fails, reporting one
/// [`Telemetry`] record per refill.
///
/// The token is checked once per iteration, before the blocking refill. The stream is
/// consumed: on return its buffer is destroyed and the channels disabled.
pub fn run<B: Backend>(
    mut stream: RxStream<'_, B>,
    cancel: &CancelToken,
    check_overflow: bool,
    mut report: impl FnMut(&Telemetry),
) -> Summary {
    let mut refills = 0u64;
    let mut total = 0u64;
    let mut last = Instant::now();

    info!("Starting streaming (press CTRL+C to cancel)");
    let reason = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }

        let (samples, max_amplitude) = match stream.refill() {
            Ok(view) => (view.sample_count(), view.peaks().max()),
            Err(e) => {
                error!("Error refilling buffer: {e}");
                cancel.cancel();
                break StopReason::RefillFailed(e);
            }
        };

        let now = Instant::now();
        let msps = throughput_msps(samples, now.saturating_duration_since(last));
        last = now;

        let overflow = check_overflow.then(|| stream.check_overflow());

        refills += 1;
        total += samples as u64;
        report(&Telemetry {
            samples,
            msps,
            max_amplitude,
            overflow,
        });
    };

    drop(stream);
    cancel.finish();

    Summary {
        refills,
        samples: total,
        reason,
    }
}
