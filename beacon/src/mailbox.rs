//! Ordered inbox of a running beacon.
//!
//! Configuration commands from handles and timer firings scheduled by the
//! beacon itself travel through the same FIFO channel, so the beacon observes
//! a single total order of events.

use crate::state::Callback;
use std::{fmt, time::Duration};
use tokio::{sync::mpsc, task::JoinSet, time};

pub(crate) type Sender<T> = mpsc::UnboundedSender<Command<T>>;
pub(crate) type Receiver<T> = mpsc::UnboundedReceiver<Command<T>>;

/// Message processed by a beacon.
pub(crate) enum Command<T> {
    SetPeriodic { period: Duration, callback: Callback<T> },
    SetDuration { duration: Duration, callback: Option<Callback<T>> },
    SetTermCallback(Callback<T>),
    SetCancelCallback(Callback<T>),
    Enable,
    Cancel,
    /// A periodic timer has fired.
    Periodic,
    /// The terminal timer has fired.
    Terminal,
}

impl<T> fmt::Debug for Command<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetPeriodic { period, .. } => {
                f.debug_struct("SetPeriodic").field("period", period).finish_non_exhaustive()
            }
            Self::SetDuration { duration, callback } => f
                .debug_struct("SetDuration")
                .field("duration", duration)
                .field("callback", &callback.is_some())
                .finish(),
            Self::SetTermCallback(_) => f.write_str("SetTermCallback"),
            Self::SetCancelCallback(_) => f.write_str("SetCancelCallback"),
            Self::Enable => f.write_str("Enable"),
            Self::Cancel => f.write_str("Cancel"),
            Self::Periodic => f.write_str("Periodic"),
            Self::Terminal => f.write_str("Terminal"),
        }
    }
}

pub(crate) fn new<T>() -> (Sender<T>, Receiver<T>) {
    mpsc::unbounded_channel()
}

/// Pending delayed deliveries into a beacon's own inbox.
///
/// Dropping this aborts every delivery that hasn't happened yet.
pub(crate) struct Timers<T> {
    this: Sender<T>,
    pending: JoinSet<()>,
}

impl<T: Send + 'static> Timers<T> {
    pub(crate) fn new(this: Sender<T>) -> Self {
        Self { this, pending: JoinSet::new() }
    }

    /// Delivers `command` to the inbox once `delay` has passed.
    ///
    /// Must be called within a tokio runtime.
    pub(crate) fn send_in(&mut self, command: Command<T>, delay: Duration) {
        let this = self.this.clone();
        self.pending.spawn(async move {
            time::sleep(delay).await;
            // The beacon may be gone already.
            let _ = this.send(command);
        });
    }

    /// Forgets deliveries that have already completed.
    pub(crate) fn reap(&mut self) {
        while self.pending.try_join_next().is_some() {}
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
