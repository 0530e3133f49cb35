//! Beacon configuration as plain data.
//!
//! [`State`] is owned by exactly one running beacon. Every setter consumes the
//! current state and returns the next one. Once the state is
//! [started](State::start), setters return it unchanged.
//!
//! ```
//! use beacon::state::{Schedule, State};
//! use std::time::Duration;
//!
//! let state = State::new("gateway")
//!     .set_periodic(Duration::from_millis(100), Box::new(|_: &&str| {}))
//!     .set_duration(Duration::from_secs(1))
//!     .start()
//!     // ignored, the beacon is already started
//!     .set_duration(Duration::from_secs(5));
//!
//! assert_eq!(
//!     state.schedule(),
//!     Schedule {
//!         periodic: Some(Duration::from_millis(100)),
//!         terminal: Some(Duration::from_secs(1)),
//!     }
//! );
//! ```

use std::{fmt, time::Duration};

/// Function invoked with the beacon target.
pub type Callback<T> = Box<dyn FnMut(&T) + Send + 'static>;

/// Beacon configuration.
pub struct State<T> {
    started: bool,
    target: T,
    duration: Option<Duration>,
    period: Option<Duration>,
    periodic_callback: Option<Callback<T>>,
    term_callback: Option<Callback<T>>,
    cancel_callback: Option<Callback<T>>,
}

/// Timers to arm when a beacon gets enabled.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Schedule {
    /// Delay of the first periodic firing.
    pub periodic: Option<Duration>,
    /// Delay of the terminal firing.
    pub terminal: Option<Duration>,
}

impl Schedule {
    /// Returns `true` if nothing would ever fire.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.periodic.is_none() && self.terminal.is_none()
    }
}

impl<T> State<T> {
    /// Creates a blank, not yet started configuration for `target`.
    pub fn new(target: T) -> Self {
        Self {
            started: false,
            target,
            duration: None,
            period: None,
            periodic_callback: None,
            term_callback: None,
            cancel_callback: None,
        }
    }

    /// Sets the period and the callback invoked on every periodic firing.
    #[must_use]
    pub fn set_periodic(self, period: Duration, callback: Callback<T>) -> Self {
        self.configure(|state| {
            state.period = Some(period);
            state.periodic_callback = Some(callback);
        })
    }

    /// Sets the time after which the beacon terminates itself.
    #[must_use]
    pub fn set_duration(self, duration: Duration) -> Self {
        self.configure(|state| state.duration = Some(duration))
    }

    /// Sets the callback invoked when the duration elapses.
    #[must_use]
    pub fn set_term_callback(self, callback: Callback<T>) -> Self {
        self.configure(|state| state.term_callback = Some(callback))
    }

    /// Sets the callback invoked when the beacon is cancelled.
    #[must_use]
    pub fn set_cancel_callback(self, callback: Callback<T>) -> Self {
        self.configure(|state| state.cancel_callback = Some(callback))
    }

    /// Freezes the configuration.
    #[must_use]
    pub fn start(mut self) -> Self {
        self.started = true;
        self
    }

    /// Timers implied by the current configuration.
    pub fn schedule(&self) -> Schedule {
        Schedule {
            periodic: self.period,
            terminal: self.duration,
        }
    }

    /// Returns `true` once the configuration is frozen.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Value passed to every callback.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Time between periodic firings.
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Time until the terminal firing.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Invokes the periodic callback, if any. Returns `true` if it was invoked.
    pub fn invoke_periodic(&mut self) -> bool {
        invoke(&mut self.periodic_callback, &self.target)
    }

    /// Invokes the terminal callback, if any. Returns `true` if it was invoked.
    pub fn invoke_term(&mut self) -> bool {
        invoke(&mut self.term_callback, &self.target)
    }

    /// Invokes the cancel callback, if any. Returns `true` if it was invoked.
    pub fn invoke_cancel(&mut self) -> bool {
        invoke(&mut self.cancel_callback, &self.target)
    }

    fn configure(mut self, f: impl FnOnce(&mut Self)) -> Self {
        if !self.started {
            f(&mut self);
        }
        self
    }
}

fn invoke<T>(callback: &mut Option<Callback<T>>, target: &T) -> bool {
    callback.as_mut().map(|callback| callback(target)).is_some()
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("started", &self.started)
            .field("target", &self.target)
            .field("duration", &self.duration)
            .field("period", &self.period)
            .field("periodic_callback", &self.periodic_callback.is_some())
            .field("term_callback", &self.term_callback.is_some())
            .field("cancel_callback", &self.cancel_callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const MS: Duration = Duration::from_millis(1);

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> Callback<&'static str> {
        let log = Arc::clone(log);
        Box::new(move |target: &&str| log.lock().unwrap().push(format!("{tag}:{target}")))
    }

    #[test]
    fn test_new_is_blank() {
        let state = State::new(7_u32);
        assert!(!state.is_started());
        assert_eq!(*state.target(), 7);
        assert_eq!(state.period(), None);
        assert_eq!(state.duration(), None);
        assert!(state.schedule().is_inert());
    }

    #[test]
    fn test_last_write_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut state = State::new("t")
            .set_periodic(50 * MS, recorder(&log, "first"))
            .set_periodic(100 * MS, recorder(&log, "second"))
            .set_duration(10 * MS)
            .set_duration(20 * MS)
            .set_cancel_callback(recorder(&log, "cancel-a"))
            .set_cancel_callback(recorder(&log, "cancel-b"))
            .set_term_callback(recorder(&log, "term-a"))
            .set_term_callback(recorder(&log, "term-b"));

        assert_eq!(state.period(), Some(100 * MS));
        assert_eq!(state.duration(), Some(20 * MS));
        assert!(state.invoke_periodic());
        assert!(state.invoke_term());
        assert!(state.invoke_cancel());
        assert_eq!(*log.lock().unwrap(), ["second:t", "term-b:t", "cancel-b:t"]);
    }

    #[test]
    fn test_setters_are_ignored_once_started() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut state = State::new("t")
            .set_periodic(100 * MS, recorder(&log, "periodic"))
            .start()
            .set_periodic(MS, recorder(&log, "late"))
            .set_duration(5 * MS)
            .set_term_callback(recorder(&log, "late"))
            .set_cancel_callback(recorder(&log, "late"));

        assert!(state.is_started());
        assert_eq!(state.period(), Some(100 * MS));
        assert_eq!(state.duration(), None);
        assert!(state.invoke_periodic());
        assert!(!state.invoke_term());
        assert!(!state.invoke_cancel());
        assert_eq!(*log.lock().unwrap(), ["periodic:t"]);
    }

    #[test]
    fn test_schedule_table() {
        let noop = || -> Callback<()> { Box::new(|_: &()| {}) };

        let neither = State::new(());
        assert_eq!(neither.schedule(), Schedule::default());
        assert!(neither.schedule().is_inert());

        let duration_only = State::new(()).set_duration(30 * MS);
        assert_eq!(
            duration_only.schedule(),
            Schedule { periodic: None, terminal: Some(30 * MS) }
        );

        let period_only = State::new(()).set_periodic(10 * MS, noop());
        assert_eq!(
            period_only.schedule(),
            Schedule { periodic: Some(10 * MS), terminal: None }
        );

        let both = State::new(()).set_periodic(10 * MS, noop()).set_duration(30 * MS);
        assert_eq!(
            both.schedule(),
            Schedule { periodic: Some(10 * MS), terminal: Some(30 * MS) }
        );
        assert!(!both.schedule().is_inert());
    }

    #[test]
    fn test_missing_callbacks_are_not_invoked() {
        let mut state = State::new(()).set_duration(MS).start();
        assert!(!state.invoke_periodic());
        assert!(!state.invoke_term());
        assert!(!state.invoke_cancel());
    }
}
