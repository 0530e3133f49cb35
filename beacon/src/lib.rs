//! Self-scheduling units that periodically reach a target.
//!
//! There are three main components:
//! - **Beacon** - an independently running unit that owns a target value and
//!   invokes callbacks against it on a timer.
//! - **State** - the beacon configuration and its pure transitions. See
//!   [`state`].
//! - **Registry** - optional process-wide names for running beacons.
//!
//! # Beacon
//!
//! A beacon is created with [`Beacon::create`], configured with the `set_*`
//! methods, and started with [`Beacon::enable`]. All of these are
//! fire-and-forget: they enqueue a command into the beacon's inbox and return
//! immediately. Commands and timer firings are processed one at a time, in
//! the order they arrive.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! use beacon::{Beacon, Options};
//! use std::time::Duration;
//!
//! let beacon = Beacon::create("10.0.0.1", Options::default()).unwrap();
//! beacon
//!     .set_periodic_callback(Duration::from_millis(100), |target| {
//!         println!("ping {target}");
//!     })
//!     .set_duration_with_callback(Duration::from_secs(1), |target| {
//!         println!("done with {target}");
//!     })
//!     .set_cancel_callback(|target| println!("gave up on {target}"))
//!     .enable();
//!
//! beacon.terminated().await;
//! # }
//! ```
//!
//! When enabled, a beacon arms its timers according to its configuration:
//!
//! | period | duration | on enable |
//! |--------|----------|-----------|
//! | -      | set      | terminal firing after `duration` |
//! | set    | -        | periodic firing after `period`, rescheduled after each firing |
//! | set    | set      | both of the above, independently |
//! | -      | -        | nothing; the beacon idles until cancelled |
//!
//! The terminal firing invokes the term callback and ends the beacon.
//! [`Beacon::cancel`] invokes the cancel callback and ends the beacon, whether
//! it was enabled or not. Once a beacon has ended, its pending timers never
//! fire.
//!
//! Enabling a beacon freezes its configuration: setters and further enables
//! are silently ignored afterwards. To change the schedule, cancel the beacon
//! and create a new one.
//!
//! # Placement
//!
//! By default a beacon runs as a task on the ambient tokio runtime. With
//! [`Placement::Thread`] it gets a dedicated OS thread with its own runtime,
//! which keeps blocking callbacks away from the rest of the application.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod mailbox;
mod process;
mod registry;
pub mod state;

use mailbox::Command;
use std::{
    fmt, io,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use thiserror::Error;

/// Process-unique beacon identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, derive_more::Display)]
#[display("{_0}")]
pub struct BeaconId(u64);

impl BeaconId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Where a beacon's event loop runs.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Placement {
    /// A task on the tokio runtime of the caller of [`Beacon::create`].
    #[default]
    Task,
    /// A dedicated OS thread running its own single-threaded runtime.
    Thread,
}

/// Hints for the execution substrate.
#[derive(Clone, Debug, Default, bon::Builder)]
pub struct SpawnHints {
    /// Where to run the beacon.
    #[builder(default)]
    pub placement: Placement,
    /// Name of the dedicated thread. Defaults to `bcn-<name>` or `bcn-<id>`.
    ///
    /// Only used with [`Placement::Thread`].
    #[builder(into)]
    pub thread_name: Option<String>,
}

/// Beacon creation options.
#[derive(Clone, Debug, Default, bon::Builder)]
pub struct Options {
    /// Registers the beacon under this name. See [`Beacon::whereis`].
    #[builder(into)]
    pub name: Option<String>,
    /// Execution hints.
    #[builder(default)]
    pub hints: SpawnHints,
}

/// The type of error that can occur when creating a beacon.
#[derive(Error, Debug)]
pub enum CreateError {
    /// The name is held by another running beacon.
    #[error("beacon {name} is already started as {id}")]
    AlreadyStarted {
        /// Requested name.
        name: String,
        /// Beacon holding the name.
        id: BeaconId,
    },
    /// The substrate couldn't start the beacon.
    #[error("beacon initialization: {0}")]
    Init(#[from] InitError),
}

/// The substrate couldn't start a beacon.
#[derive(Error, Debug)]
pub enum InitError {
    /// [`Placement::Task`] requires a tokio runtime.
    #[error("no tokio runtime to spawn the beacon task on")]
    NoRuntime,
    /// A tokio runtime for the dedicated thread couldn't be built.
    #[error("runtime: {0}")]
    Runtime(io::Error),
    /// The dedicated thread couldn't be spawned.
    #[error("thread spawning: {0}")]
    SpawnThread(io::Error),
}

/// Handle to a running beacon.
///
/// Handles are cheap to clone. Dropping every handle doesn't stop the beacon,
/// only [`Beacon::cancel`] or the elapsed duration does.
pub struct Beacon<T> {
    id: BeaconId,
    name: Option<Arc<str>>,
    tx: mailbox::Sender<T>,
}

impl<T: Send + 'static> Beacon<T> {
    /// Spawns a new beacon owning `target`.
    ///
    /// The beacon does nothing until it is [enabled](Self::enable) or
    /// [cancelled](Self::cancel).
    pub fn create(target: T, options: Options) -> Result<Self, CreateError> {
        process::spawn(target, options)
    }

    /// Looks up a running beacon registered under `name`.
    ///
    /// Returns `None` if there is no such beacon or its target isn't a `T`.
    #[must_use]
    pub fn whereis(name: &str) -> Option<Self> {
        registry::whereis(name)
    }

    /// Sets the callback invoked every `period` once the beacon is enabled.
    ///
    /// Ignored if the beacon is already enabled.
    pub fn set_periodic_callback(
        &self,
        period: Duration,
        callback: impl FnMut(&T) + Send + 'static,
    ) -> &Self {
        self.send(Command::SetPeriodic { period, callback: Box::new(callback) })
    }

    /// Makes the beacon terminate itself `duration` after it's enabled.
    ///
    /// Ignored if the beacon is already enabled.
    pub fn set_duration(&self, duration: Duration) -> &Self {
        self.send(Command::SetDuration { duration, callback: None })
    }

    /// Same as [`set_duration`](Self::set_duration), also setting the callback
    /// invoked when the duration elapses.
    pub fn set_duration_with_callback(
        &self,
        duration: Duration,
        callback: impl FnMut(&T) + Send + 'static,
    ) -> &Self {
        self.send(Command::SetDuration { duration, callback: Some(Box::new(callback)) })
    }

    /// Sets the callback invoked when the duration elapses.
    ///
    /// Ignored if the beacon is already enabled.
    pub fn set_term_callback(&self, callback: impl FnMut(&T) + Send + 'static) -> &Self {
        self.send(Command::SetTermCallback(Box::new(callback)))
    }

    /// Sets the callback invoked if the beacon is cancelled.
    ///
    /// Ignored if the beacon is already enabled.
    pub fn set_cancel_callback(&self, callback: impl FnMut(&T) + Send + 'static) -> &Self {
        self.send(Command::SetCancelCallback(Box::new(callback)))
    }

    /// Arms the beacon timers according to its current configuration.
    pub fn enable(&self) {
        self.send(Command::Enable);
    }

    /// Stops the beacon, invoking the cancel callback if there is one.
    pub fn cancel(&self) {
        self.send(Command::Cancel);
    }

    fn send(&self, command: Command<T>) -> &Self {
        if let Err(err) = self.tx.send(command) {
            tracing::debug!(beacon = %self.id, command = ?err.0, "beacon is gone, dropping command");
        }
        self
    }
}

impl<T> Beacon<T> {
    /// Beacon identifier.
    #[must_use]
    pub fn id(&self) -> BeaconId {
        self.id
    }

    /// Name the beacon is registered under.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` until the beacon terminates.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Resolves once the beacon has terminated.
    pub async fn terminated(&self) {
        self.tx.closed().await;
    }
}

impl<T> Clone for Beacon<T> {
    fn clone(&self) -> Self {
        Self { id: self.id, name: self.name.clone(), tx: self.tx.clone() }
    }
}

impl<T> fmt::Debug for Beacon<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Beacon")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}
