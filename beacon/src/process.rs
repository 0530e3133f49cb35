//! Running beacons.
//!
//! Each beacon is an event loop owning its [`State`] and draining its inbox one
//! command at a time. Callbacks run inline on the loop, so a slow callback
//! delays this beacon's later commands and firings, and nothing else.
//!
//! A callback panic is not caught: it tears down the beacon's task or thread
//! the same way any other panic would.

use crate::{
    Beacon, BeaconId, CreateError, InitError, Options, Placement,
    mailbox::{self, Command, Receiver, Timers},
    registry::{self, Registration},
    state::State,
};
use std::{fmt, sync::Arc, thread};
use tokio::runtime;
use tracing::{Instrument as _, debug, info, info_span, trace};

/// Used to tell the event loop whether it should keep going.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Continue,
    Exit(ExitReason),
}

/// Why a beacon stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ExitReason {
    Cancelled,
    Elapsed,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::Elapsed => f.write_str("duration elapsed"),
        }
    }
}

/// Allocates a beacon for `target` and starts its event loop.
pub(crate) fn spawn<T: Send + 'static>(
    target: T,
    options: Options,
) -> Result<Beacon<T>, CreateError> {
    let Options { name, hints } = options;
    let id = BeaconId::next();
    let (tx, rx) = mailbox::new();
    let beacon = Beacon { id, name: name.map(Arc::from), tx };

    let registration = beacon
        .name()
        .map(|name| registry::register(name, &beacon))
        .transpose()?;
    let span = info_span!("beacon", id = %id, name = beacon.name());
    let event_loop = run(State::new(target), rx, Timers::new(beacon.tx.clone()), registration)
        .instrument(span);

    match hints.placement {
        Placement::Task => spawn_task(event_loop)?,
        Placement::Thread => {
            let thread_name = hints.thread_name.unwrap_or_else(|| match beacon.name() {
                Some(name) => format!("bcn-{name}"),
                None => format!("bcn-{id}"),
            });
            spawn_thread(thread_name, event_loop)?;
        }
    }
    info!(beacon = %id, name = beacon.name(), placement = ?hints.placement, "beacon spawned");

    Ok(beacon)
}

fn spawn_task(event_loop: impl Future<Output = ()> + Send + 'static) -> Result<(), InitError> {
    let rt = runtime::Handle::try_current().map_err(|_| InitError::NoRuntime)?;
    rt.spawn(event_loop);
    Ok(())
}

fn spawn_thread(
    thread_name: String,
    event_loop: impl Future<Output = ()> + Send + 'static,
) -> Result<(), InitError> {
    let rt = runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(InitError::Runtime)?;
    thread::Builder::new()
        .name(thread_name)
        .spawn(move || rt.block_on(event_loop))
        .map_err(InitError::SpawnThread)?;
    Ok(())
}

async fn run<T: Send + 'static>(
    mut state: State<T>,
    mut inbox: Receiver<T>,
    mut timers: Timers<T>,
    registration: Option<Registration>,
) {
    let mut reason = None;
    while let Some(command) = inbox.recv().await {
        timers.reap();
        let (next, flow) = handle(state, command, &mut timers);
        state = next;
        if let Flow::Exit(exit) = flow {
            reason = Some(exit);
            break;
        }
    }
    // Pending timers must never fire into a terminated beacon.
    drop(timers);
    drop(inbox);
    drop(registration);
    match reason {
        Some(reason) => info!("beacon terminated: {reason}"),
        None => info!("beacon terminated: inbox closed"),
    }
}

fn handle<T: Send + 'static>(
    mut state: State<T>,
    command: Command<T>,
    timers: &mut Timers<T>,
) -> (State<T>, Flow) {
    trace!(?command, pending_timers = timers.len(), "processing command");
    let state = match command {
        Command::SetPeriodic { period, callback } => {
            configure(state, "set_periodic_callback", |s| s.set_periodic(period, callback))
        }
        Command::SetDuration { duration, callback } => {
            configure(state, "set_duration", |s| {
                let s = s.set_duration(duration);
                match callback {
                    Some(callback) => s.set_term_callback(callback),
                    None => s,
                }
            })
        }
        Command::SetTermCallback(callback) => {
            configure(state, "set_term_callback", |s| s.set_term_callback(callback))
        }
        Command::SetCancelCallback(callback) => {
            configure(state, "set_cancel_callback", |s| s.set_cancel_callback(callback))
        }
        Command::Enable => enable(state, timers),
        Command::Cancel => {
            if state.invoke_cancel() {
                debug!("cancel callback invoked");
            }
            return (state, Flow::Exit(ExitReason::Cancelled));
        }
        Command::Periodic => {
            state.invoke_periodic();
            if let Some(period) = state.period() {
                timers.send_in(Command::Periodic, period);
            }
            state
        }
        Command::Terminal => {
            if state.invoke_term() {
                debug!("terminal callback invoked");
            }
            return (state, Flow::Exit(ExitReason::Elapsed));
        }
    };
    (state, Flow::Continue)
}

fn configure<T>(
    state: State<T>,
    setter: &'static str,
    f: impl FnOnce(State<T>) -> State<T>,
) -> State<T> {
    if state.is_started() {
        debug!(setter, "beacon already enabled, ignoring configuration");
        return state;
    }
    f(state)
}

fn enable<T: Send + 'static>(state: State<T>, timers: &mut Timers<T>) -> State<T> {
    if state.is_started() {
        debug!("beacon already enabled, ignoring enable");
        return state;
    }
    let schedule = state.schedule();
    if let Some(period) = schedule.periodic {
        timers.send_in(Command::Periodic, period);
    }
    if let Some(duration) = schedule.terminal {
        timers.send_in(Command::Terminal, duration);
    }
    if schedule.is_inert() {
        info!("beacon enabled without period or duration, waiting for cancellation");
    } else {
        info!(period = ?schedule.periodic, duration = ?schedule.terminal, "beacon enabled");
    }
    state.start()
}
