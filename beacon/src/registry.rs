//! Process-wide names for running beacons.
//!
//! A name is held by at most one live beacon at a time. The binding is
//! released when the beacon terminates, however it terminates.

use crate::{Beacon, BeaconId, CreateError};
use dashmap::{DashMap, mapref::entry::Entry};
use std::{any::Any, sync::LazyLock};

static NAMES: LazyLock<DashMap<String, Binding>> = LazyLock::new(DashMap::new);

struct Binding {
    id: BeaconId,
    beacon: Box<dyn Any + Send + Sync>,
    is_alive: fn(&(dyn Any + Send + Sync)) -> bool,
}

impl Binding {
    fn new<T: Send + 'static>(beacon: &Beacon<T>) -> Self {
        Self { id: beacon.id(), beacon: Box::new(beacon.clone()), is_alive: is_alive::<T> }
    }

    fn is_alive(&self) -> bool {
        (self.is_alive)(&*self.beacon)
    }
}

fn is_alive<T: Send + 'static>(beacon: &(dyn Any + Send + Sync)) -> bool {
    beacon.downcast_ref::<Beacon<T>>().is_some_and(Beacon::is_alive)
}

/// Keeps a name bound to a beacon. Owned by the beacon's event loop.
#[derive(Debug)]
pub(crate) struct Registration {
    name: String,
    id: BeaconId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if NAMES.remove_if(&self.name, |_, binding| binding.id == self.id).is_some() {
            tracing::debug!(beacon = %self.id, name = %self.name, "name released");
        }
    }
}

/// Binds `name` to `beacon`.
///
/// A binding left behind by a terminated beacon is taken over.
pub(crate) fn register<T: Send + 'static>(
    name: &str,
    beacon: &Beacon<T>,
) -> Result<Registration, CreateError> {
    match NAMES.entry(name.to_owned()) {
        Entry::Occupied(mut occupied) => {
            if occupied.get().is_alive() {
                return Err(CreateError::AlreadyStarted {
                    name: name.to_owned(),
                    id: occupied.get().id,
                });
            }
            occupied.insert(Binding::new(beacon));
        }
        Entry::Vacant(vacant) => {
            vacant.insert(Binding::new(beacon));
        }
    }
    Ok(Registration { name: name.to_owned(), id: beacon.id() })
}

/// Resolves `name` to a live beacon with target type `T`.
pub(crate) fn whereis<T: Send + 'static>(name: &str) -> Option<Beacon<T>> {
    let binding = NAMES.get(name)?;
    let beacon = binding.beacon.downcast_ref::<Beacon<T>>()?;
    beacon.is_alive().then(|| beacon.clone())
}
