//! In-memory registry of known devices.
//!
//! The registry is fed by the dispatcher: [`DeviceRegistry::attach`] registers
//! callbacks for found and removed devices. Callers only read snapshots.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::event::{Event, EventDispatcher, EventKind, SubscriptionId};
use crate::types::{Address, DeviceIdentity};

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The address was new.
    Inserted,
    /// The address was known and its name changed.
    Renamed,
    /// Nothing changed.
    Unchanged,
}

/// Known devices, deduplicated by address, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<Vec<DeviceIdentity>>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the registry in sync with found and removed device events.
    pub(crate) fn attach(&self, dispatcher: &EventDispatcher) -> [SubscriptionId; 2] {
        let found = self.clone();
        let found_id = dispatcher.subscribe(EventKind::DeviceFound, move |event| {
            if let Event::DeviceFound { device, .. } = event {
                found.upsert(device.clone());
            }
            Ok(())
        });

        let removed = self.clone();
        let removed_id = dispatcher.subscribe(EventKind::DeviceRemoved, move |event| {
            if let Event::DeviceRemoved { address } = event {
                removed.remove(address);
            }
            Ok(())
        });

        [found_id, removed_id]
    }

    /// Inserts an unseen address, or renames a known one when the new name is
    /// non-empty.
    pub(crate) fn upsert(&self, identity: DeviceIdentity) -> Upsert {
        let mut devices = self.write();
        match devices
            .iter_mut()
            .find(|known| known.address == identity.address)
        {
            Some(known) if !identity.name.is_empty() && known.name != identity.name => {
                tracing::debug!("renamed {} to {:?}", known.address, identity.name);
                known.name = identity.name;
                Upsert::Renamed
            }
            Some(_) => Upsert::Unchanged,
            None => {
                tracing::debug!("registered {} {:?}", identity.address, identity.name);
                devices.push(identity);
                Upsert::Inserted
            }
        }
    }

    /// Removes an address. Returns false if it was unknown.
    pub(crate) fn remove(&self, address: &Address) -> bool {
        let mut devices = self.write();
        let before = devices.len();
        devices.retain(|known| known.address != *address);
        devices.len() != before
    }

    /// Returns the devices matching `filter`, in insertion order.
    #[must_use]
    pub fn list<F>(&self, filter: F) -> Vec<DeviceIdentity>
    where
        F: Fn(&DeviceIdentity) -> bool,
    {
        self.read()
            .iter()
            .filter(|device| filter(device))
            .cloned()
            .collect()
    }

    /// Returns every known device, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DeviceIdentity> {
        self.list(|_| true)
    }

    /// Looks up a device by address.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<DeviceIdentity> {
        self.read()
            .iter()
            .find(|known| known.address == *address)
            .cloned()
    }

    /// Returns true if the address is known.
    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.read().iter().any(|known| known.address == *address)
    }

    /// Returns the number of known devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no device is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<DeviceIdentity>> {
        self.devices.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<DeviceIdentity>> {
        self.devices.write().unwrap_or_else(PoisonError::into_inner)
    }
}
