//! Bounded pool of externally allocated sandbox identifiers: telemetry
//! ports and snapshot image names. One mutex guards the whole pool; no
//! process-wide globals.

use std::sync::Mutex;

use tracing::debug;

/// A checked-out (port, image name) pair. Identified by slot index so a
/// release is tied to the exact slot that was acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    slot: usize,
    port: u16,
    image: String,
}

impl Lease {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn image(&self) -> &str {
        &self.image
    }
}

/// Fixed set of (port, image) slots behind one mutex.
pub struct ResourcePool {
    inner: Mutex<Vec<Slot>>,
}

struct Slot {
    port: u16,
    image: String,
    in_use: bool,
}

impl ResourcePool {
    pub fn new(slots: impl IntoIterator<Item = (u16, String)>) -> Self {
        let inner = slots
            .into_iter()
            .map(|(port, image)| Slot {
                port,
                image,
                in_use: false,
            })
            .collect();
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Check out a free slot, if one exists.
    pub fn acquire(&self) -> Option<Lease> {
        let mut slots = self.inner.lock().unwrap();
        let (index, slot) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.in_use)?;
        slot.in_use = true;
        debug!(slot = index, port = slot.port, "resource acquired");
        Some(Lease {
            slot: index,
            port: slot.port,
            image: slot.image.clone(),
        })
    }

    /// Return a lease. Idempotent: releasing an already-free slot is a
    /// no-op.
    pub fn release(&self, lease: &Lease) {
        let mut slots = self.inner.lock().unwrap();
        if let Some(slot) = slots.get_mut(lease.slot) {
            if slot.in_use {
                slot.in_use = false;
                debug!(slot = lease.slot, port = slot.port, "resource released");
            }
        }
    }

    pub fn available(&self) -> usize {
        self.inner.lock().unwrap().iter().filter(|s| !s.in_use).count()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}
