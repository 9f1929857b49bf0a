//! # Partition lease as seen by a pump.
//!
//! The lease store owns leases; a pump holds an `Arc<Lease>` and only touches the epoch.
//! Before every open attempt the pump reads [`Lease::epoch`]; once the receiver request
//! for that attempt has been issued it writes the same value back with
//! [`Lease::stamp_epoch`], so the store's next renewal persists the epoch actually used
//! on the wire, even if the store raised the epoch while the attempt was in flight.
//! A renewal between attempts is picked up by the next attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Exclusive, time-bounded ownership record for one partition.
#[derive(Debug)]
pub struct Lease {
    partition_id: Arc<str>,
    owner: Arc<str>,
    epoch: AtomicU64,
}

impl Lease {
    /// Creates a lease held by `owner` at `epoch`.
    pub fn new(partition_id: impl Into<Arc<str>>, owner: impl Into<Arc<str>>, epoch: u64) -> Self {
        Self {
            partition_id: partition_id.into(),
            owner: owner.into(),
            epoch: AtomicU64::new(epoch),
        }
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Current epoch.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Records the epoch an open attempt used on the wire, replacing the current value.
    #[inline]
    pub fn stamp_epoch(&self, epoch: u64) {
        self.epoch.store(epoch, Ordering::Release);
    }

    /// Raises the epoch, as the lease store does on takeover. Returns the new value.
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}
