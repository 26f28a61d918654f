//! Unique identifiers for RPMsg entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a device
///
/// A device is the per-link context towards one remote processor. The
/// identifier carries no protocol meaning; it only tags log lines so that
/// several links in one process can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(Uuid);

impl DeviceId {
    /// Creates a new random device ID
    pub fn new() -> Self {
        Self(fresh_uuid())
    }

    /// Creates a device ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device({})", self.0)
    }
}

// Firmware images have no entropy source, so ids there are counter-based.
#[cfg(target_os = "none")]
fn fresh_uuid() -> Uuid {
    use core::sync::atomic::{AtomicU64, Ordering};

    static NEXT: AtomicU64 = AtomicU64::new(1);
    let seq = NEXT.fetch_add(1, Ordering::Relaxed);

    let mut bytes = [0u8; 16];
    bytes[8..].copy_from_slice(&seq.to_le_bytes());
    Uuid::from_bytes(bytes)
}

#[cfg(not(target_os = "none"))]
fn fresh_uuid() -> Uuid {
    Uuid::new_v4()
}
