//! Transport buffer handles
//!
//! Buffers belong to the transport. The core only moves these handles between
//! the transport and endpoint handlers; it never allocates payload memory of
//! its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Identifier of a transport buffer slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BufferId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({})", self.0)
    }
}

/// A transmit payload buffer lent out by the transport
///
/// Obtained through `get_tx_payload_buffer`, filled in place, then either
/// sent with a no-copy send (which hands it back to the transport) or
/// returned unused with `release_tx_buffer`.
#[derive(Debug, PartialEq, Eq)]
pub struct TxBuffer {
    id: BufferId,
    payload: Vec<u8>,
}

impl TxBuffer {
    /// Creates a zeroed buffer of `capacity` bytes
    pub fn new(id: BufferId, capacity: usize) -> Self {
        Self {
            id,
            payload: vec![0; capacity],
        }
    }

    /// Returns the slot identifier
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Returns the usable payload size
    pub fn capacity(&self) -> usize {
        self.payload.len()
    }

    /// Consumes the handle, returning the slot and its bytes
    pub fn into_parts(self) -> (BufferId, Vec<u8>) {
        (self.id, self.payload)
    }
}

impl Deref for TxBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.payload
    }
}

impl DerefMut for TxBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }
}

/// A received message buffer
///
/// Handlers see the payload through `Deref<Target = [u8]>`; its length is
/// the message length. A handler that needs the data beyond the callback
/// holds the buffer and releases it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxBuffer {
    id: BufferId,
    payload: Vec<u8>,
}

impl RxBuffer {
    /// Wraps a received payload
    pub fn new(id: BufferId, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }

    /// Returns the slot identifier
    pub fn id(&self) -> BufferId {
        self.id
    }
}

impl Deref for RxBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_buffer_fill_in_place() {
        let mut buffer = TxBuffer::new(BufferId(3), 8);
        assert_eq!(buffer.capacity(), 8);
        buffer[..3].copy_from_slice(b"abc");

        let (id, bytes) = buffer.into_parts();
        assert_eq!(id, BufferId(3));
        assert_eq!(&bytes[..3], b"abc");
        assert_eq!(bytes[3..], [0; 5]);
    }

    #[test]
    fn test_rx_buffer_exposes_payload() {
        let buffer = RxBuffer::new(BufferId(1), b"ping".to_vec());
        assert_eq!(buffer.len(), 4);
        assert_eq!(&buffer[..], b"ping");
        assert_eq!(buffer.id(), BufferId(1));
    }
}
