//! Name-service announce record
//!
//! The record is what a device sends to the peer's name-service endpoint when
//! a named endpoint appears or disappears. Its layout must match the remote
//! parser byte-for-byte:
//!
//! ```text
//! offset  size  field
//! 0       32    name, NUL-padded, not necessarily NUL-terminated
//! 32      4     address (little-endian u32)
//! 36      4     flags   (little-endian u32: 0 = create, 1 = destroy)
//! ```

use crate::address::{Address, NAME_SIZE};
use crate::error::{Result, RpmsgError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of an encoded record
pub const NS_MESSAGE_SIZE: usize = NAME_SIZE + 4 + 4;

/// Action carried by a name-service record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum NsFlags {
    /// A named endpoint was created
    Create = 0,
    /// A named endpoint was destroyed
    Destroy = 1,
}

impl NsFlags {
    /// Parses the wire value
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(NsFlags::Create),
            1 => Some(NsFlags::Destroy),
            _ => None,
        }
    }

    /// Returns the wire value
    pub const fn raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for NsFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NsFlags::Create => write!(f, "create"),
            NsFlags::Destroy => write!(f, "destroy"),
        }
    }
}

/// Truncates a name to the wire width without splitting a UTF-8 sequence
pub fn truncate_name(name: &str) -> &str {
    if name.len() <= NAME_SIZE {
        return name;
    }
    let mut end = NAME_SIZE;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// A decoded name-service record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NsAnnouncement {
    /// Endpoint name, at most `NAME_SIZE` bytes
    pub name: String,
    /// Address of the announced endpoint
    pub addr: Address,
    /// Create or destroy
    pub flags: NsFlags,
}

impl NsAnnouncement {
    /// Creates a record, truncating the name to the wire width
    pub fn new(name: &str, addr: Address, flags: NsFlags) -> Self {
        Self {
            name: truncate_name(name).to_string(),
            addr,
            flags,
        }
    }

    /// Encodes the record in its wire layout
    pub fn to_bytes(&self) -> [u8; NS_MESSAGE_SIZE] {
        let mut bytes = [0u8; NS_MESSAGE_SIZE];
        let name = truncate_name(&self.name).as_bytes();
        bytes[..name.len()].copy_from_slice(name);
        bytes[NAME_SIZE..NAME_SIZE + 4].copy_from_slice(&self.addr.raw().to_le_bytes());
        bytes[NAME_SIZE + 4..].copy_from_slice(&self.flags.raw().to_le_bytes());
        bytes
    }

    /// Decodes a record received from the peer
    ///
    /// Fails with `InvalidBufferSize` when the length is not exactly
    /// [`NS_MESSAGE_SIZE`] and with `InvalidParam` for unknown flags or a name
    /// that is not UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NS_MESSAGE_SIZE {
            return Err(RpmsgError::InvalidBufferSize);
        }

        let name_field = &bytes[..NAME_SIZE];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_SIZE);
        let name = core::str::from_utf8(&name_field[..name_len])
            .map_err(|_| RpmsgError::InvalidParam)?
            .to_string();

        let addr = u32::from_le_bytes(read_word(bytes, NAME_SIZE));
        let flags = u32::from_le_bytes(read_word(bytes, NAME_SIZE + 4));
        let flags = NsFlags::from_raw(flags).ok_or(RpmsgError::InvalidParam)?;

        Ok(Self {
            name,
            addr: Address(addr),
            flags,
        })
    }
}

fn read_word(bytes: &[u8], offset: usize) -> [u8; 4] {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let record = NsAnnouncement::new("echo", Address(0x400), NsFlags::Create);
        let bytes = record.to_bytes();

        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[..4], b"echo");
        assert!(bytes[4..NAME_SIZE].iter().all(|&b| b == 0));
        assert_eq!(&bytes[32..36], &[0x00, 0x04, 0x00, 0x00]);
        assert_eq!(&bytes[36..40], &[0, 0, 0, 0]);

        let destroy = NsAnnouncement::new("echo", Address(0x400), NsFlags::Destroy);
        assert_eq!(&destroy.to_bytes()[36..40], &[1, 0, 0, 0]);
    }

    #[test]
    fn test_long_name_fills_field_without_terminator() {
        let name = "a".repeat(40);
        let record = NsAnnouncement::new(&name, Address(0x401), NsFlags::Create);
        assert_eq!(record.name.len(), NAME_SIZE);

        let decoded = NsAnnouncement::from_bytes(&record.to_bytes()).unwrap();
        assert_eq!(decoded.name, "a".repeat(NAME_SIZE));
        assert_eq!(decoded.addr, Address(0x401));
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let name = format!("{}é", "x".repeat(31));
        assert_eq!(name.len(), 33);
        assert_eq!(truncate_name(&name), "x".repeat(31));
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        assert_eq!(
            NsAnnouncement::from_bytes(&[0u8; 12]),
            Err(RpmsgError::InvalidBufferSize)
        );
    }

    #[test]
    fn test_decode_rejects_unknown_flags() {
        let mut bytes = NsAnnouncement::new("svc", Address(1), NsFlags::Create).to_bytes();
        bytes[36] = 7;
        assert_eq!(
            NsAnnouncement::from_bytes(&bytes),
            Err(RpmsgError::InvalidParam)
        );
    }
}
