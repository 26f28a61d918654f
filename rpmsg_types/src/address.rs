//! Endpoint addresses and the address-space geometry

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw value of the wildcard address.
pub const ADDR_ANY: u32 = 0xFFFF_FFFF;

/// Addresses below this bound are well-known and never tracked.
pub const RESERVED_ADDRESSES: u32 = 1024;

/// Number of dynamically allocatable addresses.
pub const ADDR_BITMAP_SIZE: usize = 128;

/// Well-known address of the name-service endpoint.
pub const NS_EPT_ADDR: Address = Address(0x35);

/// Width of an endpoint name, in bytes, on the wire.
pub const NAME_SIZE: usize = 32;

/// A 32-bit endpoint address
///
/// The address space is split into three parts:
/// - `[0, RESERVED_ADDRESSES)`: well-known services, assigned statically
/// - `[RESERVED_ADDRESSES, RESERVED_ADDRESSES + ADDR_BITMAP_SIZE)`: dynamic pool
/// - [`Address::ANY`]: the wildcard, meaning "unassigned"
///
/// Anything else is outside every range and cannot be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub u32);

impl Address {
    /// The wildcard address
    pub const ANY: Address = Address(ADDR_ANY);

    /// Creates an address from its raw value
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Checks if this is the wildcard address
    pub const fn is_any(self) -> bool {
        self.0 == ADDR_ANY
    }

    /// Checks if this is a well-known (statically assigned) address
    pub const fn is_reserved(self) -> bool {
        self.0 < RESERVED_ADDRESSES
    }

    /// Checks if this address belongs to the dynamic pool
    pub const fn is_dynamic(self) -> bool {
        self.pool_index().is_some()
    }

    /// Returns the bit index of this address within the dynamic pool
    pub const fn pool_index(self) -> Option<usize> {
        if self.0 < RESERVED_ADDRESSES {
            return None;
        }
        let index = (self.0 - RESERVED_ADDRESSES) as usize;
        if index < ADDR_BITMAP_SIZE {
            Some(index)
        } else {
            None
        }
    }

    /// Returns the dynamic address for a pool bit index
    pub const fn from_pool_index(index: usize) -> Option<Self> {
        if index < ADDR_BITMAP_SIZE {
            Some(Self(RESERVED_ADDRESSES + index as u32))
        } else {
            None
        }
    }
}

impl From<u32> for Address {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Address> for u32 {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "ANY")
        } else {
            write!(f, "{:#x}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_ranges() {
        assert!(Address::ANY.is_any());
        assert!(!Address::ANY.is_reserved());
        assert!(!Address::ANY.is_dynamic());

        assert!(Address(0).is_reserved());
        assert!(NS_EPT_ADDR.is_reserved());
        assert!(Address(RESERVED_ADDRESSES - 1).is_reserved());

        assert!(Address(RESERVED_ADDRESSES).is_dynamic());
        assert!(Address(RESERVED_ADDRESSES + ADDR_BITMAP_SIZE as u32 - 1).is_dynamic());
        assert!(!Address(RESERVED_ADDRESSES + ADDR_BITMAP_SIZE as u32).is_dynamic());
        assert!(!Address(RESERVED_ADDRESSES + ADDR_BITMAP_SIZE as u32).is_reserved());
    }

    #[test]
    fn test_pool_index_mapping() {
        assert_eq!(Address(RESERVED_ADDRESSES).pool_index(), Some(0));
        assert_eq!(Address(RESERVED_ADDRESSES + 5).pool_index(), Some(5));
        assert_eq!(Address(3).pool_index(), None);
        assert_eq!(Address::from_pool_index(7), Some(Address(RESERVED_ADDRESSES + 7)));
        assert_eq!(Address::from_pool_index(ADDR_BITMAP_SIZE), None);
    }

    #[test]
    fn test_address_display() {
        assert_eq!(format!("{}", Address::ANY), "ANY");
        assert_eq!(format!("{}", Address(0x400)), "0x400");
    }
}
