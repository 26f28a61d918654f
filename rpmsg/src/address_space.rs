//! Dynamic address allocation
//!
//! Each device owns one [`AddressSpace`]. It tracks the dynamic pool
//! `[RESERVED_ADDRESSES, RESERVED_ADDRESSES + ADDR_BITMAP_SIZE)` bit-for-bit;
//! well-known addresses below the pool are never tracked.
//!
//! Bit `i` is set iff address `RESERVED_ADDRESSES + i` is owned by exactly one
//! live endpoint. The device lock guards the space together with the endpoint
//! registry, so allocation and registration are observed as one step.

use rpmsg_types::{Address, Result, RpmsgError, ADDR_BITMAP_SIZE};

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = ADDR_BITMAP_SIZE.div_ceil(WORD_BITS);

/// Outcome of querying an address against the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressState {
    /// The address is in the pool and owned
    Set,
    /// The address is in the pool and free
    Clear,
    /// The address is not part of the pool
    OutOfRange,
}

/// Fixed-size bitset with index-checked operations
#[derive(Debug, Clone, PartialEq, Eq)]
struct AddressBitmap {
    words: [u64; WORDS],
}

impl AddressBitmap {
    const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    fn test(&self, index: usize) -> bool {
        debug_assert!(index < ADDR_BITMAP_SIZE);
        self.words[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    fn set(&mut self, index: usize) {
        debug_assert!(index < ADDR_BITMAP_SIZE);
        self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
    }

    fn clear(&mut self, index: usize) {
        debug_assert!(index < ADDR_BITMAP_SIZE);
        self.words[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
    }

    fn first_clear(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map(|(i, word)| i * WORD_BITS + word.trailing_ones() as usize)
            .filter(|&index| index < ADDR_BITMAP_SIZE)
    }

    fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Allocator for dynamic endpoint addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSpace {
    bitmap: AddressBitmap,
}

impl AddressSpace {
    /// Creates an empty address space
    pub const fn new() -> Self {
        Self {
            bitmap: AddressBitmap::new(),
        }
    }

    /// Allocates the lowest free dynamic address
    ///
    /// Returns [`Address::ANY`] when the pool is exhausted.
    pub fn allocate(&mut self) -> Address {
        match self.bitmap.first_clear() {
            Some(index) => {
                self.bitmap.set(index);
                Address::from_pool_index(index).unwrap_or(Address::ANY)
            }
            None => Address::ANY,
        }
    }

    /// Marks a specific dynamic address as owned
    pub fn reserve(&mut self, addr: Address) -> Result<()> {
        let index = addr.pool_index().ok_or(RpmsgError::InvalidAddress)?;
        if self.bitmap.test(index) {
            return Err(RpmsgError::AddressInUse);
        }
        self.bitmap.set(index);
        Ok(())
    }

    /// Frees a dynamic address
    ///
    /// Addresses outside the pool are ignored, unlike [`reserve`] and
    /// [`state`] which report them.
    ///
    /// [`reserve`]: AddressSpace::reserve
    /// [`state`]: AddressSpace::state
    pub fn release(&mut self, addr: Address) {
        if let Some(index) = addr.pool_index() {
            self.bitmap.clear(index);
        }
    }

    /// Queries whether an address is owned, free or outside the pool
    pub fn state(&self, addr: Address) -> AddressState {
        match addr.pool_index() {
            Some(index) if self.bitmap.test(index) => AddressState::Set,
            Some(_) => AddressState::Clear,
            None => AddressState::OutOfRange,
        }
    }

    /// Returns the number of owned dynamic addresses
    pub fn in_use(&self) -> usize {
        self.bitmap.count()
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}
