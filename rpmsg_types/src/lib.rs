//! # RPMsg Types
//!
//! This crate defines the vocabulary shared by every RPMsg crate in the
//! workspace: endpoint addresses, the error taxonomy, the name-service wire
//! record and transport buffer handles.
//!
//! ## Philosophy
//!
//! - **Addresses are typed**: an [`Address`] knows whether it is the wildcard,
//!   a well-known reserved address or part of the dynamic pool.
//! - **Errors carry their wire codes**: every [`RpmsgError`] maps to the
//!   numeric code the remote firmware reports.
//! - **Wire layouts are explicit**: the name-service record is encoded and
//!   decoded byte-for-byte, never through a generic serializer.
//!
//! ## Key Types
//!
//! - [`Address`]: 32-bit endpoint address with the range helpers
//! - [`RpmsgError`]: error taxonomy surfaced to callers
//! - [`NsAnnouncement`]: name-service create/destroy record
//! - [`TxBuffer`] / [`RxBuffer`]: transport buffer handles
//! - [`DeviceId`]: identifier used to correlate a device in logs

pub mod address;
pub mod buffer;
pub mod error;
pub mod ids;
pub mod ns;

pub use address::{
    Address, ADDR_ANY, ADDR_BITMAP_SIZE, NAME_SIZE, NS_EPT_ADDR, RESERVED_ADDRESSES,
};
pub use buffer::{BufferId, RxBuffer, TxBuffer};
pub use error::{Result, RpmsgError, RPMSG_ERROR_BASE};
pub use ids::DeviceId;
pub use ns::{truncate_name, NsAnnouncement, NsFlags, NS_MESSAGE_SIZE};
