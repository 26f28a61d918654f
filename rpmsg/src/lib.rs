//! # RPMsg Core
//!
//! This crate implements the endpoint layer of RPMsg: message passing
//! between a host processor and a remote processor over a shared transport.
//!
//! ## Philosophy
//!
//! - **Addresses are owned**: every dynamic address belongs to exactly one
//!   live endpoint, and is returned to the pool when that endpoint goes away
//! - **Services discover each other**: named endpoints announce themselves to
//!   the peer and bind to the peer's announcements
//! - **Transports are capabilities**: the core never touches rings or shared
//!   memory, it calls whatever a [`Transport`] offers
//!
//! ## Architecture
//!
//! A [`Device`] is the context of one link. It guards an [`AddressSpace`]
//! and an [`EndpointRegistry`] with a single lock and holds the link's
//! [`Transport`]. [`Endpoint`]s are created through the device and point back
//! at it without owning it.
//!
//! Inbound messages enter through [`Device::dispatch`], which routes them to
//! the endpoint bound to the destination address. Name-service records from
//! the peer arrive at an internal endpoint and bind or unbind local ones.

pub mod address_space;
pub mod config;
pub mod device;
pub mod endpoint;
pub mod name_service;
pub mod registry;
pub mod transport;

pub use address_space::{AddressSpace, AddressState};
pub use config::{ConfigError, DeviceConfig};
pub use device::{Device, DeviceBuilder, NsBindCallback};
pub use endpoint::{handler_fn, Endpoint, EndpointHandler};
pub use name_service::NS_ENDPOINT_NAME;
pub use registry::EndpointRegistry;
pub use transport::Transport;

pub use rpmsg_types::{
    Address, BufferId, DeviceId, NsAnnouncement, NsFlags, Result, RpmsgError, RxBuffer, TxBuffer,
    ADDR_ANY, ADDR_BITMAP_SIZE, NS_EPT_ADDR, RESERVED_ADDRESSES,
};
