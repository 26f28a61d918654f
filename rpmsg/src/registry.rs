//! Endpoint registry
//!
//! Live endpoints of one device, kept in registration order. Order matters:
//! when several endpoints share a name, lookup returns the earliest
//! registered match.
//!
//! The registry itself is not synchronized. Every method is called with the
//! device lock held, together with the address space it is paired with.

use crate::device::DeviceShared;
use crate::endpoint::Endpoint;
use rpmsg_types::{truncate_name, Address};
use std::sync::Weak;

/// Ordered collection of live endpoints
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Endpoint>,
}

impl EndpointRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self {
            endpoints: Vec::new(),
        }
    }

    /// Appends an endpoint and points it back at its device
    pub(crate) fn register(&mut self, ept: &Endpoint, device: Weak<DeviceShared>) {
        ept.attach(device);
        self.endpoints.push(ept.clone());
    }

    /// Removes an endpoint and clears its device back-reference
    ///
    /// Returns false if the endpoint was not registered here. The endpoint's
    /// address is left for the caller to release.
    pub fn unregister(&mut self, ept: &Endpoint) -> bool {
        match self.endpoints.iter().position(|e| e.same_as(ept)) {
            Some(index) => {
                self.endpoints.remove(index);
                ept.detach();
                true
            }
            None => false,
        }
    }

    /// Finds an endpoint by local address, or by name and destination
    ///
    /// Precedence:
    /// 1. `local` not `ANY`: the endpoint bound to that local address.
    /// 2. `name` given: the first endpoint, in registration order, with that
    ///    name and either the requested non-`ANY` `dest`, or, when `local` is
    ///    `ANY`, no peer binding yet.
    ///
    /// A local-address miss falls through to the name scan.
    pub fn lookup(&self, name: Option<&str>, local: Address, dest: Address) -> Option<&Endpoint> {
        if !local.is_any() {
            if let Some(ept) = self.endpoints.iter().find(|e| e.local_addr() == local) {
                return Some(ept);
            }
        }

        let name = truncate_name(name?);
        self.endpoints.iter().find(|e| {
            if e.name() != name {
                return false;
            }
            let peer = e.dest_addr();
            (!dest.is_any() && peer == dest) || (local.is_any() && peer.is_any())
        })
    }

    /// Returns the number of live endpoints
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Checks if no endpoint is registered
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Iterates endpoints in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }
}
