//! Device: the per-link context
//!
//! A device owns the address space and the endpoint registry of one link to
//! one remote processor, guarded together by a single lock, plus the
//! transport used to reach the peer.
//!
//! ## Locking
//!
//! Every allocate/reserve/register/unregister/release sequence runs under the
//! device lock. The lock is always dropped before calling the transport or a
//! handler, so an endpoint is visible to inbound dispatch before its create
//! announce has gone out.

use crate::address_space::{AddressSpace, AddressState};
use crate::config::DeviceConfig;
use crate::endpoint::{Endpoint, EndpointHandler};
use crate::name_service::{self, NameServiceHandler, NS_ENDPOINT_NAME};
use crate::registry::EndpointRegistry;
use crate::transport::Transport;
use log::{debug, info, warn};
use rpmsg_types::{Address, DeviceId, NsFlags, Result, RpmsgError, RxBuffer, NS_EPT_ADDR};
use std::fmt;
use std::sync::Arc;

/// Callback run when the peer announces a service no local endpoint waits for
pub type NsBindCallback = Box<dyn Fn(&Device, &str, Address) + Send + Sync>;

struct DeviceState {
    addresses: AddressSpace,
    endpoints: EndpointRegistry,
    torn_down: bool,
}

impl DeviceState {
    fn resolve_address(&mut self, requested: Address) -> Result<Address> {
        if requested.is_any() {
            let addr = self.addresses.allocate();
            if addr.is_any() {
                return Err(RpmsgError::NoAddress);
            }
            Ok(addr)
        } else if requested.is_reserved() {
            // Well-known addresses are trusted, never tracked.
            Ok(requested)
        } else {
            self.addresses.reserve(requested)?;
            Ok(requested)
        }
    }

    fn unregister_and_release(&mut self, ept: &Endpoint) -> bool {
        if !self.endpoints.unregister(ept) {
            return false;
        }
        let addr = ept.local_addr();
        if !addr.is_any() {
            self.addresses.release(addr);
        }
        true
    }
}

pub(crate) struct DeviceShared {
    id: DeviceId,
    label: String,
    ns_supported: bool,
    transport: Box<dyn Transport>,
    ns_bind: Option<NsBindCallback>,
    state: spin::Mutex<DeviceState>,
}

/// Builder for [`Device`]
pub struct DeviceBuilder {
    config: DeviceConfig,
    ns_bind: Option<NsBindCallback>,
}

impl DeviceBuilder {
    /// Creates a builder with the default configuration
    pub fn new() -> Self {
        Self {
            config: DeviceConfig::default(),
            ns_bind: None,
        }
    }

    /// Replaces the whole configuration
    pub fn with_config(mut self, config: DeviceConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the label used in log lines
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Enables or disables name-service announcements on this link
    pub fn with_ns_support(mut self, supported: bool) -> Self {
        self.config.ns_supported = supported;
        self
    }

    /// Sets the callback for peer services with no waiting local endpoint
    pub fn with_ns_bind<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Device, &str, Address) + Send + Sync + 'static,
    {
        self.ns_bind = Some(Box::new(callback));
        self
    }

    /// Creates the device over `transport`
    ///
    /// With name-service support the internal name-service endpoint is
    /// registered at [`NS_EPT_ADDR`]. A configuration that fails
    /// [`DeviceConfig::validate`] is refused with `InvalidParam`.
    pub fn build(self, transport: impl Transport + 'static) -> Result<Device> {
        if let Err(err) = self.config.validate() {
            warn!("refusing device configuration: {}", err);
            return Err(RpmsgError::InvalidParam);
        }

        let device = Device {
            shared: Arc::new(DeviceShared {
                id: DeviceId::new(),
                label: self.config.label,
                ns_supported: self.config.ns_supported,
                transport: Box::new(transport),
                ns_bind: self.ns_bind,
                state: spin::Mutex::new(DeviceState {
                    addresses: AddressSpace::new(),
                    endpoints: EndpointRegistry::new(),
                    torn_down: false,
                }),
            }),
        };

        if device.ns_supported() {
            device.create_endpoint(NS_ENDPOINT_NAME, NS_EPT_ADDR, NS_EPT_ADDR, NameServiceHandler)?;
        }

        info!(
            "{} {}: device up (name service {})",
            device.label(),
            device.id(),
            if device.ns_supported() { "on" } else { "off" }
        );
        Ok(device)
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared context of one link to a remote processor
///
/// Cloning a `Device` yields another handle to the same context.
#[derive(Clone)]
pub struct Device {
    shared: Arc<DeviceShared>,
}

impl Device {
    /// Creates a device with the default configuration
    pub fn new(transport: impl Transport + 'static) -> Result<Self> {
        DeviceBuilder::new().build(transport)
    }

    /// Creates a device from a loaded configuration
    pub fn from_config(config: DeviceConfig, transport: impl Transport + 'static) -> Result<Self> {
        DeviceBuilder::new().with_config(config).build(transport)
    }

    /// Returns a builder
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::new()
    }

    pub(crate) fn from_shared(shared: Arc<DeviceShared>) -> Self {
        Self { shared }
    }

    /// Returns the device identifier
    pub fn id(&self) -> DeviceId {
        self.shared.id
    }

    /// Returns the configured label
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Checks if name-service announcements are supported on this link
    pub fn ns_supported(&self) -> bool {
        self.shared.ns_supported
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.shared.transport.as_ref()
    }

    /// Creates and registers an endpoint
    ///
    /// `src` selects the local address: `ANY` allocates the lowest free
    /// dynamic address, a well-known address is taken as given, a dynamic
    /// address is reserved. `dest` is the peer address, `ANY` for an endpoint
    /// that waits to be discovered.
    ///
    /// A named, unpaired endpoint is announced to the peer once registered.
    /// If that announce fails the endpoint is unregistered, its address
    /// released, and `InitFailure` returned.
    pub fn create_endpoint(
        &self,
        name: &str,
        src: Address,
        dest: Address,
        handler: impl EndpointHandler + 'static,
    ) -> Result<Endpoint> {
        let ept = {
            let mut state = self.shared.state.lock();
            if state.torn_down {
                return Err(RpmsgError::InvalidDeviceState);
            }
            let local = state.resolve_address(src)?;
            let ept = Endpoint::new(name, local, dest, Box::new(handler));
            state.endpoints.register(&ept, Arc::downgrade(&self.shared));
            ept
        };
        debug!("{}: registered {}", self.label(), ept);

        if name_service::should_announce_create(&ept, self.ns_supported()) {
            if let Err(err) = name_service::announce(&ept, NsFlags::Create) {
                warn!(
                    "{}: create announce for {} failed ({}), rolling back",
                    self.label(),
                    ept,
                    err.code_name()
                );
                self.shared.state.lock().unregister_and_release(&ept);
                return Err(RpmsgError::InitFailure);
            }
        }

        Ok(ept)
    }

    /// Destroys an endpoint of this device
    ///
    /// The destroy announce is best-effort: a failure is logged and the
    /// endpoint is removed regardless. Endpoints of other devices and already
    /// destroyed endpoints are ignored.
    pub fn destroy_endpoint(&self, ept: &Endpoint) {
        if !ept.belongs_to(&self.shared) {
            return;
        }

        if name_service::should_announce_destroy(ept, self.ns_supported()) {
            if let Err(err) = name_service::announce(ept, NsFlags::Destroy) {
                warn!(
                    "{}: destroy announce for {} failed ({}), ignored",
                    self.label(),
                    ept,
                    err.code_name()
                );
            }
        }

        if self.shared.state.lock().unregister_and_release(ept) {
            debug!("{}: destroyed {}", self.label(), ept);
        }
    }

    /// Finds a live endpoint, see [`EndpointRegistry::lookup`]
    pub fn lookup(&self, name: Option<&str>, local: Address, dest: Address) -> Result<Endpoint> {
        self.shared
            .state
            .lock()
            .endpoints
            .lookup(name, local, dest)
            .cloned()
            .ok_or(RpmsgError::NotFound)
    }

    /// Delivers a received message to the endpoint bound to `dst`
    ///
    /// Returns the handler's result. With no endpoint at `dst` the message is
    /// left to the caller and `NotFound` is returned.
    pub fn dispatch(&self, src: Address, dst: Address, data: &RxBuffer) -> Result<()> {
        let target = self
            .shared
            .state
            .lock()
            .endpoints
            .lookup(None, dst, Address::ANY)
            .cloned();

        match target {
            Some(ept) => ept.handler().on_message(&ept, data, src),
            None => {
                warn!(
                    "{}: no endpoint at {} for {} bytes from {}",
                    self.label(),
                    dst,
                    data.len(),
                    src
                );
                Err(RpmsgError::NotFound)
            }
        }
    }

    /// Binds the first waiting endpoint named `name` to a peer address
    ///
    /// Returns false if no endpoint matched.
    pub(crate) fn bind_remote(&self, name: &str, remote: Address) -> bool {
        let state = self.shared.state.lock();
        match state.endpoints.lookup(Some(name), Address::ANY, remote) {
            Some(ept) => {
                if ept.dest_addr().is_any() {
                    ept.set_dest_addr(remote);
                    debug!("{}: bound {}", self.label(), ept);
                }
                true
            }
            None => false,
        }
    }

    pub(crate) fn notify_ns_bind(&self, name: &str, remote: Address) {
        if let Some(callback) = &self.shared.ns_bind {
            callback(self, name, remote);
        }
    }

    /// Tears one endpoint down on behalf of the peer
    ///
    /// Runs the unbind handler, then removes the endpoint and releases its
    /// address without announcing anything back.
    pub fn force_unbind(&self, ept: &Endpoint) {
        if !ept.belongs_to(&self.shared) {
            return;
        }
        ept.set_dest_addr(Address::ANY);
        ept.handler().on_unbind(ept);
        if self.shared.state.lock().unregister_and_release(ept) {
            debug!("{}: force-unbound {}", self.label(), ept);
        }
    }

    /// Tears down the whole link
    ///
    /// Every user endpoint is force-unbound, then the name-service endpoint is
    /// removed. Afterwards no endpoint can be created on this device.
    pub fn teardown(&self) {
        let endpoints = {
            let mut state = self.shared.state.lock();
            state.torn_down = true;
            state.endpoints.iter().cloned().collect::<Vec<_>>()
        };

        info!(
            "{} {}: link teardown, unbinding {} endpoint(s)",
            self.label(),
            self.id(),
            endpoints.len()
        );

        let (services, users): (Vec<_>, Vec<_>) = endpoints
            .into_iter()
            .partition(|ept| ept.local_addr() == NS_EPT_ADDR && ept.name() == NS_ENDPOINT_NAME);
        for ept in users.iter().chain(services.iter()) {
            self.force_unbind(ept);
        }
    }

    /// Queries the address space
    pub fn address_state(&self, addr: Address) -> AddressState {
        self.shared.state.lock().addresses.state(addr)
    }

    /// Returns the number of owned dynamic addresses
    pub fn addresses_in_use(&self) -> usize {
        self.shared.state.lock().addresses.in_use()
    }

    /// Returns the number of live endpoints, including the name-service one
    pub fn endpoint_count(&self) -> usize {
        self.shared.state.lock().endpoints.len()
    }

    /// Returns a snapshot of the live endpoints in registration order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.shared.state.lock().endpoints.iter().cloned().collect()
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("ns_supported", &self.ns_supported())
            .finish()
    }
}
