//! Endpoints and their handlers
//!
//! An [`Endpoint`] is a cheap, cloneable handle. The device registry keeps one
//! clone while the endpoint is live; the caller keeps another. The endpoint
//! points back at its device through a non-owning reference that is cleared
//! when the endpoint is unregistered, which is how a destroyed endpoint is
//! recognised.

use crate::device::{Device, DeviceShared};
use rpmsg_types::{truncate_name, Address, Result, RpmsgError, RxBuffer, TxBuffer};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

/// Inbound message and unbind handlers of an endpoint
///
/// Handlers run without the device lock held, on whatever execution context
/// drives inbound dispatch.
pub trait EndpointHandler: Send + Sync {
    /// Handles a message addressed to this endpoint
    ///
    /// The result is handed back to the transport as the processing outcome.
    fn on_message(&self, ept: &Endpoint, data: &RxBuffer, src: Address) -> Result<()>;

    /// Called when the peer tears the binding down
    ///
    /// The endpoint is unregistered and its address released right after this
    /// returns, unless the handler already destroyed it.
    fn on_unbind(&self, ept: &Endpoint) {
        let _ = ept;
    }
}

struct FnHandler<F>(F);

impl<F> EndpointHandler for FnHandler<F>
where
    F: Fn(&Endpoint, &RxBuffer, Address) -> Result<()> + Send + Sync,
{
    fn on_message(&self, ept: &Endpoint, data: &RxBuffer, src: Address) -> Result<()> {
        (self.0)(ept, data, src)
    }
}

/// Builds a handler from a message closure, with no unbind behaviour
pub fn handler_fn<F>(f: F) -> impl EndpointHandler
where
    F: Fn(&Endpoint, &RxBuffer, Address) -> Result<()> + Send + Sync + 'static,
{
    FnHandler(f)
}

pub(crate) struct EndpointInner {
    name: String,
    local_addr: Address,
    dest_addr: AtomicU32,
    handler: Box<dyn EndpointHandler>,
    device: spin::Mutex<Option<Weak<DeviceShared>>>,
    // Kept past unregistration so lent transmit buffers can still go home.
    lender: spin::Mutex<Weak<DeviceShared>>,
}

/// A named or address-bound communication endpoint
#[derive(Clone)]
pub struct Endpoint {
    inner: Arc<EndpointInner>,
}

impl Endpoint {
    pub(crate) fn new(
        name: &str,
        local_addr: Address,
        dest_addr: Address,
        handler: Box<dyn EndpointHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(EndpointInner {
                name: truncate_name(name).to_string(),
                local_addr,
                dest_addr: AtomicU32::new(dest_addr.raw()),
                handler,
                device: spin::Mutex::new(None),
                lender: spin::Mutex::new(Weak::new()),
            }),
        }
    }

    /// Returns the endpoint name (empty for anonymous endpoints)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the local address
    pub fn local_addr(&self) -> Address {
        self.inner.local_addr
    }

    /// Returns the remote address, [`Address::ANY`] while unbound
    pub fn dest_addr(&self) -> Address {
        Address(self.inner.dest_addr.load(Ordering::Acquire))
    }

    pub(crate) fn set_dest_addr(&self, addr: Address) {
        self.inner.dest_addr.store(addr.raw(), Ordering::Release);
    }

    pub(crate) fn handler(&self) -> &dyn EndpointHandler {
        self.inner.handler.as_ref()
    }

    /// Returns the owning device, or `None` once destroyed
    pub fn device(&self) -> Option<Device> {
        self.inner
            .device
            .lock()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Device::from_shared)
    }

    /// Checks if the endpoint is still registered with a device
    pub fn is_registered(&self) -> bool {
        self.inner.device.lock().is_some()
    }

    pub(crate) fn attach(&self, device: Weak<DeviceShared>) {
        *self.inner.lender.lock() = device.clone();
        *self.inner.device.lock() = Some(device);
    }

    pub(crate) fn detach(&self) {
        *self.inner.device.lock() = None;
    }

    pub(crate) fn belongs_to(&self, device: &Arc<DeviceShared>) -> bool {
        self.inner
            .device
            .lock()
            .as_ref()
            .is_some_and(|weak| Weak::as_ptr(weak) == Arc::as_ptr(device))
    }

    /// Checks if two handles refer to the same endpoint
    pub fn same_as(&self, other: &Endpoint) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Destroys the endpoint
    ///
    /// Announces the destruction to the peer when applicable (failures are
    /// discarded), then unregisters the endpoint and releases its address.
    /// Does nothing if the endpoint was already destroyed.
    pub fn destroy(&self) {
        if let Some(device) = self.device() {
            device.destroy_endpoint(self);
        }
    }

    fn live_device(&self) -> Result<Device> {
        self.device().ok_or(RpmsgError::InvalidParam)
    }

    /// Returns a transmit buffer to the transport of the device that lent it
    ///
    /// Works after the endpoint is destroyed, as long as the device is alive.
    fn return_tx_buffer(&self, buffer: TxBuffer) {
        let lender = self.inner.lender.lock().upgrade();
        if let Some(shared) = lender {
            let _ = Device::from_shared(shared).transport().release_tx_buffer(buffer);
        }
    }

    /// Sends `data` from `src` to `dst`, bypassing the endpoint addresses
    pub fn send_offchannel_raw(
        &self,
        src: Address,
        dst: Address,
        data: &[u8],
        wait: bool,
    ) -> Result<usize> {
        let device = self.live_device()?;
        if dst.is_any() {
            return Err(RpmsgError::InvalidParam);
        }
        device.transport().send_offchannel_raw(src, dst, data, wait)
    }

    /// Sends to the bound remote address, waiting for a buffer if needed
    pub fn send(&self, data: &[u8]) -> Result<usize> {
        self.send_offchannel_raw(self.local_addr(), self.dest_addr(), data, true)
    }

    /// Sends to the bound remote address without waiting for a buffer
    pub fn try_send(&self, data: &[u8]) -> Result<usize> {
        self.send_offchannel_raw(self.local_addr(), self.dest_addr(), data, false)
    }

    /// Sends to an explicit remote address
    pub fn send_to(&self, dst: Address, data: &[u8]) -> Result<usize> {
        self.send_offchannel_raw(self.local_addr(), dst, data, true)
    }

    pub fn try_send_to(&self, dst: Address, data: &[u8]) -> Result<usize> {
        self.send_offchannel_raw(self.local_addr(), dst, data, false)
    }

    /// Sends with explicit source and destination addresses
    pub fn send_offchannel(&self, src: Address, dst: Address, data: &[u8]) -> Result<usize> {
        self.send_offchannel_raw(src, dst, data, true)
    }

    pub fn try_send_offchannel(&self, src: Address, dst: Address, data: &[u8]) -> Result<usize> {
        self.send_offchannel_raw(src, dst, data, false)
    }

    /// Borrows a transmit buffer from the transport
    pub fn get_tx_payload_buffer(&self, wait: bool) -> Result<TxBuffer> {
        let device = self.live_device()?;
        device
            .transport()
            .get_tx_payload_buffer(wait)
            .ok_or(RpmsgError::NoBuffer)
    }

    /// Hands an unsent transmit buffer back to the transport
    ///
    /// On a destroyed endpoint the buffer still goes back, but the call
    /// reports `InvalidParam`.
    pub fn release_tx_buffer(&self, buffer: TxBuffer) -> Result<()> {
        match self.device() {
            Some(device) => device.transport().release_tx_buffer(buffer),
            None => {
                self.return_tx_buffer(buffer);
                Err(RpmsgError::InvalidParam)
            }
        }
    }

    /// Sends the first `len` bytes of a transmit buffer without copying
    ///
    /// A rejected buffer goes back to the transport, whether the endpoint
    /// was destroyed or the destination is a wildcard.
    pub fn send_offchannel_nocopy(
        &self,
        src: Address,
        dst: Address,
        buffer: TxBuffer,
        len: usize,
    ) -> Result<usize> {
        let Some(device) = self.device() else {
            self.return_tx_buffer(buffer);
            return Err(RpmsgError::InvalidParam);
        };
        let transport = device.transport();
        if dst.is_any() {
            let _ = transport.release_tx_buffer(buffer);
            return Err(RpmsgError::InvalidParam);
        }
        transport.send_offchannel_nocopy(src, dst, buffer, len)
    }

    pub fn send_nocopy(&self, buffer: TxBuffer, len: usize) -> Result<usize> {
        self.send_offchannel_nocopy(self.local_addr(), self.dest_addr(), buffer, len)
    }

    pub fn send_to_nocopy(&self, dst: Address, buffer: TxBuffer, len: usize) -> Result<usize> {
        self.send_offchannel_nocopy(self.local_addr(), dst, buffer, len)
    }

    /// Keeps a received buffer after the handler returns
    pub fn hold_rx_buffer(&self, buffer: &RxBuffer) {
        if let Some(device) = self.device() {
            device.transport().hold_rx_buffer(buffer);
        }
    }

    /// Releases a buffer previously held with [`hold_rx_buffer`](Endpoint::hold_rx_buffer)
    pub fn release_rx_buffer(&self, buffer: &RxBuffer) {
        if let Some(device) = self.device() {
            device.transport().release_rx_buffer(buffer);
        }
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Endpoint {}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name())
            .field("local_addr", &self.local_addr())
            .field("dest_addr", &self.dest_addr())
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Endpoint({:?}, {} -> {})",
            self.name(),
            self.local_addr(),
            self.dest_addr()
        )
    }
}
