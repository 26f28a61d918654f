//! Transport capability boundary
//!
//! A transport moves bytes between the two processors (shared-memory rings,
//! buffer pools, interrupts). The core only needs the capability set below.
//! A transport may implement any subset: every method has a default that
//! reports the capability as absent.

use rpmsg_types::{Address, Result, RpmsgError, RxBuffer, TxBuffer};

/// Capability set a transport offers to a device
///
/// Calls are made without the device lock held, possibly from several
/// execution contexts at once.
pub trait Transport: Send + Sync {
    /// Copies `data` into a transport buffer and sends it from `src` to `dst`
    ///
    /// When `wait` is true the call may suspend until a buffer is available.
    /// Returns the number of payload bytes sent.
    fn send_offchannel_raw(
        &self,
        src: Address,
        dst: Address,
        data: &[u8],
        wait: bool,
    ) -> Result<usize> {
        let _ = (src, dst, data, wait);
        Err(RpmsgError::InvalidParam)
    }

    /// Sends the first `len` bytes of a buffer obtained from
    /// [`get_tx_payload_buffer`](Transport::get_tx_payload_buffer)
    ///
    /// The transport takes the buffer back whether or not the send succeeds.
    fn send_offchannel_nocopy(
        &self,
        src: Address,
        dst: Address,
        buffer: TxBuffer,
        len: usize,
    ) -> Result<usize> {
        let _ = (src, dst, buffer, len);
        Err(RpmsgError::InvalidParam)
    }

    /// Lends out a transmit buffer
    fn get_tx_payload_buffer(&self, wait: bool) -> Option<TxBuffer> {
        let _ = wait;
        None
    }

    /// Takes back a transmit buffer that will not be sent
    fn release_tx_buffer(&self, buffer: TxBuffer) -> Result<()> {
        let _ = buffer;
        Err(RpmsgError::PermissionDenied)
    }

    /// Keeps a received buffer alive past its handler invocation
    fn hold_rx_buffer(&self, buffer: &RxBuffer) {
        let _ = buffer;
    }

    /// Returns a held receive buffer to the transport
    fn release_rx_buffer(&self, buffer: &RxBuffer) {
        let _ = buffer;
    }
}
