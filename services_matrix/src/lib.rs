//! # Matrix Multiply Service
//!
//! This crate implements the remote side of the matrix multiply demo: a
//! named endpoint that receives two matrices, multiplies them and sends the
//! product back to the sender.
//!
//! ## Lifecycle
//!
//! [`MatrixService::start`] creates the endpoint, which announces itself to
//! the host. [`MatrixService::run`] then drives the link until a shutdown is
//! requested, either by the host's shutdown message or by the host tearing
//! the channel down, and destroys the endpoint.

pub mod matrix;

use log::{info, warn};
use matrix::{decode_request, Matrix};
use rpmsg::{Address, Device, Endpoint, EndpointHandler, Result, RxBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use matrix::{MATRIX_WIRE_SIZE, MAX_SIZE, REQUEST_WIRE_SIZE};

/// Name the service announces itself under
pub const SERVICE_NAME: &str = "rpmsg-openamp-demo-channel";

/// Payload that asks the service to stop
pub const SHUTDOWN_MSG: u32 = 0xEF56_A55A;

/// Shared shutdown flag
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownState {
    requested: Arc<AtomicBool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

/// Checks if a payload is the shutdown message
pub fn is_shutdown_message(data: &[u8]) -> bool {
    match data {
        [a, b, c, d, ..] => u32::from_le_bytes([*a, *b, *c, *d]) == SHUTDOWN_MSG,
        _ => false,
    }
}

struct MatrixHandler {
    shutdown: ShutdownState,
}

impl EndpointHandler for MatrixHandler {
    fn on_message(&self, ept: &Endpoint, data: &RxBuffer, src: Address) -> Result<()> {
        if is_shutdown_message(data) {
            info!("{}: shutdown message received", SERVICE_NAME);
            self.shutdown.request();
            return Ok(());
        }

        let (lhs, rhs) = decode_request(data).map_err(|err| {
            warn!(
                "{}: bad request of {} bytes from {}: {}",
                SERVICE_NAME,
                data.len(),
                src,
                err
            );
            err
        })?;
        let product: Matrix = lhs.multiply(&rhs);

        // A failed reply is the host's loss; the request itself was handled.
        if let Err(err) = ept.send_to(src, &product.to_bytes()) {
            warn!("{}: reply to {} failed: {}", SERVICE_NAME, src, err.code_name());
        }
        Ok(())
    }

    fn on_unbind(&self, _ept: &Endpoint) {
        warn!("{}: endpoint destroyed by peer", SERVICE_NAME);
        self.shutdown.request();
    }
}

/// A running matrix multiply service
pub struct MatrixService {
    endpoint: Endpoint,
    shutdown: ShutdownState,
}

impl MatrixService {
    /// Creates the service endpoint on `device`
    pub fn start(device: &Device) -> Result<Self> {
        let shutdown = ShutdownState::new();
        let handler = MatrixHandler {
            shutdown: shutdown.clone(),
        };

        let endpoint = device
            .create_endpoint(SERVICE_NAME, Address::ANY, Address::ANY, handler)
            .map_err(|err| {
                warn!(
                    "{}: failed to create endpoint: {} ({})",
                    device.label(),
                    err.code(),
                    err.code_name()
                );
                err
            })?;

        info!("{}: {} waiting for events", device.label(), endpoint);
        Ok(Self { endpoint, shutdown })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns a handle to the shutdown flag
    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown.clone()
    }

    /// Polls the link until shutdown is requested, then destroys the endpoint
    ///
    /// `poll` is called once per iteration and should deliver pending inbound
    /// frames to the device.
    pub fn run<P>(self, mut poll: P)
    where
        P: FnMut(),
    {
        loop {
            poll();
            if self.shutdown.is_requested() {
                info!("{}: shutdown requested, exiting", SERVICE_NAME);
                break;
            }
        }
        self.endpoint.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpmsg::{BufferId, NsFlags, NS_EPT_ADDR};
    use sim_transport::{Side, SimLink};

    fn remote_device(link: &SimLink) -> Device {
        Device::builder()
            .with_label("remote")
            .build(link.transport(Side::Remote))
            .unwrap()
    }

    #[test]
    fn test_shutdown_message_detection() {
        assert!(is_shutdown_message(&SHUTDOWN_MSG.to_le_bytes()));
        assert!(is_shutdown_message(&[0x5A, 0xA5, 0x56, 0xEF, 0, 0]));
        assert!(!is_shutdown_message(&[0x5A, 0xA5, 0x56]));
        assert!(!is_shutdown_message(&0u32.to_le_bytes()));
    }

    #[test]
    fn test_start_announces_service() {
        let link = SimLink::default();
        let device = remote_device(&link);
        let service = MatrixService::start(&device).unwrap();

        let announcements = link.announcements(Side::Remote);
        assert_eq!(announcements.len(), 1);
        assert_eq!(announcements[0].name, SERVICE_NAME);
        assert_eq!(announcements[0].addr, service.endpoint().local_addr());
        assert_eq!(announcements[0].flags, NsFlags::Create);
    }

    #[test]
    fn test_request_is_answered_to_sender() {
        let link = SimLink::default();
        let device = remote_device(&link);
        let service = MatrixService::start(&device).unwrap();
        let ept = service.endpoint().clone();

        let a = Matrix::from_rows(&[&[1, 2], &[3, 4]]).unwrap();
        let b = Matrix::identity(2).unwrap();
        let request = RxBuffer::new(BufferId(0), matrix::encode_request(&a, &b));
        device
            .dispatch(Address(0x400), ept.local_addr(), &request)
            .unwrap();

        let reply = link
            .audit()
            .into_iter()
            .find(|r| r.dst == Address(0x400))
            .unwrap();
        assert_eq!(reply.src, ept.local_addr());
        assert_eq!(Matrix::from_bytes(&reply.payload).unwrap(), a);
        assert!(!service.shutdown_state().is_requested());
    }

    #[test]
    fn test_malformed_request_rejected() {
        let link = SimLink::default();
        let device = remote_device(&link);
        let service = MatrixService::start(&device).unwrap();

        let request = RxBuffer::new(BufferId(0), vec![1; 12]);
        assert_eq!(
            device.dispatch(Address(0x400), service.endpoint().local_addr(), &request),
            Err(rpmsg::RpmsgError::InvalidBufferSize)
        );
    }

    #[test]
    fn test_run_stops_on_shutdown_message_and_destroys() {
        let link = SimLink::default();
        let device = remote_device(&link);
        let service = MatrixService::start(&device).unwrap();
        let ept = service.endpoint().clone();

        let message = RxBuffer::new(BufferId(0), SHUTDOWN_MSG.to_le_bytes().to_vec());
        let mut polls = 0;
        service.run(|| {
            polls += 1;
            device
                .dispatch(Address(0x400), ept.local_addr(), &message)
                .unwrap();
        });

        assert_eq!(polls, 1);
        assert!(!ept.is_registered());
        let flags: Vec<_> = link
            .announcements(Side::Remote)
            .into_iter()
            .map(|a| a.flags)
            .collect();
        assert_eq!(flags, vec![NsFlags::Create, NsFlags::Destroy]);
    }

    #[test]
    fn test_peer_unbind_requests_shutdown() {
        let link = SimLink::default();
        let device = remote_device(&link);
        let service = MatrixService::start(&device).unwrap();
        let shutdown = service.shutdown_state();

        let record = rpmsg::NsAnnouncement::new(SERVICE_NAME, Address::ANY, NsFlags::Destroy);
        let rx = RxBuffer::new(BufferId(0), record.to_bytes().to_vec());
        device.dispatch(Address(0x400), NS_EPT_ADDR, &rx).unwrap();

        assert!(shutdown.is_requested());
        assert!(!service.endpoint().is_registered());
        // Already gone: run destroys nothing and announces nothing more.
        service.run(|| {});
        assert_eq!(link.announcements(Side::Remote).len(), 1);
    }
}
