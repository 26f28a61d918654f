//! Name-service handshake
//!
//! Outbound: a named, offer-style endpoint is announced to the peer when it is
//! created, and its disappearance when it is destroyed. A failed create
//! announce aborts the creation; a failed destroy announce is discarded.
//!
//! Inbound: the device registers an internal endpoint at [`NS_EPT_ADDR`] that
//! decodes the peer's announcements and binds or unbinds local endpoints.

use crate::device::Device;
use crate::endpoint::{Endpoint, EndpointHandler};
use log::{debug, warn};
use rpmsg_types::{Address, NsAnnouncement, NsFlags, Result, RpmsgError, RxBuffer, NS_EPT_ADDR};

/// Name of the internal name-service endpoint
pub const NS_ENDPOINT_NAME: &str = "NS";

/// Builds the record announcing `ept`
pub fn build_announce(ept: &Endpoint, flags: NsFlags) -> NsAnnouncement {
    NsAnnouncement::new(ept.name(), ept.local_addr(), flags)
}

/// Checks if creating `ept` must be announced
///
/// Only named endpoints that are not yet paired with a peer address offer
/// themselves.
pub fn should_announce_create(ept: &Endpoint, ns_supported: bool) -> bool {
    !ept.name().is_empty() && ns_supported && ept.dest_addr().is_any()
}

/// Checks if destroying `ept` must be announced
///
/// Well-known endpoints never announce their teardown.
pub fn should_announce_destroy(ept: &Endpoint, ns_supported: bool) -> bool {
    !ept.name().is_empty() && ns_supported && ept.local_addr().is_dynamic()
}

/// Sends a name-service record for `ept` to the peer's name-service endpoint
///
/// The send blocks until the transport has a buffer. Any transport error is a
/// failed announce.
pub fn announce(ept: &Endpoint, flags: NsFlags) -> Result<()> {
    let record = build_announce(ept, flags);
    ept.send_offchannel_raw(ept.local_addr(), NS_EPT_ADDR, &record.to_bytes(), true)?;
    debug!("announced {} of {:?} at {}", flags, record.name, record.addr);
    Ok(())
}

/// Applies an announcement received from the peer
pub fn handle_announcement(device: &Device, record: &NsAnnouncement) {
    let remote = record.addr;
    match record.flags {
        NsFlags::Create => {
            let bound = device.bind_remote(&record.name, remote);
            if !bound {
                debug!(
                    "{}: no local endpoint for {:?}, offering to bind callback",
                    device.label(),
                    record.name
                );
                device.notify_ns_bind(&record.name, remote);
            }
        }
        NsFlags::Destroy => {
            let target = device
                .lookup(Some(&record.name), Address::ANY, remote)
                .ok();
            match target {
                Some(ept) => device.force_unbind(&ept),
                None => debug!(
                    "{}: peer destroyed unknown service {:?} at {}",
                    device.label(),
                    record.name,
                    remote
                ),
            }
        }
    }
}

/// Handler of the internal name-service endpoint
pub(crate) struct NameServiceHandler;

impl EndpointHandler for NameServiceHandler {
    fn on_message(&self, ept: &Endpoint, data: &RxBuffer, src: Address) -> Result<()> {
        let device = ept.device().ok_or(RpmsgError::InvalidDeviceState)?;
        let record = NsAnnouncement::from_bytes(data).map_err(|err| {
            warn!(
                "{}: malformed name-service record from {} ({} bytes): {}",
                device.label(),
                src,
                data.len(),
                err
            );
            err
        })?;
        handle_announcement(&device, &record);
        Ok(())
    }
}
