//! Test utilities for link-level testing
//!
//! Helpers that wire two devices to the ends of a [`SimLink`] and move
//! frames between them until the link is quiet.

use crate::fault_injection::FaultPlan;
use crate::{Side, SimLink, SimLinkConfig};
use rpmsg::{Device, DeviceBuilder, Result};

/// A host and a remote device joined by one simulated link
pub struct LinkedPair {
    pub link: SimLink,
    pub host: Device,
    pub remote: Device,
}

impl LinkedPair {
    /// Creates both devices with name-service support
    pub fn new(config: SimLinkConfig) -> Result<Self> {
        Self::with_builders(
            config,
            Device::builder().with_label("host"),
            Device::builder().with_label("remote"),
        )
    }

    /// Creates both devices from caller-prepared builders
    pub fn with_builders(
        config: SimLinkConfig,
        host: DeviceBuilder,
        remote: DeviceBuilder,
    ) -> Result<Self> {
        let link = SimLink::new(config);
        let host = host.build(link.transport(Side::Host))?;
        let remote = remote.build(link.transport(Side::Remote))?;
        Ok(Self { link, host, remote })
    }

    /// Returns the device attached to `side`
    pub fn device(&self, side: Side) -> &Device {
        match side {
            Side::Host => &self.host,
            Side::Remote => &self.remote,
        }
    }

    /// Delivers queued frames on both sides until none are left
    ///
    /// Stops after `max_frames` deliveries so ping-pong handlers cannot spin
    /// forever. Returns the number of frames delivered.
    pub fn pump(&self, max_frames: usize) -> usize {
        pump_until_idle(&self.link, &self.host, &self.remote, max_frames)
    }
}

/// Runs a test against a linked pair with a fault plan applied
///
/// The plan is installed after both devices are up, so device bring-up is
/// never affected by it.
///
/// # Example
///
/// ```
/// use sim_transport::test_utils::with_fault_plan;
/// use sim_transport::fault_injection::{FaultPlan, SendFault};
///
/// with_fault_plan(
///     FaultPlan::new().with_send_fault(SendFault::DropNext { count: 1 }),
///     |pair| {
///         assert_eq!(pair.pump(8), 0);
///     },
/// )
/// .unwrap();
/// ```
pub fn with_fault_plan<F>(plan: FaultPlan, f: F) -> Result<()>
where
    F: FnOnce(&LinkedPair),
{
    let pair = LinkedPair::new(SimLinkConfig::default())?;
    pair.link.set_fault_plan(plan);
    f(&pair);
    Ok(())
}

/// Delivers frames in both directions until the link is idle
///
/// Dispatch errors are not fatal here; they are logged by the device.
pub fn pump_until_idle(link: &SimLink, host: &Device, remote: &Device, max_frames: usize) -> usize {
    let mut delivered = 0;
    while delivered < max_frames {
        let progressed = [(Side::Remote, remote), (Side::Host, host)]
            .into_iter()
            .filter_map(|(side, device)| link.poll(side, device))
            .count();
        if progressed == 0 {
            break;
        }
        delivered += progressed;
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault_injection::SendFault;
    use rpmsg::{handler_fn, Address, NS_EPT_ADDR};

    #[test]
    fn test_linked_pair_starts_idle() {
        let pair = LinkedPair::new(SimLinkConfig::default()).unwrap();
        assert_eq!(pair.pump(16), 0);
        assert_eq!(pair.device(Side::Host).endpoint_count(), 1);
        assert_eq!(pair.device(Side::Remote).endpoint_count(), 1);
    }

    #[test]
    fn test_pump_delivers_announcements() {
        let pair = LinkedPair::new(SimLinkConfig::default()).unwrap();
        let waiting = pair
            .host
            .create_endpoint("svc", Address::ANY, Address::ANY, handler_fn(|_, _, _| Ok(())))
            .unwrap();
        let offer = pair
            .remote
            .create_endpoint("svc", Address::ANY, Address::ANY, handler_fn(|_, _, _| Ok(())))
            .unwrap();

        assert_eq!(pair.pump(16), 2);
        assert_eq!(waiting.dest_addr(), offer.local_addr());
        assert_eq!(offer.dest_addr(), waiting.local_addr());
    }

    #[test]
    fn test_pump_stops_at_limit() {
        let pair = LinkedPair::new(SimLinkConfig::default()).unwrap();
        let host = pair.link.transport(Side::Host);
        for _ in 0..4 {
            rpmsg::Transport::send_offchannel_raw(&host, Address(1), Address(0x500), b"x", true)
                .unwrap();
        }
        assert_eq!(pair.pump(2), 2);
        assert_eq!(pair.link.pending(Side::Remote), 2);
    }

    #[test]
    fn test_with_fault_plan() {
        with_fault_plan(
            FaultPlan::new().with_send_fault(SendFault::FailToAddress {
                dst: NS_EPT_ADDR,
                count: 1,
            }),
            |pair| {
                let result = pair.host.create_endpoint(
                    "svc",
                    Address::ANY,
                    Address::ANY,
                    handler_fn(|_, _, _| Ok(())),
                );
                assert!(result.is_err());
                assert_eq!(pair.link.pending(Side::Remote), 0);
            },
        )
        .unwrap();
    }
}
