//! Best-Effort Destroy Tests
//!
//! Validates that destroying an endpoint always completes locally, whatever
//! happens to the destroy announce.

use rpmsg::{Address, AddressState, NsFlags, RpmsgError, NS_EPT_ADDR};
use sim_transport::fault_injection::{FaultPlan, SendFault};
use sim_transport::Side;
use tests_resilience::{spawn_test_endpoint, test_bootstrap};

/// Test: Destroy completes when its announce fails
#[test]
fn test_destroy_survives_announce_failure() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let ept = spawn_test_endpoint(&pair.host, "svc").expect("Failed to create");
    let addr = ept.local_addr();

    pair.link.set_fault_plan(FaultPlan::new().with_send_fault(SendFault::FailToAddress {
        dst: NS_EPT_ADDR,
        count: 1,
    }));
    ept.destroy();

    assert!(!ept.is_registered());
    assert_eq!(pair.host.address_state(addr), AddressState::Clear);
    let flags: Vec<_> = pair
        .link
        .announcements(Side::Host)
        .into_iter()
        .map(|a| a.flags)
        .collect();
    assert_eq!(flags, vec![NsFlags::Create]);
}

/// Test: Destroy completes when its announce is silently dropped
#[test]
fn test_destroy_survives_dropped_announce() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let ept = spawn_test_endpoint(&pair.host, "svc").expect("Failed to create");

    pair.link
        .set_fault_plan(FaultPlan::new().with_send_fault(SendFault::DropNext { count: 1 }));
    ept.destroy();

    assert!(!ept.is_registered());
    assert_eq!(pair.host.addresses_in_use(), 0);
}

/// Test: A destroyed endpoint is inert
///
/// Sends fail, a second destroy does nothing, and the address can be reused
/// by a new endpoint without the old handle interfering.
#[test]
fn test_destroyed_endpoint_is_inert() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let old = spawn_test_endpoint(&pair.host, "svc").expect("Failed to create");
    let addr = old.local_addr();
    old.destroy();

    assert_eq!(old.send_to(Address(0x400), b"x"), Err(RpmsgError::InvalidParam));
    assert_eq!(old.get_tx_payload_buffer(false), Err(RpmsgError::InvalidParam));

    let new = spawn_test_endpoint(&pair.host, "svc").expect("Failed to recreate");
    assert_eq!(new.local_addr(), addr);

    old.destroy();
    assert!(new.is_registered());
    assert_eq!(pair.host.address_state(addr), AddressState::Set);
}

/// Test: Each destroy is announced exactly once
#[test]
fn test_destroy_announced_once() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let ept = spawn_test_endpoint(&pair.host, "svc").expect("Failed to create");
    ept.destroy();
    ept.destroy();
    pair.host.destroy_endpoint(&ept);

    let destroys = pair
        .link
        .announcements(Side::Host)
        .into_iter()
        .filter(|a| a.flags == NsFlags::Destroy)
        .count();
    assert_eq!(destroys, 1);
}

/// Test: A lent transmit buffer returns to the pool when its endpoint is gone
///
/// The endpoint is destroyed between borrowing a buffer and sending it. The
/// no-copy send and the release both fail, but neither loses the buffer.
#[test]
fn test_lent_buffer_survives_destroy() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let ept = spawn_test_endpoint(&pair.host, "svc").expect("Failed to create");
    let free_before = pair.link.free_tx_buffers(Side::Host);

    let first = ept.get_tx_payload_buffer(false).expect("Failed to get buffer");
    let second = ept.get_tx_payload_buffer(false).expect("Failed to get buffer");
    ept.destroy();
    let free_after_destroy = pair.link.free_tx_buffers(Side::Host);

    assert_eq!(
        ept.send_to_nocopy(Address(0x400), first, 1),
        Err(RpmsgError::InvalidParam)
    );
    assert_eq!(ept.release_tx_buffer(second), Err(RpmsgError::InvalidParam));
    assert_eq!(
        pair.link.free_tx_buffers(Side::Host),
        free_after_destroy + 2
    );

    // Only the destroy announce is still in flight.
    pair.pump(16);
    assert_eq!(pair.link.free_tx_buffers(Side::Host), free_before + 1);
}
