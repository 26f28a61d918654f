//! Link Teardown Tests
//!
//! Validates how endpoints go away when the peer withdraws a service or the
//! whole link is torn down.

use rpmsg::{
    Address, AddressState, Endpoint, EndpointHandler, NsFlags, Result, RpmsgError, RxBuffer,
};
use sim_transport::Side;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tests_resilience::{recording_handler, spawn_test_endpoint, test_bootstrap};

/// Counts unbind notifications
struct UnbindCounter(Arc<AtomicUsize>);

impl EndpointHandler for UnbindCounter {
    fn on_message(&self, _ept: &Endpoint, _data: &RxBuffer, _src: Address) -> Result<()> {
        Ok(())
    }

    fn on_unbind(&self, _ept: &Endpoint) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test: The peer withdrawing its service unbinds the local endpoint
///
/// The host waits for "svc"; the remote offers it, then destroys it. The
/// host endpoint is bound, then unbound: its handler is told, it leaves the
/// registry and its address returns to the pool.
#[test]
fn test_peer_destroy_unbinds_local_endpoint() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let unbinds = Arc::new(AtomicUsize::new(0));
    let waiting = pair
        .host
        .create_endpoint(
            "svc",
            Address::ANY,
            Address::ANY,
            UnbindCounter(unbinds.clone()),
        )
        .expect("Failed to create host endpoint");
    let offer = spawn_test_endpoint(&pair.remote, "svc").expect("Failed to create offer");

    pair.pump(16);
    assert_eq!(waiting.dest_addr(), offer.local_addr());

    offer.destroy();
    pair.pump(16);

    assert_eq!(unbinds.load(Ordering::SeqCst), 1);
    assert!(!waiting.is_registered());
    assert_eq!(waiting.dest_addr(), Address::ANY);
    assert_eq!(
        pair.host.address_state(waiting.local_addr()),
        AddressState::Clear
    );

    // Force-unbind is silent: the host only ever announced its create.
    let flags: Vec<_> = pair
        .link
        .announcements(Side::Host)
        .into_iter()
        .map(|a| a.flags)
        .collect();
    assert_eq!(flags, vec![NsFlags::Create]);
}

/// Test: A destroy for an unknown service is ignored
#[test]
fn test_peer_destroy_of_unknown_service_is_ignored() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let bystander = spawn_test_endpoint(&pair.host, "other").expect("Failed to create");
    let ghost = spawn_test_endpoint(&pair.remote, "ghost").expect("Failed to create");

    pair.pump(16);
    ghost.destroy();
    pair.pump(16);

    assert!(bystander.is_registered());
    assert_eq!(pair.host.endpoint_count(), 2);
}

/// Test: Teardown unbinds every endpoint and closes the device
#[test]
fn test_teardown_unbinds_all_endpoints() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let unbinds = Arc::new(AtomicUsize::new(0));

    let endpoints: Vec<_> = (0..4)
        .map(|i| {
            pair.host
                .create_endpoint(
                    &format!("svc{}", i),
                    Address::ANY,
                    Address::ANY,
                    UnbindCounter(unbinds.clone()),
                )
                .expect("Failed to create")
        })
        .collect();
    let sent_before = pair.link.audit().len();

    pair.host.teardown();

    assert_eq!(unbinds.load(Ordering::SeqCst), 4);
    assert!(endpoints.iter().all(|e| !e.is_registered()));
    assert_eq!(pair.host.endpoint_count(), 0);
    assert_eq!(pair.host.addresses_in_use(), 0);
    assert_eq!(pair.link.audit().len(), sent_before);

    assert_eq!(
        spawn_test_endpoint(&pair.host, "late").unwrap_err(),
        RpmsgError::InvalidDeviceState
    );
}

/// Test: Traffic arriving after teardown finds no endpoint
#[test]
fn test_traffic_after_teardown_is_undeliverable() {
    let pair = test_bootstrap().expect("Failed to bring up link");
    let (handler, inbox) = recording_handler();
    let ept = pair
        .host
        .create_endpoint("rx", Address::ANY, Address::ANY, handler)
        .expect("Failed to create");
    let addr = ept.local_addr();
    let peer = spawn_test_endpoint(&pair.remote, "").expect("Failed to create peer");

    pair.host.teardown();
    peer.send_to(addr, b"late").expect("Send failed");

    assert_eq!(
        pair.link.poll(Side::Host, &pair.host),
        Some(Err(RpmsgError::NotFound))
    );
    assert!(inbox.lock().expect("Inbox poisoned").is_empty());
}
