//! Resilience Test Utilities
//!
//! This crate provides shared utilities for link-level integration tests.
//!
//! ## Test Philosophy
//!
//! - **Safety under faults**: address ownership holds even when sends fail
//! - **Deterministic failures**: all faults are reproducible via FaultPlan
//! - **No address leaks**: every failed or torn-down endpoint returns its address
//! - **Consistency**: both ends agree on which services exist

use rpmsg::{handler_fn, Address, Device, Endpoint, EndpointHandler, Result, RxBuffer};
use sim_transport::test_utils::LinkedPair;
use sim_transport::SimLinkConfig;
use std::sync::{Arc, Mutex};

/// A message seen by a recording handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub src: Address,
    pub payload: Vec<u8>,
}

/// Shared list of messages a recording handler has seen
pub type Inbox = Arc<Mutex<Vec<Received>>>;

/// Installs the test logger; repeated calls are harmless
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Bootstrap helper for tests
///
/// Creates a host and a remote device joined by a default simulated link,
/// both with name-service support.
pub fn test_bootstrap() -> Result<LinkedPair> {
    init_logging();
    LinkedPair::new(SimLinkConfig::default())
}

/// Creates a standalone device with name-service support disabled
///
/// Nothing it does reaches a peer, which keeps the buffer pool out of the
/// way of tests that only exercise address ownership.
pub fn isolated_device() -> Result<Device> {
    init_logging();
    let link = sim_transport::SimLink::new(SimLinkConfig::default());
    Device::builder()
        .with_label("isolated")
        .with_ns_support(false)
        .build(link.transport(sim_transport::Side::Host))
}

/// Handler that ignores every message
pub fn noop_handler() -> impl EndpointHandler {
    handler_fn(|_, _, _| Ok(()))
}

/// Handler that records every message into the returned inbox
pub fn recording_handler() -> (impl EndpointHandler, Inbox) {
    let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
    let sink = inbox.clone();
    let handler = handler_fn(move |_: &Endpoint, data: &RxBuffer, src: Address| {
        if let Ok(mut messages) = sink.lock() {
            messages.push(Received {
                src,
                payload: data.to_vec(),
            });
        }
        Ok(())
    });
    (handler, inbox)
}

/// Creates an endpoint with a dynamic address and no handler behaviour
pub fn spawn_test_endpoint(device: &Device, name: &str) -> Result<Endpoint> {
    device.create_endpoint(name, Address::ANY, Address::ANY, noop_handler())
}
