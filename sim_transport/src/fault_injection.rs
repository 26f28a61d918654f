//! Deterministic fault injection for testing
//!
//! A [`FaultPlan`] describes which sends on a simulated link fail or vanish.
//! The link consults its [`FaultInjector`] once per send that got a buffer.
//! A failed or dropped frame hands its buffer straight back to the sender's
//! pool. A send rejected earlier (oversized, or no free buffer) never reaches
//! the injector and consumes no planned fault.
//!
//! ## Design Philosophy
//!
//! - **Deterministic**: faults trigger by count, never by chance
//! - **Composable**: several faults can be active at once
//! - **Test-focused**: not intended for production use
//!
//! ## Example
//!
//! ```
//! use sim_transport::fault_injection::{FaultPlan, SendFault};
//! use rpmsg_types::NS_EPT_ADDR;
//!
//! let plan = FaultPlan::new()
//!     .with_send_fault(SendFault::FailToAddress { dst: NS_EPT_ADDR, count: 1 })
//!     .with_send_fault(SendFault::DropNext { count: 2 });
//! assert_eq!(plan.send_faults().len(), 2);
//! ```

use rpmsg_types::{Address, RpmsgError};
use std::collections::HashMap;

/// A fault to inject into sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFault {
    /// Fail the next N sends on any address
    FailNext { count: usize },

    /// Fail the next N sends to a specific destination address
    FailToAddress { dst: Address, count: usize },

    /// Accept the next N sends but never deliver them
    DropNext { count: usize },
}

/// A plan describing all faults to inject
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    send_faults: Vec<SendFault>,
    fail_error: Option<RpmsgError>,
}

impl FaultPlan {
    /// Creates a new empty fault plan
    pub fn new() -> Self {
        Self {
            send_faults: Vec::new(),
            fail_error: None,
        }
    }

    /// Adds a send fault to the plan
    pub fn with_send_fault(mut self, fault: SendFault) -> Self {
        self.send_faults.push(fault);
        self
    }

    /// Sets the error returned by failed sends (defaults to `NoBuffer`)
    pub fn with_fail_error(mut self, error: RpmsgError) -> Self {
        self.fail_error = Some(error);
        self
    }

    /// Returns the send faults
    pub fn send_faults(&self) -> &[SendFault] {
        &self.send_faults
    }
}

/// What the link does with a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendVerdict {
    /// Queue the frame for the peer
    Deliver,
    /// Reject the send with the given error
    Fail(RpmsgError),
    /// Report success but discard the frame
    Drop,
}

/// Fault injector that applies a plan to sends
#[derive(Debug)]
pub struct FaultInjector {
    fail_next_count: usize,
    fail_to_address: HashMap<Address, usize>,
    drop_next_count: usize,
    fail_error: RpmsgError,
    sends_seen: usize,
}

impl FaultInjector {
    /// Creates a new fault injector with the given plan
    pub fn new(plan: FaultPlan) -> Self {
        let mut injector = Self {
            fail_next_count: 0,
            fail_to_address: HashMap::new(),
            drop_next_count: 0,
            fail_error: plan.fail_error.unwrap_or(RpmsgError::NoBuffer),
            sends_seen: 0,
        };

        for fault in plan.send_faults() {
            match fault {
                SendFault::FailNext { count } => {
                    injector.fail_next_count += *count;
                }
                SendFault::FailToAddress { dst, count } => {
                    *injector.fail_to_address.entry(*dst).or_insert(0) += *count;
                }
                SendFault::DropNext { count } => {
                    injector.drop_next_count += *count;
                }
            }
        }

        injector
    }

    /// Decides the fate of a send to `dst`
    ///
    /// Address-specific failures are consumed first, then global failures,
    /// then drops.
    pub fn on_send(&mut self, dst: Address) -> SendVerdict {
        self.sends_seen += 1;

        if let Some(count) = self.fail_to_address.get_mut(&dst) {
            if *count > 0 {
                *count -= 1;
                return SendVerdict::Fail(self.fail_error);
            }
        }

        if self.fail_next_count > 0 {
            self.fail_next_count -= 1;
            return SendVerdict::Fail(self.fail_error);
        }

        if self.drop_next_count > 0 {
            self.drop_next_count -= 1;
            return SendVerdict::Drop;
        }

        SendVerdict::Deliver
    }

    /// Checks if every planned fault has been consumed
    pub fn is_exhausted(&self) -> bool {
        self.fail_next_count == 0
            && self.drop_next_count == 0
            && self.fail_to_address.values().all(|count| *count == 0)
    }

    /// Returns the number of sends inspected
    pub fn sends_seen(&self) -> usize {
        self.sends_seen
    }
}
