//! Frame audit trail
//!
//! Every send attempted on a simulated link is recorded here, whatever its
//! outcome, so tests can assert on exactly what crossed the link.
//!
//! ## Philosophy
//!
//! - Test-only: this is NOT production logging, it's for test verification
//! - Deterministic: records are kept in send order

use crate::Side;
use rpmsg_types::{Address, NsAnnouncement, NS_EPT_ADDR};

/// Fate of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Queued for the peer
    Queued,
    /// Accepted, then discarded by a fault
    Dropped,
    /// Rejected by a fault or by the transport
    Failed,
}

/// A single audited send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRecord {
    /// Side that sent the frame
    pub from: Side,
    pub src: Address,
    pub dst: Address,
    pub payload: Vec<u8>,
    pub outcome: FrameOutcome,
}

impl FrameRecord {
    /// Decodes the payload as a name-service record, if addressed to one
    pub fn announcement(&self) -> Option<NsAnnouncement> {
        if self.dst != NS_EPT_ADDR {
            return None;
        }
        NsAnnouncement::from_bytes(&self.payload).ok()
    }
}

/// Chronological log of sends on a link
#[derive(Debug, Default)]
pub struct FrameAuditLog {
    records: Vec<FrameRecord>,
}

impl FrameAuditLog {
    /// Creates a new empty audit log
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Records a send
    pub fn record(&mut self, record: FrameRecord) {
        self.records.push(record);
    }

    /// Returns all records
    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    /// Counts records matching the predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&FrameRecord) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).count()
    }

    /// Returns the name-service records that reached the peer, in order
    pub fn announcements(&self, from: Side) -> Vec<NsAnnouncement> {
        self.records
            .iter()
            .filter(|r| r.from == from && r.outcome == FrameOutcome::Queued)
            .filter_map(FrameRecord::announcement)
            .collect()
    }

    /// Clears all records
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
