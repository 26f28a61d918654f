//! # Simulated Transport
//!
//! This crate provides an in-memory link between two RPMsg devices.
//!
//! ## Purpose
//!
//! The simulated link allows testing endpoint behavior without a remote
//! processor:
//! - Runs under `cargo test`
//! - Deterministic (frames are delivered only when a test polls)
//! - Inspectable (buffer pools, queues and every send are visible)
//!
//! ## Model
//!
//! Each [`Side`] owns a pool of `tx_buffers` transmit buffers of
//! `payload_size` bytes, mirroring a shared-memory ring. A send takes a buffer
//! from the sender's pool and queues a frame for the peer. The buffer goes
//! back to the sender's pool once the peer has dispatched the frame, unless
//! the receiving handler holds it.
//!
//! The simulation never blocks: a send that finds the pool empty fails with
//! `NoBuffer` whether or not it asked to wait.

pub mod fault_injection;
pub mod frame_audit;
pub mod test_utils;

use fault_injection::{FaultInjector, FaultPlan, SendVerdict};
use frame_audit::{FrameAuditLog, FrameOutcome, FrameRecord};
use log::debug;
use rpmsg::{Device, Transport};
use rpmsg_types::{Address, BufferId, NsAnnouncement, Result, RpmsgError, RxBuffer, TxBuffer};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// One end of a simulated link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Host,
    Remote,
}

impl Side {
    /// Returns the other end
    pub fn peer(self) -> Side {
        match self {
            Side::Host => Side::Remote,
            Side::Remote => Side::Host,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Host => 0,
            Side::Remote => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Host => write!(f, "host"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// Geometry of a simulated link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimLinkConfig {
    /// Transmit buffers per side
    pub tx_buffers: usize,
    /// Usable payload bytes per buffer
    pub payload_size: usize,
}

impl Default for SimLinkConfig {
    fn default() -> Self {
        // 512-byte shared buffers less the 16-byte message header.
        Self {
            tx_buffers: 16,
            payload_size: 496,
        }
    }
}

#[derive(Debug)]
struct Frame {
    src: Address,
    dst: Address,
    buffer: BufferId,
    payload: Vec<u8>,
}

#[derive(Debug)]
struct SideState {
    inbound: VecDeque<Frame>,
    free_tx: VecDeque<BufferId>,
    lent_tx: Vec<BufferId>,
    held_rx: Vec<BufferId>,
}

impl SideState {
    fn new(tx_buffers: usize) -> Self {
        Self {
            inbound: VecDeque::new(),
            free_tx: (0..tx_buffers as u32).map(BufferId).collect(),
            lent_tx: Vec::new(),
            held_rx: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct LinkState {
    config: SimLinkConfig,
    sides: [SideState; 2],
    audit: FrameAuditLog,
    injector: FaultInjector,
}

impl LinkState {
    fn side(&mut self, side: Side) -> &mut SideState {
        &mut self.sides[side.index()]
    }

    /// Returns a buffer to its owner's pool; recycling twice is harmless
    fn recycle(&mut self, owner: Side, id: BufferId) {
        let pool = &mut self.side(owner).free_tx;
        if !pool.contains(&id) {
            pool.push_back(id);
        }
    }

    /// Takes back a buffer lent out by `get_tx_payload_buffer`
    ///
    /// Fails for buffers that are free, in flight, or were never lent.
    fn take_lent(&mut self, owner: Side, id: BufferId) -> bool {
        let lent = &mut self.side(owner).lent_tx;
        match lent.iter().position(|l| *l == id) {
            Some(index) => {
                lent.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Applies the fault plan and queues the frame
    ///
    /// The buffer has already been taken from the sender's pool; it is
    /// recycled unless the frame is queued.
    fn submit(&mut self, from: Side, frame: Frame) -> Result<usize> {
        let len = frame.payload.len();
        let verdict = self.injector.on_send(frame.dst);
        let outcome = match verdict {
            SendVerdict::Deliver => FrameOutcome::Queued,
            SendVerdict::Drop => FrameOutcome::Dropped,
            SendVerdict::Fail(_) => FrameOutcome::Failed,
        };

        self.audit.record(FrameRecord {
            from,
            src: frame.src,
            dst: frame.dst,
            payload: frame.payload.clone(),
            outcome,
        });

        match verdict {
            SendVerdict::Deliver => {
                self.side(from.peer()).inbound.push_back(frame);
                Ok(len)
            }
            SendVerdict::Drop => {
                debug!("{}: dropped frame {} -> {}", from, frame.src, frame.dst);
                self.recycle(from, frame.buffer);
                Ok(len)
            }
            SendVerdict::Fail(err) => {
                debug!("{}: failed frame {} -> {}: {}", from, frame.src, frame.dst, err);
                self.recycle(from, frame.buffer);
                Err(err)
            }
        }
    }

    fn reject(&mut self, from: Side, src: Address, dst: Address, payload: Vec<u8>) {
        self.audit.record(FrameRecord {
            from,
            src,
            dst,
            payload,
            outcome: FrameOutcome::Failed,
        });
    }
}

/// In-memory link between a host and a remote device
///
/// Cloning a `SimLink` yields another handle to the same link.
#[derive(Clone)]
pub struct SimLink {
    state: Arc<spin::Mutex<LinkState>>,
}

impl SimLink {
    /// Creates a link with the given geometry
    pub fn new(config: SimLinkConfig) -> Self {
        Self {
            state: Arc::new(spin::Mutex::new(LinkState {
                config,
                sides: [
                    SideState::new(config.tx_buffers),
                    SideState::new(config.tx_buffers),
                ],
                audit: FrameAuditLog::new(),
                injector: FaultInjector::new(FaultPlan::new()),
            })),
        }
    }

    /// Replaces the fault plan applied to future sends on both sides
    pub fn with_fault_plan(self, plan: FaultPlan) -> Self {
        self.set_fault_plan(plan);
        self
    }

    pub fn set_fault_plan(&self, plan: FaultPlan) {
        self.state.lock().injector = FaultInjector::new(plan);
    }

    /// Returns the transport for one end of the link
    pub fn transport(&self, side: Side) -> SimTransport {
        SimTransport {
            link: self.clone(),
            side,
        }
    }

    pub fn config(&self) -> SimLinkConfig {
        self.state.lock().config
    }

    /// Delivers the next frame queued for `side` to `device`
    ///
    /// Returns `None` when nothing is queued, otherwise the dispatch result.
    /// The link lock is not held while the device runs its handler, so the
    /// handler may send through the same link.
    pub fn poll(&self, side: Side, device: &Device) -> Option<Result<()>> {
        let frame = self.state.lock().side(side).inbound.pop_front()?;
        let buffer = frame.buffer;
        let rx = RxBuffer::new(buffer, frame.payload);

        let result = device.dispatch(frame.src, frame.dst, &rx);

        let mut state = self.state.lock();
        if !state.side(side).held_rx.contains(&buffer) {
            state.recycle(side.peer(), buffer);
        }
        Some(result)
    }

    /// Returns the number of frames waiting for `side`
    pub fn pending(&self, side: Side) -> usize {
        self.state.lock().side(side).inbound.len()
    }

    /// Returns the number of free transmit buffers of `side`
    pub fn free_tx_buffers(&self, side: Side) -> usize {
        self.state.lock().side(side).free_tx.len()
    }

    /// Returns the number of received buffers `side` is holding
    pub fn held_rx_buffers(&self, side: Side) -> usize {
        self.state.lock().side(side).held_rx.len()
    }

    /// Returns a snapshot of every send attempted on the link
    pub fn audit(&self) -> Vec<FrameRecord> {
        self.state.lock().audit.records().to_vec()
    }

    /// Returns the name-service records `from` delivered to its peer
    pub fn announcements(&self, from: Side) -> Vec<NsAnnouncement> {
        self.state.lock().audit.announcements(from)
    }

    pub fn clear_audit(&self) {
        self.state.lock().audit.clear();
    }
}

impl Default for SimLink {
    fn default() -> Self {
        Self::new(SimLinkConfig::default())
    }
}

/// [`Transport`] for one side of a [`SimLink`]
#[derive(Clone)]
pub struct SimTransport {
    link: SimLink,
    side: Side,
}

impl SimTransport {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn link(&self) -> &SimLink {
        &self.link
    }
}

impl Transport for SimTransport {
    fn send_offchannel_raw(
        &self,
        src: Address,
        dst: Address,
        data: &[u8],
        _wait: bool,
    ) -> Result<usize> {
        let mut state = self.link.state.lock();

        if data.len() > state.config.payload_size {
            state.reject(self.side, src, dst, data.to_vec());
            return Err(RpmsgError::InvalidBufferSize);
        }

        let Some(buffer) = state.side(self.side).free_tx.pop_front() else {
            state.reject(self.side, src, dst, data.to_vec());
            return Err(RpmsgError::NoBuffer);
        };

        state.submit(
            self.side,
            Frame {
                src,
                dst,
                buffer,
                payload: data.to_vec(),
            },
        )
    }

    fn send_offchannel_nocopy(
        &self,
        src: Address,
        dst: Address,
        buffer: TxBuffer,
        len: usize,
    ) -> Result<usize> {
        let mut state = self.link.state.lock();
        let (id, mut payload) = buffer.into_parts();

        if !state.take_lent(self.side, id) {
            return Err(RpmsgError::InvalidParam);
        }
        if len > payload.len() {
            state.recycle(self.side, id);
            state.reject(self.side, src, dst, payload);
            return Err(RpmsgError::InvalidBufferSize);
        }

        payload.truncate(len);
        state.submit(
            self.side,
            Frame {
                src,
                dst,
                buffer: id,
                payload,
            },
        )
    }

    fn get_tx_payload_buffer(&self, _wait: bool) -> Option<TxBuffer> {
        let mut state = self.link.state.lock();
        let payload_size = state.config.payload_size;
        let side = state.side(self.side);
        let id = side.free_tx.pop_front()?;
        side.lent_tx.push(id);
        Some(TxBuffer::new(id, payload_size))
    }

    fn release_tx_buffer(&self, buffer: TxBuffer) -> Result<()> {
        let mut state = self.link.state.lock();
        let id = buffer.id();
        if !state.take_lent(self.side, id) {
            return Err(RpmsgError::InvalidParam);
        }
        state.recycle(self.side, id);
        Ok(())
    }

    fn hold_rx_buffer(&self, buffer: &RxBuffer) {
        let mut state = self.link.state.lock();
        let held = &mut state.side(self.side).held_rx;
        if !held.contains(&buffer.id()) {
            held.push(buffer.id());
        }
    }

    fn release_rx_buffer(&self, buffer: &RxBuffer) {
        let mut state = self.link.state.lock();
        let held = &mut state.side(self.side).held_rx;
        if let Some(index) = held.iter().position(|id| *id == buffer.id()) {
            held.remove(index);
            state.recycle(self.side.peer(), buffer.id());
        }
    }
}
