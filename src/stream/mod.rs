//! Streams: the directed edges between stage ports.
//!
//! This module provides:
//! - `Stream`: An edge with an optional producer end and an optional consumer end
//! - `Side`: Which end of a stage a port belongs to
//! - `StreamState`: Snapshot of the rendezvous state of one stream
//! - `PortStatus`: Non-blocking connection report used by stage policies
//! - `StreamLock`: The synchronization engine (see `lock`)

use std::fmt;
use std::sync::Arc;

mod lock;

pub(crate) use lock::Severed;
pub use lock::StreamLock;

use crate::record::Record;
use crate::stage::StageId;

/// Which side of a stage a port is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Input,
    Output,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Input => write!(f, "input"),
            Side::Output => write!(f, "output"),
        }
    }
}

/// Rendezvous state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Empty,
    ReadyToOutput,
    Full,
    Reading,
    Peeking,
    Severed,
}

/// What a stage can learn about one of its ports without blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    /// The peer is blocked on this stream right now
    ConnectedWaiting,
    ConnectedNotWaiting,
    /// There is no peer, or the stream has been severed
    NotConnected,
    /// The stage has no such port
    NotDefined,
}

/// Index of a stream within its pipeline graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

impl StreamId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// One end of a stream: a stage and the port number on that stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub stage: StageId,
    pub port: usize,
}

/// A directed edge between an output port and an input port.
///
/// Either end may be absent. A stream holds at most one record; all of its
/// state lives in a lane of a `StreamLock`, which is shared with the other
/// input streams of the consuming stage.
#[derive(Debug)]
pub struct Stream {
    id: StreamId,
    producer: Option<Endpoint>,
    consumer: Option<Endpoint>,
    lock: Arc<StreamLock>,
    lane: usize,
}

impl Stream {
    pub(crate) fn new(
        id: StreamId,
        producer: Option<Endpoint>,
        consumer: Option<Endpoint>,
        lock: Arc<StreamLock>,
        lane: usize,
    ) -> Self {
        Self {
            id,
            producer,
            consumer,
            lock,
            lane,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn producer(&self) -> Option<Endpoint> {
        self.producer
    }

    pub fn consumer(&self) -> Option<Endpoint> {
        self.consumer
    }

    /// True when both ends are attached to a stage.
    pub fn is_connected(&self) -> bool {
        self.producer.is_some() && self.consumer.is_some()
    }

    pub fn state(&self) -> StreamState {
        self.lock.state(self.lane)
    }

    pub(crate) fn output(&self, record: Record) -> Result<(), Severed> {
        self.lock.output(self.lane, record)
    }

    pub(crate) fn peek(&self) -> Result<Record, Severed> {
        self.lock.peek(self.lane)
    }

    pub(crate) fn read(&self) -> Result<Record, Severed> {
        self.lock.read(self.lane)
    }

    /// Sever this stream from the given side. Idempotent.
    pub fn sever(&self, from: Side) {
        self.lock.sever(self.lane, from);
    }

    /// Connection report as seen from the stage on `side` of this stream.
    pub fn status(&self, side: Side) -> PortStatus {
        if !self.is_connected() {
            return PortStatus::NotConnected;
        }
        let peer_waiting = match (side, self.state()) {
            (_, StreamState::Severed) => return PortStatus::NotConnected,
            (Side::Output, StreamState::Reading | StreamState::Peeking) => true,
            (Side::Input, StreamState::ReadyToOutput | StreamState::Full) => true,
            _ => false,
        };
        if peer_waiting {
            PortStatus::ConnectedWaiting
        } else {
            PortStatus::ConnectedNotWaiting
        }
    }
}
