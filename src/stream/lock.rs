//! Rendezvous state machine behind every stream.
//!
//! A `StreamLock` guards one or more *lanes*. Each lane is the single-slot
//! buffer of one stream. All input streams of a stage share one lock so that
//! "read from any input" can wait on every lane at once; a stream without a
//! consumer gets a private lock.
//!
//! Lane states:
//!
//! | state           | meaning                                             |
//! |-----------------|-----------------------------------------------------|
//! | `Empty`         | nobody is waiting                                   |
//! | `ReadyToOutput` | the producer holds a record and waits for a consumer|
//! | `Full`          | a record sits in the slot                           |
//! | `Reading`       | the consumer waits to take a record                 |
//! | `Peeking`       | the consumer waits to look at a record              |
//! | `Severed`       | terminal; every later operation fails               |
//!
//! A producer that finds `Peeking` deposits its record and keeps waiting until
//! a read takes it. A producer that finds `Reading` deposits and returns at
//! once. Callers wait on the lock's condition variable and re-examine the lane
//! after every wake-up.

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::record::Record;

use super::{Side, StreamState};

/// Internal signal: the lane was severed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Severed;

#[derive(Debug)]
enum Slot {
    Empty,
    ReadyToOutput,
    Full(Record),
    Reading,
    Peeking,
    /// A record the producer handed off before severing stays readable.
    Severed(Option<Record>),
}

impl Slot {
    fn record(&self) -> Option<&Record> {
        match self {
            Slot::Full(r) | Slot::Severed(Some(r)) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Lane {
    slot: Slot,
    /// Number of records placed in the slot
    deposited: u64,
    /// Number of records taken out of the slot
    consumed: u64,
}

#[derive(Debug)]
struct Inner {
    lanes: Vec<Lane>,
    /// Lane chosen by the most recent any-peek
    pinned: Option<usize>,
    /// Lane claimed by an any-operation while its producer was waiting
    awaiting: Option<usize>,
}

impl Inner {
    fn take(&mut self, lane: usize) -> Option<Record> {
        let l = &mut self.lanes[lane];
        let record = match std::mem::replace(&mut l.slot, Slot::Empty) {
            Slot::Full(r) => r,
            Slot::Severed(Some(r)) => {
                l.slot = Slot::Severed(None);
                r
            }
            other => {
                l.slot = other;
                return None;
            }
        };
        l.consumed += 1;
        if self.pinned == Some(lane) {
            self.pinned = None;
        }
        if self.awaiting == Some(lane) {
            self.awaiting = None;
        }
        Some(record)
    }

    fn all_severed(&self) -> bool {
        self.lanes
            .iter()
            .all(|l| matches!(l.slot, Slot::Severed(None)))
    }

    /// One pass of an any-operation over the lanes in index order.
    ///
    /// The pinned lane answers first while it still holds its record. Then
    /// the first lane holding a record or with a waiting producer decides the
    /// outcome; a waiting producer's lane is claimed and waited on. A claimed
    /// producer that has not deposited yet keeps its place in that order.
    /// Failing all of that, the lowest idle lane is claimed.
    fn scan_any(&mut self) -> AnyScan {
        if let Some(i) = self.pinned.filter(|&i| self.lanes[i].slot.record().is_some()) {
            return AnyScan::Ready(i);
        }
        for i in 0..self.lanes.len() {
            match self.lanes[i].slot {
                Slot::Full(_) | Slot::Severed(Some(_)) => return AnyScan::Ready(i),
                Slot::ReadyToOutput => {
                    self.lanes[i].slot = Slot::Peeking;
                    self.awaiting = Some(i);
                    return AnyScan::Wait { claimed: true };
                }
                Slot::Peeking if self.awaiting == Some(i) => {
                    return AnyScan::Wait { claimed: false };
                }
                _ => {}
            }
        }
        if self.all_severed() {
            return AnyScan::Severed;
        }
        match self
            .lanes
            .iter()
            .position(|l| matches!(l.slot, Slot::Empty))
        {
            Some(i) => {
                self.lanes[i].slot = Slot::Peeking;
                AnyScan::Wait { claimed: true }
            }
            None => AnyScan::Wait { claimed: false },
        }
    }
}

enum AnyScan {
    /// This lane holds the record to return
    Ready(usize),
    /// Nothing to return yet; `claimed` if a lane changed state
    Wait { claimed: bool },
    Severed,
}

#[derive(Debug)]
pub struct StreamLock {
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl StreamLock {
    /// Create a lock over `lanes` lanes. Lanes listed in `connected` start
    /// `Empty`; all others start severed.
    pub(crate) fn new(connected: &[bool]) -> Self {
        let lanes = connected
            .iter()
            .map(|&c| Lane {
                slot: if c { Slot::Empty } else { Slot::Severed(None) },
                deposited: 0,
                consumed: 0,
            })
            .collect();
        Self {
            inner: Mutex::new(Inner {
                lanes,
                pinned: None,
                awaiting: None,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.inner.lock().lanes.len()
    }

    fn wait(&self, guard: &mut MutexGuard<'_, Inner>) {
        self.cond.wait(guard);
    }

    /// Hand `record` to the consumer of `lane`, blocking until it is taken
    /// (or, if the consumer is already reading, until it is deposited).
    pub(crate) fn output(&self, lane: usize, record: Record) -> Result<(), Severed> {
        let mut g = self.inner.lock();
        let mut record = Some(record);
        let mut ticket: Option<u64> = None;
        loop {
            {
                let l = &mut g.lanes[lane];
                if let Some(t) = ticket {
                    if l.consumed >= t {
                        return Ok(());
                    }
                }
                match l.slot {
                    Slot::Severed(_) => return Err(Severed),
                    // Deposited; wait for a read to take it.
                    _ if ticket.is_some() => {}
                    Slot::Empty => {
                        l.slot = Slot::ReadyToOutput;
                        self.cond.notify_all();
                    }
                    Slot::ReadyToOutput | Slot::Full(_) => {}
                    Slot::Peeking => {
                        if let Some(r) = record.take() {
                            l.deposited += 1;
                            ticket = Some(l.deposited);
                            l.slot = Slot::Full(r);
                            self.cond.notify_all();
                        }
                    }
                    Slot::Reading => {
                        if let Some(r) = record.take() {
                            l.deposited += 1;
                            l.slot = Slot::Full(r);
                            self.cond.notify_all();
                            return Ok(());
                        }
                    }
                }
            }
            self.wait(&mut g);
        }
    }

    /// Look at the next record of `lane` without consuming it.
    pub(crate) fn peek(&self, lane: usize) -> Result<Record, Severed> {
        let mut g = self.inner.lock();
        loop {
            {
                let l = &mut g.lanes[lane];
                match l.slot {
                    Slot::Full(ref r) | Slot::Severed(Some(ref r)) => return Ok(r.clone()),
                    Slot::Severed(None) => return Err(Severed),
                    Slot::Empty | Slot::ReadyToOutput => {
                        l.slot = Slot::Peeking;
                        self.cond.notify_all();
                    }
                    Slot::Reading | Slot::Peeking => {}
                }
            }
            self.wait(&mut g);
        }
    }

    /// Take the next record of `lane`, releasing its producer.
    pub(crate) fn read(&self, lane: usize) -> Result<Record, Severed> {
        let mut g = self.inner.lock();
        loop {
            if let Some(r) = g.take(lane) {
                self.cond.notify_all();
                return Ok(r);
            }
            {
                let l = &mut g.lanes[lane];
                match l.slot {
                    Slot::Severed(_) => return Err(Severed),
                    Slot::Empty | Slot::ReadyToOutput => {
                        l.slot = Slot::Reading;
                        self.cond.notify_all();
                    }
                    _ => {}
                }
            }
            self.wait(&mut g);
        }
    }

    /// Look at the next record available on any lane.
    ///
    /// The lane that satisfied the peek is pinned: a following `peek_any` or
    /// `read_any` returns the same record while it is still there.
    pub(crate) fn peek_any(&self) -> Result<(usize, Record), Severed> {
        let mut g = self.inner.lock();
        loop {
            match g.scan_any() {
                AnyScan::Ready(i) => {
                    g.pinned = Some(i);
                    if let Some(r) = g.lanes[i].slot.record() {
                        return Ok((i, r.clone()));
                    }
                }
                AnyScan::Severed => return Err(Severed),
                AnyScan::Wait { claimed } => {
                    if claimed {
                        self.cond.notify_all();
                    }
                }
            }
            self.wait(&mut g);
        }
    }

    /// Take the next record available on any lane, preferring the lane pinned
    /// by an immediately preceding `peek_any`.
    pub(crate) fn read_any(&self) -> Result<(usize, Record), Severed> {
        let mut g = self.inner.lock();
        loop {
            match g.scan_any() {
                AnyScan::Ready(i) => {
                    if let Some(r) = g.take(i) {
                        g.pinned = None;
                        self.cond.notify_all();
                        return Ok((i, r));
                    }
                }
                AnyScan::Severed => return Err(Severed),
                AnyScan::Wait { claimed } => {
                    if claimed {
                        self.cond.notify_all();
                    }
                }
            }
            self.wait(&mut g);
        }
    }

    /// Force `lane` into the severed state and wake every waiter. Idempotent.
    ///
    /// When the producer severs, a record it already handed off stays
    /// readable; when the consumer severs, any buffered record is dropped.
    pub(crate) fn sever(&self, lane: usize, side: Side) {
        let mut g = self.inner.lock();
        let l = &mut g.lanes[lane];
        l.slot = match std::mem::replace(&mut l.slot, Slot::Severed(None)) {
            Slot::Full(r) | Slot::Severed(Some(r)) if side == Side::Output => {
                Slot::Severed(Some(r))
            }
            _ => Slot::Severed(None),
        };
        if g.pinned == Some(lane) && side == Side::Input {
            g.pinned = None;
        }
        if g.awaiting == Some(lane) {
            g.awaiting = None;
        }
        tracing::trace!(lane, %side, "lane severed");
        self.cond.notify_all();
    }

    /// Snapshot of the lane state, for inspection only.
    pub fn state(&self, lane: usize) -> StreamState {
        match self.inner.lock().lanes[lane].slot {
            Slot::Empty => StreamState::Empty,
            Slot::ReadyToOutput => StreamState::ReadyToOutput,
            Slot::Full(_) => StreamState::Full,
            Slot::Reading => StreamState::Reading,
            Slot::Peeking => StreamState::Peeking,
            Slot::Severed(_) => StreamState::Severed,
        }
    }

    /// Number of records taken from `lane` so far.
    pub fn consumed(&self, lane: usize) -> u64 {
        self.inner.lock().lanes[lane].consumed
    }
}
