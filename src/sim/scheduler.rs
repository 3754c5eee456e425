//! Event queue driving the simulation.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use crate::energy::node::RadioHandle;
use crate::energy::radio::Mode;

use super::time::SimTime;

/// A simulation event awaiting dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Periodic energy-source update.
    Refresh,
    /// Radio state transition driven by the traffic layer.
    Transition {
        /// Radio the transition applies to.
        radio: RadioHandle,
        /// Target operating mode.
        mode: Mode,
        /// Transmit power in dBm, present on transitions into transmit.
        power_dbm: Option<f64>,
    },
}

/// Handle for a scheduled event, usable to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle(u64);

struct Entry {
    at: SimTime,
    seq: u64,
    event: Event,
}

// Ordering considers only (time, insertion sequence); the payload is
// irrelevant for queue position.
impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

/// Discrete-event scheduler with a fixed stop time.
///
/// Events dispatch in timestamp order, ties broken by insertion order, and
/// dispatch never moves the clock backwards. Events scheduled past the stop
/// time are accepted but never dispatched.
///
/// # Examples
///
/// ```
/// use radio_energy_sim::sim::scheduler::{Event, Scheduler};
/// use radio_energy_sim::sim::time::SimTime;
///
/// let mut sched = Scheduler::new(SimTime::from_secs_f64(10.0));
/// sched.schedule(SimTime::from_secs_f64(1.0), Event::Refresh);
///
/// let (at, event) = sched.pop_next().unwrap();
/// assert_eq!(at, SimTime::from_secs_f64(1.0));
/// assert_eq!(event, Event::Refresh);
/// assert!(sched.pop_next().is_none());
/// ```
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Entry>>,
    cancelled: HashSet<u64>,
    now: SimTime,
    stop_at: SimTime,
    next_seq: u64,
    finished: bool,
}

impl Scheduler {
    /// Creates a scheduler running from time zero to `stop_at`.
    pub fn new(stop_at: SimTime) -> Self {
        Self {
            queue: BinaryHeap::new(),
            cancelled: HashSet::new(),
            now: SimTime::ZERO,
            stop_at,
            next_seq: 0,
            finished: false,
        }
    }

    /// Current simulated time: the timestamp of the last dispatched event.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// The configured stop time.
    pub fn stop_at(&self) -> SimTime {
        self.stop_at
    }

    /// Returns `true` once [`Scheduler::finish`] has been called.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Schedules `event` for dispatch at `at`.
    ///
    /// # Panics
    ///
    /// Panics if `at` lies in the past.
    pub fn schedule(&mut self, at: SimTime, event: Event) -> EventHandle {
        assert!(at >= self.now, "cannot schedule an event in the past");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry { at, seq, event }));
        EventHandle(seq)
    }

    /// Removes a scheduled event; a no-op if it already fired.
    pub fn cancel(&mut self, handle: EventHandle) {
        self.cancelled.insert(handle.0);
    }

    /// Pops the next dispatchable event and advances the clock to it.
    ///
    /// Returns `None` when no event at or before the stop time remains;
    /// events beyond the stop time stay queued but are never returned.
    pub fn pop_next(&mut self) -> Option<(SimTime, Event)> {
        loop {
            let entry = self.queue.peek()?;
            if self.cancelled.remove(&entry.0.seq) {
                self.queue.pop();
                continue;
            }
            if entry.0.at > self.stop_at {
                return None;
            }
            let Reverse(entry) = self.queue.pop()?;
            self.now = entry.at;
            return Some((entry.at, entry.event));
        }
    }

    /// Ends the run: advances the clock to the stop time and marks the
    /// scheduler finished. Later refresh requests become no-ops.
    pub fn finish(&mut self) {
        if self.stop_at > self.now {
            self.now = self.stop_at;
        }
        self.finished = true;
    }
}
