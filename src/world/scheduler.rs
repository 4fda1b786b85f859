use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::entities::thing::ThingId;

/// Deferred work. Targets are named by id so an event outliving its target is
/// simply ignored by the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduledEvent {
    RemoveThing(ThingId),
    RemoveAnimatedText(ThingId),
    WalkUpdate(ThingId),
    FinishWalkAnimation(ThingId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(u64);

#[derive(Clone, Copy, Debug)]
struct ScheduledEntry {
    fire_at: u64,
    sequence: u64,
    event: ScheduledEvent,
}

/// Min-heap by fire_at (earliest first)
impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for ScheduledEntry {}

#[derive(Debug, Default)]
pub struct Scheduler {
    heap: BinaryHeap<ScheduledEntry>,
    live: HashSet<u64>,
    next_sequence: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_event(
        &mut self,
        event: ScheduledEvent,
        delay_ms: u64,
        now: u64,
    ) -> EventHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.live.insert(sequence);
        self.heap.push(ScheduledEntry {
            fire_at: now.saturating_add(delay_ms),
            sequence,
            event,
        });
        log::trace!(target: "scheduler", "scheduled {:?} in {}ms", event, delay_ms);
        EventHandle(sequence)
    }

    /// Runs on the next poll.
    pub fn add_event(&mut self, event: ScheduledEvent, now: u64) -> EventHandle {
        self.schedule_event(event, 0, now)
    }

    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.live.contains(&handle.0)
    }

    pub fn cancel(&mut self, handle: EventHandle) {
        self.live.remove(&handle.0);
    }

    /// Pops every event due at `now`. Events scheduled while the caller works
    /// through the returned batch wait for the next call.
    pub fn drain_ready(&mut self, now: u64) -> Vec<ScheduledEvent> {
        let mut ready = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.fire_at > now {
                break;
            }
            let Some(entry) = self.heap.pop() else {
                break;
            };
            if !self.live.remove(&entry.sequence) {
                continue;
            }
            ready.push(entry.event);
        }
        ready
    }

    pub fn next_fire_time(&mut self) -> Option<u64> {
        loop {
            let entry = self.heap.peek()?;
            if !self.live.contains(&entry.sequence) {
                self.heap.pop();
                continue;
            }
            return Some(entry.fire_at);
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
