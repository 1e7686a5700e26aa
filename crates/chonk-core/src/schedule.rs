//! Virtual-time deferred task queue.
//!
//! Nothing here sleeps. The owner advances time explicitly and pulls due tasks in
//! (due time, registration order). Each task remembers the epoch it was registered
//! in; [`Scheduler::cancel_all`] moves to a new epoch, so anything registered before
//! it is dead even if it is still observed later.

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scheduled<T> {
    pub due: Duration,
    pub epoch: u64,
    pub task: T,
}

#[derive(Debug)]
struct Entry<T> {
    due: Duration,
    seq: u64,
    epoch: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// reversed: BinaryHeap is a max-heap
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    epoch: u64,
    seq: u64,
    queue: BinaryHeap<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            epoch: 0,
            seq: 0,
            queue: BinaryHeap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn schedule_after(&mut self, delay: Duration, task: T) {
        let entry = Entry {
            due: self.now + delay,
            seq: self.seq,
            epoch: self.epoch,
            task,
        };
        self.seq += 1;
        self.queue.push(entry);
    }

    /// Drop every pending task and start a new epoch. Returns the new epoch.
    pub fn cancel_all(&mut self) -> u64 {
        self.queue.clear();
        self.advance_epoch()
    }

    /// Start a new epoch without draining the queue. Tasks registered earlier still
    /// come out of [`Scheduler::pop_due`] but fail [`Scheduler::is_current`].
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    pub fn is_current(&self, scheduled: &Scheduled<T>) -> bool {
        scheduled.epoch == self.epoch
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.queue.peek().map(|e| e.due)
    }

    /// Pop the earliest task due at or before `until`, moving the clock to its due time.
    pub fn pop_due(&mut self, until: Duration) -> Option<Scheduled<T>> {
        if self.next_due()? > until {
            return None;
        }
        let entry = self.queue.pop()?;
        self.now = self.now.max(entry.due);
        Some(Scheduled {
            due: entry.due,
            epoch: entry.epoch,
            task: entry.task,
        })
    }

    /// Move the clock forward. Never moves backwards.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}
