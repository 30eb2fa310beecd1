//! Debounce/supersede scheduling for deferred recomputation.
//!
//! Each task class holds at most one pending entry. Scheduling again
//! replaces the pending entry and restarts its delay, so a burst of
//! requests collapses into a single run carrying the latest payload.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
    AnchorRecompute,
    Relayout,
}

/// Handle identifying one scheduled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

#[derive(Debug)]
struct Pending<T> {
    ticket: Ticket,
    due: Instant,
    payload: T,
}

#[derive(Debug)]
pub struct Scheduler<K, T> {
    pending: HashMap<K, Pending<T>>,
    next_ticket: u64,
}

impl<K, T> Default for Scheduler<K, T> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            next_ticket: 0,
        }
    }
}

impl<K: Eq + Hash + Copy + std::fmt::Debug, T> Scheduler<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `payload` to run `delay` after `now`, cancelling whatever
    /// was pending for `class`.
    pub fn schedule_at(&mut self, now: Instant, class: K, payload: T, delay: Duration) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        let previous = self.pending.insert(
            class,
            Pending {
                ticket,
                due: now + delay,
                payload,
            },
        );
        if let Some(previous) = previous {
            tracing::trace!(?class, superseded = previous.ticket.0, "Rescheduled task");
        }
        ticket
    }

    pub fn schedule(&mut self, class: K, payload: T, delay: Duration) -> Ticket {
        self.schedule_at(Instant::now(), class, payload, delay)
    }

    pub fn cancel(&mut self, class: K) -> Option<T> {
        self.pending.remove(&class).map(|p| p.payload)
    }

    pub fn is_pending(&self, class: K) -> bool {
        self.pending.contains_key(&class)
    }

    pub fn pending_ticket(&self, class: K) -> Option<Ticket> {
        self.pending.get(&class).map(|p| p.ticket)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    /// Remove and return every entry due at `now`, earliest first.
    pub fn poll_at(&mut self, now: Instant) -> Vec<(K, T)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(class, _)| *class)
            .collect();

        let mut ready: Vec<(Instant, Ticket, K, T)> = due
            .into_iter()
            .filter_map(|class| {
                self.pending
                    .remove(&class)
                    .map(|p| (p.due, p.ticket, class, p.payload))
            })
            .collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        ready
            .into_iter()
            .map(|(_, _, class, payload)| (class, payload))
            .collect()
    }

    pub fn poll(&mut self) -> Vec<(K, T)> {
        self.poll_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn test_burst_collapses_to_latest() {
        let start = Instant::now();
        let mut scheduler: Scheduler<TaskClass, u32> = Scheduler::new();

        let first = scheduler.schedule_at(start, TaskClass::AnchorRecompute, 1, WINDOW);
        scheduler.schedule_at(start + Duration::from_millis(20), TaskClass::AnchorRecompute, 2, WINDOW);
        let last = scheduler.schedule_at(
            start + Duration::from_millis(40),
            TaskClass::AnchorRecompute,
            3,
            WINDOW,
        );
        assert_ne!(first, last);
        assert_eq!(scheduler.pending_ticket(TaskClass::AnchorRecompute), Some(last));

        // The first request's deadline has passed but it was superseded.
        assert!(scheduler.poll_at(start + Duration::from_millis(110)).is_empty());

        let ran = scheduler.poll_at(start + Duration::from_millis(140));
        assert_eq!(ran, vec![(TaskClass::AnchorRecompute, 3)]);
        assert!(scheduler.poll_at(start + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn test_classes_are_independent() {
        let start = Instant::now();
        let mut scheduler: Scheduler<TaskClass, &str> = Scheduler::new();
        scheduler.schedule_at(start, TaskClass::Relayout, "layout", Duration::from_millis(50));
        scheduler.schedule_at(start, TaskClass::AnchorRecompute, "anchors", Duration::from_millis(10));
        assert_eq!(scheduler.pending_count(), 2);
        assert_eq!(scheduler.next_deadline(), Some(start + Duration::from_millis(10)));

        let ran = scheduler.poll_at(start + Duration::from_millis(60));
        assert_eq!(
            ran,
            vec![
                (TaskClass::AnchorRecompute, "anchors"),
                (TaskClass::Relayout, "layout")
            ]
        );
    }

    #[test]
    fn test_cancel_drops_pending() {
        let start = Instant::now();
        let mut scheduler: Scheduler<TaskClass, ()> = Scheduler::new();
        scheduler.schedule_at(start, TaskClass::Relayout, (), WINDOW);
        assert_eq!(scheduler.cancel(TaskClass::Relayout), Some(()));
        assert!(!scheduler.is_pending(TaskClass::Relayout));
        assert!(scheduler.poll_at(start + WINDOW).is_empty());
    }
}
