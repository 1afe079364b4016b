//! Due-time scheduling of checks.
//!
//! [`DueQueue`] keeps every known check keyed by the instant it is next due;
//! [`MonitorScheduler`] reloads the check list on each tick, runs whatever is
//! due through the [`CheckRunner`] and puts those checks back at
//! `now + interval`.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::db::entities::check::MIN_INTERVAL_SECONDS;

use super::runner::{CheckRunner, PassReport};

#[derive(Debug, Clone, Copy)]
struct Slot {
    interval: Duration,
    due: Instant,
    generation: u64,
}

/// Min-heap of checks ordered by next due instant.
///
/// Heap entries carry the generation of the slot they were pushed for; an
/// entry whose generation no longer matches its slot is stale and skipped.
#[derive(Debug, Default)]
pub struct DueQueue {
    heap: BinaryHeap<Reverse<(Instant, u64, i32)>>,
    slots: HashMap<i32, Slot>,
    next_generation: u64,
}

impl DueQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Brings the queue in line with the current check list: new checks are
    /// due immediately, removed checks are dropped and a changed interval is
    /// re-applied from the check's last run.
    pub fn reconcile<I>(&mut self, checks: I, now: Instant)
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let desired: HashMap<i32, Duration> = checks
            .into_iter()
            .map(|(check_id, interval_seconds)| (check_id, interval_for(interval_seconds)))
            .collect();

        self.slots.retain(|check_id, _| desired.contains_key(check_id));

        for (check_id, interval) in desired {
            match self.slots.get(&check_id).copied() {
                None => self.schedule(check_id, interval, now),
                Some(slot) if slot.interval != interval => {
                    let due = slot
                        .due
                        .checked_sub(slot.interval)
                        .map(|last_run| last_run + interval)
                        .unwrap_or(now);
                    self.schedule(check_id, interval, due);
                }
                Some(_) => {}
            }
        }
    }

    /// Removes and returns every check due at `now`. Popped checks stay known
    /// to the queue but are not due again until [`DueQueue::reschedule`].
    pub fn pop_due(&mut self, now: Instant) -> Vec<i32> {
        let mut due = Vec::new();
        while let Some(Reverse((due_at, generation, check_id))) = self.heap.peek().copied() {
            if due_at > now {
                break;
            }
            self.heap.pop();
            if let Some(slot) = self.slots.get_mut(&check_id) {
                if slot.generation == generation {
                    // Parked until rescheduled.
                    slot.generation = u64::MAX;
                    due.push(check_id);
                }
            }
        }
        due
    }

    pub fn reschedule(&mut self, check_id: i32, now: Instant) {
        if let Some(slot) = self.slots.get(&check_id).copied() {
            self.schedule(check_id, slot.interval, now + slot.interval);
        }
    }

    /// Next instant at which some check becomes due.
    pub fn next_due(&self) -> Option<Instant> {
        self.heap
            .iter()
            .filter(|Reverse((_, generation, check_id))| {
                self.slots
                    .get(check_id)
                    .is_some_and(|slot| slot.generation == *generation)
            })
            .map(|Reverse((due, _, _))| *due)
            .min()
    }

    fn schedule(&mut self, check_id: i32, interval: Duration, due: Instant) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots.insert(
            check_id,
            Slot {
                interval,
                due,
                generation,
            },
        );
        self.heap.push(Reverse((due, generation, check_id)));
    }
}

fn interval_for(interval_seconds: i32) -> Duration {
    Duration::from_secs(interval_seconds.max(MIN_INTERVAL_SECONDS).unsigned_abs().into())
}

pub struct MonitorScheduler {
    runner: Arc<CheckRunner>,
    tick: Duration,
}

impl MonitorScheduler {
    pub fn new(runner: Arc<CheckRunner>, tick: Duration) -> Self {
        Self {
            runner,
            tick: tick.max(Duration::from_secs(1)),
        }
    }

    /// Runs until the shutdown channel fires. In-flight probes are dropped on
    /// shutdown.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<()>) {
        let mut queue = DueQueue::new();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(tick_seconds = self.tick.as_secs(), "Check scheduler started.");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received, stopping check scheduler.");
                    break;
                }

                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => {
                            info!("Shutdown signal received during a run, stopping check scheduler.");
                            break;
                        }
                        _ = self.tick_once(&mut queue) => {}
                    }
                }
            }
        }
        info!("Check scheduler gracefully shut down.");
    }

    /// One scheduling round: reload, reconcile, run due checks, reschedule.
    pub async fn tick_once(&self, queue: &mut DueQueue) -> Option<PassReport> {
        let checks = match self.runner.load_checks().await {
            Ok(checks) => checks,
            Err(e) => {
                error!(error = %e, "Failed to load checks for scheduling.");
                return None;
            }
        };

        let now = Instant::now();
        queue.reconcile(
            checks.iter().map(|c| (c.check.id, c.check.interval_seconds)),
            now,
        );

        let due: HashSet<i32> = queue.pop_due(now).into_iter().collect();
        if due.is_empty() {
            debug!(known = queue.len(), "No checks due.");
            return None;
        }

        let selected: Vec<_> = checks
            .into_iter()
            .filter(|c| due.contains(&c.check.id))
            .collect();
        let report = self.runner.run_checks(selected).await;

        let finished = Instant::now();
        for check_id in due {
            queue.reschedule(check_id, finished);
        }

        info!(
            due = report.summary.total,
            recorded = report.summary.recorded,
            skipped = report.summary.skipped,
            failed = report.summary.failed,
            "Scheduled checks finished."
        );
        Some(report)
    }
}
