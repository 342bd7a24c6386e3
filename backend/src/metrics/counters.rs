use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Minimal counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub leads_distributed: Arc<AtomicU64>,
    pub leads_unmatched: Arc<AtomicU64>,
    pub leads_skipped: Arc<AtomicU64>,
    pub leads_failed: Arc<AtomicU64>,

    pub assignments_unlocked: Arc<AtomicU64>,
    pub assignments_locked: Arc<AtomicU64>,
    pub counters_incremented: Arc<AtomicU64>,
}

impl Counters {
    pub fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        let get = |c: &Arc<AtomicU64>| c.load(Ordering::Relaxed);
        CountersSnapshot {
            leads_distributed: get(&self.leads_distributed),
            leads_unmatched: get(&self.leads_unmatched),
            leads_skipped: get(&self.leads_skipped),
            leads_failed: get(&self.leads_failed),
            assignments_unlocked: get(&self.assignments_unlocked),
            assignments_locked: get(&self.assignments_locked),
            counters_incremented: get(&self.counters_incremented),
        }
    }
}

/// Point-in-time copy of [`Counters`].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub leads_distributed: u64,
    pub leads_unmatched: u64,
    pub leads_skipped: u64,
    pub leads_failed: u64,
    pub assignments_unlocked: u64,
    pub assignments_locked: u64,
    pub counters_incremented: u64,
}
