//! Anomaly flags, per-stream counters and bounded record history.
//!
//! Shared by every listener callback. Flags only move `false -> true`
//! between resets, so concurrent writers commute. Recording, resetting and
//! reporting serialize on the history lock, so a report never pairs cleared
//! flags with stale counters. Flag queries stay lock-free.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;

use crate::domain::models::{AnomalyKind, AnomalyRecord, AnomalyReport, PlacementStream, StreamTally};

#[derive(Debug, Default)]
struct StreamCounters {
    under_replicated: AtomicU64,
    over_replicated: AtomicU64,
}

impl StreamCounters {
    fn increment(&self, kind: AnomalyKind) {
        let counter = match kind {
            AnomalyKind::UnderReplicated => &self.under_replicated,
            AnomalyKind::OverReplicated => &self.over_replicated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn tally(&self) -> StreamTally {
        StreamTally {
            under_replicated: self.under_replicated.load(Ordering::Relaxed),
            over_replicated: self.over_replicated.load(Ordering::Relaxed),
        }
    }

    fn clear(&self) {
        self.under_replicated.store(0, Ordering::Relaxed);
        self.over_replicated.store(0, Ordering::Relaxed);
    }
}

/// Accumulated anomaly state since the last reset.
#[derive(Debug)]
pub struct AnomalyLedger {
    has_under_replication: AtomicBool,
    has_over_replication: AtomicBool,
    declared: StreamCounters,
    actual: StreamCounters,
    history: Mutex<VecDeque<AnomalyRecord>>,
    history_capacity: usize,
}

impl AnomalyLedger {
    /// Create an empty ledger retaining at most `history_capacity` records.
    pub fn new(history_capacity: usize) -> Self {
        Self {
            has_under_replication: AtomicBool::new(false),
            has_over_replication: AtomicBool::new(false),
            declared: StreamCounters::default(),
            actual: StreamCounters::default(),
            history: Mutex::new(VecDeque::with_capacity(history_capacity.min(1024))),
            history_capacity,
        }
    }

    /// Record an anomaly: raise its flag, count it, and append it to history.
    pub fn record(&self, anomaly: &AnomalyRecord) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);

        self.counters(anomaly.stream).increment(anomaly.kind);
        match anomaly.kind {
            AnomalyKind::UnderReplicated => self.has_under_replication.store(true, Ordering::Release),
            AnomalyKind::OverReplicated => self.has_over_replication.store(true, Ordering::Release),
        }

        if self.history_capacity == 0 {
            return;
        }
        if history.len() == self.history_capacity {
            history.pop_front();
        }
        history.push_back(anomaly.clone());
    }

    pub fn has_under_replication(&self) -> bool {
        self.has_under_replication.load(Ordering::Acquire)
    }

    pub fn has_over_replication(&self) -> bool {
        self.has_over_replication.load(Ordering::Acquire)
    }

    /// Clear flags, counters and history.
    pub fn reset(&self) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        self.has_under_replication.store(false, Ordering::Release);
        self.has_over_replication.store(false, Ordering::Release);
        self.declared.clear();
        self.actual.clear();
        history.clear();
    }

    /// Snapshot the ledger into a report.
    pub fn report(&self) -> AnomalyReport {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let recent = history.iter().cloned().collect();

        AnomalyReport {
            has_under_replication: self.has_under_replication(),
            has_over_replication: self.has_over_replication(),
            declared: self.declared.tally(),
            actual: self.actual.tally(),
            recent,
            generated_at: Utc::now(),
        }
    }

    const fn counters(&self, stream: PlacementStream) -> &StreamCounters {
        match stream {
            PlacementStream::Declared => &self.declared,
            PlacementStream::Actual => &self.actual,
        }
    }
}
