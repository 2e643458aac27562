//! Result Sink: dedup-by-URL, per-kind counters, forward to the report writer.
//!
//! Grounded on `original_source/src/utils/helpers.py`'s `ScanState.add_result`.
//! The original only tracks two buckets (`total_repos`, `total_gists`) even
//! though three kinds of result exist; code-search hits fall into the
//! "else" branch there and are counted as gists. This implementation keeps
//! that mapping for consistency with the dedup-cardinality invariant in
//! spec.md 8 (`size == total_repos + total_gists`), documented in DESIGN.md.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashSet;
use tokio_util::sync::CancellationToken;

use crate::types::{ResultKind, ResultRecord};

/// A callback invoked for every newly-accepted (non-duplicate) record.
/// Stands in for the external report writer, which is out of scope here.
pub type ReportSink = dyn Fn(&ResultRecord) + Send + Sync;

/// Shared, read-mostly scan bookkeeping. Counters and the dedup set are
/// mutated only by [`Sink`]; `current_slice` is also written by the
/// driver for diagnostics; `cancel` is flipped by the interrupt handler.
pub struct ScanState {
    seen: DashSet<String>,
    total_repos: AtomicU64,
    total_gists: AtomicU64,
    pub start_time: Instant,
    pub cancel: CancellationToken,
    current_slice: std::sync::Mutex<String>,
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanState {
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
            total_repos: AtomicU64::new(0),
            total_gists: AtomicU64::new(0),
            start_time: Instant::now(),
            cancel: CancellationToken::new(),
            current_slice: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn total_repos(&self) -> u64 {
        self.total_repos.load(Ordering::Relaxed)
    }

    pub fn total_gists(&self) -> u64 {
        self.total_gists.load(Ordering::Relaxed)
    }

    pub fn unique_count(&self) -> usize {
        self.seen.len()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn set_current_slice(&self, label: impl Into<String>) {
        *self.current_slice.lock().unwrap() = label.into();
    }

    pub fn current_slice(&self) -> String {
        self.current_slice.lock().unwrap().clone()
    }
}

/// Accepts parsed result records, deduplicates by canonical URL, counts
/// per kind, and forwards accepted records to the report writer.
pub struct Sink {
    state: std::sync::Arc<ScanState>,
    forward: std::sync::Arc<ReportSink>,
}

impl Sink {
    pub fn new(state: std::sync::Arc<ScanState>, forward: std::sync::Arc<ReportSink>) -> Self {
        Self { state, forward }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Returns `true` iff `record.canonical_url` had not been seen before.
    pub fn add(&self, record: ResultRecord) -> bool {
        if !self.state.seen.insert(record.canonical_url.clone()) {
            return false;
        }

        match record.kind {
            ResultKind::Repository => {
                self.state.total_repos.fetch_add(1, Ordering::Relaxed);
            }
            ResultKind::Code | ResultKind::Gist => {
                self.state.total_gists.fetch_add(1, Ordering::Relaxed);
            }
        }

        (self.forward)(&record);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(kind: ResultKind, url: &str) -> ResultRecord {
        ResultRecord {
            kind,
            name: "n".into(),
            canonical_url: url.into(),
            owner: "o".into(),
            description: None,
            language: None,
            stars: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn dedups_by_canonical_url() {
        let state = Arc::new(ScanState::new());
        let forwarded = Arc::new(std::sync::Mutex::new(0usize));
        let f = forwarded.clone();
        let sink = Sink::new(state.clone(), Arc::new(move |_| *f.lock().unwrap() += 1));

        assert!(sink.add(record(ResultKind::Repository, "https://x/a")));
        assert!(!sink.add(record(ResultKind::Repository, "https://x/a")));
        assert_eq!(state.unique_count(), 1);
        assert_eq!(*forwarded.lock().unwrap(), 1);
    }

    #[test]
    fn counters_equal_dedup_cardinality() {
        let state = Arc::new(ScanState::new());
        let sink = Sink::new(state.clone(), Arc::new(|_| {}));

        sink.add(record(ResultKind::Repository, "https://x/1"));
        sink.add(record(ResultKind::Code, "https://x/2"));
        sink.add(record(ResultKind::Gist, "https://x/3"));
        sink.add(record(ResultKind::Code, "https://x/2")); // dup

        assert_eq!(state.total_repos(), 1);
        assert_eq!(state.total_gists(), 2);
        assert_eq!(state.unique_count() as u64, state.total_repos() + state.total_gists());
    }
}
