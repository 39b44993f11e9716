use crate::checkpoint::CheckpointStats;
use crate::models::Revision;
use crate::scanner::ScanSummary;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics collected across all windows of an extraction run
#[derive(Default)]
pub struct ExtractionStats {
    pub windows_scanned: AtomicU64,
    pub windows_aborted: AtomicU64,
    pub pages_seen: AtomicU64,
    pub revisions_emitted: AtomicU64,
    pub revisions_skipped: AtomicU64,
    pub redirects: AtomicU64,
    pub stubs: AtomicU64,
    pub metadata_only: AtomicU64,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_windows(&self) {
        self.windows_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_aborted(&self) {
        self.windows_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Classification counters for one emitted revision.
    pub fn record_revision(&self, revision: &Revision) {
        if revision.is_redirect {
            self.redirects.fetch_add(1, Ordering::Relaxed);
        }
        if revision.is_stub {
            self.stubs.fetch_add(1, Ordering::Relaxed);
        }
        if revision.is_metadata_only {
            self.metadata_only.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Folds one finished window's counters in.
    pub fn add_summary(&self, summary: &ScanSummary) {
        self.pages_seen.fetch_add(summary.pages, Ordering::Relaxed);
        self.revisions_emitted
            .fetch_add(summary.revisions, Ordering::Relaxed);
        self.revisions_skipped
            .fetch_add(summary.skipped_revisions, Ordering::Relaxed);
    }

    /// Adds every counter of `other` into `self`.
    pub fn absorb(&self, other: &ExtractionStats) {
        let pairs = [
            (&self.windows_scanned, &other.windows_scanned),
            (&self.windows_aborted, &other.windows_aborted),
            (&self.pages_seen, &other.pages_seen),
            (&self.revisions_emitted, &other.revisions_emitted),
            (&self.revisions_skipped, &other.revisions_skipped),
            (&self.redirects, &other.redirects),
            (&self.stubs, &other.stubs),
            (&self.metadata_only, &other.metadata_only),
        ];
        for (total, part) in pairs {
            total.fetch_add(part.load(Ordering::Relaxed), Ordering::Relaxed);
        }
    }

    pub fn windows(&self) -> u64 {
        self.windows_scanned.load(Ordering::Relaxed)
    }

    pub fn aborted(&self) -> u64 {
        self.windows_aborted.load(Ordering::Relaxed)
    }

    pub fn pages(&self) -> u64 {
        self.pages_seen.load(Ordering::Relaxed)
    }

    pub fn revisions(&self) -> u64 {
        self.revisions_emitted.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.revisions_skipped.load(Ordering::Relaxed)
    }

    pub fn redirect_count(&self) -> u64 {
        self.redirects.load(Ordering::Relaxed)
    }

    pub fn stub_count(&self) -> u64 {
        self.stubs.load(Ordering::Relaxed)
    }

    pub fn metadata_only_count(&self) -> u64 {
        self.metadata_only.load(Ordering::Relaxed)
    }

    /// Create stats initialized from a checkpoint
    pub fn from_checkpoint(cp: &CheckpointStats) -> Self {
        Self {
            windows_scanned: AtomicU64::new(cp.windows_scanned),
            windows_aborted: AtomicU64::new(cp.windows_aborted),
            pages_seen: AtomicU64::new(cp.pages_seen),
            revisions_emitted: AtomicU64::new(cp.revisions_emitted),
            revisions_skipped: AtomicU64::new(cp.revisions_skipped),
            redirects: AtomicU64::new(cp.redirects),
            stubs: AtomicU64::new(cp.stubs),
            metadata_only: AtomicU64::new(cp.metadata_only),
        }
    }

    /// Convert to checkpoint stats for persistence
    pub fn to_checkpoint(&self) -> CheckpointStats {
        CheckpointStats {
            windows_scanned: self.windows(),
            windows_aborted: self.aborted(),
            pages_seen: self.pages(),
            revisions_emitted: self.revisions(),
            revisions_skipped: self.skipped(),
            redirects: self.redirect_count(),
            stubs: self.stub_count(),
            metadata_only: self.metadata_only_count(),
        }
    }
}
