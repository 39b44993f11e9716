use crate::config::CHECKPOINT_VERSION;
use crate::stats::ExtractionStats;
use anyhow::{Context, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, info, warn};

#[derive(Serialize, Deserialize, Clone, Default)]
pub struct CheckpointStats {
    pub windows_scanned: u64,
    pub windows_aborted: u64,
    pub pages_seen: u64,
    pub revisions_emitted: u64,
    pub revisions_skipped: u64,
    pub redirects: u64,
    pub stubs: u64,
    pub metadata_only: u64,
}

#[derive(Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub input_path: String,
    pub input_mtime: u64,
    pub output_dir: String,
    pub split_size: u64,
    /// Indices of splits whose output is complete
    pub completed_splits: Vec<u32>,
    /// Totals over the completed splits only
    pub stats: CheckpointStats,
}

impl Checkpoint {
    pub fn is_complete(&self, split_index: u32) -> bool {
        self.completed_splits.binary_search(&split_index).is_ok()
    }
}

pub fn checkpoint_path(output_dir: &str) -> PathBuf {
    Path::new(output_dir).join("checkpoint.bin")
}

fn get_input_mtime(input_path: &str) -> Result<u64> {
    let metadata = fs::metadata(input_path)
        .with_context(|| format!("Failed to get metadata for: {}", input_path))?;
    let mtime = metadata
        .modified()
        .context("Failed to get modification time")?
        .duration_since(SystemTime::UNIX_EPOCH)
        .context("Invalid modification time")?
        .as_secs();
    Ok(mtime)
}

pub fn load_if_valid(
    input_path: &str,
    output_dir: &str,
    split_size: u64,
) -> Result<Option<Checkpoint>> {
    let path = checkpoint_path(output_dir);

    if !path.exists() {
        return Ok(None);
    }

    let file_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    let file = File::open(&path).context("Failed to open checkpoint file")?;
    let reader = BufReader::new(file);

    let options = bincode::options().with_limit(file_size.saturating_add(1024));

    let checkpoint: Checkpoint = match options.deserialize_from(reader) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Checkpoint file is corrupt or unreadable");
            return Ok(None);
        }
    };

    if checkpoint.version != CHECKPOINT_VERSION {
        info!(
            cached = checkpoint.version,
            current = CHECKPOINT_VERSION,
            "Checkpoint version mismatch"
        );
        return Ok(None);
    }

    if checkpoint.input_path != input_path {
        info!(
            cached = checkpoint.input_path,
            current = input_path,
            "Checkpoint input path mismatch"
        );
        return Ok(None);
    }

    let current_mtime = get_input_mtime(input_path)?;
    if checkpoint.input_mtime != current_mtime {
        info!(
            cached_mtime = checkpoint.input_mtime,
            current_mtime = current_mtime,
            "Input file has changed since checkpoint was created"
        );
        return Ok(None);
    }

    if checkpoint.output_dir != output_dir {
        info!(
            cached = checkpoint.output_dir,
            current = output_dir,
            "Checkpoint output directory mismatch"
        );
        return Ok(None);
    }

    // split indices only mean something for the same plan
    if checkpoint.split_size != split_size {
        info!(
            cached = checkpoint.split_size,
            current = split_size,
            "Checkpoint split size mismatch"
        );
        return Ok(None);
    }

    info!(
        completed = checkpoint.completed_splits.len(),
        revisions = checkpoint.stats.revisions_emitted,
        "Loaded valid checkpoint"
    );

    Ok(Some(checkpoint))
}

pub fn clear(output_dir: &str) -> Result<()> {
    let path = checkpoint_path(output_dir);
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove checkpoint file: {:?}", path))?;
        info!("Checkpoint cleared");
    }
    Ok(())
}

pub struct CheckpointManager {
    checkpoint_path: PathBuf,
    input_path: String,
    input_mtime: u64,
    output_dir: String,
    split_size: u64,
    interval: u32,
    completed: Mutex<BTreeSet<u32>>,
    /// Counters of the splits in `completed`, updated under its lock
    totals: ExtractionStats,
    splits_since_save: AtomicU32,
}

impl CheckpointManager {
    pub fn new(input_path: &str, output_dir: &str, split_size: u64, interval: u32) -> Result<Self> {
        let input_mtime = get_input_mtime(input_path)?;
        Ok(Self {
            checkpoint_path: checkpoint_path(output_dir),
            input_path: input_path.to_string(),
            input_mtime,
            output_dir: output_dir.to_string(),
            split_size,
            interval: interval.max(1),
            completed: Mutex::new(BTreeSet::new()),
            totals: ExtractionStats::new(),
            splits_since_save: AtomicU32::new(0),
        })
    }

    /// Seeds the completed set and its totals from a loaded checkpoint.
    pub fn restore(&self, checkpoint: &Checkpoint) {
        if let Ok(mut completed) = self.completed.lock() {
            completed.extend(checkpoint.completed_splits.iter().copied());
            self.totals
                .absorb(&ExtractionStats::from_checkpoint(&checkpoint.stats));
        }
    }

    /// Records a finished split with its own counters and saves once
    /// `interval` splits have finished since the last save.
    pub fn mark_complete(&self, split_index: u32, window: &ExtractionStats) -> Result<bool> {
        let mut completed = match self.completed.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "Checkpoint lock poisoned, skipping save");
                return Ok(false);
            }
        };
        if !completed.insert(split_index) {
            return Ok(false);
        }
        self.totals.absorb(window);

        let count = self.splits_since_save.fetch_add(1, Ordering::Relaxed) + 1;
        if count < self.interval {
            return Ok(false);
        }

        self.write(&completed)?;
        self.splits_since_save.store(0, Ordering::Relaxed);
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        let completed = match self.completed.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "Checkpoint lock poisoned, skipping save");
                return Ok(());
            }
        };
        self.write(&completed)
    }

    fn write(&self, completed: &BTreeSet<u32>) -> Result<()> {
        let checkpoint = Checkpoint {
            version: CHECKPOINT_VERSION,
            input_path: self.input_path.clone(),
            input_mtime: self.input_mtime,
            output_dir: self.output_dir.clone(),
            split_size: self.split_size,
            completed_splits: completed.iter().copied().collect(),
            stats: self.totals.to_checkpoint(),
        };

        if let Some(parent) = self.checkpoint_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let tmp_path = self.checkpoint_path.with_extension("bin.tmp");
        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create temp checkpoint file: {:?}", tmp_path))?;
        let writer = BufWriter::new(file);

        bincode::DefaultOptions::new()
            .serialize_into(writer, &checkpoint)
            .context("Failed to serialize checkpoint")?;

        fs::rename(&tmp_path, &self.checkpoint_path).with_context(|| {
            format!(
                "Failed to rename temp checkpoint: {:?}",
                self.checkpoint_path
            )
        })?;

        debug!(
            completed = checkpoint.completed_splits.len(),
            revisions = checkpoint.stats.revisions_emitted,
            "Checkpoint saved"
        );

        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        clear(&self.output_dir)
    }
}
