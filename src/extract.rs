use crate::checkpoint::{Checkpoint, CheckpointManager};
use crate::config::{PROGRESS_INTERVAL, WRITER_BUFFER_CAPACITY};
use crate::content;
use crate::models::{RevisionRecord, RevisionRow, TextBlob};
use crate::scanner::ScanSummary;
use crate::split::{open_split, plan_splits, Split};
use crate::stats::ExtractionStats;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Knobs for one extraction run
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub split_size: u64,
    /// Also write revision bodies to `text_NNNNN.jsonl`
    pub write_text: bool,
    /// Reduce bodies to plain text before writing them
    pub plain_text: bool,
    pub dry_run: bool,
}

pub fn revisions_shard_path(output_dir: &str, index: u32) -> PathBuf {
    Path::new(output_dir).join(format!("revisions_{:05}.csv", index))
}

pub fn text_shard_path(output_dir: &str, index: u32) -> PathBuf {
    Path::new(output_dir).join(format!("text_{:05}.jsonl", index))
}

/// Per-split output files
struct ShardWriter {
    rows: csv::Writer<BufWriter<File>>,
    text: Option<BufWriter<File>>,
    plain_text: bool,
}

impl ShardWriter {
    fn create(output_dir: &str, index: u32, options: &ExtractOptions) -> Result<Self> {
        let rows_path = revisions_shard_path(output_dir, index);
        let rows_file = File::create(&rows_path)
            .with_context(|| format!("Failed to create shard: {}", rows_path.display()))?;
        let rows = csv::Writer::from_writer(BufWriter::with_capacity(WRITER_BUFFER_CAPACITY, rows_file));

        let text = if options.write_text {
            let text_path = text_shard_path(output_dir, index);
            let text_file = File::create(&text_path)
                .with_context(|| format!("Failed to create shard: {}", text_path.display()))?;
            Some(BufWriter::with_capacity(WRITER_BUFFER_CAPACITY, text_file))
        } else {
            None
        };

        Ok(Self {
            rows,
            text,
            plain_text: options.plain_text,
        })
    }

    fn write(&mut self, record: &RevisionRecord) -> Result<()> {
        self.rows.serialize(RevisionRow::from(record))?;

        if let Some(out) = self.text.as_mut() {
            let page = record.page();
            let rendered;
            let text = if self.plain_text {
                rendered = content::plain_text(&page.title, &record.revision.raw_markup);
                rendered.as_str()
            } else {
                record.revision.raw_markup.as_str()
            };
            let blob = TextBlob {
                key: &record.key,
                title: &page.title,
                text,
            };
            serde_json::to_writer(&mut *out, &blob)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.rows.flush()?;
        if let Some(mut out) = self.text.take() {
            out.flush()?;
        }
        Ok(())
    }
}

/// Scans every split of `input` in parallel and writes one shard per split.
///
/// A split whose scan aborts on truncated input keeps the records it already
/// wrote but is not marked complete, so a resumed run scans it again. The
/// returned totals cover every split scanned by this run plus the completed
/// splits carried over from `checkpoint`.
pub fn run_extraction(
    input: &str,
    output_dir: &str,
    options: &ExtractOptions,
    checkpoint: Option<&Checkpoint>,
    checkpoint_mgr: Option<&CheckpointManager>,
) -> Result<ExtractionStats> {
    let splits = plan_splits(Path::new(input), options.split_size)
        .with_context(|| format!("Failed to plan splits for: {}", input))?;

    let stats = match checkpoint {
        Some(cp) => {
            if let Some(mgr) = checkpoint_mgr {
                mgr.restore(cp);
            }
            ExtractionStats::from_checkpoint(&cp.stats)
        }
        None => ExtractionStats::new(),
    };

    let pending: Vec<&Split> = splits
        .iter()
        .filter(|s| !checkpoint.is_some_and(|cp| cp.is_complete(s.index)))
        .collect();

    info!(
        total = splits.len(),
        pending = pending.len(),
        split_size = options.split_size,
        "Scanning windows"
    );

    let pb = ProgressBar::new(pending.len() as u64);

    pending.par_iter().try_for_each(|split| -> Result<()> {
        let window = ExtractionStats::new();
        let completed = scan_split(split, output_dir, options, &window)?;
        stats.absorb(&window);
        if completed {
            if let Some(mgr) = checkpoint_mgr {
                if let Err(e) = mgr.mark_complete(split.index, &window) {
                    warn!(error = %e, "Failed to save checkpoint");
                }
            }
        }
        pb.inc(1);
        Ok(())
    })?;

    pb.finish_and_clear();

    if let Some(mgr) = checkpoint_mgr {
        mgr.save()?;
    }

    Ok(stats)
}

/// Scans one window, counting into `stats`. Returns `false` when the window
/// was aborted.
fn scan_split(
    split: &Split,
    output_dir: &str,
    options: &ExtractOptions,
    stats: &ExtractionStats,
) -> Result<bool> {
    let mut scanner = open_split(split)
        .with_context(|| format!("Failed to open window {} of {}", split.index, split.path.display()))?;

    let mut writer = if options.dry_run {
        None
    } else {
        Some(ShardWriter::create(output_dir, split.index, options)?)
    };

    let mut completed = true;
    let mut emitted: u64 = 0;
    loop {
        match scanner.next_record() {
            Ok(Some(record)) => {
                stats.record_revision(&record.revision);
                if let Some(w) = writer.as_mut() {
                    w.write(&record)?;
                }
                emitted += 1;
                if emitted % PROGRESS_INTERVAL == 0 {
                    debug!(
                        split = split.index,
                        revisions = emitted,
                        progress = scanner.progress(),
                        "Window progress"
                    );
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(split = split.index, start = split.start, error = %e, "Window aborted");
                completed = false;
                break;
            }
        }
    }

    if let Some(w) = writer {
        w.finish()?;
    }

    stats.add_summary(&scanner.summary());
    stats.inc_windows();
    if !completed {
        stats.inc_aborted();
    }

    Ok(completed)
}

/// Scans a single window and writes one JSON object per revision to `out`.
/// This is the entry point for workers driven by an external scheduler.
pub fn run_window<W: Write>(split: &Split, out: &mut W) -> Result<ScanSummary> {
    let mut scanner = open_split(split)
        .with_context(|| format!("Failed to open window at {} of {}", split.start, split.path.display()))?;

    while let Some(record) = scanner.next_record()? {
        serde_json::to_writer(&mut *out, &RevisionRow::from(&record))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    Ok(scanner.summary())
}
