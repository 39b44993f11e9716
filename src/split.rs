//! Byte-range windows over a dump file and the byte sources behind them.
//!
//! Plain XML is seekable, so each window is opened at its own start offset.
//! Bzip2 streams are not: a compressed dump is decoded from byte zero with no
//! window end, which is why it is always planned as a single window.

use crate::config::READ_BUFFER_CAPACITY;
use crate::error::SplitError;
use crate::reader::BoundaryReader;
use crate::scanner::RevisionScanner;
use bzip2::read::MultiBzDecoder;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Plain,
    Bzip2,
}

impl Codec {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bz2") => Codec::Bzip2,
            _ => Codec::Plain,
        }
    }

    pub fn is_splittable(self) -> bool {
        matches!(self, Codec::Plain)
    }
}

/// A contiguous byte range `[start, start + length)` of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub index: u32,
    pub path: PathBuf,
    pub start: u64,
    pub length: u64,
}

impl Split {
    pub fn new(index: u32, path: impl Into<PathBuf>, start: u64, length: u64) -> Self {
        Self {
            index,
            path: path.into(),
            start,
            length,
        }
    }

    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }
}

/// Covering, non-overlapping windows of at most `split_size` bytes.
pub fn plan_splits(path: &Path, split_size: u64) -> Result<Vec<Split>, SplitError> {
    let len = fs::metadata(path)
        .map_err(|source| SplitError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if !Codec::detect(path).is_splittable() {
        info!(path = %path.display(), "Compressed input is not splittable, using one window");
        return Ok(vec![Split::new(0, path, 0, len)]);
    }

    Ok(plan_ranges(len, split_size)
        .enumerate()
        .map(|(index, (start, length))| Split::new(index as u32, path, start, length))
        .collect())
}

fn plan_ranges(len: u64, split_size: u64) -> impl Iterator<Item = (u64, u64)> {
    let step = split_size.max(1);
    let count = len.div_ceil(step).max(1);
    (0..count).map(move |i| {
        let start = i * step;
        (start, step.min(len - start))
    })
}

/// Opens the byte source for `split` and wraps it in a scanner.
pub fn open_split(split: &Split) -> Result<RevisionScanner<Box<dyn BufRead + Send>>, SplitError> {
    let file = File::open(&split.path).map_err(|source| SplitError::Open {
        path: split.path.clone(),
        source,
    })?;

    let reader = match Codec::detect(&split.path) {
        Codec::Plain => {
            let mut file = file;
            file.seek(SeekFrom::Start(split.start))
                .map_err(|source| SplitError::Seek {
                    path: split.path.clone(),
                    offset: split.start,
                    source,
                })?;
            debug!(path = %split.path.display(), start = split.start, "Reading uncompressed file");
            let source: Box<dyn BufRead + Send> =
                Box::new(BufReader::with_capacity(READ_BUFFER_CAPACITY, file));
            BoundaryReader::new(source, split.start, Some(split.end()))
        }
        Codec::Bzip2 => {
            if split.start != 0 {
                return Err(SplitError::UnsplittableCompressed {
                    path: split.path.clone(),
                    start: split.start,
                });
            }
            debug!(path = %split.path.display(), "Reading compressed file from the start");
            let source: Box<dyn BufRead + Send> = Box::new(BufReader::with_capacity(
                READ_BUFFER_CAPACITY,
                MultiBzDecoder::new(file),
            ));
            BoundaryReader::new(source, 0, None)
        }
    };

    Ok(RevisionScanner::new(reader, split.path.clone()))
}
