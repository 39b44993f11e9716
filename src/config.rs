/// Opening tag of a page record
pub const PAGE_START_TAG: &[u8] = b"<page>";

/// Closing tag of a page record
pub const PAGE_END_TAG: &[u8] = b"</page>";

/// Opening tag of a revision record
pub const REVISION_START_TAG: &[u8] = b"<revision>";

/// Closing tag of a revision record
pub const REVISION_END_TAG: &[u8] = b"</revision>";

/// Default window length for uncompressed dumps (64 MiB)
pub const DEFAULT_SPLIT_SIZE: u64 = 64 * 1024 * 1024;

/// Read buffer in front of every byte source
pub const READ_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Initial capacity of the record accumulation buffer
pub const RECORD_BUFFER_CAPACITY: usize = 64 * 1024;

/// Buffer size for CSV and JSONL shard writers
pub const WRITER_BUFFER_CAPACITY: usize = 128 * 1024;

/// Log scanner progress every N revisions
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Persist the checkpoint every N completed splits
pub const CHECKPOINT_INTERVAL: u32 = 8;

/// Bumped whenever the checkpoint layout or meaning changes
pub const CHECKPOINT_VERSION: u32 = 2;
