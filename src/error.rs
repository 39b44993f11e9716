//! Error types for scanning and record extraction.

use std::path::PathBuf;
use thiserror::Error;

/// A captured snippet could not be turned into a record.
#[derive(Error, Debug)]
pub enum SnippetError {
    #[error("snippet is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("bad attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("snippet has no root element")]
    Empty,

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("declared content length is not an integer: {0:?}")]
    InvalidContentLength(String),
}

/// A window scan that cannot continue.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("I/O error while scanning: {0}")]
    Io(#[from] std::io::Error),

    #[error("no end tag for page starting at position {offset} in file {}", path.display())]
    TruncatedPage { path: PathBuf, offset: u64 },

    #[error("no end tag for revision starting at position {offset} in file {}", path.display())]
    TruncatedRevision { path: PathBuf, offset: u64 },
}

/// A split could not be opened as a byte source.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to seek '{}' to {offset}: {source}", path.display())]
    Seek {
        path: PathBuf,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("compressed file '{}' cannot be split; window starts at {start}", path.display())]
    UnsplittableCompressed { path: PathBuf, start: u64 },
}
