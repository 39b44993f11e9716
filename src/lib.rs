//! Wikisplit: split-aware revision extraction from Wikipedia XML dumps
//!
//! A full-history dump is one huge XML document: a `<mediawiki>` root, a
//! `<siteinfo>` header and then millions of `<page>` elements, each holding
//! its `<revision>` elements. Wikisplit cuts the dump into byte windows that
//! can be scanned independently and emits one record per revision.
//!
//! # Ownership rule
//!
//! A page belongs to the window that contains the first byte of its `<page>`
//! start tag. The scanner never starts matching `<page>` at or past its
//! window end, but once inside a page it reads past the end until the page
//! closes. Adjacent windows therefore produce disjoint record sets whose
//! union is exactly the set of revisions in the dump.
//!
//! # Pipeline
//!
//! 1. **Plan** -- Cut the input into windows ([`split::plan_splits`]).
//!    Bzip2 input is not seekable and is planned as a single window.
//! 2. **Scan** -- Scan windows in parallel with rayon, one CSV shard (and
//!    optionally one JSONL text shard) per window ([`extract`]).
//! 3. **Merge** -- Concatenate the shards in window order ([`merge`]).
//!
//! # Key Modules
//!
//! - [`matcher`] -- Incremental multi-pattern byte matcher
//! - [`reader`] -- Position-tracking reader with bounded/unbounded reads
//! - [`scanner`] -- The page/revision state machine
//! - [`page`] / [`revision`] -- Snippet extractors for headers and revisions
//! - [`snippet`] -- Mini-DOM over quick-xml for small, complete fragments
//! - [`split`] -- Window planning and opening (plain and bzip2)
//! - [`content`] -- Plain-text rendering, links and categories from wikitext
//! - [`checkpoint`] -- Resumable runs keyed on completed windows
//! - [`stats`] -- Thread-safe counters for a run
//!
//! # Example Usage
//!
//! ```bash
//! # Scan a dump in 64 MiB windows, writing bodies as plain text
//! wikisplit scan -i enwiki-pages-meta-history1.xml -o output/ --text --plain-text
//!
//! # Scan one window, e.g. from an external scheduler
//! wikisplit window -i enwiki-pages-meta-history1.xml --start 2500 --length 200
//!
//! # Merge per-window shards
//! wikisplit merge -o output/
//! ```

pub mod checkpoint;
pub mod config;
pub mod content;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod merge;
pub mod models;
pub mod page;
pub mod reader;
pub mod revision;
pub mod scanner;
pub mod snippet;
pub mod split;
pub mod stats;

pub use error::{ScanError, SnippetError, SplitError};
pub use models::{Contributor, Page, Revision, RevisionRecord};
pub use scanner::{RevisionScanner, ScanSummary};
pub use split::{open_split, plan_splits, Codec, Split};
