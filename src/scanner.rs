//! Split-aware page/revision scanner.
//!
//! A scanner is handed one byte window of a dump and yields every revision of
//! every page whose `<page>` tag starts inside that window. Once a page has
//! started, reading continues past the window end for as long as the page
//! lasts. A page that starts before the window (even partially) belongs to
//! the previous window and is never picked up here, so a covering,
//! non-overlapping set of windows emits each revision exactly once with no
//! coordination between the workers scanning them.
//!
//! ```text
//! SeekingPage --<page>--> InPage --</page>--> SeekingPage
//!                           |  ^
//!                 <revision>|  | </revision> (emit record)
//!                           v  |
//!                        [capture revision]
//! ```

use crate::config::{PAGE_END_TAG, PAGE_START_TAG, REVISION_END_TAG, REVISION_START_TAG};
use crate::error::{ScanError, SnippetError};
use crate::models::{Page, RevisionRecord};
use crate::page::parse_page;
use crate::reader::{BoundaryReader, Found, ReadMode};
use crate::revision::parse_revision;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, warn};

const REVISION_OR_PAGE_END: [&[u8]; 2] = [REVISION_START_TAG, PAGE_END_TAG];
const REVISION_MATCH: usize = 0;
const PAGE_END_MATCH: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingPage,
    InPage,
    Done,
}

/// Header of the page currently being scanned.
#[derive(Debug, Clone)]
enum PageHeader {
    /// Not parsed yet; happens at the first `<revision>` of the page.
    Pending,
    Parsed(Arc<Page>),
    /// The header could not be parsed; revisions of this page are skipped.
    Malformed,
}

/// Counters for one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub pages: u64,
    pub revisions: u64,
    pub skipped_revisions: u64,
}

pub struct RevisionScanner<R> {
    /// Released as soon as the scan terminates.
    reader: Option<BoundaryReader<R>>,
    source: PathBuf,
    state: State,
    header: PageHeader,
    page_start: u64,
    start: u64,
    end: Option<u64>,
    position: u64,
    summary: ScanSummary,
}

impl<R: BufRead> RevisionScanner<R> {
    /// `source` is only used in diagnostics.
    pub fn new(reader: BoundaryReader<R>, source: impl Into<PathBuf>) -> Self {
        let start = reader.start();
        let end = reader.end();
        Self {
            reader: Some(reader),
            source: source.into(),
            state: State::SeekingPage,
            header: PageHeader::Pending,
            page_start: start,
            start,
            end,
            position: start,
            summary: ScanSummary::default(),
        }
    }

    pub fn source(&self) -> &PathBuf {
        &self.source
    }

    pub fn summary(&self) -> ScanSummary {
        self.summary
    }

    pub fn byte_position(&self) -> u64 {
        self.reader.as_ref().map_or(self.position, BoundaryReader::position)
    }

    /// Fraction of the window consumed; may exceed 1.0 while finishing a
    /// page that runs past the window end.
    pub fn progress(&self) -> f64 {
        match self.end {
            Some(end) if end > self.start => {
                (self.byte_position() - self.start) as f64 / (end - self.start) as f64
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }

    /// True once the window is exhausted or the scan was aborted.
    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    /// Returns the next revision, `Ok(None)` once the window holds no further
    /// page starts. A truncated page or revision aborts the window: the error
    /// is logged and returned once, and every later call yields `Ok(None)`.
    pub fn next_record(&mut self) -> Result<Option<RevisionRecord>, ScanError> {
        match self.advance() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(e) => {
                error!(
                    path = %self.source.display(),
                    position = self.byte_position(),
                    "{e}"
                );
                self.finish();
                Err(e)
            }
        }
    }

    fn finish(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.position = reader.position();
        }
        self.state = State::Done;
        self.header = PageHeader::Pending;
    }

    fn advance(&mut self) -> Result<Option<RevisionRecord>, ScanError> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                return Ok(None);
            };

            match self.state {
                State::Done => return Ok(None),
                State::SeekingPage => {
                    reader.clear_buffer();
                    match reader.read_until([PAGE_START_TAG], false, ReadMode::Bounded)? {
                        Found::Match(_) => {
                            self.page_start = reader.position() - PAGE_START_TAG.len() as u64;
                            self.state = State::InPage;
                            self.header = PageHeader::Pending;
                            self.summary.pages += 1;
                            debug!(offset = self.page_start, "Page start");
                        }
                        Found::WindowEnd | Found::EndOfStream => {
                            debug!(position = reader.position(), "No page start left in window");
                            return Ok(None);
                        }
                    }
                }
                State::InPage => {
                    match reader.read_until(REVISION_OR_PAGE_END, true, ReadMode::Unbounded)? {
                        Found::Match(REVISION_MATCH) => {
                            if let Some(record) = self.read_revision()? {
                                return Ok(Some(record));
                            }
                        }
                        Found::Match(PAGE_END_MATCH) => {
                            // the only transition that goes back to looking for a page
                            self.state = State::SeekingPage;
                            self.header = PageHeader::Pending;
                        }
                        _ => {
                            return Err(ScanError::TruncatedPage {
                                path: self.source.clone(),
                                offset: self.page_start,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Called right after a `<revision>` tag was consumed. Returns `None` when
    /// the revision was captured but could not be turned into a record.
    fn read_revision(&mut self) -> Result<Option<RevisionRecord>, ScanError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        if matches!(self.header, PageHeader::Pending) {
            let captured = reader.buffer();
            let header = &captured[..captured.len() - REVISION_START_TAG.len()];
            self.header = match page_snippet(header).map(|xml| parse_page(&xml)) {
                Ok(Ok(page)) => PageHeader::Parsed(Arc::new(page)),
                Ok(Err(e)) => {
                    warn!(offset = self.page_start, error = %e, "Malformed page header");
                    PageHeader::Malformed
                }
                Err(e) => {
                    warn!(offset = self.page_start, error = %e, "Page header is not UTF-8");
                    PageHeader::Malformed
                }
            };
        }

        let revision_start = reader.position() - REVISION_START_TAG.len() as u64;
        reader.reset_buffer(REVISION_START_TAG);
        if reader.read_until([REVISION_END_TAG], true, ReadMode::Unbounded)? != Found::Match(0) {
            return Err(ScanError::TruncatedRevision {
                path: self.source.clone(),
                offset: revision_start,
            });
        }

        let page = match &self.header {
            PageHeader::Parsed(page) => Arc::clone(page),
            _ => {
                self.summary.skipped_revisions += 1;
                debug!(offset = revision_start, "Skipping revision of malformed page");
                return Ok(None);
            }
        };

        let parsed = String::from_utf8(reader.buffer().to_vec())
            .map_err(SnippetError::from)
            .and_then(|xml| parse_revision(&xml, Arc::clone(&page)));

        match parsed {
            Ok(revision) => {
                self.summary.revisions += 1;
                Ok(Some(RevisionRecord::new(revision)))
            }
            Err(e) => {
                self.summary.skipped_revisions += 1;
                warn!(
                    page_id = %page.page_id,
                    offset = revision_start,
                    error = %e,
                    "Skipping malformed revision"
                );
                Ok(None)
            }
        }
    }
}

/// Rebuilds a standalone `<page>` element from the bytes between the page
/// start tag and the first revision.
fn page_snippet(header: &[u8]) -> Result<String, std::string::FromUtf8Error> {
    let mut xml = Vec::with_capacity(PAGE_START_TAG.len() + header.len() + PAGE_END_TAG.len());
    xml.extend_from_slice(PAGE_START_TAG);
    xml.extend_from_slice(header);
    xml.extend_from_slice(PAGE_END_TAG);
    String::from_utf8(xml)
}

impl<R: BufRead> Iterator for RevisionScanner<R> {
    type Item = Result<RevisionRecord, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
