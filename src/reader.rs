//! Single-direction byte reader that knows where its window ends.
//!
//! Compressed streams cannot report their offset, so the reader counts every
//! consumed byte itself. The count starts at the window start for seeked
//! sources and at zero for sources decoded from the top of the file.

use crate::matcher::TagMatcher;
use std::io::{self, BufRead, ErrorKind};

/// Whether a search may run past the end of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Give up once the window end is reached with no partial match pending.
    Bounded,
    /// Keep reading until a pattern matches or the source is exhausted.
    Unbounded,
}

/// Outcome of [`BoundaryReader::read_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Found {
    /// Pattern `index` matched; the position points just past its last byte.
    Match(usize),
    /// A bounded search reached the window end.
    WindowEnd,
    /// The underlying source has no more bytes.
    EndOfStream,
}

pub struct BoundaryReader<R> {
    inner: R,
    start: u64,
    end: Option<u64>,
    position: u64,
    buffer: Vec<u8>,
}

impl<R: BufRead> BoundaryReader<R> {
    /// Reader over a source already positioned at `start`.
    /// `end` is `None` for sources without a usable window end.
    pub fn new(inner: R, start: u64, end: Option<u64>) -> Self {
        Self {
            inner,
            start,
            end,
            position: start,
            buffer: Vec::with_capacity(crate::config::RECORD_BUFFER_CAPACITY),
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> Option<u64> {
        self.end
    }

    /// Number of bytes consumed so far, offset by the window start.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes captured since the last [`clear_buffer`](Self::clear_buffer).
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Empties the capture buffer, keeping its allocation.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Empties the capture buffer and seeds it with `bytes`.
    pub fn reset_buffer(&mut self, bytes: &[u8]) {
        self.buffer.clear();
        self.buffer.extend_from_slice(bytes);
    }

    fn past_end(&self) -> bool {
        self.end.is_some_and(|end| self.position >= end)
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let Some(&byte) = available.first() else {
                return Ok(None);
            };
            self.inner.consume(1);
            self.position += 1;
            return Ok(Some(byte));
        }
    }

    /// Consumes bytes until one of `patterns` matches.
    ///
    /// With `capture` set, every consumed byte (the matched tag included) is
    /// appended to the buffer. In [`ReadMode::Bounded`] no new match is started
    /// at or beyond the window end, but one already in progress is finished.
    pub fn read_until<const N: usize>(
        &mut self,
        patterns: [&[u8]; N],
        capture: bool,
        mode: ReadMode,
    ) -> io::Result<Found> {
        let mut matcher = TagMatcher::new(patterns);
        loop {
            if mode == ReadMode::Bounded && !matcher.in_progress() && self.past_end() {
                return Ok(Found::WindowEnd);
            }
            let Some(byte) = self.next_byte()? else {
                return Ok(Found::EndOfStream);
            };
            if capture {
                self.buffer.push(byte);
            }
            if let Some(index) = matcher.feed(byte) {
                return Ok(Found::Match(index));
            }
        }
    }

    /// Fraction of the window consumed. Exceeds 1.0 while draining a record
    /// that runs past the window; always 0.0 without a window end.
    pub fn progress(&self) -> f64 {
        match self.end {
            Some(end) if end > self.start => {
                (self.position - self.start) as f64 / (end - self.start) as f64
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PAGE: [&[u8]; 1] = [b"<page>"];

    /// Reader over `data[start..]` with window `[start, end)`.
    fn window(data: &[u8], start: usize, end: usize) -> BoundaryReader<Cursor<&[u8]>> {
        BoundaryReader::new(Cursor::new(&data[start..]), start as u64, Some(end as u64))
    }

    #[test]
    fn bounded_search_finds_tag_inside_window() {
        let data = b"....<page>....";
        let mut reader = window(data, 0, 8);
        assert_eq!(reader.read_until(PAGE, false, ReadMode::Bounded).unwrap(), Found::Match(0));
        assert_eq!(reader.position(), 10);
        assert!(reader.buffer().is_empty());
    }

    #[test]
    fn bounded_search_completes_tag_straddling_window_end() {
        let data = b"....<page>....";
        let mut reader = window(data, 0, 5);
        assert_eq!(reader.read_until(PAGE, false, ReadMode::Bounded).unwrap(), Found::Match(0));
    }

    #[test]
    fn bounded_search_ignores_tag_starting_at_window_end() {
        let data = b"....<page>....";
        let mut reader = window(data, 0, 4);
        assert_eq!(reader.read_until(PAGE, false, ReadMode::Bounded).unwrap(), Found::WindowEnd);
        assert_eq!(reader.position(), 4);
    }

    #[test]
    fn bounded_search_misses_tag_cut_by_window_start() {
        let data = b"....<page>....<page>";
        // starts inside the first tag, ends before the second one
        let mut reader = window(data, 6, 12);
        assert_eq!(reader.read_until(PAGE, false, ReadMode::Bounded).unwrap(), Found::WindowEnd);
    }

    #[test]
    fn unbounded_search_reads_past_window_end() {
        let data = b"<page>..........</page>";
        let mut reader = window(data, 0, 3);
        let tags: [&[u8]; 1] = [b"</page>"];
        assert_eq!(reader.read_until(tags, true, ReadMode::Unbounded).unwrap(), Found::Match(0));
        assert_eq!(reader.buffer(), data.as_slice());
        assert_eq!(reader.position(), data.len() as u64);
    }

    #[test]
    fn end_of_stream_is_reported() {
        let data = b"<page>.....";
        let mut reader = window(data, 0, 100);
        let tags: [&[u8]; 1] = [b"</page>"];
        assert_eq!(reader.read_until(tags, true, ReadMode::Unbounded).unwrap(), Found::EndOfStream);
    }

    #[test]
    fn reset_buffer_seeds_bytes() {
        let data = b"abc</revision>";
        let mut reader = window(data, 0, 100);
        reader.reset_buffer(b"<revision>");
        let tags: [&[u8]; 1] = [b"</revision>"];
        reader.read_until(tags, true, ReadMode::Unbounded).unwrap();
        assert_eq!(reader.buffer(), b"<revision>abc</revision>".as_slice());
    }

    #[test]
    fn progress_tracks_window_fraction() {
        let data = b"0123456789abcdefghij";
        let mut reader = window(data, 10, 15);
        assert_eq!(reader.progress(), 0.0);
        let tags: [&[u8]; 1] = [b"j"];
        reader.read_until(tags, false, ReadMode::Unbounded).unwrap();
        assert_eq!(reader.progress(), 2.0);
    }

    #[test]
    fn progress_without_end_is_zero() {
        let reader = BoundaryReader::new(Cursor::new(b"abc".as_slice()), 0, None);
        assert_eq!(reader.progress(), 0.0);
    }
}
