//! Streaming multi-pattern matcher for the fixed framing tags.
//!
//! Each pattern keeps its own progress counter. A counter advances when the
//! next expected byte arrives and drops back to zero on any other byte, the
//! mismatching byte included; no credit is shared between patterns. None of
//! the framing tags overlap with themselves, so a plain restart is enough and
//! no failure table is needed.

/// Progress of up to `N` literal patterns over a byte stream.
///
/// Counters live inline in the value, so every search starts from a fresh
/// matcher and no state can leak between unrelated searches.
#[derive(Debug, Clone, Copy)]
pub struct TagMatcher<'p, const N: usize> {
    patterns: [&'p [u8]; N],
    progress: [usize; N],
}

impl<'p, const N: usize> TagMatcher<'p, N> {
    pub fn new(patterns: [&'p [u8]; N]) -> Self {
        debug_assert!(patterns.iter().all(|p| !p.is_empty()));
        Self {
            patterns,
            progress: [0; N],
        }
    }

    /// Feed one byte. Returns the index of the first pattern completed by it.
    pub fn feed(&mut self, byte: u8) -> Option<usize> {
        let mut matched = None;
        for (m, pattern) in self.patterns.iter().enumerate() {
            let seen = &mut self.progress[m];
            if pattern[*seen] == byte {
                *seen += 1;
            } else {
                *seen = 0;
            }
            if *seen == pattern.len() {
                *seen = 0;
                if matched.is_none() {
                    matched = Some(m);
                }
            }
        }
        matched
    }

    /// True while any pattern has a partial match pending.
    pub fn in_progress(&self) -> bool {
        self.progress.iter().any(|&p| p > 0)
    }

    pub fn pattern(&self, index: usize) -> &'p [u8] {
        self.patterns[index]
    }
}
