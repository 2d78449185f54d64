use std::{fmt::Debug, ops::Range};

use bytes::Bytes;

/// A contiguous run of cached bytes covering `[start, end)`.
///
/// Segments are never empty, and `end - start == data.len()` always holds.
#[derive(Clone, PartialEq, Eq)]
pub struct Segment {
    start: u64,
    end: u64,
    data: Bytes,
    /// cache-wide insertion sequence number, used for FIFO eviction
    tick: u64,
}

impl Segment {
    /// Copies `data` into a new segment starting at `start`.
    ///
    /// Returns `None` if `data` is empty or the segment would extend past
    /// `u64::MAX`.
    pub fn copy_from_slice(start: u64, data: &[u8], tick: u64) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let end = start.checked_add(data.len() as u64)?;
        let data = Bytes::copy_from_slice(data);
        Some(Self { start, end, data, tick })
    }

    /// Wraps a freshly built merge buffer. The caller guarantees `data` is
    /// non-empty and fits after `start`.
    pub(crate) fn from_merged(start: u64, data: Bytes, tick: u64) -> Self {
        debug_assert!(!data.is_empty(), "merged segment must not be empty");
        let end = start + data.len() as u64;
        Self { start, end, data, tick }
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    #[inline]
    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Returns true if every byte of `range` is covered by this segment.
    #[inline]
    pub fn contains(&self, range: &Range<u64>) -> bool {
        self.start <= range.start && range.end <= self.end
    }

    /// Returns the bytes at absolute offsets `range`, which must lie within
    /// this segment.
    pub(crate) fn slice(&self, range: Range<u64>) -> &[u8] {
        debug_assert!(self.contains(&range), "slice out of bounds");
        let lo = (range.start - self.start) as usize;
        let hi = (range.end - self.start) as usize;
        &self.data[lo..hi]
    }

    /// Copies the bytes at `range` into a new, independently owned segment
    /// which keeps this segment's tick.
    pub(crate) fn copy_range(&self, range: Range<u64>) -> Option<Self> {
        Self::copy_from_slice(range.start, self.slice(range), self.tick)
    }
}

impl Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("range", &self.range())
            .field("tick", &self.tick)
            .field("data", &String::from_utf8_lossy(&self.data))
            .finish()
    }
}
