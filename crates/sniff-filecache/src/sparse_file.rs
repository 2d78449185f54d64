//! The cached view of a single file: a sorted list of disjoint segments.
//!
//! After every mutation the segment list is in maximally-merged form:
//! sorted by offset, no two segments overlap, and no two segments touch
//! (adjacent segments are always merged into one).

use std::{
    ops::Range,
    time::{Duration, Instant},
};

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;

use crate::{hash_table::HTEntry, path_hash::PathHash, segment::Segment};

#[derive(Debug, Clone)]
pub struct SparseFile {
    key: PathHash,
    segments: Vec<Segment>,
    /// sum of all segment lengths
    size: u64,
    last_touch: Instant,
    last_tick: u64,
}

impl HTEntry for SparseFile {
    type Key = PathHash;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl SparseFile {
    pub fn new(key: PathHash, now: Instant, tick: u64) -> Self {
        Self {
            key,
            segments: Vec::new(),
            size: 0,
            last_touch: now,
            last_tick: tick,
        }
    }

    #[inline]
    pub fn key(&self) -> PathHash {
        self.key
    }

    /// Number of cached bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<u64>> + '_ {
        self.segments.iter().map(Segment::range)
    }

    #[inline]
    pub fn last_touch(&self) -> Instant {
        self.last_touch
    }

    /// Ordering key for least-recently-touched eviction. The tick breaks ties
    /// between touches which happened at the same instant.
    #[inline]
    pub(crate) fn lru_order(&self) -> (Instant, u64) {
        (self.last_touch, self.last_tick)
    }

    pub fn touch(&mut self, now: Instant, tick: u64) {
        self.last_touch = self.last_touch.max(now);
        self.last_tick = self.last_tick.max(tick);
    }

    pub fn is_expired(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.last_touch) > max_age
    }

    /// Indexes of the segments which overlap or are adjacent to `range`.
    fn touching(&self, range: &Range<u64>) -> Range<usize> {
        let lo = self.segments.partition_point(|s| s.end() < range.start);
        let hi = self.segments.partition_point(|s| s.start() <= range.end);
        lo..hi.max(lo)
    }

    /// Indexes of the segments which share at least one byte with `range`.
    fn overlapping(&self, range: &Range<u64>) -> Range<usize> {
        let lo = self.segments.partition_point(|s| s.end() <= range.start);
        let hi = self.segments.partition_point(|s| s.start() < range.end);
        lo..hi.max(lo)
    }

    /// Inserts a segment, merging it with every segment it overlaps or
    /// touches. Bytes from `segment` replace older bytes at the same offsets;
    /// older bytes outside of `segment` are kept.
    pub fn insert(&mut self, segment: Segment) {
        let idx = self.touching(&segment.range());

        if idx.is_empty() {
            self.size += segment.len();
            self.segments.insert(idx.start, segment);
            return;
        }

        let neighbors = &self.segments[idx.clone()];
        let start = neighbors[0].start().min(segment.start());
        let end = neighbors[neighbors.len() - 1].end().max(segment.end());

        let replaced: u64 = neighbors.iter().map(Segment::len).sum();

        let mut buf = BytesMut::zeroed((end - start) as usize);
        for old in neighbors.iter().chain(std::iter::once(&segment)) {
            let at = (old.start() - start) as usize;
            buf[at..at + old.data().len()].copy_from_slice(old.data());
        }

        let merged = Segment::from_merged(start, buf.freeze(), segment.tick());
        self.size = self.size - replaced + merged.len();
        self.segments.splice(idx, [merged]);
    }

    /// Drops every cached byte in `range`, trimming or splitting segments
    /// which partially overlap it. Returns the number of bytes removed.
    pub fn invalidate(&mut self, range: Range<u64>) -> u64 {
        if range.is_empty() {
            return 0;
        }
        let idx = self.overlapping(&range);
        if idx.is_empty() {
            return 0;
        }

        let first = &self.segments[idx.start];
        let last = &self.segments[idx.end - 1];

        let mut survivors: SmallVec<[Segment; 2]> = SmallVec::new();
        if first.start() < range.start {
            survivors.extend(first.copy_range(first.start()..range.start));
        }
        if last.end() > range.end {
            survivors.extend(last.copy_range(range.end..last.end()));
        }

        let before: u64 = self.segments[idx.clone()].iter().map(Segment::len).sum();
        let after: u64 = survivors.iter().map(Segment::len).sum();

        self.segments.splice(idx, survivors);
        self.size = self.size - before + after;
        before - after
    }

    /// Applies a write: the write's bytes become the only truth for its
    /// range. Older bytes in that range are discarded rather than blended,
    /// and any surviving neighbor which touches the write is merged with it.
    pub fn write(&mut self, segment: Segment) {
        self.invalidate(segment.range());
        self.insert(segment);
    }

    /// Reconstructs `len` bytes starting at `offset`. Positions not covered
    /// by any segment are filled with `gap_byte`.
    ///
    /// Returns `None` if `len` is zero, if the range wraps past `u64::MAX`,
    /// or if no segment covers any byte of the range.
    pub fn content_range(&self, offset: u64, len: u64, gap_byte: u8) -> Option<Bytes> {
        if len == 0 {
            return None;
        }
        let end = offset.checked_add(len)?;
        let range = offset..end;
        let idx = self.overlapping(&range);
        if idx.is_empty() {
            return None;
        }

        // a single covering segment can hand out a view of its own buffer
        if let [seg] = &self.segments[idx.clone()]
            && seg.contains(&range)
        {
            let at = (offset - seg.start()) as usize;
            return Some(seg.data().slice(at..at + len as usize));
        }

        let len = usize::try_from(len).ok()?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).ok()?;
        buf.resize(len, gap_byte);

        for seg in &self.segments[idx] {
            let lo = seg.start().max(offset);
            let hi = seg.end().min(end);
            let at = (lo - offset) as usize;
            buf[at..at + (hi - lo) as usize].copy_from_slice(seg.slice(lo..hi));
        }

        Some(buf.into())
    }

    /// Evicts segments in insertion order until the file holds at most
    /// `limit` bytes. Returns the number of bytes evicted.
    ///
    /// The bytes in `protect` (the range just inserted) are never evicted, so
    /// a single insert larger than `limit` is kept whole. When only the
    /// segment holding `protect` remains, older bytes merged into it are
    /// trimmed away instead, left side first.
    pub fn enforce_limit(&mut self, limit: u64, protect: &Range<u64>) -> u64 {
        let before = self.size;

        if limit == 0 {
            self.segments.clear();
            self.size = 0;
            return before;
        }

        while self.size > limit {
            let oldest = self
                .segments
                .iter()
                .enumerate()
                .filter(|(_, seg)| !seg.contains(protect))
                .min_by_key(|(_, seg)| seg.tick())
                .map(|(i, _)| i);

            match oldest {
                Some(i) => {
                    let seg = self.segments.remove(i);
                    self.size -= seg.len();
                }
                None => break,
            }
        }

        if self.size > limit {
            self.trim_around(protect, self.size - limit);
        }

        before - self.size
    }

    fn trim_around(&mut self, protect: &Range<u64>, excess: u64) {
        let Some(i) = self.segments.iter().position(|seg| seg.contains(protect)) else {
            return;
        };
        let seg = &self.segments[i];

        let left = (protect.start - seg.start()).min(excess);
        let right = (seg.end() - protect.end).min(excess - left);
        if left == 0 && right == 0 {
            return;
        }

        if let Some(trimmed) = seg.copy_range(seg.start() + left..seg.end() - right) {
            self.size -= seg.len() - trimmed.len();
            self.segments[i] = trimmed;
        }
    }

    /// Checks the structural invariants: segments are non-empty, sorted,
    /// neither overlapping nor touching, and `size` matches their lengths.
    pub fn is_consistent(&self) -> bool {
        let sorted = self
            .segments
            .windows(2)
            .all(|pair| pair[0].end() < pair[1].start());
        let non_empty = self.segments.iter().all(|seg| !seg.is_empty());
        let size: u64 = self.segments.iter().map(Segment::len).sum();
        sorted && non_empty && size == self.size
    }
}
