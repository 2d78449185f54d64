use std::{
    fmt::{self, Debug},
    ops::Range,
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    byte_unit::ByteUnit,
    clock::{Clock, SystemClock},
    config::CacheConfig,
    diff::{self, PrettyStyle},
    hash_table::HashTable,
    path_hash::PathHash,
    segment::Segment,
    sparse_file::SparseFile,
};

/// Gap byte used by [`FileCache::get_old_content`].
pub const DEFAULT_GAP_BYTE: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// A point-in-time summary of a [`FileCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub keys: usize,
    pub segments: usize,
    pub total_size: ByteUnit,
    pub hits: u64,
    pub misses: u64,
    pub evicted_bytes: ByteUnit,
    pub evicted_keys: u64,
    pub expired_keys: u64,
}

#[derive(Debug, Default)]
struct Inner {
    files: HashTable<SparseFile>,
    /// sum of every file's size
    total_size: u64,
    tick: u64,

    hits: u64,
    misses: u64,
    evicted_bytes: u64,
    evicted_keys: u64,
    expired_keys: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Caches the bytes observed by reads of many files, keyed by path hash, so
/// that a later write can be diffed against what the file looked like before.
///
/// Memory is bounded by a per-key budget (oldest segments go first) and a
/// global budget (least recently touched keys go first). Idle keys are
/// expired by [`FileCache::cleanup`]. All state sits behind a single lock, so
/// a `FileCache` can be shared freely between threads.
pub struct FileCache {
    per_key_limit: ByteUnit,
    global_limit: ByteUnit,
    max_age: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl FileCache {
    pub fn new(
        per_key_limit: impl Into<ByteUnit>,
        global_limit: impl Into<ByteUnit>,
        max_age: Duration,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            per_key_limit: per_key_limit.into(),
            global_limit: global_limit.into(),
            max_age,
            clock: Arc::new(clock),
            inner: Default::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn with_clock(config: &CacheConfig, clock: impl Clock + 'static) -> Self {
        Self::new(
            config.per_key_limit,
            config.global_limit,
            config.max_age(),
            clock,
        )
    }

    pub fn per_key_limit(&self) -> ByteUnit {
        self.per_key_limit
    }

    pub fn global_limit(&self) -> ByteUnit {
        self.global_limit
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Records bytes observed by a read. New bytes replace cached bytes at the
    /// same offsets and are merged with any cached neighbors.
    pub fn add_read(&self, key: PathHash, offset: u64, data: &[u8]) {
        let mut inner = self.inner.lock();
        self.apply(&mut inner, key, offset, data, Mode::Read);
    }

    /// Records bytes observed by a write. The write becomes the only truth for
    /// its range; cached bytes it overlaps are trimmed or split away.
    pub fn update_with_write(&self, key: PathHash, offset: u64, data: &[u8]) {
        let mut inner = self.inner.lock();
        self.apply(&mut inner, key, offset, data, Mode::Write);
    }

    /// Reconstructs `len` bytes at `offset`, filling uncovered positions with
    /// `gap_byte`. Returns `None` if `len` is zero or nothing is cached in the
    /// range. A successful lookup counts as a touch.
    pub fn get_content_range(
        &self,
        key: PathHash,
        offset: u64,
        len: u64,
        gap_byte: u8,
    ) -> Option<Bytes> {
        let mut inner = self.inner.lock();
        self.lookup(&mut inner, key, offset, len, gap_byte)
    }

    pub fn get_old_content(&self, key: PathHash, offset: u64, len: u64) -> Option<Bytes> {
        self.get_content_range(key, offset, len, DEFAULT_GAP_BYTE)
    }

    /// Diffs the cached view at `offset` against `new`, naming the file by
    /// its hash. Returns `None` if nothing is cached there or the bytes are
    /// unchanged.
    pub fn generate_diff(&self, key: PathHash, offset: u64, new: &[u8]) -> Option<String> {
        self.generate_unified_diff(key, offset, new, &key.to_string())
    }

    pub fn generate_unified_diff(
        &self,
        key: PathHash,
        offset: u64,
        new: &[u8],
        name: &str,
    ) -> Option<String> {
        let old = self.changed_content(key, offset, new)?;
        diff::unified_diff(&old, new, name)
    }

    /// Like [`FileCache::generate_unified_diff`], keeping only
    /// `context_lines` of context around each change. A negative
    /// `context_lines` keeps the whole diff.
    pub fn generate_elided_unified_diff(
        &self,
        key: PathHash,
        offset: u64,
        new: &[u8],
        name: &str,
        context_lines: isize,
    ) -> Option<String> {
        let old = self.changed_content(key, offset, new)?;
        diff::elided_unified_diff(&old, new, name, context_lines)
    }

    pub fn generate_pretty_diff(
        &self,
        key: PathHash,
        offset: u64,
        new: &[u8],
        style: PrettyStyle,
    ) -> Option<String> {
        let old = self.changed_content(key, offset, new)?;
        diff::pretty_diff(&old, new, style)
    }

    /// Diffs a write against the cached view and then applies it, under a
    /// single lock acquisition so no other write can slip in between.
    pub fn record_write(
        &self,
        key: PathHash,
        offset: u64,
        new: &[u8],
        name: &str,
        context_lines: isize,
    ) -> Option<String> {
        let mut inner = self.inner.lock();
        let diff = self
            .lookup(&mut inner, key, offset, new.len() as u64, DEFAULT_GAP_BYTE)
            .filter(|old| old[..] != new[..])
            .and_then(|old| diff::elided_unified_diff(&old, new, name, context_lines));
        self.apply(&mut inner, key, offset, new, Mode::Write);
        diff
    }

    /// Drops every key which has not been touched within `max_age`, along
    /// with any key left without segments. Returns the number of keys removed.
    pub fn cleanup(&self) -> usize {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let now = self.clock.now();
        let max_age = self.max_age;

        let mut removed = 0;
        let mut freed = 0;
        for file in inner
            .files
            .extract_if(|file| file.is_empty() || file.is_expired(now, max_age))
        {
            if !file.is_empty() {
                tracing::debug!(
                    key = %file.key(),
                    size = %ByteUnit::new(file.size()),
                    idle = ?now.saturating_duration_since(file.last_touch()),
                    "expired key"
                );
            }
            freed += file.size();
            removed += 1;
        }

        inner.total_size -= freed;
        inner.expired_keys += removed as u64;
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            keys: inner.files.len(),
            segments: inner.files.iter().map(SparseFile::len).sum(),
            total_size: ByteUnit::new(inner.total_size),
            hits: inner.hits,
            misses: inner.misses,
            evicted_bytes: ByteUnit::new(inner.evicted_bytes),
            evicted_keys: inner.evicted_keys,
            expired_keys: inner.expired_keys,
        }
    }

    /// Number of bytes cached for `key`.
    pub fn key_size(&self, key: PathHash) -> u64 {
        self.inner.lock().files.find(&key).map_or(0, SparseFile::size)
    }

    /// The cached ranges of `key`, in offset order.
    pub fn key_ranges(&self, key: PathHash) -> Vec<Range<u64>> {
        self.inner
            .lock()
            .files
            .find(&key)
            .map(|file| file.ranges().collect())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: PathHash) -> bool {
        self.inner.lock().files.has(&key)
    }

    pub fn total_size(&self) -> u64 {
        self.inner.lock().total_size
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.inner.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().files.is_empty()
    }

    /// Drops all cached content. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.files.clear();
        inner.total_size = 0;
    }

    /// Checks that every file is well formed and that the global size
    /// matches the per-file sizes.
    pub fn is_consistent(&self) -> bool {
        let inner = self.inner.lock();
        let sum: u64 = inner.files.iter().map(SparseFile::size).sum();
        sum == inner.total_size && inner.files.iter().all(SparseFile::is_consistent)
    }

    /// The cached bytes under `new`, if any exist and differ from it.
    fn changed_content(&self, key: PathHash, offset: u64, new: &[u8]) -> Option<Bytes> {
        self.get_old_content(key, offset, new.len() as u64)
            .filter(|old| old[..] != new[..])
    }

    fn lookup(
        &self,
        inner: &mut Inner,
        key: PathHash,
        offset: u64,
        len: u64,
        gap_byte: u8,
    ) -> Option<Bytes> {
        let now = self.clock.now();
        let tick = inner.next_tick();

        let found = inner.files.find_mut(&key).and_then(|file| {
            let content = file.content_range(offset, len, gap_byte)?;
            file.touch(now, tick);
            Some(content)
        });

        if found.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        found
    }

    fn apply(&self, inner: &mut Inner, key: PathHash, offset: u64, data: &[u8], mode: Mode) {
        if data.is_empty() {
            return;
        }
        if self.per_key_limit.is_zero() || self.global_limit.is_zero() {
            tracing::trace!(%key, "cache budget is zero; dropping segment");
            return;
        }

        let now = self.clock.now();
        let tick = inner.next_tick();
        let Some(segment) = Segment::copy_from_slice(offset, data, tick) else {
            tracing::debug!(
                %key,
                offset,
                len = data.len(),
                "segment extends past the end of the address space; ignoring"
            );
            return;
        };
        let protect = segment.range();

        let file = inner
            .files
            .get_or_insert_with(&key, || SparseFile::new(key, now, tick));
        let before = file.size();

        match mode {
            Mode::Read => file.insert(segment),
            Mode::Write => file.write(segment),
        }
        file.touch(now, tick);

        let evicted = file.enforce_limit(self.per_key_limit.as_u64(), &protect);
        if evicted > 0 {
            tracing::debug!(
                %key,
                evicted = %ByteUnit::new(evicted),
                limit = %self.per_key_limit,
                "per-key limit exceeded"
            );
        }

        precept::expect_always!(
            file.is_consistent(),
            "sparse file segments are sorted, disjoint, and accounted for",
            { "key": key.to_string(), "segments": file.len(), "size": file.size() }
        );
        debug_assert!(file.is_consistent(), "inconsistent sparse file: {file:?}");

        let after = file.size();
        let emptied = file.is_empty();
        tracing::trace!(
            %key,
            ?mode,
            range = ?protect,
            size = after,
            segments = file.len(),
            "cached segment"
        );

        inner.total_size = inner.total_size - before + after;
        inner.evicted_bytes += evicted;
        if emptied {
            inner.files.remove(&key);
        }

        self.enforce_global_limit(inner, key);
    }

    /// Evicts whole keys, least recently touched first, until the cache fits
    /// within the global limit. `keep` is never evicted.
    fn enforce_global_limit(&self, inner: &mut Inner, keep: PathHash) {
        while inner.total_size > self.global_limit.as_u64() {
            let victim = inner
                .files
                .iter()
                .filter(|file| file.key() != keep)
                .min_by_key(|file| file.lru_order())
                .map(SparseFile::key);

            let Some(file) = victim.and_then(|victim| inner.files.remove(&victim)) else {
                break;
            };

            tracing::debug!(
                key = %file.key(),
                size = %ByteUnit::new(file.size()),
                total = %ByteUnit::new(inner.total_size),
                limit = %self.global_limit,
                "global limit exceeded; evicted least recently touched key"
            );
            inner.total_size -= file.size();
            inner.evicted_bytes += file.size();
            inner.evicted_keys += 1;
        }
    }

    #[cfg(test)]
    fn last_touch(&self, key: PathHash) -> Option<std::time::Instant> {
        self.inner.lock().files.find(&key).map(SparseFile::last_touch)
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl Debug for FileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCache")
            .field("per_key_limit", &self.per_key_limit)
            .field("global_limit", &self.global_limit)
            .field("max_age", &self.max_age)
            .field("stats", &self.stats())
            .finish()
    }
}
