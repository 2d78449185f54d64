//! Seeded random read/write workloads checked against a byte-level model.

use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use sniff_filecache::{FileCache, PathHash};

/// The gap byte used by workload lookups. Workload data never contains it, so
/// any zero in a lookup result is a position the cache does not know.
pub const GAP: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Read { key: PathHash, offset: u64, data: Vec<u8> },
    Write { key: PathHash, offset: u64, data: Vec<u8> },
    Lookup { key: PathHash, offset: u64, len: u64 },
}

#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub seed: u64,
    pub ops: usize,
    pub keys: u32,
    /// every op touches bytes below this offset
    pub span: u64,
    pub max_len: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            ops: 1000,
            keys: 4,
            span: 512,
            max_len: 64,
        }
    }
}

/// Generates a deterministic stream of ops.
pub fn generate(config: &WorkloadConfig) -> Vec<Op> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    (0..config.ops)
        .map(|_| {
            let key = PathHash::new(rng.random_range(0..config.keys));
            let len = rng.random_range(0..=config.max_len);
            let offset = rng.random_range(0..config.span.saturating_sub(len).max(1));
            let data: Vec<u8> = (0..len).map(|_| rng.random_range(1..=u8::MAX)).collect();
            match rng.random_range(0..10) {
                0..4 => Op::Read { key, offset, data },
                4..7 => Op::Write { key, offset, data },
                _ => Op::Lookup { key, offset, len },
            }
        })
        .collect()
}

/// The last byte observed at every position of every key.
#[derive(Debug, Default)]
pub struct Model {
    files: HashMap<PathHash, HashMap<u64, u8>>,
}

impl Model {
    pub fn observe(&mut self, key: PathHash, offset: u64, data: &[u8]) {
        let file = self.files.entry(key).or_default();
        for (pos, byte) in (offset..).zip(data) {
            file.insert(pos, *byte);
        }
    }

    pub fn get(&self, key: PathHash, pos: u64) -> Option<u8> {
        self.files.get(&key).and_then(|file| file.get(&pos).copied())
    }

    /// The bytes a cache without any eviction would return.
    pub fn expected(&self, key: PathHash, offset: u64, len: u64) -> Option<Vec<u8>> {
        let bytes: Vec<Option<u8>> = (offset..offset + len).map(|pos| self.get(key, pos)).collect();
        if bytes.iter().all(Option::is_none) {
            return None;
        }
        Some(bytes.into_iter().map(|b| b.unwrap_or(GAP)).collect())
    }
}

/// Applies `ops` to `cache` and `model`. After every lookup `check` receives
/// the requested window, the cache's answer, and the model.
pub fn run<F>(cache: &FileCache, model: &mut Model, ops: &[Op], mut check: F)
where
    F: FnMut(&Op, Option<&[u8]>, &Model),
{
    for op in ops {
        match op {
            Op::Read { key, offset, data } => {
                cache.add_read(*key, *offset, data);
                model.observe(*key, *offset, data);
            }
            Op::Write { key, offset, data } => {
                cache.update_with_write(*key, *offset, data);
                model.observe(*key, *offset, data);
            }
            Op::Lookup { key, offset, len } => {
                let found = cache.get_content_range(*key, *offset, *len, GAP);
                check(op, found.as_deref(), model);
            }
        }
    }
    tracing::debug!(ops = ops.len(), stats = ?cache.stats(), "workload complete");
}
