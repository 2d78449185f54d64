use std::time::Duration;

use sniff_filecache::{ByteUnit, FileCache, ManualClock};
use sniff_test::workload::{GAP, Model, Op, WorkloadConfig, generate, run};

fn cache(per_key: u64, global: u64) -> FileCache {
    FileCache::new(
        ByteUnit::new(per_key),
        ByteUnit::new(global),
        Duration::from_secs(3600),
        ManualClock::new(),
    )
}

#[sniff_test::test]
fn test_unbounded_cache_matches_model() {
    for seed in 0..8 {
        let config = WorkloadConfig { seed, ..Default::default() };
        let cache = cache(u64::MAX, u64::MAX);
        let mut model = Model::default();

        run(&cache, &mut model, &generate(&config), |op, found, model| {
            let Op::Lookup { key, offset, len } = *op else {
                unreachable!("only lookups are checked");
            };
            assert_eq!(
                found.map(<[u8]>::to_vec),
                model.expected(key, offset, len),
                "seed {seed}: mismatch at {key:?} {offset}+{len}"
            );
        });
        assert!(cache.is_consistent(), "seed {seed}");
    }
}

#[sniff_test::test]
fn test_bounded_cache_never_invents_bytes() {
    for seed in 0..8 {
        let config = WorkloadConfig {
            seed,
            ops: 2000,
            keys: 6,
            ..Default::default()
        };
        let cache = cache(128, 512);
        let mut model = Model::default();

        run(&cache, &mut model, &generate(&config), |op, found, model| {
            let Op::Lookup { key, offset, .. } = *op else {
                unreachable!("only lookups are checked");
            };
            // evicted bytes read as gaps; every other byte is the latest seen
            for (pos, &byte) in (offset..).zip(found.unwrap_or_default()) {
                if byte != GAP {
                    assert_eq!(Some(byte), model.get(key, pos), "seed {seed}: {key:?} @ {pos}");
                }
            }
        });

        assert!(cache.is_consistent(), "seed {seed}");
        let stats = cache.stats();
        assert!(
            stats.total_size.as_u64() <= 512 + 128,
            "seed {seed}: {stats:?}"
        );
        assert!(stats.evicted_bytes > ByteUnit::ZERO, "seed {seed}: nothing was evicted");
    }
}

#[sniff_test::test]
fn test_workload_is_deterministic() {
    let config = WorkloadConfig { seed: 42, ops: 100, ..Default::default() };
    assert_eq!(generate(&config), generate(&config));
    assert_ne!(
        generate(&config),
        generate(&WorkloadConfig { seed: 43, ..config.clone() })
    );
}
