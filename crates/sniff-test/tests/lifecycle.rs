use std::time::Duration;

use assert_matches::assert_matches;
use sniff_filecache::{ByteUnit, CacheConfig, FileCache, ManualClock, PathHash};

fn manual_cache(max_age: Duration) -> (FileCache, ManualClock) {
    let clock = ManualClock::new();
    let cache = FileCache::new(ByteUnit::from_kb(64), ByteUnit::from_mb(1), max_age, clock.clone());
    (cache, clock)
}

#[sniff_test::test]
fn test_read_write_read_cycle() {
    let (cache, _) = manual_cache(Duration::from_secs(600));
    let key = PathHash::of("/etc/app.conf");

    cache.add_read(key, 0, b"port = 80\nhost = a\n");
    cache.update_with_write(key, 7, b"81");
    assert_eq!(
        cache.get_old_content(key, 0, 19).as_deref(),
        Some(&b"port = 81\nhost = a\n"[..])
    );

    // a later read of the same bytes replaces the written view
    cache.add_read(key, 7, b"82");
    assert_eq!(
        cache.get_old_content(key, 0, 9).as_deref(),
        Some(&b"port = 82"[..])
    );
    assert_eq!(cache.key_ranges(key), vec![0..19]);
    assert!(cache.is_consistent());
}

#[sniff_test::test]
fn test_appending_reads_merge_into_one_segment() {
    let (cache, _) = manual_cache(Duration::from_secs(600));
    let key = PathHash::of("/var/log/app.log");

    let mut offset = 0;
    for chunk in ["first line\n", "second line\n", "third line\n"] {
        cache.add_read(key, offset, chunk.as_bytes());
        offset += chunk.len() as u64;
    }

    assert_eq!(cache.key_ranges(key), vec![0..offset]);
    assert_eq!(
        cache.get_old_content(key, 0, offset).as_deref(),
        Some(&b"first line\nsecond line\nthird line\n"[..])
    );
    assert_eq!(cache.stats().segments, 1);
}

#[sniff_test::test]
fn test_duplicate_read_is_idempotent() {
    let (cache, _) = manual_cache(Duration::from_secs(600));
    let key = PathHash::new(7);

    cache.add_read(key, 100, b"same bytes");
    let ranges = cache.key_ranges(key);
    let size = cache.total_size();

    cache.add_read(key, 100, b"same bytes");
    assert_eq!(cache.key_ranges(key), ranges);
    assert_eq!(cache.total_size(), size);
}

#[sniff_test::test]
fn test_ttl_expiry() {
    let (cache, clock) = manual_cache(Duration::from_secs(60));
    let key = PathHash::new(1);

    cache.add_read(key, 0, b"stale");
    clock.advance(Duration::from_secs(61));
    assert_eq!(cache.cleanup(), 1);
    assert_matches!(cache.get_old_content(key, 0, 5), None);

    cache.add_read(key, 0, b"fresh");
    assert_eq!(cache.cleanup(), 0);
    assert_eq!(cache.get_old_content(key, 0, 5).as_deref(), Some(&b"fresh"[..]));
    assert_eq!(cache.total_size(), 5);
}

#[sniff_test::test]
fn test_ttl_boundary_is_exclusive() {
    let (cache, clock) = manual_cache(Duration::from_secs(60));
    let key = PathHash::new(1);

    cache.add_read(key, 0, b"data");
    clock.advance(Duration::from_secs(60));
    assert_eq!(cache.cleanup(), 0);

    clock.advance(Duration::from_millis(1));
    assert_eq!(cache.cleanup(), 1);
}

#[sniff_test::test]
fn test_lookup_keeps_key_alive() {
    let (cache, clock) = manual_cache(Duration::from_secs(60));
    let (busy, idle) = (PathHash::new(1), PathHash::new(2));
    cache.add_read(busy, 0, b"busy");
    cache.add_read(idle, 0, b"idle");

    for _ in 0..5 {
        clock.advance(Duration::from_secs(30));
        assert!(cache.get_old_content(busy, 0, 4).is_some());
        cache.cleanup();
    }

    assert!(cache.contains_key(busy));
    assert!(!cache.contains_key(idle));
    assert_eq!(cache.stats().expired_keys, 1);
}

#[sniff_test::test]
fn test_cleanup_is_idempotent() {
    let (cache, clock) = manual_cache(Duration::from_secs(1));
    for key in 0..10 {
        cache.add_read(PathHash::new(key), 0, b"x");
    }
    clock.advance(Duration::from_secs(2));

    assert_eq!(cache.cleanup(), 10);
    assert_eq!(cache.cleanup(), 0);
    assert!(cache.is_empty());
    assert_eq!(cache.total_size(), 0);
}

#[sniff_test::test]
fn test_independent_caches_do_not_interfere() {
    let (a, _) = manual_cache(Duration::from_secs(60));
    let (b, _) = manual_cache(Duration::from_secs(60));
    let key = PathHash::new(5);

    a.add_read(key, 0, b"only in a");
    assert!(a.get_old_content(key, 0, 9).is_some());
    assert_matches!(b.get_old_content(key, 0, 9), None);
}

#[sniff_test::test]
fn test_default_config() {
    let cache = FileCache::default();
    assert_eq!(cache.per_key_limit(), ByteUnit::from_kb(512));
    assert_eq!(cache.global_limit(), ByteUnit::from_mb(64));
    assert_eq!(cache.max_age(), Duration::from_secs(600));

    let config = CacheConfig {
        per_key_limit: ByteUnit::new(10),
        ..Default::default()
    };
    let cache = FileCache::with_clock(&config, ManualClock::new());
    cache.add_read(PathHash::new(1), 0, b"0123456789");
    cache.add_read(PathHash::new(1), 20, b"abc");
    assert_eq!(cache.key_size(PathHash::new(1)), 3);
}

#[sniff_test::test]
fn test_stats() {
    let (cache, _) = manual_cache(Duration::from_secs(60));
    let key = PathHash::new(3);

    cache.add_read(key, 0, b"abc");
    cache.add_read(key, 10, b"def");
    assert!(cache.get_old_content(key, 0, 3).is_some());
    assert!(cache.get_old_content(key, 50, 3).is_none());

    let stats = cache.stats();
    assert_eq!(stats.keys, 1);
    assert_eq!(stats.segments, 2);
    assert_eq!(stats.total_size, ByteUnit::new(6));
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert!(format!("{cache:?}").contains("per_key_limit"));
}
