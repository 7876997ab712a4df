//! Buffer pool integration: eviction under pinning, latch semantics, and
//! concurrent access against real file storage.

use std::sync::Arc;

use hivedb::storage::buffer::{BufferPool, BufferPoolError, TwoQReplacer};
use hivedb::storage::{FileStorage, MemoryStorage, PAGE_SIZE, PageId, Storage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A dirty page that gets evicted is readable with its latest bytes on
/// the next fix.
#[tokio::test]
async fn test_dirty_eviction_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path().join("test.db"), true)
        .await
        .unwrap();
    let pool = BufferPool::new(storage, TwoQReplacer::new(), 3);

    for i in 0..10u64 {
        let mut guard = pool.fetch_page_mut(PageId::new(i)).await.unwrap();
        guard[0..8].copy_from_slice(&(i * 7).to_le_bytes());
        guard.mark_dirty();
    }
    assert_eq!(pool.resident_pages(), 3);

    // Re-fixing every page forces the earlier ones back in from disk.
    for i in 0..10u64 {
        let guard = pool.fetch_page(PageId::new(i)).await.unwrap();
        assert_eq!(guard[0..8], (i * 7).to_le_bytes());
    }
}

/// With all `C` frames pinned, a fix of a new page fails with AllPinned;
/// releasing any one pin makes a retry succeed.
#[tokio::test]
async fn test_all_pinned_then_recover() {
    let pool = BufferPool::new(MemoryStorage::new(), TwoQReplacer::new(), 4);

    let mut guards = Vec::new();
    for i in 0..4u64 {
        guards.push(pool.fetch_page(PageId::new(i)).await.unwrap());
    }

    for _ in 0..3 {
        let result = pool.fetch_page(PageId::new(99)).await;
        assert!(matches!(result, Err(BufferPoolError::AllPinned)));
    }

    guards.swap_remove(2);
    let guard = pool.fetch_page(PageId::new(99)).await.unwrap();
    assert_eq!(guard.page_id(), PageId::new(99));
}

/// Concurrent exclusive fixers of one page serialize: T tasks each adding
/// 1,000 to an in-page counter leave exactly T * 1,000 behind.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_exclusive_latch_serializes_writers() {
    const TASKS: usize = 4;
    const INCREMENTS: u64 = 1000;

    let pool = Arc::new(BufferPool::new(
        MemoryStorage::new(),
        TwoQReplacer::new(),
        4,
    ));

    let mut handles = Vec::new();
    for _ in 0..TASKS {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            for _ in 0..INCREMENTS {
                let mut guard = pool.fetch_page_mut(PageId::new(0)).await.unwrap();
                let counter = u64::from_le_bytes(guard[0..8].try_into().unwrap());
                guard[0..8].copy_from_slice(&(counter + 1).to_le_bytes());
                guard.mark_dirty();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let guard = pool.fetch_page(PageId::new(0)).await.unwrap();
    let counter = u64::from_le_bytes(guard[0..8].try_into().unwrap());
    assert_eq!(counter, (TASKS as u64) * INCREMENTS);
}

/// Readers and writers racing over more pages than the pool holds never
/// observe lost or phantom bytes: every page ends up with exactly the sum
/// of the additive writes applied to it.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_random_access_stress() {
    const POOL_SIZE: usize = 8;
    const TOTAL_PAGES: u64 = 32;
    const WORKERS: usize = 16;
    const OPS_PER_WORKER: usize = 100;

    struct Context {
        pool: BufferPool<FileStorage, TwoQReplacer>,
        write_log: std::sync::Mutex<Vec<(u64, u8)>>,
    }

    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::open(dir.path().join("stress.db"), true)
        .await
        .unwrap();
    storage.extend_to(PageId::new(TOTAL_PAGES - 1)).await.unwrap();

    let ctx = Arc::new(Context {
        pool: BufferPool::new(storage, TwoQReplacer::new(), POOL_SIZE),
        write_log: std::sync::Mutex::new(Vec::new()),
    });

    let mut handles = Vec::new();
    for worker in 0..WORKERS {
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(worker as u64 * 7919);
            for _ in 0..OPS_PER_WORKER {
                let page = rng.gen_range(0..TOTAL_PAGES);
                if rng.gen_bool(0.3) {
                    let add: u8 = rng.gen_range(1..=255);
                    // Log first so verification never undercounts.
                    ctx.write_log.lock().unwrap().push((page, add));
                    let mut guard =
                        ctx.pool.fetch_page_mut(PageId::new(page)).await.unwrap();
                    for offset in 0..64 {
                        guard[offset] = guard[offset].wrapping_add(add);
                    }
                    guard.mark_dirty();
                } else {
                    let guard = ctx.pool.fetch_page(PageId::new(page)).await.unwrap();
                    // A page is all-equal in its first 64 bytes under any
                    // interleaving of whole-range writes.
                    let first = guard[0];
                    assert!(guard[1..64].iter().all(|&b| b == first));
                }
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    ctx.pool.flush_all().await.unwrap();

    let mut expected = vec![0u8; TOTAL_PAGES as usize];
    for &(page, add) in ctx.write_log.lock().unwrap().iter() {
        expected[page as usize] = expected[page as usize].wrapping_add(add);
    }
    for page in 0..TOTAL_PAGES {
        let guard = ctx.pool.fetch_page(PageId::new(page)).await.unwrap();
        assert_eq!(
            guard[0], expected[page as usize],
            "page {} diverged from the write log",
            page
        );
        assert_eq!(guard.len(), PAGE_SIZE);
    }
}

/// Four reader tasks hammering overlapping pages all see full, coherent
/// pages while eviction churns underneath.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_readers_under_eviction() {
    let pool = Arc::new(BufferPool::new(
        MemoryStorage::new(),
        TwoQReplacer::new(),
        4,
    ));

    // Stamp 16 pages with a recognizable pattern.
    for i in 0..16u64 {
        let mut guard = pool.fetch_page_mut(PageId::new(i)).await.unwrap();
        guard[..].fill(i as u8);
        guard.mark_dirty();
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            for round in 0..5 {
                for i in 0..16u64 {
                    let guard = pool.fetch_page(PageId::new(i)).await.unwrap();
                    assert!(
                        guard.iter().all(|&b| b == i as u8),
                        "page {} corrupt in round {}",
                        i,
                        round
                    );
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}
