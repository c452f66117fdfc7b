//! Tests for slot pool claim/release

use std::collections::HashSet;
use std::time::Duration;

use burrow::proxy::pool::SlotPool;
use tokio::time::timeout;

#[tokio::test]
async fn test_pool_starts_full() {
    for n in 1..=8 {
        let pool = SlotPool::new(n);
        let slots = pool.available_slots().await;

        assert_eq!(slots, (0..n).collect::<Vec<_>>());
        assert_eq!(pool.capacity(), n);
    }
}

#[tokio::test]
async fn test_pool_claims_are_distinct() {
    let pool = SlotPool::new(5);
    let mut claimed = HashSet::new();

    for _ in 0..5 {
        assert!(claimed.insert(pool.claim().await));
    }

    assert_eq!(claimed, (0..5).collect());
    assert_eq!(pool.available_count().await, 0);
    assert!(timeout(Duration::from_millis(20), pool.claim()).await.is_err());
}

#[tokio::test]
async fn test_pool_claim_blocks_until_release() {
    let pool = SlotPool::new(1);
    let id = pool.claim().await;

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.claim().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    assert!(pool.release(id).await);
    let reclaimed = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(reclaimed, id);
}

#[tokio::test]
async fn test_pool_release_before_claim_is_not_lost() {
    let pool = SlotPool::new(2);
    let a = pool.claim().await;
    let b = pool.claim().await;

    pool.release(b).await;
    pool.release(a).await;

    let first = timeout(Duration::from_secs(1), pool.claim()).await.unwrap();
    let second = timeout(Duration::from_secs(1), pool.claim()).await.unwrap();
    assert_eq!((first, second), (b, a));
}

#[tokio::test]
async fn test_pool_rejects_duplicate_release() {
    let pool = SlotPool::new(3);
    let id = pool.claim().await;

    assert!(pool.release(id).await);
    assert!(!pool.release(id).await);
    assert!(!pool.release(1).await); // never claimed

    assert_eq!(pool.available_count().await, 3);
}

#[tokio::test]
async fn test_pool_rejects_out_of_range_release() {
    let pool = SlotPool::new(2);
    pool.claim().await;

    assert!(!pool.release(7).await);
    assert_eq!(pool.available_count().await, 1);
}

#[tokio::test]
async fn test_pool_concurrent_recycling_keeps_every_id() {
    let pool = SlotPool::new(4);
    let mut tasks = Vec::new();

    for _ in 0..50 {
        let id = timeout(Duration::from_secs(1), pool.claim()).await.unwrap();
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            tokio::task::yield_now().await;
            assert!(pool.release(id).await);
        }));
    }

    for task in tasks {
        task.await.unwrap();
    }

    let mut slots = pool.available_slots().await;
    slots.sort();
    assert_eq!(slots, vec![0, 1, 2, 3]);
}
