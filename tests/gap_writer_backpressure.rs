//! Gap writer behavior under backpressure: a small pending-queue cap drops the
//! oldest record, and a store that fails moves batches into the retry queue
//! where they're picked up on the next retry tick.

use async_trait::async_trait;
use footprint_engine::application::gap_writer::{self, GapWriterConfig};
use footprint_engine::domain::errors::{EngineError, EngineResult};
use footprint_engine::domain::market::gap::{GapFilter, GapRecord};
use footprint_engine::domain::ports::GapStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct FlakyGapStore {
    fail_first_n: AtomicUsize,
    saved: std::sync::Mutex<Vec<GapRecord>>,
}

#[async_trait]
impl GapStore for FlakyGapStore {
    async fn gap_save(&self, gap: GapRecord) -> EngineResult<GapRecord> {
        self.saved.lock().unwrap().push(gap.clone());
        Ok(gap)
    }

    async fn gap_save_batch(&self, gaps: Vec<GapRecord>) -> EngineResult<Vec<GapRecord>> {
        if self.fail_first_n.load(Ordering::SeqCst) > 0 {
            self.fail_first_n.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::Storage("simulated persistence failure".to_string()));
        }
        self.saved.lock().unwrap().extend(gaps.iter().cloned());
        Ok(gaps)
    }

    async fn gap_load(&self, _filter: GapFilter) -> EngineResult<Vec<GapRecord>> {
        Ok(self.saved.lock().unwrap().clone())
    }

    async fn gap_mark_synced(&self, ids: Vec<i64>) -> EngineResult<usize> {
        Ok(ids.len())
    }
}

fn gap(n: u64) -> GapRecord {
    GapRecord::new("binance", "BTCUSDT", n * 10, n * 10 + 1, n as i64)
}

#[tokio::test]
async fn overflowing_the_pending_queue_drops_the_oldest_record() {
    let store = Arc::new(FlakyGapStore { fail_first_n: AtomicUsize::new(0), saved: Default::default() });
    let config = GapWriterConfig {
        max_queue_size: 2,
        max_retry_queue_size: 10,
        batch_size: 10,
        flush_interval: Duration::from_secs(60), // don't let the ticker drain mid-test
        retry_interval: Duration::from_secs(60),
        ..Default::default()
    };
    let handle = gap_writer::spawn(store.clone(), None, config);

    handle.submit(gap(1));
    handle.submit(gap(2));
    handle.submit(gap(3)); // queue cap is 2, so gap(1) is dropped

    handle.flush_all(Duration::from_secs(1)).await;

    let saved = store.gap_load(GapFilter::default()).await.unwrap();
    let ids: Vec<i64> = saved.iter().map(|g| g.detected_at).collect();
    assert_eq!(ids, vec![2, 3]);

    let metrics = handle.metrics();
    assert_eq!(metrics.dropped_count, 1);
    assert_eq!(metrics.processed_count, 2);

    handle.shutdown().await;
}

#[tokio::test]
async fn a_failed_batch_is_recovered_from_the_retry_queue() {
    // `save_with_retries` itself retries a batch 3 times ([100,200,400]ms) before
    // giving up, so the store must fail all 4 in-batch attempts for the batch to
    // actually land in the retry queue rather than recover inline.
    let store = Arc::new(FlakyGapStore { fail_first_n: AtomicUsize::new(4), saved: Default::default() });
    let config = GapWriterConfig {
        max_queue_size: 100,
        max_retry_queue_size: 10,
        batch_size: 10,
        flush_interval: Duration::from_secs(60),
        retry_interval: Duration::from_millis(50),
        ..Default::default()
    };
    let handle = gap_writer::spawn(store.clone(), None, config);

    handle.submit(gap(1));
    // First flush exhausts all 4 in-batch attempts and the batch lands in the retry queue.
    handle.flush_all(Duration::from_secs(2)).await;
    assert!(store.gap_load(GapFilter::default()).await.unwrap().is_empty());

    // The retry ticker picks the batch back up and it succeeds this time.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let saved = store.gap_load(GapFilter::default()).await.unwrap();
    assert_eq!(saved.len(), 1);

    let metrics = handle.metrics();
    assert_eq!(metrics.failed_count, 1);
    assert_eq!(metrics.processed_count, 1);

    handle.shutdown().await;
}
