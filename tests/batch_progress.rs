// tests/batch_progress.rs

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use cvsync::batch::{ProgressSnapshot, ProgressStore};
use cvsync::config::Settings;
use cvsync::errors::CvSyncError;
use cvsync::fs::mock::MockFileSystem;
use cvsync::sync::{ItemStore, MemoryItemStore, SourceRecord, TrackedItem};
use cvsync::types::{BatchId, BatchKind, BatchStatus, ItemId, ItemStatus, SourceId};
use cvsync::watch::NoopPublisher;
use cvsync::CvSync;
use cvsync_test_utils::builders::{fast_settings, fast_settings_with_width};
use cvsync_test_utils::fake_processor::{FakeProcessor, FlakyProcessor};
use cvsync_test_utils::{init_tracing, with_timeout};

fn core_with(settings: Settings) -> (CvSync, Arc<MemoryItemStore>) {
    init_tracing();

    let store = Arc::new(MemoryItemStore::new());
    let core = CvSync::with_parts(
        settings,
        Arc::new(MockFileSystem::new()),
        store.clone(),
        Arc::new(NoopPublisher),
    )
    .unwrap();
    (core, store)
}

fn seed_items(store: &MemoryItemStore, n: usize) -> (SourceId, Vec<ItemId>) {
    let source = SourceRecord::new("/inbox".into(), "inbox");
    let source_id = source.id;
    store.insert_source(source).unwrap();

    let ids = (0..n)
        .map(|i| {
            let item = TrackedItem::new(
                source_id,
                format!("cv-{i}.pdf"),
                format!("/inbox/cv-{i}.pdf"),
                format!("hash-{i}"),
                64,
            );
            let id = item.id;
            store.insert_item(item).unwrap();
            id
        })
        .collect();
    (source_id, ids)
}

async fn wait_until(
    core: &CvSync,
    batch: BatchId,
    pred: impl Fn(&ProgressSnapshot) -> bool,
) -> ProgressSnapshot {
    with_timeout(async {
        loop {
            let snap = core.get_progress(batch);
            if pred(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let (core, _store) = core_with(fast_settings());
    let err = core
        .submit_batch(BatchKind::Parse, Vec::new(), Arc::new(FakeProcessor::new()))
        .unwrap_err();
    assert!(matches!(err, CvSyncError::EmptyBatch));
}

#[tokio::test]
async fn progress_moves_from_pending_to_completed() {
    let (core, store) = core_with(fast_settings());
    let (_source, ids) = seed_items(&store, 2);

    let processor = Arc::new(FakeProcessor::new().with_delay(Duration::from_millis(300)));
    let batch = core
        .submit_batch(BatchKind::Parse, ids.clone(), processor.clone())
        .unwrap();

    let running = wait_until(&core, batch, |s| s.status != BatchStatus::Pending).await;
    assert_eq!(running.status, BatchStatus::Processing);
    assert_eq!(running.current, 0);
    assert_eq!(running.total, 2);
    assert_eq!(running.message, "Processing 2 CVs");

    let done = wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;
    assert_eq!(done.current, 2);
    assert_eq!(done.total, 2);
    assert_eq!(done.message, "All CVs processed");
    assert_eq!(processor.calls(), 2);

    for id in ids {
        let item = store.get_item(id).unwrap().unwrap();
        assert_eq!(item.status, ItemStatus::Processed);
        assert!(item.processed_at.is_some());
    }
}

#[tokio::test]
async fn match_batches_report_matching() {
    let (core, store) = core_with(fast_settings());
    let (_source, ids) = seed_items(&store, 1);

    let processor = Arc::new(FakeProcessor::new().with_delay(Duration::from_millis(300)));
    let batch = core.submit_batch(BatchKind::Match, ids, processor).unwrap();

    let running = wait_until(&core, batch, |s| s.status != BatchStatus::Pending).await;
    assert_eq!(running.status, BatchStatus::Matching);
    assert_eq!(running.message, "Matching 1 CVs");

    let done = wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;
    assert_eq!(done.message, "All CVs matched");
}

#[tokio::test]
async fn failures_do_not_stall_the_batch() {
    let (core, store) = core_with(fast_settings());
    let (_source, ids) = seed_items(&store, 6);
    let failing: Vec<ItemId> = ids[..2].to_vec();

    let processor = Arc::new(FakeProcessor::new().failing_items(failing.clone()));
    let batch = core
        .submit_batch(BatchKind::Parse, ids.clone(), processor)
        .unwrap();

    let done = wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;
    assert_eq!(done.current, 6);

    for id in &ids {
        let item = store.get_item(*id).unwrap().unwrap();
        if failing.contains(id) {
            assert_eq!(item.status, ItemStatus::Error);
            let message = item.error_message.unwrap();
            assert!(!message.is_empty());
        } else {
            assert_eq!(item.status, ItemStatus::Processed);
            assert_eq!(item.error_message, None);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_pool_is_bounded() {
    let (core, store) = core_with(fast_settings_with_width(5));
    let (_source, ids) = seed_items(&store, 50);

    let processor = Arc::new(FakeProcessor::new().with_delay(Duration::from_millis(20)));
    let batch = core
        .submit_batch(BatchKind::Parse, ids, processor.clone())
        .unwrap();

    let done = wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;
    assert_eq!(done.current, 50);
    assert_eq!(processor.calls(), 50);
    assert!(
        processor.peak_in_flight() <= 5,
        "peak in-flight was {}",
        processor.peak_in_flight()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn progress_only_moves_forward() {
    let (core, store) = core_with(fast_settings());
    let (_source, ids) = seed_items(&store, 20);

    let processor = Arc::new(FakeProcessor::new().with_delay(Duration::from_millis(5)));
    let batch = core.submit_batch(BatchKind::Parse, ids, processor).unwrap();

    let final_snap = with_timeout(async {
        let mut last = 0usize;
        loop {
            let snap = core.get_progress(batch);
            assert!(snap.current >= last, "progress went backwards");
            assert!(snap.current <= snap.total);
            last = snap.current;
            if snap.status == BatchStatus::Completed {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert_eq!(final_snap.current, 20);
}

#[tokio::test]
async fn completed_progress_is_stable() {
    let (core, store) = core_with(fast_settings());
    let (_source, ids) = seed_items(&store, 3);

    let batch = core
        .submit_batch(BatchKind::Parse, ids, Arc::new(FakeProcessor::new()))
        .unwrap();
    let done = wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;
    assert!(done.status.is_terminal());

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(core.get_progress(batch), done);
    }
}

#[tokio::test]
async fn removed_entries_poll_as_unknown() {
    init_tracing();

    let progress = ProgressStore::new();
    let batch = Uuid::new_v4();
    progress.create(batch, 3);
    assert!(progress.created_at(batch).is_some());
    assert_eq!(progress.get(batch).status, BatchStatus::Pending);

    assert!(progress.remove(batch));
    assert_eq!(progress.get(batch), ProgressSnapshot::unknown());
    assert_eq!(progress.created_at(batch), None);
    assert!(!progress.remove(batch));
}

#[tokio::test]
async fn unknown_batch_yields_the_unknown_sentinel() {
    let (core, _store) = core_with(fast_settings());
    let snap = core.get_progress(Uuid::new_v4());
    assert_eq!(snap, ProgressSnapshot::unknown());
    assert_eq!(snap.status, BatchStatus::Unknown);
    assert!(snap.status.is_terminal());
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let (core, store) = core_with(fast_settings());
    let (_source, ids) = seed_items(&store, 1);
    let item_id = ids[0];

    let processor = Arc::new(FlakyProcessor::new(1));
    let batch = core
        .submit_batch(BatchKind::Parse, ids, processor.clone())
        .unwrap();

    let done = wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;
    assert_eq!(done.current, 1);
    assert_eq!(processor.attempts_for(item_id), 2);

    let item = store.get_item(item_id).unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Processed);
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let (core, store) = core_with(fast_settings());
    let (_source, ids) = seed_items(&store, 1);
    let item_id = ids[0];

    let processor = Arc::new(FakeProcessor::new().failing_items([item_id]));
    let batch = core
        .submit_batch(BatchKind::Parse, ids, processor.clone())
        .unwrap();

    wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;
    assert_eq!(processor.calls(), 1);

    let item = store.get_item(item_id).unwrap().unwrap();
    assert_eq!(item.status, ItemStatus::Error);
    assert!(item.processed_at.is_some());
}

#[tokio::test]
async fn error_messages_are_truncated() {
    let settings = Settings {
        error_message_limit: 16,
        ..fast_settings()
    };
    let (core, store) = core_with(settings);
    let (_source, ids) = seed_items(&store, 1);
    let item_id = ids[0];

    let processor = Arc::new(FakeProcessor::new().failing_items([item_id]));
    let batch = core.submit_batch(BatchKind::Parse, ids, processor).unwrap();

    wait_until(&core, batch, |s| s.status == BatchStatus::Completed).await;

    let item = store.get_item(item_id).unwrap().unwrap();
    let message = item.error_message.unwrap();
    assert_eq!(message.chars().count(), 16);
}
