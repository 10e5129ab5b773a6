//! Concurrent access to shared handles
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{locator, page_increment, page_objects, sample_pdf, write_document};
use pdfeditor_core::session::{EditOperation, LifecycleState, OpenMode, SaveError, SessionManager};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_page_reads_on_one_handle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_document(dir.path(), "doc.pdf", &sample_pdf(8));

    let manager = Arc::new(SessionManager::default());
    let handle = manager
        .open(&locator(&path), OpenMode::ReadOnly)
        .await
        .expect("open");

    let mut tasks = Vec::new();
    for index in 0..8 {
        let manager = Arc::clone(&manager);
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move {
            let page = manager.page(&handle, index)?;
            page.info()
        }));
    }

    for (index, task) in tasks.into_iter().enumerate() {
        let info = task.await.expect("task").expect("page");
        assert_eq!(info.index, index);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_page_reads_proceed_while_transaction_is_staged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_document(dir.path(), "doc.pdf", &sample_pdf(2));

    let manager = SessionManager::default();
    let handle = manager
        .open(&locator(&path), OpenMode::ReadWrite)
        .await
        .expect("open");

    let mut tx = manager.begin_edit(&handle).expect("begin");
    tx.stage(EditOperation::AppendIncrement(page_increment(&page_objects(2), 30)));

    assert!(manager.page(&handle, 0).is_ok());
    assert!(manager.page(&handle, 1).is_ok());
    assert!(manager.page(&handle, 2).is_err());

    manager.commit(tx).await.expect("commit");
    assert!(manager.page(&handle, 2).is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_commits_on_different_handles_are_independent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let manager = Arc::new(SessionManager::default());

    let mut tasks = Vec::new();
    for i in 0..4 {
        let path = write_document(dir.path(), &format!("doc{}.pdf", i), &sample_pdf(1));
        let manager = Arc::clone(&manager);
        tasks.push(tokio::spawn(async move {
            let handle = manager.open(&locator(&path), OpenMode::ReadWrite).await?;
            let mut tx = manager.begin_edit(&handle)?;
            tx.stage(EditOperation::AppendIncrement(page_increment(&page_objects(1), 40 + i)));
            manager.commit(tx).await?;
            let pages = handle.page_count();
            manager.close(&handle).await;
            Ok::<_, anyhow::Error>(pages)
        }));
    }

    for task in tasks {
        assert_eq!(task.await.expect("task").expect("edit"), 2);
    }
    assert!(manager.open_handles().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_close_waits_for_in_flight_commit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let original = sample_pdf(1);
    let path = write_document(dir.path(), "doc.pdf", &original);

    let manager = Arc::new(SessionManager::default());
    let handle = manager
        .open(&locator(&path), OpenMode::ReadWrite)
        .await
        .expect("open");

    let mut tx = manager.begin_edit(&handle).expect("begin");
    tx.stage(EditOperation::AppendIncrement(page_increment(&page_objects(1), 50)));

    let committer = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.commit(tx).await })
    };
    manager.close(&handle).await;
    let result = committer.await.expect("task");

    assert_eq!(handle.state(), LifecycleState::Closed);
    let on_disk = std::fs::read(&path).expect("read");
    match result {
        Ok(()) => {
            let mut expected = original.clone();
            expected.extend_from_slice(&page_increment(&page_objects(1), 50));
            assert_eq!(on_disk, expected);
        }
        Err(SaveError::Invalidated) => assert_eq!(on_disk, original),
        Err(other) => panic!("unexpected commit failure: {}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_commit_is_all_or_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let original = sample_pdf(3);
    let path = write_document(dir.path(), "doc.pdf", &original);

    let manager = SessionManager::default();
    let handle = manager
        .open(&locator(&path), OpenMode::ReadWrite)
        .await
        .expect("open");

    let mut tx = manager.begin_edit(&handle).expect("begin");
    tx.stage(EditOperation::ReplaceContents(sample_pdf(6)));

    // The caller stops waiting almost immediately
    let _ = tokio::time::timeout(Duration::from_micros(1), manager.commit(tx)).await;

    // Close serializes behind whatever the commit task was doing
    manager.close(&handle).await;

    let on_disk = std::fs::read(&path).expect("read");
    assert!(on_disk == original || on_disk == sample_pdf(6));
}
