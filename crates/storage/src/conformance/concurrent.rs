use std::future::Future;
use std::sync::Arc;

use super::{create_page, with_body, TestResult, PAGE};
use crate::{RecordStore, Stage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "checked_writes_exactly_one_wins",
            checked_writes_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "unchecked_writes_all_append",
            unchecked_writes_all_append(factory).await,
        ),
    ]
}

// ── Checked writes: exactly one wins ────────────────────────────────────────

/// N tasks race to write the Draft row, all expecting version 1. Exactly one
/// succeeds; the rest must get ConcurrentConflict.
async fn checked_writes_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let rec = create_page(store.as_ref(), "v1").await?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        let next = with_body(&rec, &format!("writer-{i}"));
        handles.push(tokio::spawn(async move {
            match s.write(Stage::Draft, &next, Some(1)).await {
                Ok(_) => Ok(true),
                Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }

    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    let history = store
        .list_versions(PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    if history.len() != 2 {
        return Err(format!("expected 2 history entries, got {}", history.len()));
    }
    Ok(())
}

// ── Unchecked writes: last write wins, nothing lost from history ────────────

async fn unchecked_writes_all_append<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let rec = create_page(store.as_ref(), "v1").await?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        let next = with_body(&rec, &format!("writer-{i}"));
        handles.push(tokio::spawn(
            async move { s.write(Stage::Draft, &next, None).await },
        ));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
    }

    let history = store
        .list_versions(PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    let versions: Vec<u64> = history.iter().map(|s| s.version).collect();
    let expected: Vec<u64> = (1..=(N as u64 + 1)).collect();
    if versions != expected {
        return Err(format!("expected versions {expected:?}, got {versions:?}"));
    }
    Ok(())
}
