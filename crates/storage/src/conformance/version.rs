use std::future::Future;

use super::{create_page, with_body, TestResult, PAGE};
use crate::{RecordStore, Stage, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    // Basic version tracking
    results.push(TestResult::from_result(
        "version",
        "write_increments_version",
        write_increments_version(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "versions_shared_across_stages",
        versions_shared_across_stages(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "live_snapshot_marked_published",
        live_snapshot_marked_published(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "get_version_returns_exact_content",
        get_version_returns_exact_content(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "get_unknown_version_is_none",
        get_unknown_version_is_none(factory).await,
    ));

    // Expected version (OCC)
    results.push(TestResult::from_result(
        "version",
        "write_with_current_version_succeeds",
        write_with_current_version_succeeds(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "stale_version_returns_conflict",
        stale_version_returns_conflict(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "expected_version_on_absent_row_conflicts",
        expected_version_on_absent_row_conflicts(factory).await,
    ));

    // History immutability
    results.push(TestResult::from_result(
        "version",
        "delete_keeps_history",
        delete_keeps_history(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "history_prefix_never_rewritten",
        history_prefix_never_rewritten(factory).await,
    ));

    results
}

async fn write_increments_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let v2 = s
        .write(Stage::Draft, &with_body(&rec, "v2"), None)
        .await
        .map_err(|e| e.to_string())?;
    let v3 = s
        .write(Stage::Draft, &with_body(&v2, "v3"), None)
        .await
        .map_err(|e| e.to_string())?;
    if (v2.version, v3.version) != (2, 3) {
        return Err(format!(
            "expected versions (2, 3), got ({}, {})",
            v2.version, v3.version
        ));
    }
    Ok(())
}

async fn versions_shared_across_stages<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let live = s
        .write(Stage::Live, &rec, None)
        .await
        .map_err(|e| e.to_string())?;
    let draft = s
        .write(Stage::Draft, &with_body(&rec, "v3"), None)
        .await
        .map_err(|e| e.to_string())?;
    if live.version != 2 || draft.version != 3 {
        return Err(format!(
            "expected live=2 draft=3, got live={} draft={}",
            live.version, draft.version
        ));
    }
    Ok(())
}

async fn live_snapshot_marked_published<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let live = s
        .write(Stage::Live, &rec, None)
        .await
        .map_err(|e| e.to_string())?;
    if live.last_published.is_none() {
        return Err("live write did not stamp last_published".into());
    }
    let snap = s
        .get_version(PAGE, rec.id, live.version)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("live version missing from history")?;
    if !snap.published || snap.stage != Stage::Live {
        return Err(format!("live snapshot not flagged published: {snap:?}"));
    }
    Ok(())
}

async fn get_version_returns_exact_content<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let v2 = s
        .write(Stage::Draft, &with_body(&rec, "v2"), None)
        .await
        .map_err(|e| e.to_string())?;
    let snap = s
        .get_version(PAGE, rec.id, 1)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("version 1 missing")?;
    if snap.content != rec.content {
        return Err(format!("version 1 content changed: {:?}", snap.content));
    }
    if snap.content == v2.content {
        return Err("version 1 reflects a later write".into());
    }
    Ok(())
}

async fn get_unknown_version_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let missing = s
        .get_version(PAGE, rec.id, 42)
        .await
        .map_err(|e| e.to_string())?;
    if missing.is_some() {
        return Err("version 42 should not exist".into());
    }
    Ok(())
}

async fn write_with_current_version_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let v2 = s
        .write(Stage::Draft, &with_body(&rec, "v2"), Some(1))
        .await
        .map_err(|e| format!("checked write: {e}"))?;
    if v2.version != 2 {
        return Err(format!("expected version 2, got {}", v2.version));
    }
    Ok(())
}

async fn stale_version_returns_conflict<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    s.write(Stage::Draft, &with_body(&rec, "theirs"), None)
        .await
        .map_err(|e| e.to_string())?;

    match s.write(Stage::Draft, &with_body(&rec, "mine"), Some(1)).await {
        Err(StorageError::ConcurrentConflict {
            expected_version,
            actual_version,
            stage,
            ..
        }) => {
            if expected_version != 1 || actual_version != Some(2) || stage != Stage::Draft {
                return Err(format!(
                    "wrong conflict fields: expected={expected_version} actual={actual_version:?} stage={stage}"
                ));
            }
        }
        Ok(r) => return Err(format!("stale write succeeded at version {}", r.version)),
        Err(e) => return Err(format!("expected ConcurrentConflict, got: {e}")),
    }

    let history = s
        .list_versions(PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    if history.len() != 2 {
        return Err(format!(
            "conflicting write appended history ({} entries)",
            history.len()
        ));
    }
    Ok(())
}

async fn expected_version_on_absent_row_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    match s.write(Stage::Live, &rec, Some(1)).await {
        Err(StorageError::ConcurrentConflict {
            actual_version: None,
            ..
        }) => Ok(()),
        Ok(_) => Err("checked write onto an absent row succeeded".into()),
        Err(e) => Err(format!("expected ConcurrentConflict, got: {e}")),
    }
}

async fn delete_keeps_history<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    s.write(Stage::Live, &rec, None)
        .await
        .map_err(|e| e.to_string())?;
    let before = s
        .list_versions(PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    s.delete(Stage::Live, PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    let after = s
        .list_versions(PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    if before != after {
        return Err("delete altered version history".into());
    }
    Ok(())
}

async fn history_prefix_never_rewritten<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let mut current = rec.clone();
    let mut seen = Vec::new();
    for i in 0..4 {
        let stage = if i % 2 == 0 { Stage::Draft } else { Stage::Live };
        current = s
            .write(stage, &with_body(&current, &format!("v{}", i + 2)), None)
            .await
            .map_err(|e| e.to_string())?;
        let history = s
            .list_versions(PAGE, rec.id)
            .await
            .map_err(|e| e.to_string())?;
        if !history.starts_with(&seen) {
            return Err(format!("history prefix rewritten after write {i}"));
        }
        if history.len() != seen.len() + 1 && !seen.is_empty() {
            return Err(format!("write {i} did not append exactly one entry"));
        }
        seen = history;
    }
    Ok(())
}
