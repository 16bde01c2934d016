use std::future::Future;

use super::{content, create_page, TestResult, PAGE};
use crate::{RecordStore, Stage};

pub(super) async fn run_init_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "init",
            "create_assigns_version_1",
            create_assigns_version_1(factory).await,
        ),
        TestResult::from_result(
            "init",
            "create_writes_draft_only",
            create_writes_draft_only(factory).await,
        ),
        TestResult::from_result(
            "init",
            "create_records_initial_snapshot",
            create_records_initial_snapshot(factory).await,
        ),
        TestResult::from_result(
            "init",
            "create_allocates_distinct_ids",
            create_allocates_distinct_ids(factory).await,
        ),
        TestResult::from_result(
            "init",
            "get_first_on_empty_type_is_none",
            get_first_on_empty_type_is_none(factory).await,
        ),
        TestResult::from_result(
            "init",
            "get_first_returns_lowest_id",
            get_first_returns_lowest_id(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn create_assigns_version_1<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "hello").await?;
    if rec.version != 1 {
        return Err(format!("expected version 1, got {}", rec.version));
    }
    if rec.last_published.is_some() {
        return Err("freshly created record must not carry a publish time".into());
    }
    Ok(())
}

async fn create_writes_draft_only<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "hello").await?;

    let draft = s
        .get(PAGE, rec.id, Stage::Draft)
        .await
        .map_err(|e| e.to_string())?;
    if draft.as_ref().map(|r| &r.content) != Some(&rec.content) {
        return Err(format!("draft row mismatch: {draft:?}"));
    }

    let live = s
        .get(PAGE, rec.id, Stage::Live)
        .await
        .map_err(|e| e.to_string())?;
    if live.is_some() {
        return Err("create must not write a Live row".into());
    }
    Ok(())
}

async fn create_records_initial_snapshot<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "hello").await?;
    let history = s
        .list_versions(PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    match history.as_slice() {
        [only] if only.version == 1 && only.stage == Stage::Draft && !only.published => Ok(()),
        other => Err(format!("unexpected initial history: {other:?}")),
    }
}

async fn create_allocates_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = create_page(&s, "a").await?;
    let b = s
        .create("FooterBlock", content("Footer", "b"), None)
        .await
        .map_err(|e| e.to_string())?;
    if a.id == b.id {
        return Err(format!("ids collided: {}", a.id));
    }
    Ok(())
}

async fn get_first_on_empty_type_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let _ = create_page(&s, "a").await?;
    let other = s
        .get_first("ContactPage", Stage::Draft)
        .await
        .map_err(|e| e.to_string())?;
    if other.is_some() {
        return Err("get_first leaked a record of another type".into());
    }
    let live = s
        .get_first(PAGE, Stage::Live)
        .await
        .map_err(|e| e.to_string())?;
    if live.is_some() {
        return Err("get_first(Live) found an unpublished record".into());
    }
    Ok(())
}

async fn get_first_returns_lowest_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let first = create_page(&s, "first").await?;
    let _second = create_page(&s, "second").await?;
    let found = s
        .get_first(PAGE, Stage::Draft)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("get_first returned None")?;
    if found.id != first.id {
        return Err(format!("expected id {}, got {}", first.id, found.id));
    }
    Ok(())
}
