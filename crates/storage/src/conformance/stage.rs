use std::future::Future;

use super::{content, create_page, with_body, TestResult, PAGE};
use crate::{RecordStore, Stage};

pub(super) async fn run_stage_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "stage",
            "draft_write_leaves_live_untouched",
            draft_write_leaves_live_untouched(factory).await,
        ),
        TestResult::from_result(
            "stage",
            "live_write_leaves_draft_untouched",
            live_write_leaves_draft_untouched(factory).await,
        ),
        TestResult::from_result(
            "stage",
            "delete_live_keeps_draft",
            delete_live_keeps_draft(factory).await,
        ),
        TestResult::from_result(
            "stage",
            "delete_missing_row_returns_false",
            delete_missing_row_returns_false(factory).await,
        ),
        TestResult::from_result(
            "stage",
            "list_owned_filters_by_owner_and_stage",
            list_owned_filters_by_owner_and_stage(factory).await,
        ),
    ]
}

async fn draft_write_leaves_live_untouched<S, F, Fut>(factory: &F) -> Result<(), String>
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
        .map_err(|e| format!("publish: {e}"))?;

    s.write(Stage::Draft, &with_body(&rec, "v2"), None)
        .await
        .map_err(|e| format!("draft write: {e}"))?;

    let live_after = s
        .get(PAGE, rec.id, Stage::Live)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("live row disappeared")?;
    if live_after != live {
        return Err(format!("live row changed: {live_after:?}"));
    }
    Ok(())
}

async fn live_write_leaves_draft_untouched<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    s.write(Stage::Live, &with_body(&rec, "live only"), None)
        .await
        .map_err(|e| format!("live write: {e}"))?;

    let draft = s
        .get(PAGE, rec.id, Stage::Draft)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("draft row disappeared")?;
    if draft != rec {
        return Err(format!("draft row changed: {draft:?}"));
    }
    Ok(())
}

async fn delete_live_keeps_draft<S, F, Fut>(factory: &F) -> Result<(), String>
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

    let removed = s
        .delete(Stage::Live, PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    if !removed {
        return Err("delete reported nothing removed".into());
    }
    if s.get(PAGE, rec.id, Stage::Live)
        .await
        .map_err(|e| e.to_string())?
        .is_some()
    {
        return Err("live row still present after delete".into());
    }
    if s.get(PAGE, rec.id, Stage::Draft)
        .await
        .map_err(|e| e.to_string())?
        .is_none()
    {
        return Err("draft row removed by live delete".into());
    }
    Ok(())
}

async fn delete_missing_row_returns_false<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_page(&s, "v1").await?;
    let removed = s
        .delete(Stage::Live, PAGE, rec.id)
        .await
        .map_err(|e| e.to_string())?;
    if removed {
        return Err("deleting an absent live row reported success".into());
    }
    Ok(())
}

async fn list_owned_filters_by_owner_and_stage<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let page = create_page(&s, "v1").await?;
    let other = create_page(&s, "other").await?;

    let banner = s
        .create("Banner", content("Banner", "b"), Some(page.record_ref()))
        .await
        .map_err(|e| e.to_string())?;
    let _foreign = s
        .create("Banner", content("Banner", "f"), Some(other.record_ref()))
        .await
        .map_err(|e| e.to_string())?;

    let draft_owned = s
        .list_owned(&page.record_ref(), Stage::Draft)
        .await
        .map_err(|e| e.to_string())?;
    if draft_owned.iter().map(|r| r.id).collect::<Vec<_>>() != vec![banner.id] {
        return Err(format!("unexpected draft children: {draft_owned:?}"));
    }

    let live_owned = s
        .list_owned(&page.record_ref(), Stage::Live)
        .await
        .map_err(|e| e.to_string())?;
    if !live_owned.is_empty() {
        return Err("unpublished child visible on Live".into());
    }
    Ok(())
}
