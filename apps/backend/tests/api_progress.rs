//! Daily progress and goal override tests.

mod common;

use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;

use study_backend::services::progress::IncrementPath;
use study_backend::store::ProgressStore;
use study_backend::ErrorKind;

use common::TestContext;

#[tokio::test]
async fn test_read_progress_defaults_without_creating_row() {
    let ctx = TestContext::new();
    ctx.set_settings(Some(15), Some(4));

    let snapshot = ctx.engine.read_progress(&ctx.ctx(), None).await.unwrap();

    assert_eq!(snapshot.date_key, ctx.today());
    assert_eq!(snapshot.reviews_done, 0);
    assert_eq!(snapshot.daily_goal, 15);
    assert_eq!(snapshot.remaining_for_today, 15);
    assert_eq!(snapshot.new_remaining, 4);
    assert!(ctx
        .store
        .get_progress(ctx.user, ctx.today())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_goal_override_set_and_clear() {
    let ctx = TestContext::new();
    ctx.set_settings(Some(20), None);
    ctx.set_progress(3, 1, None);

    let snapshot = ctx
        .engine
        .upsert_goal_override(&ctx.ctx(), None, Some(8))
        .await
        .unwrap();
    assert_eq!(snapshot.goal_override, Some(8));
    assert_eq!(snapshot.daily_goal, 8);
    assert_eq!(snapshot.remaining_for_today, 5);
    // Counters are untouched.
    assert_eq!((snapshot.reviews_done, snapshot.new_introduced), (3, 1));

    let snapshot = ctx
        .engine
        .upsert_goal_override(&ctx.ctx(), None, None)
        .await
        .unwrap();
    assert_eq!(snapshot.goal_override, None);
    assert_eq!(snapshot.daily_goal, 20);
}

#[tokio::test]
async fn test_goal_override_for_explicit_day() {
    let ctx = TestContext::new();

    ctx.engine
        .upsert_goal_override(&ctx.ctx(), Some("2024-04-01"), Some(0))
        .await
        .unwrap();

    let day = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let row = ctx.store.get_progress(ctx.user, day).await.unwrap().unwrap();
    assert_eq!(row.goal_override, Some(0));
    let snapshot = ctx
        .engine
        .read_progress(&ctx.ctx(), Some("2024-04-01"))
        .await
        .unwrap();
    // A zero goal still allows one review.
    assert_eq!(snapshot.daily_goal, 1);
}

#[tokio::test]
async fn test_goal_override_accepts_largest_stored_value() {
    let ctx = TestContext::new();

    let snapshot = ctx
        .engine
        .upsert_goal_override(&ctx.ctx(), None, Some(i64::from(i32::MAX)))
        .await
        .unwrap();

    assert_eq!(snapshot.goal_override, Some(i32::MAX as u32));
}

#[tokio::test]
async fn test_goal_override_rejects_bad_input() {
    let ctx = TestContext::new();

    let err = ctx
        .engine
        .upsert_goal_override(&ctx.ctx(), None, Some(-1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ctx
        .engine
        .upsert_goal_override(&ctx.ctx(), Some("15/03/2024"), Some(5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ctx
        .engine
        .upsert_goal_override(&ctx.ctx(), None, Some(i64::from(i32::MAX) + 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ctx
        .engine
        .read_progress(&ctx.ctx(), Some("not-a-date"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(ctx
        .store
        .get_progress(ctx.user, ctx.today())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_engine_increments() {
    let ctx = TestContext::new();
    let today = ctx.today();

    let outcome = ctx
        .engine
        .increment_reviews_done(&ctx.ctx(), today)
        .await
        .unwrap();
    assert_eq!(outcome.value, 1);
    assert_eq!(outcome.path, IncrementPath::Swapped { attempt: 1 });

    let outcome = ctx
        .engine
        .increment_new_introduced(&ctx.ctx(), today, 4)
        .await
        .unwrap();
    assert_eq!(outcome.value, 4);

    let snapshot = ctx.engine.read_progress(&ctx.ctx(), None).await.unwrap();
    assert_eq!((snapshot.reviews_done, snapshot.new_introduced), (1, 4));
    assert_eq!(snapshot.new_remaining, 6);
}

#[tokio::test]
async fn test_counters_roll_over_with_the_day() {
    let ctx = TestContext::new();
    let card = ctx.seed_new_cards(1).remove(0);
    ctx.engine.review_card(&ctx.ctx(), card.id, 0).await.unwrap();
    let yesterday = ctx.today();

    ctx.clock.advance(Duration::days(1));
    ctx.engine.review_card(&ctx.ctx(), card.id, 2).await.unwrap();

    assert_eq!(ctx.progress().await.reviews_done, 1);
    let previous = ctx
        .store
        .get_progress(ctx.user, yesterday)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(previous.reviews_done, 1);
}
