//! Study queue tests.

mod common;

use pretty_assertions::assert_eq;

use study_backend::models::CardStatus;
use study_backend::store::ProgressStore;
use study_backend::{ErrorKind, RequestContext};

use common::TestContext;

/// A user with no settings row: 5 due + 20 new under the default goal and
/// new limit.
#[tokio::test]
async fn test_queue_fills_with_due_then_new() {
    let ctx = TestContext::new();
    let due = ctx.seed_due_cards(5);
    let fresh = ctx.seed_new_cards(20);

    let queue = ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert_eq!(queue.meta.daily_goal, 20);
    assert_eq!(queue.meta.due_count, 5);
    assert_eq!(queue.meta.new_selected, 10);
    assert_eq!(
        queue.due.iter().map(|c| c.id).collect::<Vec<_>>(),
        due.iter().map(|c| c.id).collect::<Vec<_>>()
    );
    assert_eq!(
        queue.new.iter().map(|c| c.id).collect::<Vec<_>>(),
        fresh[..10].iter().map(|c| c.id).collect::<Vec<_>>()
    );
    assert!(queue.new.iter().all(|c| c.state == CardStatus::New));
}

/// Nearly done for the day: only the remainder is offered.
#[tokio::test]
async fn test_queue_respects_remaining_goal() {
    let ctx = TestContext::new();
    ctx.set_settings(Some(20), Some(10));
    ctx.seed_due_cards(5);
    ctx.seed_new_cards(10);
    ctx.set_progress(18, 0, None);

    let queue = ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert_eq!(queue.due.len(), 2);
    assert!(queue.new.is_empty());
}

#[tokio::test]
async fn test_queue_never_exceeds_remaining_goal() {
    for (goal, done, due, fresh) in [(20, 0, 30, 30), (5, 3, 0, 10), (10, 10, 4, 4), (3, 0, 1, 1)] {
        let ctx = TestContext::new();
        ctx.set_settings(Some(goal), Some(50));
        ctx.seed_due_cards(due);
        ctx.seed_new_cards(fresh);
        ctx.set_progress(done, 0, None);

        let queue = ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();
        let size = (queue.due.len() + queue.new.len()) as u32;
        assert!(size <= goal.saturating_sub(done), "goal {goal} done {done} got {size}");
    }
}

#[tokio::test]
async fn test_new_cards_capped_by_new_limit() {
    let ctx = TestContext::new();
    ctx.set_settings(Some(40), Some(3));
    ctx.seed_new_cards(10);

    let queue = ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert!(queue.due.is_empty());
    assert_eq!(queue.new.len(), 3);
}

#[tokio::test]
async fn test_goal_precedence() {
    let ctx = TestContext::new();
    ctx.seed_new_cards(1);

    // Nothing stored: the hint wins over the default.
    let queue = ctx.engine.build_queue(&ctx.ctx(), Some(7)).await.unwrap();
    assert_eq!(queue.meta.daily_goal, 7);

    ctx.set_settings(Some(12), None);
    let queue = ctx.engine.build_queue(&ctx.ctx(), Some(7)).await.unwrap();
    assert_eq!(queue.meta.daily_goal, 12);

    ctx.set_progress(0, 0, Some(4));
    let queue = ctx.engine.build_queue(&ctx.ctx(), Some(7)).await.unwrap();
    assert_eq!(queue.meta.daily_goal, 4);
}

#[tokio::test]
async fn test_zero_goal_is_raised_to_one() {
    let ctx = TestContext::new();
    ctx.set_settings(Some(0), None);
    ctx.seed_due_cards(3);

    let queue = ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert_eq!(queue.meta.daily_goal, 1);
    assert_eq!(queue.due.len(), 1);
}

#[tokio::test]
async fn test_deleted_and_introduced_cards_are_excluded() {
    let ctx = TestContext::new();
    ctx.set_settings(Some(20), Some(10));
    let due = ctx.seed_due_cards(2);
    let fresh = ctx.seed_new_cards(3);
    ctx.store.soft_delete(due[0].id, ctx.now()).unwrap();
    ctx.store.soft_delete(fresh[0].id, ctx.now()).unwrap();
    ctx.engine.promote_new(&ctx.ctx(), Some(1)).await.unwrap();

    let queue = ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert_eq!(queue.due.iter().map(|c| c.id).collect::<Vec<_>>(), vec![due[1].id]);
    assert_eq!(queue.new.iter().map(|c| c.id).collect::<Vec<_>>(), vec![fresh[2].id]);
}

#[tokio::test]
async fn test_future_cards_are_not_due() {
    let ctx = TestContext::new();
    ctx.seed_due_cards(2);
    ctx.clock.set(common::start_time() - chrono::Duration::days(1));

    let queue = ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert!(queue.due.is_empty());
}

#[tokio::test]
async fn test_queue_does_not_create_progress() {
    let ctx = TestContext::new();
    ctx.seed_new_cards(2);

    ctx.engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert!(ctx
        .store
        .get_progress(ctx.user, ctx.today())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_queue_requires_user() {
    let ctx = TestContext::new();
    let err = ctx
        .engine
        .build_queue(&RequestContext::anonymous(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn test_queue_is_scoped_to_user() {
    let ctx = TestContext::new();
    ctx.seed_due_cards(3);

    let other = RequestContext::for_user(study_backend::models::UserId::new());
    let queue = ctx.engine.build_queue(&other, None).await.unwrap();

    assert!(queue.due.is_empty() && queue.new.is_empty());
}

#[tokio::test]
async fn test_external_settings_provider_is_used() {
    use std::sync::Arc;
    use study_backend::models::StudySettings;
    use study_backend::services::settings::FixedSettings;

    let ctx = TestContext::new();
    ctx.seed_new_cards(5);
    let engine = ctx.engine.clone().with_settings(Arc::new(FixedSettings(Some(StudySettings {
        daily_goal: Some(30),
        new_limit: Some(2),
    }))));

    let queue = engine.build_queue(&ctx.ctx(), None).await.unwrap();

    assert_eq!(queue.meta.daily_goal, 30);
    assert_eq!(queue.new.len(), 2);
}
