//! 引擎端到端流程测试
//!
//! 使用内存仓储与内存活动源驱动完整的事件 -> 检查 -> 授予/撤销链路，
//! 覆盖幂等授予、条件撤销对称性、跨用户事件路由与异常信号的非阻塞性。

use std::sync::Arc;

use chrono::Utc;

use achievement_engine::{
    Achievement, AchievementCategory, AchievementEngine, ActivityEvent, CatalogStore,
    CriteriaType, EarnedRepositoryTrait, InMemoryActivitySource, InMemoryCatalogRepository,
    InMemoryEarnedRepository, InMemoryProgressCache, ProgressCache,
};
use achievement_shared::config::EngineConfig;

fn achievement(
    id: i64,
    slug: &str,
    category: AchievementCategory,
    criteria_type: CriteriaType,
    value: i64,
    secondary: Option<i64>,
) -> Achievement {
    Achievement {
        id,
        slug: slug.to_string(),
        name: slug.to_string(),
        description: String::new(),
        category,
        tier: 1,
        display_order: 0,
        criteria_type,
        criteria_value: value,
        criteria_secondary: secondary,
        is_rare: false,
        icon_path: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

struct TestHarness {
    engine: Arc<
        AchievementEngine<
            InMemoryCatalogRepository,
            InMemoryEarnedRepository,
            InMemoryActivitySource,
        >,
    >,
    earned: Arc<InMemoryEarnedRepository>,
    activity: Arc<InMemoryActivitySource>,
    progress_cache: Arc<InMemoryProgressCache>,
}

async fn harness(catalog_items: Vec<Achievement>) -> TestHarness {
    let catalog_repo = Arc::new(InMemoryCatalogRepository::with_achievements(catalog_items));
    let catalog = Arc::new(CatalogStore::load(catalog_repo).await.unwrap());
    let earned = Arc::new(InMemoryEarnedRepository::new());
    let activity = Arc::new(InMemoryActivitySource::new());
    let progress_cache = Arc::new(InMemoryProgressCache::new());

    let engine = Arc::new(AchievementEngine::new(
        catalog,
        earned.clone(),
        activity.clone(),
        progress_cache.clone(),
        &EngineConfig::default(),
    ));

    TestHarness {
        engine,
        earned,
        activity,
        progress_cache,
    }
}

#[tokio::test]
async fn test_duplicate_events_award_once() {
    let h = harness(vec![achievement(
        1,
        "explorer-1",
        AchievementCategory::Exploration,
        CriteriaType::VisitCount,
        1,
        None,
    )])
    .await;

    h.activity.set_visits("u1", 1);
    let event = ActivityEvent::LocationVisited {
        user_id: "u1".to_string(),
    };

    let first = h.engine.notify(&event).await;
    assert_eq!(first.awarded.len(), 1);

    // 消息重投递：同一事件再次到达，静默无操作
    let second = h.engine.notify(&event).await;
    assert!(second.awarded.is_empty());
    assert!(second.is_clean());
    assert_eq!(h.earned.list_by_user("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_events_award_once() {
    let h = harness(vec![achievement(
        1,
        "explorer-1",
        AchievementCategory::Exploration,
        CriteriaType::VisitCount,
        1,
        None,
    )])
    .await;

    h.activity.set_visits("u1", 1);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            let event = ActivityEvent::LocationVisited {
                user_id: "u1".to_string(),
            };
            engine.notify(&event).await.awarded.len()
        }));
    }

    let mut total_awarded = 0;
    for handle in handles {
        total_awarded += handle.await.unwrap();
    }

    assert_eq!(total_awarded, 1);
    assert_eq!(h.earned.list_by_user("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_vote_swing_awards_then_revokes() {
    // 赞成率成就：至少 10 篇点评且 80% 赞成
    let h = harness(vec![achievement(
        1,
        "trusted-voice",
        AchievementCategory::Review,
        CriteriaType::HelpfulRatio,
        10,
        Some(80),
    )])
    .await;

    h.activity.set_reviews_written("author", 10);
    h.activity.set_vote_totals("author", 8, 10);

    let vote_event = ActivityEvent::VoteCastOrRemoved {
        review_author_id: "author".to_string(),
    };

    let outcome = h.engine.notify(&vote_event).await;
    assert_eq!(outcome.awarded.len(), 1);
    assert_eq!(outcome.awarded[0].slug, "trusted-voice");

    // 一次反对票把比例拉到 8/11 ≈ 72%，跌破阈值即撤销
    h.activity.set_vote_totals("author", 8, 11);
    let outcome = h.engine.notify(&vote_event).await;
    assert_eq!(outcome.revoked.len(), 1);
    assert_eq!(outcome.revoked[0].slug, "trusted-voice");
    assert!(!h.earned.exists("author", 1).await.unwrap());

    // 条件恢复后重新授予（earned_at 为新时间）
    h.activity.set_vote_totals("author", 9, 11);
    let outcome = h.engine.notify(&vote_event).await;
    assert_eq!(outcome.awarded.len(), 1);
}

#[tokio::test]
async fn test_review_deletion_revokes_owner_quality() {
    let h = harness(vec![
        achievement(
            1,
            "critic-5",
            AchievementCategory::Review,
            CriteriaType::ReviewsWritten,
            5,
            None,
        ),
        achievement(
            2,
            "quality-curator-3",
            AchievementCategory::Quality,
            CriteriaType::LocationRatingCount,
            3,
            None,
        ),
    ])
    .await;

    // 所有者持有质量成就，作者持有点评成就
    h.activity.set_reviews_written("author", 5);
    h.activity.set_quality_locations("owner", 3);
    let created = ActivityEvent::ReviewCreated {
        user_id: "author".to_string(),
        location_owner_id: "owner".to_string(),
    };
    let outcome = h.engine.notify(&created).await;
    assert_eq!(outcome.awarded.len(), 2);

    // 作者删除点评：作者的点评数与所有者的高评分地点数同时跌破阈值
    h.activity.set_reviews_written("author", 4);
    h.activity.set_quality_locations("owner", 2);
    let deleted = ActivityEvent::ReviewDeleted {
        user_id: "author".to_string(),
        location_owner_id: "owner".to_string(),
    };

    let outcome = h.engine.notify(&deleted).await;
    let mut revoked: Vec<(&str, &str)> = outcome
        .revoked
        .iter()
        .map(|c| (c.user_id.as_str(), c.slug.as_str()))
        .collect();
    revoked.sort();
    assert_eq!(
        revoked,
        vec![("author", "critic-5"), ("owner", "quality-curator-3")]
    );
}

#[tokio::test]
async fn test_tenure_awarded_once_and_permanent() {
    let h = harness(vec![achievement(
        1,
        "founding-member",
        AchievementCategory::Tenure,
        CriteriaType::SpecialCondition,
        500,
        None,
    )])
    .await;

    h.activity.set_registration_rank("u1", 42);
    let event = ActivityEvent::EmailVerified {
        user_id: "u1".to_string(),
    };

    let outcome = h.engine.notify(&event).await;
    assert_eq!(outcome.awarded.len(), 1);
    assert_eq!(outcome.awarded[0].slug, "founding-member");

    // 重复验证事件与后续任何事件都不会触碰资历记录
    let outcome = h.engine.notify(&event).await;
    assert!(outcome.awarded.is_empty());
    assert!(outcome.revoked.is_empty());
    assert!(h.earned.exists("u1", 1).await.unwrap());
}

#[tokio::test]
async fn test_profile_events_award_and_revoke_special() {
    let h = harness(vec![achievement(
        1,
        "complete-profile",
        AchievementCategory::Special,
        CriteriaType::ProfileComplete,
        1,
        None,
    )])
    .await;

    h.activity
        .set_profile("u1", vec![("avatar", true), ("bio", true)]);
    let event = ActivityEvent::ProfileFieldChanged {
        user_id: "u1".to_string(),
    };

    let outcome = h.engine.notify(&event).await;
    assert_eq!(outcome.awarded.len(), 1);

    // 清空一个字段后撤销
    h.activity
        .set_profile("u1", vec![("avatar", true), ("bio", false)]);
    let outcome = h.engine.notify(&event).await;
    assert_eq!(outcome.revoked.len(), 1);
    assert_eq!(outcome.revoked[0].slug, "complete-profile");
}

#[tokio::test]
async fn test_anomaly_signal_does_not_block_awards() {
    let h = harness(vec![
        achievement(
            1,
            "explorer-1",
            AchievementCategory::Exploration,
            CriteriaType::VisitCount,
            1,
            None,
        ),
        achievement(
            2,
            "explorer-15",
            AchievementCategory::Exploration,
            CriteriaType::VisitCount,
            15,
            None,
        ),
    ])
    .await;

    let event = ActivityEvent::LocationVisited {
        user_id: "u1".to_string(),
    };

    // 连续打卡超过默认阈值（10 次/小时）
    let mut last_outcome = None;
    for i in 1..=15 {
        h.activity.set_visits("u1", i);
        last_outcome = Some(h.engine.notify(&event).await);
    }
    let outcome = last_outcome.unwrap();

    // 信号已置位，但第 15 次打卡的授予照常执行
    assert!(outcome.anomaly_flagged);
    assert_eq!(outcome.awarded.len(), 1);
    assert_eq!(outcome.awarded[0].slug, "explorer-15");
}

#[tokio::test]
async fn test_events_invalidate_progress_cache() {
    let h = harness(vec![achievement(
        1,
        "explorer-5",
        AchievementCategory::Exploration,
        CriteriaType::VisitCount,
        5,
        None,
    )])
    .await;

    // 预置两份缓存，事件只失效受影响用户的那份
    let view = achievement_engine::ProgressView::default();
    h.progress_cache
        .set("u1", &view, std::time::Duration::from_secs(300))
        .await
        .unwrap();
    h.progress_cache
        .set("bystander", &view, std::time::Duration::from_secs(300))
        .await
        .unwrap();

    // 未触发任何授予的事件同样失效缓存（进行中百分比已变化）
    h.activity.set_visits("u1", 2);
    let event = ActivityEvent::LocationVisited {
        user_id: "u1".to_string(),
    };
    let outcome = h.engine.notify(&event).await;
    assert!(outcome.awarded.is_empty());

    assert!(h.progress_cache.get("u1").await.unwrap().is_none());
    assert!(h.progress_cache.get("bystander").await.unwrap().is_some());
}
