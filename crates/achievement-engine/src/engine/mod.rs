//! 授予/撤销引擎与事件路由
//!
//! 引擎是所有成就变更的唯一入口：活动事件经 `notify` 路由到
//! 对应分类的授予检查与撤销检查，授予依赖 (user, achievement)
//! 唯一约束实现幂等，撤销只对可撤销分类生效。
//! 检查失败不会使触发它的活动操作失败——错误被收集进事件结果
//! 并记录日志，由下次同类事件自然重试。

mod anomaly;

pub use anomaly::AnomalyDetector;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use achievement_shared::config::EngineConfig;

use crate::activity::ActivitySource;
use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::evaluator::{self, SLUG_FOUNDING_MEMBER};
use crate::events::ActivityEvent;
use crate::models::{Achievement, AchievementCategory, ActivitySnapshot, CriteriaType};
use crate::progress::ProgressCache;
use crate::repository::{CatalogRepositoryTrait, EarnedRepositoryTrait};

/// 单个用户的一次成就变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementChange {
    pub user_id: String,
    pub slug: String,
}

/// 单次事件处理结果
///
/// `errors` 非空表示部分检查失败被跳过，事件本身仍视为已处理
#[derive(Debug, Default)]
pub struct EventOutcome {
    pub awarded: Vec<AchievementChange>,
    pub revoked: Vec<AchievementChange>,
    pub anomaly_flagged: bool,
    pub errors: Vec<String>,
}

impl EventOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 成就授予/撤销引擎
pub struct AchievementEngine<CR, ER, AS>
where
    CR: CatalogRepositoryTrait,
    ER: EarnedRepositoryTrait,
    AS: ActivitySource,
{
    catalog: Arc<CatalogStore<CR>>,
    earned: Arc<ER>,
    activity: Arc<AS>,
    progress_cache: Arc<dyn ProgressCache>,
    anomaly: AnomalyDetector,
}

impl<CR, ER, AS> AchievementEngine<CR, ER, AS>
where
    CR: CatalogRepositoryTrait,
    ER: EarnedRepositoryTrait,
    AS: ActivitySource,
{
    pub fn new(
        catalog: Arc<CatalogStore<CR>>,
        earned: Arc<ER>,
        activity: Arc<AS>,
        progress_cache: Arc<dyn ProgressCache>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            catalog,
            earned,
            activity,
            progress_cache,
            anomaly: AnomalyDetector::new(
                config.anomaly_visit_threshold,
                config.anomaly_window_seconds,
            ),
        }
    }

    /// 处理活动事件
    ///
    /// 分发顺序：先记录异常信号（仅打卡事件），再执行分类检查，
    /// 最后无条件失效受影响用户的进度缓存——即使没有任何成就变更，
    /// 活动计数的变化也会改变"进行中"条目的百分比。
    #[instrument(skip(self))]
    pub async fn notify(&self, event: &ActivityEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();

        match event {
            ActivityEvent::LocationVisited { user_id } => {
                outcome.anomaly_flagged = self.anomaly.record(user_id, Utc::now());
                let result = self.check_exploration(user_id).await;
                self.collect_awards(&mut outcome, user_id, result);
            }
            ActivityEvent::LocationAdded { user_id } => {
                let result = self.check_contribution(user_id).await;
                self.collect_awards(&mut outcome, user_id, result);
            }
            ActivityEvent::ReviewCreated {
                user_id,
                location_owner_id,
            } => {
                let result = self.check_review(user_id).await;
                self.collect_awards(&mut outcome, user_id, result);
                // 新点评可能使所有者地点达到质量线
                let result = self.check_quality(location_owner_id).await;
                self.collect_awards(&mut outcome, location_owner_id, result);
            }
            ActivityEvent::ReviewDeleted {
                user_id,
                location_owner_id,
            } => {
                let result = self.revoke_review(user_id).await;
                self.collect_revocations(&mut outcome, user_id, result);
                // 删除点评可能拉低所有者地点的平均评分
                let result = self.revoke_quality(location_owner_id).await;
                self.collect_revocations(&mut outcome, location_owner_id, result);
            }
            ActivityEvent::VoteCastOrRemoved { review_author_id } => {
                let result = self.check_review(review_author_id).await;
                self.collect_awards(&mut outcome, review_author_id, result);
                let result = self.revoke_review(review_author_id).await;
                self.collect_revocations(&mut outcome, review_author_id, result);
            }
            ActivityEvent::FollowChanged { followed_user_id } => {
                let result = self.check_community(followed_user_id).await;
                self.collect_awards(&mut outcome, followed_user_id, result);
                let result = self.revoke_community(followed_user_id).await;
                self.collect_revocations(&mut outcome, followed_user_id, result);
            }
            ActivityEvent::CommentCreatedOrDeleted { user_id } => {
                let result = self.check_community(user_id).await;
                self.collect_awards(&mut outcome, user_id, result);
                let result = self.revoke_community(user_id).await;
                self.collect_revocations(&mut outcome, user_id, result);
            }
            ActivityEvent::PhotoUploadedOrDeleted { user_id } => {
                let result = self.check_special(user_id).await;
                self.collect_awards(&mut outcome, user_id, result);
                let result = self.revoke_special(user_id).await;
                self.collect_revocations(&mut outcome, user_id, result);
            }
            ActivityEvent::ProfileFieldChanged { user_id } => {
                let result = self.check_special(user_id).await;
                self.collect_awards(&mut outcome, user_id, result);
                let result = self.revoke_special(user_id).await;
                self.collect_revocations(&mut outcome, user_id, result);
            }
            ActivityEvent::EmailVerified { user_id } => {
                let result = self.check_tenure(user_id).await;
                self.collect_awards(&mut outcome, user_id, result);
            }
        }

        for user_id in event.affected_users() {
            self.invalidate_progress(user_id).await;
        }

        outcome
    }

    /// 幂等授予
    ///
    /// 返回 true 表示本次调用创建了记录；已持有时静默无操作
    #[instrument(skip(self, achievement), fields(slug = %achievement.slug))]
    pub async fn award(&self, user_id: &str, achievement: &Achievement) -> Result<bool> {
        let created = self
            .earned
            .create_if_absent(user_id, achievement.id, Utc::now())
            .await?;

        if created {
            info!(
                user_id = %user_id,
                slug = %achievement.slug,
                category = ?achievement.category,
                "Achievement awarded"
            );
            self.invalidate_progress(user_id).await;
        }

        Ok(created)
    }

    /// 条件撤销
    ///
    /// 不可撤销分类、未持有、仍达标三种情况都是无操作。
    /// 返回 true 表示记录被删除。
    pub async fn revoke_if_disqualified(
        &self,
        user_id: &str,
        achievement: &Achievement,
        snapshot: &ActivitySnapshot,
    ) -> Result<bool> {
        if !achievement.category.is_revocable() {
            return Ok(false);
        }
        if !self.earned.exists(user_id, achievement.id).await? {
            return Ok(false);
        }
        if evaluator::qualifies(achievement, snapshot)? {
            return Ok(false);
        }

        let removed = self.earned.delete(user_id, achievement.id).await?;
        if removed {
            info!(
                user_id = %user_id,
                slug = %achievement.slug,
                category = ?achievement.category,
                "Achievement revoked"
            );
            self.invalidate_progress(user_id).await;
        }

        Ok(removed)
    }

    /// 探索分类检查（打卡数阶梯）
    pub async fn check_exploration(&self, user_id: &str) -> Result<Vec<String>> {
        let snapshot = self
            .snapshot_for(user_id, AchievementCategory::Exploration)
            .await?;
        self.award_ladder(
            user_id,
            AchievementCategory::Exploration,
            CriteriaType::VisitCount,
            &snapshot,
        )
        .await
    }

    /// 贡献分类检查（新增地点数阶梯）
    pub async fn check_contribution(&self, user_id: &str) -> Result<Vec<String>> {
        let snapshot = self
            .snapshot_for(user_id, AchievementCategory::Contribution)
            .await?;
        self.award_ladder(
            user_id,
            AchievementCategory::Contribution,
            CriteriaType::LocationsAdded,
            &snapshot,
        )
        .await
    }

    /// 质量分类检查（高评分地点数阶梯）
    pub async fn check_quality(&self, user_id: &str) -> Result<Vec<String>> {
        let snapshot = self
            .snapshot_for(user_id, AchievementCategory::Quality)
            .await?;
        self.award_ladder(
            user_id,
            AchievementCategory::Quality,
            CriteriaType::LocationRatingCount,
            &snapshot,
        )
        .await
    }

    /// 点评分类检查
    ///
    /// 点评分类混合多种条件类型（点评数、获赞数、赞成率），
    /// 逐个独立评估而非阶梯短路
    pub async fn check_review(&self, user_id: &str) -> Result<Vec<String>> {
        let candidates = self.catalog.review_category_all().await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self
            .snapshot_for(user_id, AchievementCategory::Review)
            .await?;
        let mut awarded = Vec::new();
        for a in candidates.iter() {
            if evaluator::qualifies(a, &snapshot)? && self.award(user_id, a).await? {
                awarded.push(a.slug.clone());
            }
        }
        Ok(awarded)
    }

    /// 社区分类检查（粉丝数与评论数两条独立阶梯）
    pub async fn check_community(&self, user_id: &str) -> Result<Vec<String>> {
        let snapshot = self
            .snapshot_for(user_id, AchievementCategory::Community)
            .await?;

        let mut awarded = self
            .award_ladder(
                user_id,
                AchievementCategory::Community,
                CriteriaType::FollowerCount,
                &snapshot,
            )
            .await?;
        awarded.extend(
            self.award_ladder(
                user_id,
                AchievementCategory::Community,
                CriteriaType::CommentsWritten,
                &snapshot,
            )
            .await?,
        );
        Ok(awarded)
    }

    /// 特殊分类检查（资料完整度 + 特殊条件，逐个独立评估）
    pub async fn check_special(&self, user_id: &str) -> Result<Vec<String>> {
        let snapshot = self
            .snapshot_for(user_id, AchievementCategory::Special)
            .await?;

        let mut candidates = Vec::new();
        candidates.extend(
            self.catalog
                .by_category_and_type(
                    AchievementCategory::Special,
                    CriteriaType::ProfileComplete,
                )
                .await?
                .iter()
                .cloned(),
        );
        candidates.extend(
            self.catalog
                .by_category_and_type(
                    AchievementCategory::Special,
                    CriteriaType::SpecialCondition,
                )
                .await?
                .iter()
                .cloned(),
        );

        let mut awarded = Vec::new();
        for a in &candidates {
            if evaluator::qualifies(a, &snapshot)? && self.award(user_id, a).await? {
                awarded.push(a.slug.clone());
            }
        }
        Ok(awarded)
    }

    /// 资历分类检查
    ///
    /// 仅由邮箱验证生命周期事件触发一次：注册名次在目录阈值内即授予。
    /// 资历分类不可撤销，也永不被常规评估器重评估。
    pub async fn check_tenure(&self, user_id: &str) -> Result<Vec<String>> {
        let candidates = self
            .catalog
            .by_category_and_type(
                AchievementCategory::Tenure,
                CriteriaType::SpecialCondition,
            )
            .await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let Some(rank) = self.activity.registration_rank(user_id).await? else {
            return Ok(Vec::new());
        };

        let mut awarded = Vec::new();
        for a in candidates.iter() {
            if a.slug == SLUG_FOUNDING_MEMBER
                && rank >= 1
                && rank <= a.criteria_value
                && self.award(user_id, a).await?
            {
                awarded.push(a.slug.clone());
            }
        }
        Ok(awarded)
    }

    /// 探索分类撤销检查
    ///
    /// 没有入站事件会减少打卡计数，此入口供数据修正/回填作业调用
    pub async fn revoke_exploration(&self, user_id: &str) -> Result<Vec<String>> {
        self.revoke_category(user_id, AchievementCategory::Exploration)
            .await
    }

    /// 贡献分类撤销检查（同上，供数据修正/回填作业调用）
    pub async fn revoke_contribution(&self, user_id: &str) -> Result<Vec<String>> {
        self.revoke_category(user_id, AchievementCategory::Contribution)
            .await
    }

    /// 质量分类撤销检查
    pub async fn revoke_quality(&self, user_id: &str) -> Result<Vec<String>> {
        self.revoke_category(user_id, AchievementCategory::Quality)
            .await
    }

    /// 点评分类撤销检查
    pub async fn revoke_review(&self, user_id: &str) -> Result<Vec<String>> {
        self.revoke_category(user_id, AchievementCategory::Review)
            .await
    }

    /// 社区分类撤销检查
    pub async fn revoke_community(&self, user_id: &str) -> Result<Vec<String>> {
        self.revoke_category(user_id, AchievementCategory::Community)
            .await
    }

    /// 特殊分类撤销检查
    pub async fn revoke_special(&self, user_id: &str) -> Result<Vec<String>> {
        self.revoke_category(user_id, AchievementCategory::Special)
            .await
    }

    // ==================== 私有方法 ====================

    /// 按升序阶梯授予：遇到首个不达标项即短路
    async fn award_ladder(
        &self,
        user_id: &str,
        category: AchievementCategory,
        criteria_type: CriteriaType,
        snapshot: &ActivitySnapshot,
    ) -> Result<Vec<String>> {
        let ladder = self.catalog.by_category_and_type(category, criteria_type).await?;

        let mut awarded = Vec::new();
        for a in ladder.iter() {
            if !evaluator::qualifies(a, snapshot)? {
                break;
            }
            if self.award(user_id, a).await? {
                awarded.push(a.slug.clone());
            }
        }
        Ok(awarded)
    }

    /// 对某分类下用户已持有的成就逐个执行条件撤销
    ///
    /// 只遍历已持有记录，未持有的成就不参与撤销检查
    async fn revoke_category(
        &self,
        user_id: &str,
        category: AchievementCategory,
    ) -> Result<Vec<String>> {
        if !category.is_revocable() {
            return Ok(Vec::new());
        }

        let earned = self.earned.list_by_user(user_id).await?;
        if earned.is_empty() {
            return Ok(Vec::new());
        }
        let earned_ids: std::collections::HashSet<i64> =
            earned.iter().map(|e| e.achievement_id).collect();

        let all = self.catalog.all().await?;
        let held: Vec<&Achievement> = all
            .iter()
            .filter(|a| a.category == category && earned_ids.contains(&a.id))
            .collect();
        if held.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot_for(user_id, category).await?;
        let mut revoked = Vec::new();
        for a in held {
            if self.revoke_if_disqualified(user_id, a, &snapshot).await? {
                revoked.push(a.slug.clone());
            }
        }
        Ok(revoked)
    }

    /// 采集分类检查所需的最小活动快照
    ///
    /// 只填充该分类条件会读取的字段，避免每次检查都全量拉取活动数据
    async fn snapshot_for(
        &self,
        user_id: &str,
        category: AchievementCategory,
    ) -> Result<ActivitySnapshot> {
        let mut snapshot = ActivitySnapshot::default();
        match category {
            AchievementCategory::Exploration => {
                snapshot.visit_count = self.activity.visit_count(user_id).await?;
            }
            AchievementCategory::Contribution => {
                snapshot.locations_added = self.activity.locations_added_count(user_id).await?;
            }
            AchievementCategory::Quality => {
                snapshot.quality_locations = self.activity.quality_location_count(user_id).await?;
            }
            AchievementCategory::Review => {
                snapshot.reviews_written = self.activity.reviews_written_count(user_id).await?;
                let (upvotes, total) = self.activity.vote_totals(user_id).await?;
                snapshot.upvotes_received = upvotes;
                snapshot.total_votes = total;
            }
            AchievementCategory::Community => {
                snapshot.follower_count = self.activity.follower_count(user_id).await?;
                snapshot.qualifying_comments =
                    self.activity.qualifying_comment_count(user_id).await?;
            }
            AchievementCategory::Special => {
                snapshot.total_photos = self.activity.photo_count(user_id).await?;
                let profile = self.activity.profile_completion(user_id).await?;
                snapshot.profile_fields_completed = profile.completed();
                snapshot.profile_fields_required = profile.total();
            }
            // 资历分类不经快照评估，注册名次由 check_tenure 单独读取
            AchievementCategory::Tenure => {}
        }
        Ok(snapshot)
    }

    /// 失效用户进度缓存，失败只告警不传播
    async fn invalidate_progress(&self, user_id: &str) {
        if let Err(e) = self.progress_cache.delete(user_id).await {
            warn!(
                user_id = %user_id,
                error = %e,
                "Progress cache invalidation failed, entry expires by TTL"
            );
        }
    }

    fn collect_awards(
        &self,
        outcome: &mut EventOutcome,
        user_id: &str,
        result: Result<Vec<String>>,
    ) {
        match result {
            Ok(slugs) => {
                outcome
                    .awarded
                    .extend(slugs.into_iter().map(|slug| AchievementChange {
                        user_id: user_id.to_string(),
                        slug,
                    }));
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Achievement check failed during event handling");
                outcome.errors.push(e.to_string());
            }
        }
    }

    fn collect_revocations(
        &self,
        outcome: &mut EventOutcome,
        user_id: &str,
        result: Result<Vec<String>>,
    ) {
        match result {
            Ok(slugs) => {
                outcome
                    .revoked
                    .extend(slugs.into_iter().map(|slug| AchievementChange {
                        user_id: user_id.to_string(),
                        slug,
                    }));
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Revocation check failed during event handling");
                outcome.errors.push(e.to_string());
            }
        }
    }
}
