//! 进度聚合与用户进度缓存
//!
//! 按需为用户构建 earned/in_progress/locked 三分类进度视图，
//! 采用缓存优先策略（TTL 默认 5 分钟）。缓存读写失败一律降级为
//! 直接重算并记录警告——进度正确性优先于缓存可用性。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{instrument, warn};

use achievement_shared::cache::{Cache, CacheKey};

use crate::activity::{ActivitySource, collect_full_snapshot};
use crate::catalog::CatalogStore;
use crate::error::Result;
use crate::evaluator;
use crate::models::{
    Achievement, EarnedEntry, InProgressEntry, LockedEntry, ProfileCompletionStatus,
    ProgressView,
};
use crate::repository::{CatalogRepositoryTrait, EarnedRepositoryTrait};

/// 用户进度缓存接口
///
/// 构造注入而非模块级全局，测试可替换为内存实现并精确断言失效调用
#[async_trait]
pub trait ProgressCache: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<ProgressView>>;
    async fn set(&self, user_id: &str, view: &ProgressView, ttl: Duration) -> Result<()>;
    async fn delete(&self, user_id: &str) -> Result<()>;
}

/// Redis 进度缓存
pub struct RedisProgressCache {
    cache: Cache,
}

impl RedisProgressCache {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ProgressCache for RedisProgressCache {
    async fn get(&self, user_id: &str) -> Result<Option<ProgressView>> {
        let view = self
            .cache
            .get::<ProgressView>(&CacheKey::user_progress(user_id))
            .await?;
        Ok(view)
    }

    async fn set(&self, user_id: &str, view: &ProgressView, ttl: Duration) -> Result<()> {
        self.cache
            .set(&CacheKey::user_progress(user_id), view, ttl)
            .await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.cache.delete(&CacheKey::user_progress(user_id)).await?;
        Ok(())
    }
}

/// 内存进度缓存
///
/// DashMap + 截止时间实现的 TTL 缓存，供测试与单机部署使用
#[derive(Debug, Default)]
pub struct InMemoryProgressCache {
    entries: DashMap<String, (ProgressView, Instant)>,
}

impl InMemoryProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前缓存条目数（测试断言失效行为用）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ProgressCache for InMemoryProgressCache {
    async fn get(&self, user_id: &str) -> Result<Option<ProgressView>> {
        if let Some(entry) = self.entries.get(user_id) {
            let (view, deadline) = entry.value();
            if Instant::now() < *deadline {
                return Ok(Some(view.clone()));
            }
        }
        // 过期条目惰性清理
        self.entries
            .remove_if(user_id, |_, (_, deadline)| Instant::now() >= *deadline);
        Ok(None)
    }

    async fn set(&self, user_id: &str, view: &ProgressView, ttl: Duration) -> Result<()> {
        self.entries
            .insert(user_id.to_string(), (view.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        self.entries.remove(user_id);
        Ok(())
    }
}

/// 进度聚合服务
///
/// 输入：用户全部获得记录、全量成就目录、即时活动快照。
/// 输出：三桶进度视图，桶内按目录展示顺序排列。
pub struct ProgressService<CR, ER, AS>
where
    CR: CatalogRepositoryTrait,
    ER: EarnedRepositoryTrait,
    AS: ActivitySource,
{
    catalog: Arc<CatalogStore<CR>>,
    earned: Arc<ER>,
    activity: Arc<AS>,
    cache: Arc<dyn ProgressCache>,
    ttl: Duration,
}

impl<CR, ER, AS> ProgressService<CR, ER, AS>
where
    CR: CatalogRepositoryTrait,
    ER: EarnedRepositoryTrait,
    AS: ActivitySource,
{
    pub fn new(
        catalog: Arc<CatalogStore<CR>>,
        earned: Arc<ER>,
        activity: Arc<AS>,
        cache: Arc<dyn ProgressCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            catalog,
            earned,
            activity,
            cache,
            ttl,
        }
    }

    /// 获取用户进度视图（缓存优先）
    ///
    /// 缓存命中直接返回；未命中或缓存层故障时重算并尝试回填。
    /// 缓存层任何故障都不会传播给调用方。
    #[instrument(skip(self))]
    pub async fn get_progress(&self, user_id: &str) -> Result<ProgressView> {
        match self.cache.get(user_id).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Progress cache read failed, recomputing");
            }
        }

        let view = self.compute_progress(user_id).await?;

        if let Err(e) = self.cache.set(user_id, &view, self.ttl).await {
            warn!(user_id = %user_id, error = %e, "Progress cache write failed");
        }

        Ok(view)
    }

    /// 资料完整度状态（不缓存，逐字段明细）
    pub async fn get_profile_completion_status(
        &self,
        user_id: &str,
    ) -> Result<ProfileCompletionStatus> {
        let profile = self.activity.profile_completion(user_id).await?;
        Ok(ProfileCompletionStatus {
            completed: profile.completed(),
            total: profile.total(),
            is_complete: profile.is_complete(),
            fields: profile.fields,
        })
    }

    /// 重算进度视图
    ///
    /// 按（分类，条件类型）分组后在组内按阈值升序遍历：
    /// 已持有 -> earned；否则首个进度严格介于 0 与阈值之间的条目
    /// -> in_progress（每组至多一个）；其余 -> locked。
    /// "只展示第一个未获得的进行中成就"抑制了把所有更高层级
    /// 同时标记为进行中造成的界面噪音。
    async fn compute_progress(&self, user_id: &str) -> Result<ProgressView> {
        let all = self.catalog.all().await?;
        let earned_records = self.earned.list_by_user(user_id).await?;
        let snapshot = collect_full_snapshot(self.activity.as_ref(), user_id).await?;

        let earned_at: HashMap<i64, chrono::DateTime<chrono::Utc>> = earned_records
            .iter()
            .map(|e| (e.achievement_id, e.earned_at))
            .collect();

        let mut groups: HashMap<_, Vec<&Achievement>> = HashMap::new();
        for a in all.iter() {
            groups.entry(a.group_key()).or_default().push(a);
        }

        let mut view = ProgressView::default();
        for (_key, mut group) in groups {
            group.sort_by_key(|a| a.criteria_value);
            let mut group_has_in_progress = false;

            for a in group {
                if let Some(&when) = earned_at.get(&a.id) {
                    view.earned.push(EarnedEntry {
                        achievement: a.clone(),
                        earned_at: when,
                    });
                    continue;
                }

                let progress = evaluator::progress_value(a, &snapshot)?;
                let threshold = evaluator::display_threshold(a, &snapshot);

                if progress > 0 && progress < threshold && !group_has_in_progress {
                    group_has_in_progress = true;
                    view.in_progress.push(InProgressEntry {
                        achievement: a.clone(),
                        progress,
                        threshold,
                        percentage: (progress * 100 / threshold) as i32,
                    });
                } else {
                    view.locked.push(LockedEntry {
                        achievement: a.clone(),
                    });
                }
            }
        }

        view.earned.sort_by_key(|e| e.achievement.display_key());
        view.in_progress.sort_by_key(|e| e.achievement.display_key());
        view.locked.sort_by_key(|e| e.achievement.display_key());

        Ok(view)
    }
}
