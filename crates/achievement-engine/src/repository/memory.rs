//! 内存仓储实现
//!
//! 基于 DashMap 的高并发内存实现，供引擎集成测试和下游测试夹具使用。
//! 语义与 PostgreSQL 实现保持一致：幂等创建、无操作删除。

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::traits::{CatalogRepositoryTrait, EarnedRepositoryTrait};
use crate::error::Result;
use crate::models::{Achievement, AchievementCategory, CriteriaType, EarnedAchievement};

/// 内存成就目录仓储
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    achievements: DashMap<i64, Achievement>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 构造带初始目录的仓储
    pub fn with_achievements(achievements: Vec<Achievement>) -> Self {
        let repo = Self::new();
        for a in achievements {
            repo.insert(a);
        }
        repo
    }

    pub fn insert(&self, achievement: Achievement) {
        self.achievements.insert(achievement.id, achievement);
    }

    fn sorted(&self, mut items: Vec<Achievement>) -> Vec<Achievement> {
        items.sort_by_key(|a| (a.category, a.criteria_type, a.criteria_value));
        items
    }
}

#[async_trait]
impl CatalogRepositoryTrait for InMemoryCatalogRepository {
    async fn list_by_category_and_type(
        &self,
        category: AchievementCategory,
        criteria_type: CriteriaType,
    ) -> Result<Vec<Achievement>> {
        let mut items: Vec<Achievement> = self
            .achievements
            .iter()
            .filter(|e| e.category == category && e.criteria_type == criteria_type)
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|a| a.criteria_value);
        Ok(items)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Achievement>> {
        Ok(self
            .achievements
            .iter()
            .find(|e| e.slug == slug)
            .map(|e| e.value().clone()))
    }

    async fn list_review_category(&self) -> Result<Vec<Achievement>> {
        let mut items: Vec<Achievement> = self
            .achievements
            .iter()
            .filter(|e| e.category == AchievementCategory::Review)
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|a| (a.tier, a.criteria_value));
        Ok(items)
    }

    async fn list_all(&self) -> Result<Vec<Achievement>> {
        let items = self
            .achievements
            .iter()
            .map(|e| e.value().clone())
            .collect();
        Ok(self.sorted(items))
    }
}

/// 内存用户获得记录仓储
///
/// DashMap entry API 保证 create_if_absent 的原子性，
/// 与数据库唯一约束的并发语义一致
#[derive(Debug, Default)]
pub struct InMemoryEarnedRepository {
    records: DashMap<(String, i64), EarnedAchievement>,
    next_id: AtomicI64,
}

impl InMemoryEarnedRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl EarnedRepositoryTrait for InMemoryEarnedRepository {
    async fn create_if_absent(
        &self,
        user_id: &str,
        achievement_id: i64,
        earned_at: DateTime<Utc>,
    ) -> Result<bool> {
        let key = (user_id.to_string(), achievement_id);
        let mut created = false;

        self.records.entry(key).or_insert_with(|| {
            created = true;
            EarnedAchievement {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                user_id: user_id.to_string(),
                achievement_id,
                earned_at,
            }
        });

        Ok(created)
    }

    async fn delete(&self, user_id: &str, achievement_id: i64) -> Result<bool> {
        Ok(self
            .records
            .remove(&(user_id.to_string(), achievement_id))
            .is_some())
    }

    async fn exists(&self, user_id: &str, achievement_id: i64) -> Result<bool> {
        Ok(self
            .records
            .contains_key(&(user_id.to_string(), achievement_id)))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<EarnedAchievement>> {
        let mut earned: Vec<EarnedAchievement> = self
            .records
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| e.value().clone())
            .collect();
        earned.sort_by_key(|e| e.earned_at);
        Ok(earned)
    }
}
