//! 成就目录存储
//!
//! 包装目录仓储，提供进程内懒加载、永不过期的目录缓存。
//! 目录属于管理侧数据，只在部署外更新，运行期视为不可变，
//! 因此缓存无需任何失效机制；键级填充是幂等的（重复计算覆盖同一值无害）。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

use crate::error::{AchievementError, Result};
use crate::evaluator;
use crate::models::{Achievement, AchievementCategory, CriteriaType};
use crate::repository::CatalogRepositoryTrait;

/// 成就目录存储
///
/// 两个独立缓存：按（分类，条件类型）的阶梯缓存与按 slug 的单条缓存。
/// `load` 在构造时执行全量校验，目录数据错误快速失败。
#[derive(Debug)]
pub struct CatalogStore<R>
where
    R: CatalogRepositoryTrait,
{
    repo: Arc<R>,
    by_group: DashMap<(AchievementCategory, CriteriaType), Arc<Vec<Achievement>>>,
    by_slug: DashMap<String, Arc<Achievement>>,
    review_all: OnceCell<Arc<Vec<Achievement>>>,
    full: OnceCell<Arc<Vec<Achievement>>>,
}

impl<R> CatalogStore<R>
where
    R: CatalogRepositoryTrait,
{
    /// 加载目录存储并执行全量校验
    ///
    /// 校验内容：
    /// - 同（分类，条件类型）分组内 criteria_value 严格递增
    /// - 比例类条件必须携带 1..=100 的次级阈值
    /// - 特殊条件 slug 必须是引擎已知的
    /// - slug 全局唯一
    #[instrument(skip(repo))]
    pub async fn load(repo: Arc<R>) -> Result<Self> {
        let all = repo.list_all().await?;
        Self::validate(&all)?;
        info!(count = all.len(), "Achievement catalog loaded and validated");

        Ok(Self {
            repo,
            by_group: DashMap::new(),
            by_slug: DashMap::new(),
            review_all: OnceCell::new(),
            full: OnceCell::new(),
        })
    }

    /// 按（分类，条件类型）获取升序阶梯，首次访问后进程内常驻
    pub async fn by_category_and_type(
        &self,
        category: AchievementCategory,
        criteria_type: CriteriaType,
    ) -> Result<Arc<Vec<Achievement>>> {
        let key = (category, criteria_type);
        if let Some(cached) = self.by_group.get(&key) {
            return Ok(cached.clone());
        }

        let ladder = Arc::new(
            self.repo
                .list_by_category_and_type(category, criteria_type)
                .await?,
        );
        // 并发填充同一键时后写覆盖前写，值相同，无需加锁
        self.by_group.insert(key, ladder.clone());
        Ok(ladder)
    }

    /// 按 slug 获取成就，缓存命中后不再回源
    ///
    /// 缺失的 slug 不缓存——目录运行期不可变，缺失同样稳定，
    /// 但负缓存会掩盖部署早期种子数据未就绪的问题
    pub async fn by_slug(&self, slug: &str) -> Result<Option<Arc<Achievement>>> {
        if let Some(cached) = self.by_slug.get(slug) {
            return Ok(Some(cached.clone()));
        }

        match self.repo.get_by_slug(slug).await? {
            Some(achievement) => {
                let achievement = Arc::new(achievement);
                self.by_slug
                    .insert(slug.to_string(), achievement.clone());
                Ok(Some(achievement))
            }
            None => Ok(None),
        }
    }

    /// 点评分类全量（tier 升序）
    ///
    /// 点评分类混合多种条件类型，必须整体取回逐个评估
    pub async fn review_category_all(&self) -> Result<Arc<Vec<Achievement>>> {
        let cached = self
            .review_all
            .get_or_try_init(|| async {
                self.repo.list_review_category().await.map(Arc::new)
            })
            .await?;
        Ok(cached.clone())
    }

    /// 目录全量（进度聚合使用）
    pub async fn all(&self) -> Result<Arc<Vec<Achievement>>> {
        let cached = self
            .full
            .get_or_try_init(|| async { self.repo.list_all().await.map(Arc::new) })
            .await?;
        Ok(cached.clone())
    }

    /// 目录全量校验
    fn validate(all: &[Achievement]) -> Result<()> {
        let mut seen_slugs = std::collections::HashSet::new();
        for a in all {
            if !seen_slugs.insert(a.slug.as_str()) {
                return Err(AchievementError::CatalogInvalid {
                    slug: a.slug.clone(),
                    reason: "slug 重复".to_string(),
                });
            }

            match a.criteria_type {
                CriteriaType::HelpfulRatio => match a.criteria_secondary {
                    Some(pct) if (1..=100).contains(&pct) => {}
                    _ => {
                        return Err(AchievementError::CatalogInvalid {
                            slug: a.slug.clone(),
                            reason: "比例类条件缺少合法的次级阈值（1-100）".to_string(),
                        });
                    }
                },
                CriteriaType::SpecialCondition => {
                    if !evaluator::is_known_special_slug(&a.slug) {
                        return Err(AchievementError::UnknownSpecialSlug(a.slug.clone()));
                    }
                }
                _ => {}
            }
        }

        // 同组内阈值严格递增（引擎依赖升序迭代短路）
        let mut groups: std::collections::HashMap<
            (AchievementCategory, CriteriaType),
            Vec<&Achievement>,
        > = std::collections::HashMap::new();
        for a in all {
            groups.entry(a.group_key()).or_default().push(a);
        }

        for (_key, mut group) in groups {
            group.sort_by_key(|a| a.criteria_value);
            for pair in group.windows(2) {
                if pair[0].criteria_value >= pair[1].criteria_value {
                    return Err(AchievementError::CatalogInvalid {
                        slug: pair[1].slug.clone(),
                        reason: format!(
                            "阶梯阈值未严格递增: {} 与 {} 均为 {}",
                            pair[0].slug, pair[1].slug, pair[1].criteria_value
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryCatalogRepository;
    use chrono::Utc;

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

    #[tokio::test]
    async fn test_load_validates_ladder() {
        let repo = Arc::new(InMemoryCatalogRepository::with_achievements(vec![
            achievement(
                1,
                "explorer-5",
                AchievementCategory::Exploration,
                CriteriaType::VisitCount,
                5,
                None,
            ),
            achievement(
                2,
                "explorer-5-dup",
                AchievementCategory::Exploration,
                CriteriaType::VisitCount,
                5,
                None,
            ),
        ]));

        let err = CatalogStore::load(repo).await.unwrap_err();
        assert!(err.is_data_error());
        assert_eq!(err.error_code(), "CATALOG_INVALID");
    }

    #[tokio::test]
    async fn test_load_rejects_ratio_without_secondary() {
        let repo = Arc::new(InMemoryCatalogRepository::with_achievements(vec![
            achievement(
                1,
                "helpful-reviewer",
                AchievementCategory::Review,
                CriteriaType::HelpfulRatio,
                10,
                None,
            ),
        ]));

        let err = CatalogStore::load(repo).await.unwrap_err();
        assert_eq!(err.error_code(), "CATALOG_INVALID");
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_special_slug() {
        let repo = Arc::new(InMemoryCatalogRepository::with_achievements(vec![
            achievement(
                1,
                "mystery",
                AchievementCategory::Special,
                CriteriaType::SpecialCondition,
                1,
                None,
            ),
        ]));

        let err = CatalogStore::load(repo).await.unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_SPECIAL_SLUG");
    }

    #[tokio::test]
    async fn test_by_slug_caches_hit() {
        let repo = Arc::new(InMemoryCatalogRepository::with_achievements(vec![
            achievement(
                1,
                "explorer-1",
                AchievementCategory::Exploration,
                CriteriaType::VisitCount,
                1,
                None,
            ),
        ]));
        let store = CatalogStore::load(repo.clone()).await.unwrap();

        let first = store.by_slug("explorer-1").await.unwrap().unwrap();
        // 命中缓存后即使仓储变更也返回旧值（目录运行期不可变的约定）
        repo.insert(achievement(
            1,
            "explorer-1",
            AchievementCategory::Exploration,
            CriteriaType::VisitCount,
            99,
            None,
        ));
        let second = store.by_slug("explorer-1").await.unwrap().unwrap();
        assert_eq!(first.criteria_value, second.criteria_value);
    }

    #[tokio::test]
    async fn test_missing_slug_not_cached() {
        let repo = Arc::new(InMemoryCatalogRepository::new());
        let store = CatalogStore::load(repo.clone()).await.unwrap();

        assert!(store.by_slug("late-seed").await.unwrap().is_none());

        // 种子数据迟到后可见
        repo.insert(achievement(
            1,
            "late-seed",
            AchievementCategory::Exploration,
            CriteriaType::VisitCount,
            1,
            None,
        ));
        assert!(store.by_slug("late-seed").await.unwrap().is_some());
    }
}
