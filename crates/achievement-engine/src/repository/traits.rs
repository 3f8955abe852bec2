//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Achievement, AchievementCategory, CriteriaType, EarnedAchievement};

/// 成就目录仓储接口
///
/// 目录在运行期只读；所有列表查询按 criteria_value 升序返回，
/// 以满足阶梯短路迭代的前提。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    /// 按（分类，条件类型）查询，criteria_value 升序
    async fn list_by_category_and_type(
        &self,
        category: AchievementCategory,
        criteria_type: CriteriaType,
    ) -> Result<Vec<Achievement>>;

    /// 按 slug 查询单个成就
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Achievement>>;

    /// 点评分类全量查询，tier 升序
    ///
    /// 点评分类混合多种条件类型，必须整体取回逐个评估而非按类型取阶梯
    async fn list_review_category(&self) -> Result<Vec<Achievement>>;

    /// 目录全量查询（进度聚合与目录校验使用）
    async fn list_all(&self) -> Result<Vec<Achievement>>;
}

/// 用户获得记录仓储接口
///
/// 唯一有权创建/删除获得记录的组件是授予/撤销引擎
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EarnedRepositoryTrait: Send + Sync {
    /// 幂等创建：记录已存在时返回 false，不报错
    ///
    /// 并发触发下由 (user_id, achievement_id) 唯一约束兜底，
    /// 竞争失败方将"已存在"视为成功（created=false）
    async fn create_if_absent(
        &self,
        user_id: &str,
        achievement_id: i64,
        earned_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 删除记录：返回是否实际删除了一条（删除不存在的记录是无操作）
    async fn delete(&self, user_id: &str, achievement_id: i64) -> Result<bool>;

    /// 用户是否持有某成就
    async fn exists(&self, user_id: &str, achievement_id: i64) -> Result<bool>;

    /// 用户全部获得记录
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<EarnedAchievement>>;
}
