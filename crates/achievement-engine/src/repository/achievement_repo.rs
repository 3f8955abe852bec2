//! 成就目录仓储
//!
//! 目录由管理侧数据加载（种子脚本/迁移）写入，引擎只读

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::CatalogRepositoryTrait;
use crate::error::Result;
use crate::models::{Achievement, AchievementCategory, CriteriaType};

const ACHIEVEMENT_COLUMNS: &str = r#"
    id, slug, name, description, category, tier, display_order,
    criteria_type, criteria_value, criteria_secondary, is_rare, icon_path,
    created_at, updated_at
"#;

/// 成就目录仓储（PostgreSQL）
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepositoryTrait for PgCatalogRepository {
    async fn list_by_category_and_type(
        &self,
        category: AchievementCategory,
        criteria_type: CriteriaType,
    ) -> Result<Vec<Achievement>> {
        let achievements = sqlx::query_as::<_, Achievement>(&format!(
            r#"
            SELECT {ACHIEVEMENT_COLUMNS}
            FROM achievements
            WHERE category = $1 AND criteria_type = $2
            ORDER BY criteria_value ASC
            "#
        ))
        .bind(category)
        .bind(criteria_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Achievement>> {
        let achievement = sqlx::query_as::<_, Achievement>(&format!(
            r#"
            SELECT {ACHIEVEMENT_COLUMNS}
            FROM achievements
            WHERE slug = $1
            "#
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(achievement)
    }

    async fn list_review_category(&self) -> Result<Vec<Achievement>> {
        let achievements = sqlx::query_as::<_, Achievement>(&format!(
            r#"
            SELECT {ACHIEVEMENT_COLUMNS}
            FROM achievements
            WHERE category = $1
            ORDER BY tier ASC, criteria_value ASC
            "#
        ))
        .bind(AchievementCategory::Review)
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }

    async fn list_all(&self) -> Result<Vec<Achievement>> {
        let achievements = sqlx::query_as::<_, Achievement>(&format!(
            r#"
            SELECT {ACHIEVEMENT_COLUMNS}
            FROM achievements
            ORDER BY category ASC, criteria_type ASC, criteria_value ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(achievements)
    }
}
