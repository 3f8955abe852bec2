//! 用户获得记录仓储
//!
//! 幂等创建基于 (user_id, achievement_id) 唯一约束 + ON CONFLICT DO NOTHING，
//! 并发竞争由数据库裁决，失败方静默得到 created=false

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::EarnedRepositoryTrait;
use crate::error::Result;
use crate::models::EarnedAchievement;

/// 用户获得记录仓储（PostgreSQL）
pub struct PgEarnedRepository {
    pool: PgPool,
}

impl PgEarnedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EarnedRepositoryTrait for PgEarnedRepository {
    async fn create_if_absent(
        &self,
        user_id: &str,
        achievement_id: i64,
        earned_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO earned_achievements (user_id, achievement_id, earned_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .bind(earned_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, user_id: &str, achievement_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM earned_achievements
            WHERE user_id = $1 AND achievement_id = $2
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, user_id: &str, achievement_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM earned_achievements
                WHERE user_id = $1 AND achievement_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<EarnedAchievement>> {
        let earned = sqlx::query_as::<_, EarnedAchievement>(
            r#"
            SELECT id, user_id, achievement_id, earned_at
            FROM earned_achievements
            WHERE user_id = $1
            ORDER BY earned_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(earned)
    }
}
