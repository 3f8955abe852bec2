//! 用户获得成就记录模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户获得成就记录
///
/// (user_id, achievement_id) 上有唯一约束，幂等创建保证每个用户
/// 对每个成就至多一条记录。earned_at 在创建时写入，之后不再变更。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EarnedAchievement {
    pub id: i64,
    pub user_id: String,
    pub achievement_id: i64,
    pub earned_at: DateTime<Utc>,
}
