//! 进度视图模型
//!
//! 由获得记录 + 即时活动快照派生的展示模型，按用户缓存（TTL 5 分钟），
//! 永远不是事实来源。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::achievement::Achievement;

/// 已获得条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedEntry {
    pub achievement: Achievement,
    pub earned_at: DateTime<Utc>,
}

/// 进行中条目
///
/// 每个（分类，条件类型）分组内至多一条——只展示第一个未获得
/// 且有实际进度的成就，避免把所有更高层级同时标记为"进行中"。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProgressEntry {
    pub achievement: Achievement,
    pub progress: i64,
    pub threshold: i64,
    /// floor(progress / threshold * 100)
    pub percentage: i32,
}

/// 未解锁条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedEntry {
    pub achievement: Achievement,
}

/// 用户进度视图
///
/// 三个桶互斥：任一成就恰好出现在其中一个桶中。
/// 各桶内部按目录展示顺序（分类、层级、展示序号、条件类型、阈值）排列。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressView {
    pub earned: Vec<EarnedEntry>,
    pub in_progress: Vec<InProgressEntry>,
    pub locked: Vec<LockedEntry>,
}

impl ProgressView {
    /// 视图内全部成就数量（用于互斥性校验与统计）
    pub fn total_entries(&self) -> usize {
        self.earned.len() + self.in_progress.len() + self.locked.len()
    }
}

/// 单个资料字段的完成状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFieldStatus {
    pub field: String,
    pub complete: bool,
}

/// 资料完整度状态
///
/// 展示层直接消费的逐字段明细；total 来自当前生效的必填项列表，
/// 新增必填项无需数据迁移即可正确反映。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCompletionStatus {
    pub completed: i64,
    pub total: i64,
    pub is_complete: bool,
    pub fields: Vec<ProfileFieldStatus>,
}
