//! 成就目录条目模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{AchievementCategory, CriteriaType};

/// 成就定义（目录条目）
///
/// 部署期内不可变：只通过管理侧数据加载（种子脚本/迁移）修改，
/// 运行时引擎只读。同一（分类，条件类型）分组内的 criteria_value
/// 必须严格递增，引擎依赖升序迭代在首个未达标处短路。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Achievement {
    pub id: i64,
    /// 稳定的跨系统引用键，目录内唯一
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    /// 分类内的层级排序（铜/银/金式递进）
    pub tier: i32,
    pub display_order: i32,
    pub criteria_type: CriteriaType,
    /// 主数值阈值；HelpfulRatio 下复用为最低点评数量
    pub criteria_value: i64,
    /// 次级阈值，仅比例类条件使用（百分比 0-100）
    pub criteria_secondary: Option<i64>,
    pub is_rare: bool,
    pub icon_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Achievement {
    /// 分组键：同组内构成递增阈值阶梯
    pub fn group_key(&self) -> (AchievementCategory, CriteriaType) {
        (self.category, self.criteria_type)
    }

    /// 展示排序键：进度视图内各桶的输出顺序
    pub fn display_key(&self) -> (AchievementCategory, i32, i32, CriteriaType, i64) {
        (
            self.category,
            self.tier,
            self.display_order,
            self.criteria_type,
            self.criteria_value,
        )
    }
}
