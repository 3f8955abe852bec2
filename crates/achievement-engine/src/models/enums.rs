//! 成就引擎枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化。
//! 条件类型是封闭枚举而非字符串分发，新增类型时编译器会强制检查所有 match。

use serde::{Deserialize, Serialize};

/// 成就分类
///
/// 排序语义用于进度视图的展示顺序，同时决定撤销语义：
/// 除 Tenure（资历）外的分类都是双向的——达标时授予、失去资格时撤销。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementCategory {
    /// 探索 - 打卡地点数量
    Exploration,
    /// 贡献 - 新增地点数量
    Contribution,
    /// 质量 - 所提交地点中获得高评分的数量
    Quality,
    /// 点评 - 撰写点评、获赞、有用比例
    Review,
    /// 社区 - 粉丝数、评论数
    Community,
    /// 特殊 - 资料完整度、照片数等特殊条件
    Special,
    /// 资历 - 注册时间/名次类成就，一经授予永不撤销
    Tenure,
}

impl AchievementCategory {
    /// 该分类的成就是否可撤销
    ///
    /// 资历类成就记录的是历史事实（如"前 500 名注册用户"），
    /// 后续任何活动计数的变化都不会使其失效。
    pub fn is_revocable(&self) -> bool {
        !matches!(self, Self::Tenure)
    }
}

/// 成就条件类型
///
/// 封闭的条件枚举：简单计数、比例、资料完整度、特殊条件。
/// 注意 HelpfulRatio 的 criteria_value 复用为最低点评数量门槛，
/// criteria_secondary 才是百分比阈值（目录中需显式注明，见目录校验）。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriteriaType {
    /// 打卡地点数 >= criteria_value
    VisitCount,
    /// 新增地点数 >= criteria_value
    LocationsAdded,
    /// 高评分（平均分 >= 4.0）地点数 >= criteria_value
    LocationRatingCount,
    /// 点评数 >= criteria_value
    ReviewsWritten,
    /// 获赞数 >= criteria_value
    UpvotesReceived,
    /// 点评数 >= criteria_value 且 赞成率百分比 >= criteria_secondary
    HelpfulRatio,
    /// 粉丝数 >= criteria_value
    FollowerCount,
    /// 有效评论数 >= criteria_value
    CommentsWritten,
    /// 资料必填项全部完成（展示阈值取自当前必填项总数而非 criteria_value）
    ProfileComplete,
    /// 按 slug 分发的特殊条件（照片数、注册名次等）
    SpecialCondition,
}

impl CriteriaType {
    /// 是否为简单计数条件（count >= criteria_value 即达标）
    pub fn is_simple_count(&self) -> bool {
        matches!(
            self,
            Self::VisitCount
                | Self::LocationsAdded
                | Self::LocationRatingCount
                | Self::ReviewsWritten
                | Self::UpvotesReceived
                | Self::FollowerCount
                | Self::CommentsWritten
        )
    }
}
