//! 活动事件模型
//!
//! 活动生产方在自身状态变更持久化提交后发布类型化事件，
//! 引擎通过 `AchievementEngine::notify` 统一路由到对应的分类检查与撤销检查。
//! 集中式的事件枚举使事件生产方集合在一处可见，
//! 取代散落在各调用点的隐式触发。

use serde::{Deserialize, Serialize};

/// 活动事件
///
/// 每个变体对应一个活动生产子系统的入站触发契约。
/// 点评相关事件同时携带点评作者与地点所有者——删除点评既影响
/// 作者的点评类成就，也可能拉低所有者地点的平均评分从而触发
/// 质量类撤销检查（两个不同的用户）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityEvent {
    /// 地点打卡完成
    LocationVisited { user_id: String },
    /// 新地点提交
    LocationAdded { user_id: String },
    /// 点评创建
    ReviewCreated {
        user_id: String,
        location_owner_id: String,
    },
    /// 点评删除
    ReviewDeleted {
        user_id: String,
        location_owner_id: String,
    },
    /// 点评被投票或撤票（影响点评作者的获赞/比例类成就，双向）
    VoteCastOrRemoved { review_author_id: String },
    /// 关注关系变化（影响被关注者，双向）
    FollowChanged { followed_user_id: String },
    /// 评论创建或删除（双向）
    CommentCreatedOrDeleted { user_id: String },
    /// 照片上传或删除（双向）
    PhotoUploadedOrDeleted { user_id: String },
    /// 资料字段变更（双向）
    ProfileFieldChanged { user_id: String },
    /// 邮箱验证完成（资历类成就的生命周期触发点，只授予不撤销）
    EmailVerified { user_id: String },
}

impl ActivityEvent {
    /// 事件影响的用户列表
    ///
    /// 进度缓存失效以此为准：即使没有任何成就被授予/撤销，
    /// 活动计数的变化也会改变"进行中"的百分比
    pub fn affected_users(&self) -> Vec<&str> {
        match self {
            Self::LocationVisited { user_id }
            | Self::LocationAdded { user_id }
            | Self::CommentCreatedOrDeleted { user_id }
            | Self::PhotoUploadedOrDeleted { user_id }
            | Self::ProfileFieldChanged { user_id }
            | Self::EmailVerified { user_id } => vec![user_id],
            Self::ReviewCreated {
                user_id,
                location_owner_id,
            }
            | Self::ReviewDeleted {
                user_id,
                location_owner_id,
            } => {
                if user_id == location_owner_id {
                    vec![user_id]
                } else {
                    vec![user_id, location_owner_id]
                }
            }
            Self::VoteCastOrRemoved { review_author_id } => vec![review_author_id],
            Self::FollowChanged { followed_user_id } => vec![followed_user_id],
        }
    }
}
