//! 活动快照模型
//!
//! 每次检查时即时计算的用户活动计数集合，从不持久化也从不缓存，
//! 以保证授予/撤销判定基于最新数据（只有聚合后的进度视图才进缓存）。

/// 活动快照
///
/// 分类检查只填充与该分类相关的字段，其余保持零值；
/// 进度聚合则填充全部字段。快照读取与触发它的写操作不在同一事务内，
/// 毫秒级的陈旧读取是可接受的容差，由下一次触发事件自我修正。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivitySnapshot {
    /// 打卡（去重地点）数
    pub visit_count: i64,
    /// 新增地点数
    pub locations_added: i64,
    /// 所提交地点中平均评分 >= 4.0 的数量
    pub quality_locations: i64,
    /// 撰写点评数
    pub reviews_written: i64,
    /// 点评获赞总数
    pub upvotes_received: i64,
    /// 点评获得的总投票数（赞 + 踩）
    pub total_votes: i64,
    /// 粉丝数
    pub follower_count: i64,
    /// 有效评论数
    pub qualifying_comments: i64,
    /// 照片总数
    pub total_photos: i64,
    /// 已完成的资料必填项数
    pub profile_fields_completed: i64,
    /// 当前必填项总数（动态来源，而非目录里的固定阈值）
    pub profile_fields_required: i64,
}

impl ActivitySnapshot {
    /// 赞成率百分比（向下取整）
    ///
    /// 总投票为 0 时按 0 处理——没有投票不等于 100% 有用
    pub fn helpful_percentage(&self) -> i64 {
        if self.total_votes <= 0 {
            return 0;
        }
        self.upvotes_received * 100 / self.total_votes
    }
}
