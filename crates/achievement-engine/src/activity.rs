//! 活动数据访问接口
//!
//! 用户活动计数由其他子系统（打卡、地点、点评、社交、相册、资料）持有，
//! 引擎只通过本模块的只读接口在检查时即时读取。
//! 快照读取不与触发写操作共享事务，接受毫秒级陈旧容差。

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::models::{ActivitySnapshot, ProfileFieldStatus};

/// 资料完整度明细
///
/// total 来自当前生效的必填项列表而非固定常量，
/// 新增必填项后无需迁移目录数据即可正确计算。
#[derive(Debug, Clone, Default)]
pub struct ProfileCompletion {
    pub fields: Vec<ProfileFieldStatus>,
}

impl ProfileCompletion {
    pub fn completed(&self) -> i64 {
        self.fields.iter().filter(|f| f.complete).count() as i64
    }

    pub fn total(&self) -> i64 {
        self.fields.len() as i64
    }

    pub fn is_complete(&self) -> bool {
        !self.fields.is_empty() && self.completed() == self.total()
    }
}

/// 活动数据只读访问接口
///
/// 各方法对应一个被追踪的活动维度。实现方（其他子系统的查询层）
/// 必须保证读取有界超时；引擎侧把访问失败当作"本次无可检查"
/// 而非致命错误（见事件路由层的错误收集）。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// 去重地点打卡数
    async fn visit_count(&self, user_id: &str) -> Result<i64>;

    /// 用户新增的地点数
    async fn locations_added_count(&self, user_id: &str) -> Result<i64>;

    /// 用户新增地点中平均评分 >= 4.0 的数量
    async fn quality_location_count(&self, user_id: &str) -> Result<i64>;

    /// 撰写点评数
    async fn reviews_written_count(&self, user_id: &str) -> Result<i64>;

    /// 点评投票合计：(获赞数, 总投票数)
    async fn vote_totals(&self, user_id: &str) -> Result<(i64, i64)>;

    /// 粉丝数
    async fn follower_count(&self, user_id: &str) -> Result<i64>;

    /// 有效评论数
    async fn qualifying_comment_count(&self, user_id: &str) -> Result<i64>;

    /// 照片总数
    async fn photo_count(&self, user_id: &str) -> Result<i64>;

    /// 资料完整度逐字段明细
    async fn profile_completion(&self, user_id: &str) -> Result<ProfileCompletion>;

    /// 注册名次（按注册顺序的序号，未验证邮箱的用户返回 None）
    async fn registration_rank(&self, user_id: &str) -> Result<Option<i64>>;
}

/// 采集完整活动快照（进度聚合使用）
///
/// 分类检查不经过此函数——它们只填充与该分类相关的字段，见引擎内部。
pub async fn collect_full_snapshot<A: ActivitySource + ?Sized>(
    source: &A,
    user_id: &str,
) -> Result<ActivitySnapshot> {
    let (upvotes_received, total_votes) = source.vote_totals(user_id).await?;
    let profile = source.profile_completion(user_id).await?;

    Ok(ActivitySnapshot {
        visit_count: source.visit_count(user_id).await?,
        locations_added: source.locations_added_count(user_id).await?,
        quality_locations: source.quality_location_count(user_id).await?,
        reviews_written: source.reviews_written_count(user_id).await?,
        upvotes_received,
        total_votes,
        follower_count: source.follower_count(user_id).await?,
        qualifying_comments: source.qualifying_comment_count(user_id).await?,
        total_photos: source.photo_count(user_id).await?,
        profile_fields_completed: profile.completed(),
        profile_fields_required: profile.total(),
    })
}

/// 内存活动数据源
///
/// 基于 DashMap 的可变假实现，供引擎集成测试与下游测试夹具使用；
/// 生产实现由持有各活动数据的子系统提供。
#[derive(Debug, Default)]
pub struct InMemoryActivitySource {
    counters: DashMap<(String, &'static str), i64>,
    profiles: DashMap<String, Vec<ProfileFieldStatus>>,
    ranks: DashMap<String, i64>,
}

impl InMemoryActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_counter(&self, user_id: &str, dimension: &'static str) -> i64 {
        self.counters
            .get(&(user_id.to_string(), dimension))
            .map(|v| *v)
            .unwrap_or(0)
    }

    fn set_counter(&self, user_id: &str, dimension: &'static str, value: i64) {
        self.counters.insert((user_id.to_string(), dimension), value);
    }

    pub fn set_visits(&self, user_id: &str, count: i64) {
        self.set_counter(user_id, "visits", count);
    }

    pub fn set_locations_added(&self, user_id: &str, count: i64) {
        self.set_counter(user_id, "locations_added", count);
    }

    pub fn set_quality_locations(&self, user_id: &str, count: i64) {
        self.set_counter(user_id, "quality_locations", count);
    }

    pub fn set_reviews_written(&self, user_id: &str, count: i64) {
        self.set_counter(user_id, "reviews_written", count);
    }

    pub fn set_vote_totals(&self, user_id: &str, upvotes: i64, total: i64) {
        self.set_counter(user_id, "upvotes", upvotes);
        self.set_counter(user_id, "total_votes", total);
    }

    pub fn set_followers(&self, user_id: &str, count: i64) {
        self.set_counter(user_id, "followers", count);
    }

    pub fn set_comments(&self, user_id: &str, count: i64) {
        self.set_counter(user_id, "comments", count);
    }

    pub fn set_photos(&self, user_id: &str, count: i64) {
        self.set_counter(user_id, "photos", count);
    }

    pub fn set_profile(&self, user_id: &str, fields: Vec<(&str, bool)>) {
        let fields = fields
            .into_iter()
            .map(|(field, complete)| ProfileFieldStatus {
                field: field.to_string(),
                complete,
            })
            .collect();
        self.profiles.insert(user_id.to_string(), fields);
    }

    pub fn set_registration_rank(&self, user_id: &str, rank: i64) {
        self.ranks.insert(user_id.to_string(), rank);
    }
}

#[async_trait]
impl ActivitySource for InMemoryActivitySource {
    async fn visit_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.get_counter(user_id, "visits"))
    }

    async fn locations_added_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.get_counter(user_id, "locations_added"))
    }

    async fn quality_location_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.get_counter(user_id, "quality_locations"))
    }

    async fn reviews_written_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.get_counter(user_id, "reviews_written"))
    }

    async fn vote_totals(&self, user_id: &str) -> Result<(i64, i64)> {
        Ok((
            self.get_counter(user_id, "upvotes"),
            self.get_counter(user_id, "total_votes"),
        ))
    }

    async fn follower_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.get_counter(user_id, "followers"))
    }

    async fn qualifying_comment_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.get_counter(user_id, "comments"))
    }

    async fn photo_count(&self, user_id: &str) -> Result<i64> {
        Ok(self.get_counter(user_id, "photos"))
    }

    async fn profile_completion(&self, user_id: &str) -> Result<ProfileCompletion> {
        let fields = self
            .profiles
            .get(user_id)
            .map(|f| f.clone())
            .unwrap_or_default();
        Ok(ProfileCompletion { fields })
    }

    async fn registration_rank(&self, user_id: &str) -> Result<Option<i64>> {
        Ok(self.ranks.get(user_id).map(|r| *r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_source_defaults_to_zero() {
        let source = InMemoryActivitySource::new();
        assert_eq!(source.visit_count("nobody").await.unwrap(), 0);
        assert_eq!(source.vote_totals("nobody").await.unwrap(), (0, 0));
        assert_eq!(source.registration_rank("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_collect_full_snapshot() {
        let source = InMemoryActivitySource::new();
        source.set_visits("u1", 12);
        source.set_reviews_written("u1", 4);
        source.set_vote_totals("u1", 8, 10);
        source.set_profile("u1", vec![("avatar", true), ("bio", false)]);

        let snapshot = collect_full_snapshot(&source, "u1").await.unwrap();
        assert_eq!(snapshot.visit_count, 12);
        assert_eq!(snapshot.reviews_written, 4);
        assert_eq!(snapshot.upvotes_received, 8);
        assert_eq!(snapshot.total_votes, 10);
        assert_eq!(snapshot.profile_fields_completed, 1);
        assert_eq!(snapshot.profile_fields_required, 2);
    }

    #[test]
    fn test_profile_completion_helpers() {
        let profile = ProfileCompletion {
            fields: vec![
                ProfileFieldStatus {
                    field: "avatar".to_string(),
                    complete: true,
                },
                ProfileFieldStatus {
                    field: "bio".to_string(),
                    complete: true,
                },
            ],
        };
        assert_eq!(profile.completed(), 2);
        assert!(profile.is_complete());

        let empty = ProfileCompletion::default();
        assert!(!empty.is_complete());
    }
}
