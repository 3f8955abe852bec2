//! 条件评估器
//!
//! 纯函数式地将（成就，活动快照）映射为达标判定与进度值，
//! 无任何副作用。所有条件类型在单个穷举 match 中分发，
//! 新增条件类型是编译期强制检查的变更。

use crate::error::{AchievementError, Result};
use crate::models::{Achievement, ActivitySnapshot, CriteriaType};

/// 特殊条件 slug：照片归档者（照片总数达到阈值）
pub const SLUG_PHOTO_ARCHIVIST: &str = "photo-archivist";

/// 特殊条件 slug：创始会员（注册名次在前 N 名内）
///
/// 仅在邮箱验证生命周期事件时由资历检查评估一次，永不重评估、永不撤销；
/// 评估器对它恒报不达标、零进度，使进度视图将未获得者归入未解锁桶。
pub const SLUG_FOUNDING_MEMBER: &str = "founding-member";

/// slug 是否为引擎已知的特殊条件
pub fn is_known_special_slug(slug: &str) -> bool {
    matches!(slug, SLUG_PHOTO_ARCHIVIST | SLUG_FOUNDING_MEMBER)
}

/// 判定用户是否满足成就条件
///
/// 未知特殊条件 slug 属于目录数据错误，首次评估即快速失败
pub fn qualifies(achievement: &Achievement, snapshot: &ActivitySnapshot) -> Result<bool> {
    let qualified = match achievement.criteria_type {
        CriteriaType::VisitCount => snapshot.visit_count >= achievement.criteria_value,
        CriteriaType::LocationsAdded => snapshot.locations_added >= achievement.criteria_value,
        CriteriaType::LocationRatingCount => {
            snapshot.quality_locations >= achievement.criteria_value
        }
        CriteriaType::ReviewsWritten => snapshot.reviews_written >= achievement.criteria_value,
        CriteriaType::UpvotesReceived => snapshot.upvotes_received >= achievement.criteria_value,
        CriteriaType::HelpfulRatio => {
            // criteria_value 在此复用为最低点评数量门槛，
            // criteria_secondary 是百分比阈值；零投票按比例 0 处理
            let min_percentage = achievement.criteria_secondary.unwrap_or(0);
            snapshot.reviews_written >= achievement.criteria_value
                && snapshot.total_votes > 0
                && snapshot.helpful_percentage() >= min_percentage
        }
        CriteriaType::FollowerCount => snapshot.follower_count >= achievement.criteria_value,
        CriteriaType::CommentsWritten => {
            snapshot.qualifying_comments >= achievement.criteria_value
        }
        CriteriaType::ProfileComplete => {
            snapshot.profile_fields_required > 0
                && snapshot.profile_fields_completed >= snapshot.profile_fields_required
        }
        CriteriaType::SpecialCondition => match achievement.slug.as_str() {
            SLUG_PHOTO_ARCHIVIST => snapshot.total_photos >= achievement.criteria_value,
            // 注册名次类条件只在生命周期事件时由资历检查评估，这里恒为不达标
            SLUG_FOUNDING_MEMBER => false,
            other => {
                return Err(AchievementError::UnknownSpecialSlug(other.to_string()));
            }
        },
    };

    Ok(qualified)
}

/// 计算展示用进度值
///
/// 比例类条件的进度展示主门槛维度（点评数）；
/// 注册名次类条件不参与进度展示，恒为 0
pub fn progress_value(achievement: &Achievement, snapshot: &ActivitySnapshot) -> Result<i64> {
    let progress = match achievement.criteria_type {
        CriteriaType::VisitCount => snapshot.visit_count,
        CriteriaType::LocationsAdded => snapshot.locations_added,
        CriteriaType::LocationRatingCount => snapshot.quality_locations,
        CriteriaType::ReviewsWritten => snapshot.reviews_written,
        CriteriaType::UpvotesReceived => snapshot.upvotes_received,
        CriteriaType::HelpfulRatio => snapshot.reviews_written,
        CriteriaType::FollowerCount => snapshot.follower_count,
        CriteriaType::CommentsWritten => snapshot.qualifying_comments,
        CriteriaType::ProfileComplete => snapshot.profile_fields_completed,
        CriteriaType::SpecialCondition => match achievement.slug.as_str() {
            SLUG_PHOTO_ARCHIVIST => snapshot.total_photos,
            SLUG_FOUNDING_MEMBER => 0,
            other => {
                return Err(AchievementError::UnknownSpecialSlug(other.to_string()));
            }
        },
    };

    Ok(progress)
}

/// 展示给用户的目标阈值
///
/// 资料完整度的阈值取自当前必填项总数（动态来源），
/// 其余条件取目录中的 criteria_value
pub fn display_threshold(achievement: &Achievement, snapshot: &ActivitySnapshot) -> i64 {
    match achievement.criteria_type {
        CriteriaType::ProfileComplete => snapshot.profile_fields_required,
        _ => achievement.criteria_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AchievementCategory;
    use chrono::Utc;

    fn achievement(criteria_type: CriteriaType, value: i64, secondary: Option<i64>) -> Achievement {
        Achievement {
            id: 1,
            slug: "test".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            category: AchievementCategory::Review,
            tier: 1,
            display_order: 0,
            criteria_type,
            criteria_value: value,
            criteria_secondary: secondary,
            is_rare: false,
            icon_path: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_simple_count_threshold() {
        let a = achievement(CriteriaType::VisitCount, 5, None);

        let below = ActivitySnapshot {
            visit_count: 4,
            ..Default::default()
        };
        let at = ActivitySnapshot {
            visit_count: 5,
            ..Default::default()
        };

        assert!(!qualifies(&a, &below).unwrap());
        assert!(qualifies(&a, &at).unwrap());
        assert_eq!(progress_value(&a, &at).unwrap(), 5);
        assert_eq!(display_threshold(&a, &at), 5);
    }

    #[test]
    fn test_helpful_ratio_requires_review_count() {
        let a = achievement(CriteriaType::HelpfulRatio, 10, Some(80));

        // 9 篇点评 100% 赞成率：数量门槛未到，不达标
        let few_reviews = ActivitySnapshot {
            reviews_written: 9,
            upvotes_received: 20,
            total_votes: 20,
            ..Default::default()
        };
        assert!(!qualifies(&a, &few_reviews).unwrap());

        // 10 篇点评，8/10 票恰好 80%：达标
        let at_boundary = ActivitySnapshot {
            reviews_written: 10,
            upvotes_received: 8,
            total_votes: 10,
            ..Default::default()
        };
        assert!(qualifies(&a, &at_boundary).unwrap());
    }

    #[test]
    fn test_helpful_ratio_zero_votes_fails() {
        let a = achievement(CriteriaType::HelpfulRatio, 10, Some(80));
        let no_votes = ActivitySnapshot {
            reviews_written: 15,
            upvotes_received: 0,
            total_votes: 0,
            ..Default::default()
        };
        assert!(!qualifies(&a, &no_votes).unwrap());
    }

    #[test]
    fn test_profile_complete_uses_dynamic_threshold() {
        let a = achievement(CriteriaType::ProfileComplete, 5, None);

        let partial = ActivitySnapshot {
            profile_fields_completed: 6,
            profile_fields_required: 7,
            ..Default::default()
        };
        assert!(!qualifies(&a, &partial).unwrap());
        // 阈值来自必填项总数而非目录中的 criteria_value=5
        assert_eq!(display_threshold(&a, &partial), 7);

        let complete = ActivitySnapshot {
            profile_fields_completed: 7,
            profile_fields_required: 7,
            ..Default::default()
        };
        assert!(qualifies(&a, &complete).unwrap());
    }

    #[test]
    fn test_profile_complete_empty_requirements_fails() {
        let a = achievement(CriteriaType::ProfileComplete, 5, None);
        let empty = ActivitySnapshot::default();
        assert!(!qualifies(&a, &empty).unwrap());
    }

    #[test]
    fn test_photo_archivist_special_condition() {
        let mut a = achievement(CriteriaType::SpecialCondition, 25, None);
        a.slug = SLUG_PHOTO_ARCHIVIST.to_string();

        let few = ActivitySnapshot {
            total_photos: 24,
            ..Default::default()
        };
        let enough = ActivitySnapshot {
            total_photos: 25,
            ..Default::default()
        };

        assert!(!qualifies(&a, &few).unwrap());
        assert!(qualifies(&a, &enough).unwrap());
        assert_eq!(progress_value(&a, &few).unwrap(), 24);
    }

    #[test]
    fn test_founding_member_never_qualifies_via_evaluator() {
        let mut a = achievement(CriteriaType::SpecialCondition, 500, None);
        a.slug = SLUG_FOUNDING_MEMBER.to_string();

        let snapshot = ActivitySnapshot {
            visit_count: 1000,
            total_photos: 1000,
            ..Default::default()
        };
        assert!(!qualifies(&a, &snapshot).unwrap());
        assert_eq!(progress_value(&a, &snapshot).unwrap(), 0);
    }

    #[test]
    fn test_unknown_special_slug_fails_fast() {
        let mut a = achievement(CriteriaType::SpecialCondition, 1, None);
        a.slug = "mystery-badge".to_string();

        let err = qualifies(&a, &ActivitySnapshot::default()).unwrap_err();
        assert!(err.is_data_error());
        assert_eq!(err.error_code(), "UNKNOWN_SPECIAL_SLUG");
    }
}
