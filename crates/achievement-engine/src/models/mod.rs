//! 领域模型定义
//!
//! 包含成就目录、用户获得记录、活动快照、进度视图等核心模型

mod achievement;
mod earned;
mod enums;
mod progress;
mod snapshot;

pub use achievement::Achievement;
pub use earned::EarnedAchievement;
pub use enums::{AchievementCategory, CriteriaType};
pub use progress::{
    EarnedEntry, InProgressEntry, LockedEntry, ProfileCompletionStatus, ProfileFieldStatus,
    ProgressView,
};
pub use snapshot::ActivitySnapshot;
