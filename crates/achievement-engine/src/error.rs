//! 成就引擎错误类型
//!
//! 区分数据/部署错误（快速失败）与运行时可降级错误

use thiserror::Error;

/// 成就引擎错误类型
#[derive(Debug, Error)]
pub enum AchievementError {
    // === 目录数据错误（部署/数据问题，加载或首次评估时快速失败） ===
    #[error("成就目录数据非法: slug={slug}, {reason}")]
    CatalogInvalid { slug: String, reason: String },

    #[error("未知的特殊条件 slug: {0}")]
    UnknownSpecialSlug(String),

    #[error("成就不存在: {0}")]
    AchievementNotFound(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("缓存错误: {0}")]
    Cache(String),

    #[error("活动数据访问错误: {0}")]
    Activity(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 成就引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, AchievementError>;

impl AchievementError {
    /// 检查是否为目录数据错误
    ///
    /// 数据错误表示部署或种子数据有问题，应当快速失败并报警，
    /// 而不是在运行时静默重试。
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::CatalogInvalid { .. } | Self::UnknownSpecialSlug(_)
        )
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Cache(_) | Self::Activity(_))
    }

    /// 获取错误码（用于日志与外部上报）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CatalogInvalid { .. } => "CATALOG_INVALID",
            Self::UnknownSpecialSlug(_) => "UNKNOWN_SPECIAL_SLUG",
            Self::AchievementNotFound(_) => "ACHIEVEMENT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Activity(_) => "ACTIVITY_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<achievement_shared::error::SharedError> for AchievementError {
    fn from(err: achievement_shared::error::SharedError) -> Self {
        use achievement_shared::error::SharedError;
        match err {
            SharedError::Database(e) => Self::Database(e),
            SharedError::Redis(e) => Self::Cache(e.to_string()),
            SharedError::CacheSerialization(e) => Self::Cache(e),
            SharedError::Config(e) => Self::Internal(e.to_string()),
            SharedError::Internal(e) => Self::Internal(e),
        }
    }
}
