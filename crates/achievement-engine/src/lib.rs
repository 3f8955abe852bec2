//! 成就引擎
//!
//! 根据声明式的成就目录评估用户活动数据，幂等地授予或撤销成就记录，
//! 并为客户端提供已获得/进行中/未解锁三类进度视图。
//!
//! ## 核心功能
//!
//! - **成就目录**：按（分类，条件类型）或 slug 查询成就定义，进程内缓存永不过期
//! - **条件评估**：纯函数式地将（成就，活动快照）映射为是否达标与进度值
//! - **授予/撤销**：基于 (user, achievement) 唯一约束的幂等创建与条件撤销
//! - **进度聚合**：三分类进度视图，同组内只展示第一个未获得的进行中成就
//! - **事件总线**：活动生产方提交后发布类型化事件，引擎统一路由到各分类检查
//! - **异常检测**：滚动窗口内打卡频率过高时发出非阻塞审计信号
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `activity`: 活动数据访问接口（外部子系统持有的只读计数）
//! - `repository`: 数据库仓储层与内存实现
//! - `catalog`: 成就目录存储（进程内缓存）
//! - `evaluator`: 条件评估器
//! - `engine`: 授予/撤销引擎与事件路由
//! - `progress`: 进度聚合与用户进度缓存

pub mod activity;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod models;
pub mod progress;
pub mod repository;

pub use activity::{ActivitySource, InMemoryActivitySource, ProfileCompletion};
pub use catalog::CatalogStore;
pub use engine::{AchievementChange, AchievementEngine, AnomalyDetector, EventOutcome};
pub use error::{AchievementError, Result};
pub use events::ActivityEvent;
pub use models::*;
pub use progress::{
    InMemoryProgressCache, ProgressCache, ProgressService, RedisProgressCache,
};
pub use repository::{
    CatalogRepositoryTrait, EarnedRepositoryTrait, InMemoryCatalogRepository,
    InMemoryEarnedRepository, PgCatalogRepository, PgEarnedRepository,
};
