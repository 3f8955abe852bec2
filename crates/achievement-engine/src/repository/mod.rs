//! 数据仓储层
//!
//! 成就目录与用户获得记录的数据访问，PostgreSQL 实现 + 内存实现

mod achievement_repo;
mod earned_repo;
mod memory;
mod traits;

pub use achievement_repo::PgCatalogRepository;
pub use earned_repo::PgEarnedRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryEarnedRepository};
pub use traits::{CatalogRepositoryTrait, EarnedRepositoryTrait};

#[cfg(test)]
pub use traits::{MockCatalogRepositoryTrait, MockEarnedRepositoryTrait};
