//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 使用 SQLx 进行类型安全的数据库操作
//! - 多表写入在仓储内部使用单个事务完成
//! - 定义 trait 接口以支持 mock 测试和内存实现

mod achievement_repo;
mod certificate_repo;
mod course_repo;
mod enrollment_repo;
mod learner_repo;
mod quiz_repo;
mod traits;

pub use achievement_repo::AchievementRepository;
pub use certificate_repo::CertificateRepository;
pub use course_repo::CourseRepository;
pub use enrollment_repo::EnrollmentRepository;
pub use learner_repo::LearnerRepository;
pub use quiz_repo::QuizRepository;
pub use traits::*;
