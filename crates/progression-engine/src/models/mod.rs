//! 领域模型定义
//!
//! 包含课程结构、报名进度、测验、证书、积分与徽章等实体

mod achievement;
mod certificate;
mod course;
mod enrollment;
mod enums;
mod quiz;

pub use achievement::*;
pub use certificate::*;
pub use course::*;
pub use enrollment::*;
pub use enums::*;
pub use quiz::*;
