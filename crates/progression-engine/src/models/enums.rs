//! 身份与角色定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// 学员 - 受报名与顺序解锁约束
    #[default]
    Student,
    /// 讲师 - 对自己的课程拥有完整访问权
    Instructor,
    /// 管理员 - 不受任何访问限制
    Admin,
}

/// 调用方身份
///
/// 由认证层（JWT 校验）解析得到后交给引擎，引擎本身不负责签发或校验令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn student(id: i64) -> Self {
        Self::new(id, Role::Student)
    }

    pub fn instructor(id: i64) -> Self {
        Self::new(id, Role::Instructor)
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }
}
