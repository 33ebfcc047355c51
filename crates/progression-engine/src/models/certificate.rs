//! 证书实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 结业证书
///
/// (user_id, course_id) 唯一，certificate_code 唯一。
/// 课程名称在签发时快照保存，课程改名不影响已签发证书
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub certificate_code: String,
    pub course_name_at_issue: String,
    pub certificate_url: String,
    pub issue_date: DateTime<Utc>,
}

/// 待写入的证书
#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub user_id: i64,
    pub course_id: i64,
    pub certificate_code: String,
    pub course_name_at_issue: String,
    pub certificate_url: String,
    pub issue_date: DateTime<Utc>,
}

/// 学员资料（证书署名与邮件发送使用）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// 生成证书编号：取随机 UUID 的前 8 位并转为大写
pub fn generate_certificate_code() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_uppercase()
}
