//! 邮件发送接口

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// 证书邮件内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateEmail {
    pub to: String,
    pub learner_name: String,
    pub course_title: String,
    pub certificate_code: String,
    pub certificate_url: String,
    pub issue_date: DateTime<Utc>,
}

impl CertificateEmail {
    pub fn subject(&self) -> String {
        format!("恭喜完成《{}》，您的结业证书已签发", self.course_title)
    }
}

/// 邮件发送器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateMailer: Send + Sync {
    async fn send_certificate(&self, email: &CertificateEmail) -> Result<()>;
}

/// 只写日志的邮件发送器，用于未接入邮件服务的环境
#[derive(Debug, Clone, Default)]
pub struct LogCertificateMailer;

#[async_trait]
impl CertificateMailer for LogCertificateMailer {
    async fn send_certificate(&self, email: &CertificateEmail) -> Result<()> {
        info!(
            to = %email.to,
            subject = %email.subject(),
            certificate_code = %email.certificate_code,
            "证书邮件（仅日志）"
        );
        Ok(())
    }
}
