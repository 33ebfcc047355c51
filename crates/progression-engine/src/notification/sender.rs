//! 证书通知发送器

use std::sync::Arc;

use tracing::{error, info};

use super::mailer::{CertificateEmail, CertificateMailer};

/// 证书通知发送器
///
/// 可被注入到证书领取流程中，发送在独立任务中完成，不阻塞调用方
#[derive(Clone)]
pub struct CertificateNotifier {
    mailer: Arc<dyn CertificateMailer>,
}

impl CertificateNotifier {
    pub fn new(mailer: Arc<dyn CertificateMailer>) -> Self {
        Self { mailer }
    }

    /// 发送证书签发通知（fire-and-forget）
    pub fn send_certificate_issued(&self, email: CertificateEmail) {
        let mailer = self.mailer.clone();

        tokio::spawn(async move {
            match mailer.send_certificate(&email).await {
                Ok(()) => {
                    info!(
                        to = %email.to,
                        certificate_code = %email.certificate_code,
                        "证书邮件发送成功"
                    );
                }
                Err(e) => {
                    error!(
                        to = %email.to,
                        certificate_code = %email.certificate_code,
                        error = %e,
                        "证书邮件发送失败"
                    );
                }
            }
        });
    }
}
