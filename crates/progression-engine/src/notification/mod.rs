//! 证书通知
//!
//! 证书签发后通过邮件通知学员。发送是 fire-and-forget：
//! 由 [`CertificateNotifier`] 在独立任务中执行，失败只记录日志，
//! 不影响证书领取结果。

mod mailer;
mod sender;

#[cfg(test)]
pub use mailer::MockCertificateMailer;
pub use mailer::{CertificateEmail, CertificateMailer, LogCertificateMailer};
pub use sender::CertificateNotifier;
