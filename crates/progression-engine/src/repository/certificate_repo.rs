//! 证书仓储
//!
//! (user_id, course_id) 与 certificate_code 分别唯一。
//! 前者冲突说明并发领取已由其他请求完成，后者冲突说明随机编号碰撞

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::CertificateRepositoryTrait;
use crate::error::{ProgressionError, Result};
use crate::models::{Certificate, NewCertificate};

/// 证书编号唯一约束名
const CODE_CONSTRAINT: &str = "certificates_code_key";

/// 证书仓储
pub struct CertificateRepository {
    pool: PgPool,
}

impl CertificateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_certificate(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<Certificate>> {
        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT id, user_id, course_id, certificate_code, course_name_at_issue,
                   certificate_url, issue_date
            FROM certificates
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<Certificate>> {
        let certificate = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT id, user_id, course_id, certificate_code, course_name_at_issue,
                   certificate_url, issue_date
            FROM certificates
            WHERE certificate_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(certificate)
    }

    /// 写入证书
    ///
    /// 只对 (user_id, course_id) 使用 ON CONFLICT DO NOTHING，
    /// 编号冲突仍会触发唯一约束错误，并被翻译为 `CertificateCodeConflict`
    pub async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Option<Certificate>> {
        let result = sqlx::query_as::<_, Certificate>(
            r#"
            INSERT INTO certificates (user_id, course_id, certificate_code,
                                      course_name_at_issue, certificate_url, issue_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING id, user_id, course_id, certificate_code, course_name_at_issue,
                      certificate_url, issue_date
            "#,
        )
        .bind(certificate.user_id)
        .bind(certificate.course_id)
        .bind(&certificate.certificate_code)
        .bind(&certificate.course_name_at_issue)
        .bind(&certificate.certificate_url)
        .bind(certificate.issue_date)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(inserted) => Ok(inserted),
            Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some(CODE_CONSTRAINT) => {
                Err(ProgressionError::CertificateCodeConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_user_certificates(&self, user_id: i64) -> Result<Vec<Certificate>> {
        let certificates = sqlx::query_as::<_, Certificate>(
            r#"
            SELECT id, user_id, course_id, certificate_code, course_name_at_issue,
                   certificate_url, issue_date
            FROM certificates
            WHERE user_id = $1
            ORDER BY issue_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }
}

#[async_trait]
impl CertificateRepositoryTrait for CertificateRepository {
    async fn get_certificate(&self, user_id: i64, course_id: i64) -> Result<Option<Certificate>> {
        self.get_certificate(user_id, course_id).await
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Certificate>> {
        self.get_by_code(code).await
    }

    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
    ) -> Result<Option<Certificate>> {
        self.insert_certificate(certificate).await
    }

    async fn list_user_certificates(&self, user_id: i64) -> Result<Vec<Certificate>> {
        self.list_user_certificates(user_id).await
    }
}
