//! 证书文件生成
//!
//! 证书渲染与存储由外部服务负责，这里只约定接口：
//! 给定学员姓名、课程名称、签发日期与证书编号，返回证书文件 URL。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// 证书文件生成请求
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub learner_name: String,
    pub course_title: String,
    pub issue_date: DateTime<Utc>,
    pub certificate_code: String,
}

/// 证书文件生成器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateArtifactGenerator: Send + Sync {
    /// 生成证书文件并返回其 URL
    async fn generate(&self, request: &ArtifactRequest) -> Result<String>;
}

/// 基于固定前缀拼接 URL 的生成器
///
/// 形如 `{base}/{code}/{learner}-{course}-{yyyymmdd}.pdf`，不实际渲染文件
#[derive(Debug, Clone)]
pub struct UrlCertificateGenerator {
    base_url: String,
}

impl UrlCertificateGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, request: &ArtifactRequest) -> String {
        format!(
            "{}/{}/{}-{}-{}.pdf",
            self.base_url,
            request.certificate_code,
            slugify(&request.learner_name),
            slugify(&request.course_title),
            request.issue_date.format("%Y%m%d"),
        )
    }
}

#[async_trait]
impl CertificateArtifactGenerator for UrlCertificateGenerator {
    async fn generate(&self, request: &ArtifactRequest) -> Result<String> {
        Ok(self.build_url(request))
    }
}

/// 转为 URL 片段：ASCII 字母数字转小写保留，其余连续字符合并为单个 `-`
fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
