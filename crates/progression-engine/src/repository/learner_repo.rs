//! 学员资料仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::LearnerDirectoryTrait;
use crate::error::Result;
use crate::models::LearnerProfile;

/// 学员资料仓储
pub struct LearnerRepository {
    pool: PgPool,
}

impl LearnerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LearnerDirectoryTrait for LearnerRepository {
    async fn get_learner(&self, user_id: i64) -> Result<Option<LearnerProfile>> {
        let learner = sqlx::query_as::<_, LearnerProfile>(
            "SELECT id, name, email FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(learner)
    }
}
