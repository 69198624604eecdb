use chrono::Utc;

use motorpool_core::domain::vehicle::ActorId;

use super::{AdminRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAdminRepository {
    pool: DbPool,
}

impl SqlAdminRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AdminRepository for SqlAdminRepository {
    async fn is_admin(&self, actor: &ActorId) -> Result<bool, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM admin WHERE actor_id = ?")
                .bind(actor.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    async fn insert_if_absent(&self, actor: &ActorId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO admin (actor_id, added_at) VALUES (?, ?) \
             ON CONFLICT (actor_id) DO NOTHING",
        )
        .bind(actor.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
