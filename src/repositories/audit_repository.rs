use super::RepoResult;
use crate::models::AuditEvent;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> RepoResult<()>;

    /// Events for one competition, oldest first
    async fn find_by_competition(&self, competition_id: Uuid) -> RepoResult<Vec<AuditEvent>>;
}

/// Repository for the competition audit log
pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditRepository for PgAuditRepository {
    async fn append(&self, event: &AuditEvent) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (id, competition_id, action, actor, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(event.competition_id)
        .bind(&event.action)
        .bind(&event.actor)
        .bind(&event.details)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_competition(&self, competition_id: Uuid) -> RepoResult<Vec<AuditEvent>> {
        let events = sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, competition_id, action, actor, details, created_at
            FROM audit_events
            WHERE competition_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(competition_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
