use super::RepoResult;
use crate::models::Competition;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait CompetitionRepository: Send + Sync {
    async fn create(&self, competition: &Competition) -> RepoResult<Competition>;

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Competition>>;

    /// Case-insensitive slug lookup
    async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Competition>>;

    async fn set_finalized(&self, id: Uuid, finalized: bool) -> RepoResult<Competition>;

    /// Newest first
    async fn list(&self) -> RepoResult<Vec<Competition>>;
}

/// Repository for competition data access
pub struct PgCompetitionRepository {
    pool: PgPool,
}

impl PgCompetitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str =
    "id, slug, name, pick_window_start, pick_window_end, created_at, mode, finalized, budget";

#[async_trait::async_trait]
impl CompetitionRepository for PgCompetitionRepository {
    async fn create(&self, competition: &Competition) -> RepoResult<Competition> {
        let sql = format!(
            r#"
            INSERT INTO competitions
                (id, slug, name, pick_window_start, pick_window_end, created_at, mode, finalized, budget)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            COLUMNS
        );
        let created = sqlx::query_as::<_, Competition>(&sql)
            .bind(competition.id)
            .bind(&competition.slug)
            .bind(&competition.name)
            .bind(competition.pick_window_start)
            .bind(competition.pick_window_end)
            .bind(competition.created_at)
            .bind(&competition.mode)
            .bind(competition.finalized)
            .bind(competition.budget)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Competition>> {
        let sql = format!("SELECT {} FROM competitions WHERE id = $1", COLUMNS);
        let found = sqlx::query_as::<_, Competition>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    async fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Competition>> {
        let sql = format!(
            "SELECT {} FROM competitions WHERE LOWER(slug) = LOWER($1)",
            COLUMNS
        );
        let found = sqlx::query_as::<_, Competition>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    async fn set_finalized(&self, id: Uuid, finalized: bool) -> RepoResult<Competition> {
        let sql = format!(
            "UPDATE competitions SET finalized = $2 WHERE id = $1 RETURNING {}",
            COLUMNS
        );
        let updated = sqlx::query_as::<_, Competition>(&sql)
            .bind(id)
            .bind(finalized)
            .fetch_one(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn list(&self) -> RepoResult<Vec<Competition>> {
        let sql = format!(
            "SELECT {} FROM competitions ORDER BY created_at DESC",
            COLUMNS
        );
        let all = sqlx::query_as::<_, Competition>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(all)
    }
}
