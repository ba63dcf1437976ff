use super::RepoResult;
use crate::models::{Participant, PortfolioStock};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ParticipantRepository: Send + Sync {
    /// Insert a participant together with their initial portfolio, atomically
    async fn create_with_stocks(
        &self,
        participant: &Participant,
        stocks: &[PortfolioStock],
    ) -> RepoResult<Participant>;

    /// Participants of a competition in join order
    async fn find_by_competition(&self, competition_id: Uuid) -> RepoResult<Vec<Participant>>;

    /// Case-insensitive name lookup within one competition
    async fn find_by_name(
        &self,
        competition_id: Uuid,
        name: &str,
    ) -> RepoResult<Option<Participant>>;

    async fn count_by_competition(&self, competition_id: Uuid) -> RepoResult<i64>;

    /// Persist the derived aggregate and primary ticker
    async fn update_aggregate(
        &self,
        id: Uuid,
        percent_change: Option<f64>,
        primary_ticker: Option<&str>,
    ) -> RepoResult<()>;

    /// Delete a participant; their stocks go with them
    async fn delete(&self, id: Uuid) -> RepoResult<bool>;
}

/// Repository for participant data access
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, competition_id, name, percent_change, primary_ticker, joined_at";

#[async_trait::async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn create_with_stocks(
        &self,
        participant: &Participant,
        stocks: &[PortfolioStock],
    ) -> RepoResult<Participant> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO participants (id, competition_id, name, percent_change, primary_ticker, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COLUMNS
        );
        let created = sqlx::query_as::<_, Participant>(&sql)
            .bind(participant.id)
            .bind(participant.competition_id)
            .bind(&participant.name)
            .bind(participant.percent_change)
            .bind(&participant.primary_ticker)
            .bind(participant.joined_at)
            .fetch_one(&mut *tx)
            .await?;

        for stock in stocks {
            super::stock_repository::insert_stock(&mut tx, stock).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_by_competition(&self, competition_id: Uuid) -> RepoResult<Vec<Participant>> {
        let sql = format!(
            "SELECT {} FROM participants WHERE competition_id = $1 ORDER BY joined_at ASC",
            COLUMNS
        );
        let found = sqlx::query_as::<_, Participant>(&sql)
            .bind(competition_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    async fn find_by_name(
        &self,
        competition_id: Uuid,
        name: &str,
    ) -> RepoResult<Option<Participant>> {
        let sql = format!(
            "SELECT {} FROM participants WHERE competition_id = $1 AND LOWER(name) = LOWER($2)",
            COLUMNS
        );
        let found = sqlx::query_as::<_, Participant>(&sql)
            .bind(competition_id)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    async fn count_by_competition(&self, competition_id: Uuid) -> RepoResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE competition_id = $1")
                .bind(competition_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn update_aggregate(
        &self,
        id: Uuid,
        percent_change: Option<f64>,
        primary_ticker: Option<&str>,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE participants
            SET percent_change = $2, primary_ticker = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(percent_change)
        .bind(primary_ticker)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> RepoResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
