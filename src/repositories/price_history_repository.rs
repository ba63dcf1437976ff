use super::RepoResult;
use crate::models::PriceHistorySample;
use sqlx::PgPool;

/// Append-only log of fetched prices
#[async_trait::async_trait]
pub trait PriceHistoryRepository: Send + Sync {
    async fn append(&self, sample: &PriceHistorySample) -> RepoResult<()>;

    /// Most recent samples for a ticker, newest first
    async fn recent(&self, ticker: &str, limit: i64) -> RepoResult<Vec<PriceHistorySample>>;
}

pub struct PgPriceHistoryRepository {
    pool: PgPool,
}

impl PgPriceHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PriceHistoryRepository for PgPriceHistoryRepository {
    async fn append(&self, sample: &PriceHistorySample) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO price_history (id, ticker, price, recorded_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(sample.id)
        .bind(&sample.ticker)
        .bind(sample.price)
        .bind(sample.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent(&self, ticker: &str, limit: i64) -> RepoResult<Vec<PriceHistorySample>> {
        let samples = sqlx::query_as::<_, PriceHistorySample>(
            r#"
            SELECT id, ticker, price, recorded_at
            FROM price_history
            WHERE ticker = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(ticker)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(samples)
    }
}
