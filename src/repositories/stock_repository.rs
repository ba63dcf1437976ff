use super::RepoResult;
use crate::models::PortfolioStock;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// A validated portfolio change, applied in one go: removals, then
/// reweights, then additions
#[derive(Debug, Clone)]
pub struct StockEdit {
    pub remove: Vec<String>,
    pub reweight: Vec<(String, f64)>,
    pub add: Vec<PortfolioStock>,
    pub updated_at: NaiveDateTime,
}

#[async_trait::async_trait]
pub trait StockRepository: Send + Sync {
    async fn find_by_participant(&self, participant_id: Uuid) -> RepoResult<Vec<PortfolioStock>>;

    async fn find_by_participants(&self, participant_ids: &[Uuid])
        -> RepoResult<Vec<PortfolioStock>>;

    async fn apply_edit(&self, participant_id: Uuid, edit: &StockEdit) -> RepoResult<()>;

    /// Overwrite baseline, current price and percent change of one stock
    async fn save_prices(&self, stock: &PortfolioStock) -> RepoResult<()>;
}

/// Repository for portfolio stock data access
pub struct PgStockRepository {
    pool: PgPool,
}

impl PgStockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str =
    "id, participant_id, ticker, shares, baseline_price, current_price, percent_change, updated_at";

pub(crate) async fn insert_stock(
    tx: &mut Transaction<'_, Postgres>,
    stock: &PortfolioStock,
) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO portfolio_stocks
            (id, participant_id, ticker, shares, baseline_price, current_price, percent_change, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(stock.id)
    .bind(stock.participant_id)
    .bind(&stock.ticker)
    .bind(stock.shares)
    .bind(stock.baseline_price)
    .bind(stock.current_price)
    .bind(stock.percent_change)
    .bind(stock.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl StockRepository for PgStockRepository {
    async fn find_by_participant(&self, participant_id: Uuid) -> RepoResult<Vec<PortfolioStock>> {
        let sql = format!(
            "SELECT {} FROM portfolio_stocks WHERE participant_id = $1 ORDER BY ticker ASC",
            COLUMNS
        );
        let found = sqlx::query_as::<_, PortfolioStock>(&sql)
            .bind(participant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    async fn find_by_participants(
        &self,
        participant_ids: &[Uuid],
    ) -> RepoResult<Vec<PortfolioStock>> {
        let sql = format!(
            "SELECT {} FROM portfolio_stocks WHERE participant_id = ANY($1) ORDER BY ticker ASC",
            COLUMNS
        );
        let found = sqlx::query_as::<_, PortfolioStock>(&sql)
            .bind(participant_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(found)
    }

    async fn apply_edit(&self, participant_id: Uuid, edit: &StockEdit) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        for ticker in &edit.remove {
            sqlx::query("DELETE FROM portfolio_stocks WHERE participant_id = $1 AND ticker = $2")
                .bind(participant_id)
                .bind(ticker)
                .execute(&mut *tx)
                .await?;
        }

        for (ticker, shares) in &edit.reweight {
            sqlx::query(
                r#"
                UPDATE portfolio_stocks
                SET shares = $3, updated_at = $4
                WHERE participant_id = $1 AND ticker = $2
                "#,
            )
            .bind(participant_id)
            .bind(ticker)
            .bind(shares)
            .bind(edit.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for stock in &edit.add {
            insert_stock(&mut tx, stock).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_prices(&self, stock: &PortfolioStock) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE portfolio_stocks
            SET baseline_price = $2, current_price = $3, percent_change = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(stock.id)
        .bind(stock.baseline_price)
        .bind(stock.current_price)
        .bind(stock.percent_change)
        .bind(stock.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
