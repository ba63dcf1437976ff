//! Upstream stock price capability.
//!
//! The core only ever asks two questions: what does this ticker trade at now,
//! and what did it close at on (or just before) a given date. Both answers
//! degrade to `None` instead of erroring; retries live inside the adapter.

pub mod yahoo;

pub use yahoo::YahooPriceSource;

use chrono::NaiveDate;

#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest price, or `None` if it cannot be determined right now
    async fn current_price(&self, ticker: &str) -> Option<f64>;

    /// Close on the nearest trading day on or before `date`, searching a
    /// bounded number of days backwards
    async fn historical_price(&self, ticker: &str, date: NaiveDate) -> Option<f64>;
}
