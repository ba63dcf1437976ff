use super::PriceSource;
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::PriceSourceConfig;
use crate::error::{AppError, AppResult};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Historical closes do not change once the day is over
const HISTORICAL_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Yahoo Finance chart API adapter
pub struct YahooPriceSource {
    client: Client,
    config: PriceSourceConfig,
    current_cache: TtlCache<String, f64>,
    historical_cache: TtlCache<(String, NaiveDate), f64>,
}

impl YahooPriceSource {
    pub fn new(config: PriceSourceConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent("Mozilla/5.0 (compatible; stockpick-backend)")
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            current_cache: TtlCache::new(config.cache_ttl(), clock.clone()),
            historical_cache: TtlCache::new(HISTORICAL_CACHE_TTL, clock),
            config,
        })
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.config.base_url.trim_end_matches('/'),
            ticker
        )
    }

    /// GET a JSON document, retrying once when throttled
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Option<Value> {
        for attempt in 0..2 {
            let response = match self.client.get(url).query(query).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Price request to {} failed: {}", url, e);
                    return None;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == 0 {
                    debug!("Throttled by price source, retrying in {:?}", self.config.retry_backoff());
                    tokio::time::sleep(self.config.retry_backoff()).await;
                    continue;
                }
                warn!("Price source still throttling {} after retry", url);
                return None;
            }

            if !status.is_success() {
                warn!("Price source returned {} for {}", status, url);
                return None;
            }

            return match response.json::<Value>().await {
                Ok(json) => Some(json),
                Err(e) => {
                    warn!("Unreadable price payload from {}: {}", url, e);
                    None
                }
            };
        }
        None
    }
}

#[async_trait::async_trait]
impl PriceSource for YahooPriceSource {
    async fn current_price(&self, ticker: &str) -> Option<f64> {
        let key = ticker.to_string();
        if let Some(price) = self.current_cache.get(&key).await {
            return Some(price);
        }

        let query = [("range", "5d".to_string()), ("interval", "1d".to_string())];
        let json = self.get_json(&self.chart_url(ticker), &query).await?;
        let price = parse_current_price(&json);

        match price {
            Some(p) => {
                self.current_cache.insert(key, p).await;
                debug!("Fetched current price {} = {}", ticker, p);
            }
            None => warn!("No current price in payload for {}", ticker),
        }
        price
    }

    async fn historical_price(&self, ticker: &str, date: NaiveDate) -> Option<f64> {
        let key = (ticker.to_string(), date);
        if let Some(price) = self.historical_cache.get(&key).await {
            return Some(price);
        }

        let lookback = i64::from(self.config.lookback_days);
        let from = (date - ChronoDuration::days(lookback)).and_time(NaiveTime::MIN);
        let to = (date + ChronoDuration::days(1)).and_time(NaiveTime::MIN);
        let query = [
            ("period1", from.and_utc().timestamp().to_string()),
            ("period2", to.and_utc().timestamp().to_string()),
            ("interval", "1d".to_string()),
        ];

        let json = self.get_json(&self.chart_url(ticker), &query).await?;
        let closes = parse_daily_closes(&json);
        let price = nearest_close_on_or_before(&closes, date, self.config.lookback_days);

        match price {
            Some(p) => {
                self.historical_cache.insert(key, p).await;
                debug!("Historical close {} on/before {} = {}", ticker, date, p);
            }
            None => warn!(
                "No close for {} within {} days before {}",
                ticker, self.config.lookback_days, date
            ),
        }
        price
    }
}

fn chart_result(json: &Value) -> Option<&Value> {
    json["chart"]["result"].as_array()?.first()
}

/// Market price from a chart payload, falling back to the last close
pub fn parse_current_price(json: &Value) -> Option<f64> {
    let result = chart_result(json)?;
    result["meta"]["regularMarketPrice"]
        .as_f64()
        .filter(|p| *p > 0.0)
        .or_else(|| {
            parse_daily_closes(json)
                .last()
                .map(|(_, close)| *close)
        })
}

/// `(trading day, close)` pairs from a chart payload, skipping null closes
pub fn parse_daily_closes(json: &Value) -> Vec<(NaiveDate, f64)> {
    let Some(result) = chart_result(json) else {
        return Vec::new();
    };
    let (Some(timestamps), Some(closes)) = (
        result["timestamp"].as_array(),
        result["indicators"]["quote"][0]["close"].as_array(),
    ) else {
        return Vec::new();
    };

    timestamps
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let day = chrono::DateTime::from_timestamp(ts.as_i64()?, 0)?.date_naive();
            let close = close.as_f64().filter(|c| *c > 0.0)?;
            Some((day, close))
        })
        .collect()
}

/// Latest close dated on or before `target`, at most `lookback_days` earlier
pub fn nearest_close_on_or_before(
    closes: &[(NaiveDate, f64)],
    target: NaiveDate,
    lookback_days: u32,
) -> Option<f64> {
    let earliest = target - ChronoDuration::days(i64::from(lookback_days));
    closes
        .iter()
        .filter(|(day, _)| *day <= target && *day >= earliest)
        .max_by_key(|(day, _)| *day)
        .map(|(_, close)| *close)
}
