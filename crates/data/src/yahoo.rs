//! Yahoo Finance chart API client.
//!
//! Fetches `/v8/finance/chart/{symbol}` with rate limiting and turns the
//! column-oriented response into an ordered [`BarSeries`].

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use maestro_core::{BarSeries, Interval, MarketDataProvider, Period, ProviderConfig};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use crate::normalize::{normalize, RawBar};

/// Yahoo Finance query host.
pub const YAHOO_CHART_API: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = concat!("maestro/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<Option<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

/// Parallel price columns; `null` entries mark missing values.
#[derive(Debug, Default, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Flattens the first result into rows. No result means no rows.
    ///
    /// # Errors
    /// Returns the provider's error object when it reports one.
    pub fn into_rows(self) -> Result<Vec<RawBar>> {
        if let Some(err) = self.chart.error {
            return Err(anyhow!("Yahoo chart error {}: {}", err.code, err.description));
        }
        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let column = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

        Ok(result
            .timestamp
            .iter()
            .enumerate()
            .map(|(i, ts)| RawBar {
                timestamp: *ts,
                open: column(&quote.open, i),
                high: column(&quote.high, i),
                low: column(&quote.low, i),
                close: column(&quote.close, i),
                volume: column(&quote.volume, i),
            })
            .collect())
    }
}

/// Market data from the Yahoo Finance chart endpoint.
pub struct YahooChartProvider {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl YahooChartProvider {
    /// Creates a client from provider configuration.
    ///
    /// # Errors
    /// Returns an error for a zero rate limit or if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Self::with_config(&config.base_url, config.rate_limit_per_second, config.timeout_secs)
    }

    /// # Errors
    /// Returns an error for a zero rate limit or if the HTTP client cannot be built.
    pub fn with_config(base_url: &str, rate_limit_per_second: u32, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        let per_second = NonZeroU32::new(rate_limit_per_second)
            .ok_or_else(|| anyhow!("Rate limit must be > 0"))?;
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Chart endpoint for `symbol`, with the symbol percent-encoded as one
    /// path segment.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be parsed or cannot carry a path.
    pub fn chart_url(&self, symbol: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("Base URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    /// Fetches and decodes the raw chart response.
    ///
    /// # Errors
    /// Returns an error if the request fails, the status is not a success, or
    /// the body cannot be decoded.
    pub async fn fetch_chart(
        &self,
        symbol: &str,
        interval: Interval,
        period: Period,
    ) -> Result<ChartResponse> {
        self.rate_limiter.until_ready().await;

        let url = self.chart_url(symbol)?;
        let range = period.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("interval", interval.as_str()),
                ("range", range.as_str()),
                ("includePrePost", "false"),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send chart request for {symbol}"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Yahoo API error ({status}) for {symbol}: {error_text}"));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse chart response for {symbol}"))
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartProvider {
    async fn fetch_bars(&self, symbol: &str, interval: Interval, period: Period) -> Result<BarSeries> {
        let rows = self.fetch_chart(symbol, interval, period).await?.into_rows()?;
        let (bars, stats) = normalize(&rows);

        if stats.incomplete > 0 || stats.duplicates > 0 {
            warn!(
                symbol,
                %interval,
                incomplete = stats.incomplete,
                duplicates = stats.duplicates,
                "dropped provider rows"
            );
        }
        debug!(symbol, %interval, %period, bars = stats.kept, "fetched chart");

        Ok(BarSeries::new(symbol, interval, bars)?)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
