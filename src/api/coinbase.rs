use governor::{Quota, RateLimiter};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::api::{ApiCredentials, Exchange, LimitOrderRequest, OrderLookup, PlacementOutcome};
use crate::models::{Account, Candle, Granularity, Product, Stats24h};
use crate::timestamps::epoch_to_utc;
use crate::{BotError, Result};

pub const PRODUCTION_API_URL: &str = "https://api.pro.coinbase.com";
pub const SANDBOX_API_URL: &str = "https://api-public.sandbox.pro.coinbase.com";

const RATE_LIMIT_RPS: u32 = 3; // public endpoint limit per IP
const REQUEST_TIMEOUT_SECS: u64 = 30;
const POST_ONLY_MESSAGE: &str = "Post only mode";

// Type alias for the rate limiter to simplify signatures
type ExchangeRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Raw candle row: [ time, low, high, open, close, volume ]
type CandleRow = (i64, Decimal, Decimal, Decimal, Decimal, Decimal);

/// Coinbase Pro REST client
///
/// Public market-data endpoints work without credentials; order and
/// account endpoints need them. Requests are paced, never retried.
#[derive(Clone)]
pub struct CoinbaseClient {
    client: Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
    rate_limiter: Arc<ExchangeRateLimiter>,
}

impl CoinbaseClient {
    pub fn new(base_url: &str, credentials: Option<ApiCredentials>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("trailbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let quota = Quota::per_second(NonZeroU32::new(RATE_LIMIT_RPS).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Send a request, signing it when credentials are configured
    async fn send(&self, method: Method, path: &str, body: Option<String>) -> Result<reqwest::Response> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let body = body.unwrap_or_default();
        let mut request = self.client.request(method.clone(), &url);

        if let Some(credentials) = &self.credentials {
            let timestamp = chrono::Utc::now().timestamp().to_string();
            let headers = credentials.headers(&timestamp, method.as_str(), path, &body)?;
            request = headers.apply(request);
        }
        if !body.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        tracing::debug!("{} {}", method, url);
        Ok(request.send().await?)
    }

    /// GET `path` and decode a successful JSON response
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None).await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BotError::Exchange {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok(response.json().await?)
    }

    fn require_credentials(&self) -> Result<()> {
        if self.credentials.is_none() {
            return Err(BotError::InvalidParameter(
                "API credentials required for private endpoints".to_string(),
            ));
        }
        Ok(())
    }
}

impl Exchange for CoinbaseClient {
    async fn product(&self, market: &str) -> Result<Product> {
        let products: Vec<Product> = self.get_json("/products").await?;

        products
            .into_iter()
            .find(|p| p.id == market)
            .ok_or_else(|| BotError::UnknownMarket(market.to_string()))
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        self.require_credentials()?;
        self.get_json("/accounts").await
    }

    async fn candles(&self, market: &str, granularity: Granularity) -> Result<Vec<Candle>> {
        let path = format!("/products/{}/candles?granularity={}", market, granularity.seconds());
        let rows: Vec<CandleRow> = self.get_json(&path).await?;

        let candles = rows
            .into_iter()
            .map(|(time, low, high, open, close, volume)| -> Result<Candle> {
                Ok(Candle {
                    time: epoch_to_utc(time)?,
                    low,
                    high,
                    open,
                    close,
                    volume,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Fetched {} {}s candles for {}", candles.len(), granularity.seconds(), market);
        Ok(candles)
    }

    async fn stats_24h(&self, market: &str) -> Result<Stats24h> {
        self.get_json(&format!("/products/{}/stats", market)).await
    }

    async fn get_order(&self, order_id: &str) -> Result<OrderLookup> {
        self.require_credentials()?;
        let response = self.send(Method::GET, &format!("/orders/{}", order_id), None).await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND || error_message(&text) == "NotFound" {
            return Ok(OrderLookup::NotFound);
        }
        if !status.is_success() {
            return Err(BotError::Exchange {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let payload: Value = serde_json::from_str(&text)?;
        if payload.as_object().map_or(true, |o| o.is_empty()) {
            return Err(BotError::Exchange {
                status: status.as_u16(),
                message: format!("could not retrieve order {}", order_id),
            });
        }

        Ok(OrderLookup::Found(payload))
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        self.require_credentials()?;
        let response = self
            .send(Method::DELETE, &format!("/orders/{}", order_id), None)
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // Usually the order filled or was cancelled since the lookup
            tracing::warn!("Cancel of order {} returned {}: {}", order_id, status, text);
            return Err(BotError::Exchange {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        tracing::info!("Cancelled order {}: {}", order_id, text);
        Ok(())
    }

    async fn place_limit_order(&self, request: &LimitOrderRequest) -> Result<PlacementOutcome> {
        self.require_credentials()?;
        let body = serde_json::to_string(request)?;
        let response = self.send(Method::POST, "/orders", Some(body)).await?;
        let status = response.status();
        let text = response.text().await?;

        let payload: Value = serde_json::from_str(&text)
            .unwrap_or_else(|_| serde_json::json!({ "message": text }));

        Ok(classify_placement(status, payload))
    }
}

/// Sort a placement response into accepted / bad price / failed
fn classify_placement(status: StatusCode, payload: Value) -> PlacementOutcome {
    let message = payload.get("message").and_then(Value::as_str).map(str::to_string);

    match message {
        Some(message) if message.contains(POST_ONLY_MESSAGE) => PlacementOutcome::PriceInvalid(message),
        Some(_) => PlacementOutcome::Failed(payload),
        None if status.is_success() && payload.get("id").is_some() => PlacementOutcome::Placed(payload),
        None => PlacementOutcome::Failed(payload),
    }
}

/// Pull `message` out of an error body, falling back to the raw text
fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| text.to_string())
}
