pub mod auth;
pub mod coinbase;

pub use auth::{ApiCredentials, AuthHeaders};
pub use coinbase::{CoinbaseClient, PRODUCTION_API_URL, SANDBOX_API_URL};

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::models::{Account, Candle, Granularity, OrderSide, Product, Stats24h};
use crate::Result;

/// Live view of an order the bot placed earlier
#[derive(Debug, Clone, PartialEq)]
pub enum OrderLookup {
    Found(Value),
    /// The exchange has no record of the id (cancelled by hand, or purged)
    NotFound,
}

/// How the exchange answered a new limit order
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementOutcome {
    /// Order payload, possibly already `rejected`
    Placed(Value),
    /// The price is not acceptable right now; the next run retries naturally
    PriceInvalid(String),
    /// Any other refusal; the payload is passed on for the failure notice
    Failed(Value),
}

/// Good-till-cancelled limit order
#[derive(Debug, Clone, Serialize)]
pub struct LimitOrderRequest {
    pub product_id: String,
    pub side: OrderSide,
    /// Price in quote currency
    pub price: Decimal,
    /// Quantity of base currency
    pub size: Decimal,
    #[serde(rename = "type")]
    pub order_type: &'static str,
}

impl LimitOrderRequest {
    pub fn new(product_id: &str, side: OrderSide, price: Decimal, size: Decimal) -> Self {
        Self {
            product_id: product_id.to_string(),
            side,
            price,
            size,
            order_type: "limit",
        }
    }
}

/// The slice of the exchange REST API the bot relies on
#[allow(async_fn_in_trait)]
pub trait Exchange {
    /// Market metadata for `market`; unknown markets are an error
    async fn product(&self, market: &str) -> Result<Product>;

    async fn accounts(&self) -> Result<Vec<Account>>;

    /// Most recent candles first, up to 300
    async fn candles(&self, market: &str, granularity: Granularity) -> Result<Vec<Candle>>;

    async fn stats_24h(&self, market: &str) -> Result<Stats24h>;

    async fn get_order(&self, order_id: &str) -> Result<OrderLookup>;

    /// Cancel an open order; a refusal (e.g. it filled meanwhile) is an error
    async fn cancel_order(&self, order_id: &str) -> Result<()>;

    async fn place_limit_order(&self, request: &LimitOrderRequest) -> Result<PlacementOutcome>;
}
