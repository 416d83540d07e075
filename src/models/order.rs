use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::OrderSide;
use crate::timestamps::parse_exchange_datetime;
use crate::{BotError, Result};

/// Exchange order status.
///
/// Only `open` and `pending` count as active. Statuses the bot has no name
/// for are kept verbatim and treated as finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Pending,
    Done,
    Cancelled,
    Rejected,
    Other(String),
}

impl OrderStatus {
    pub const ACTIVE: [OrderStatus; 2] = [OrderStatus::Open, OrderStatus::Pending];

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Open => "open",
            OrderStatus::Pending => "pending",
            OrderStatus::Done => "done",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Other(s) => s,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::Pending)
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        match value {
            "open" => OrderStatus::Open,
            "pending" => OrderStatus::Pending,
            "done" => OrderStatus::Done,
            "cancelled" => OrderStatus::Cancelled,
            "rejected" => OrderStatus::Rejected,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trailing order the bot is tracking, mirrored from the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Local row id
    pub id: Uuid,
    /// Exchange-assigned order id
    pub order_id: String,
    pub percent_diff: Option<Decimal>,
    pub target_price: Decimal,
    pub size: Decimal,
    pub market_name: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub done_reason: Option<String>,
    pub created: DateTime<Utc>,
    /// Completion time, once the exchange reports one
    pub updated: Option<DateTime<Utc>>,
    /// Last exchange payload, verbatim
    pub raw_data: Value,
}

/// Fields pulled out of an exchange order payload
struct ParsedOrder {
    order_id: String,
    target_price: Decimal,
    size: Decimal,
    market_name: String,
    side: OrderSide,
    status: OrderStatus,
    created: DateTime<Utc>,
    done: Option<(DateTime<Utc>, Option<String>)>,
}

impl Order {
    /// Start tracking an order from the exchange's placement or lookup payload
    pub fn from_exchange(payload: &Value, percent_diff: Option<Decimal>) -> Result<Self> {
        let parsed = parse_payload(payload)?;
        let (updated, done_reason) = match parsed.done {
            Some((at, reason)) => (Some(at), reason),
            None => (None, None),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            order_id: parsed.order_id,
            percent_diff,
            target_price: parsed.target_price,
            size: parsed.size,
            market_name: parsed.market_name,
            side: parsed.side,
            status: parsed.status,
            done_reason,
            created: parsed.created,
            updated,
            raw_data: payload.clone(),
        })
    }

    /// Overwrite this record with the exchange's latest view of the order.
    ///
    /// Nothing is modified if the payload is incomplete.
    pub fn refresh(&mut self, payload: &Value, percent_diff: Option<Decimal>) -> Result<()> {
        let parsed = parse_payload(payload)?;

        self.order_id = parsed.order_id;
        self.percent_diff = percent_diff;
        self.target_price = parsed.target_price;
        self.size = parsed.size;
        self.market_name = parsed.market_name;
        self.side = parsed.side;
        self.status = parsed.status;
        self.created = parsed.created;
        self.raw_data = payload.clone();
        if let Some((done_at, reason)) = parsed.done {
            self.updated = Some(done_at);
            self.done_reason = reason;
        }

        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// The exchange no longer knows this order (cancelled outside the bot)
    pub fn mark_cancelled(&mut self) {
        self.status = OrderStatus::Cancelled;
    }
}

fn parse_payload(payload: &Value) -> Result<ParsedOrder> {
    parse_fields(payload).inspect_err(|e| {
        tracing::error!("Unusable order payload ({}): {}", e, payload);
    })
}

fn parse_fields(payload: &Value) -> Result<ParsedOrder> {
    let side_str = required_str(payload, "side")?;
    let side = OrderSide::parse(side_str)
        .ok_or_else(|| BotError::InvalidParameter(format!("unknown order side {side_str}")))?;

    let done = match payload.get("done_at").and_then(Value::as_str) {
        Some(done_at) => Some((
            parse_exchange_datetime(done_at)?,
            payload
                .get("done_reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        )),
        None => None,
    };

    Ok(ParsedOrder {
        order_id: required_str(payload, "id")?.to_string(),
        target_price: Decimal::from_str(required_str(payload, "price")?)?,
        size: Decimal::from_str(required_str(payload, "size")?)?,
        market_name: required_str(payload, "product_id")?.to_string(),
        side,
        status: OrderStatus::from(required_str(payload, "status")?),
        created: parse_exchange_datetime(required_str(payload, "created_at")?)?,
        done,
    })
}

fn required_str<'a>(payload: &'a Value, field: &'static str) -> Result<&'a str> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .ok_or(BotError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn pending_payload() -> Value {
        json!({
            "id": "d0c5340b-6d6c-49d9-b567-48c4bfca13d2",
            "price": "9000.00000000",
            "size": "0.00155556",
            "product_id": "BTC-USD",
            "side": "buy",
            "stp": "dc",
            "type": "limit",
            "time_in_force": "GTC",
            "post_only": false,
            "created_at": "2020-03-31T17:19:03.162429Z",
            "fill_fees": "0.0000000000000000",
            "filled_size": "0.00000000",
            "executed_value": "0.0000000000000000",
            "status": "pending",
            "settled": false
        })
    }

    fn done_payload() -> Value {
        let mut payload = pending_payload();
        payload["status"] = json!("done");
        payload["done_at"] = json!("2020-03-31T17:21:43.922Z");
        payload["done_reason"] = json!("filled");
        payload
    }

    #[test]
    fn test_from_exchange_pending() {
        let order = Order::from_exchange(&pending_payload(), Some(dec!(-10.0))).unwrap();

        assert_eq!(order.order_id, "d0c5340b-6d6c-49d9-b567-48c4bfca13d2");
        assert_eq!(order.target_price, dec!(9000));
        assert_eq!(order.size, dec!(0.00155556));
        assert_eq!(order.side, OrderSide::Buy);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.is_active());
        assert!(order.updated.is_none());
        assert_eq!(order.raw_data, pending_payload());
    }

    #[test]
    fn test_refresh_to_done_sets_completion() {
        let mut order = Order::from_exchange(&pending_payload(), Some(dec!(-10.0))).unwrap();
        let id = order.id;

        order.refresh(&done_payload(), Some(dec!(-10.0))).unwrap();

        assert_eq!(order.id, id);
        assert_eq!(order.status, OrderStatus::Done);
        assert!(!order.is_active());
        assert_eq!(order.done_reason.as_deref(), Some("filled"));
        assert_eq!(
            order.updated,
            Some(parse_exchange_datetime("2020-03-31T17:21:43.922Z").unwrap())
        );
    }

    #[test]
    fn test_refresh_missing_field_leaves_record_untouched() {
        let mut order = Order::from_exchange(&pending_payload(), None).unwrap();
        let before = order.clone();

        let mut broken = done_payload();
        broken.as_object_mut().unwrap().remove("price");

        let err = order.refresh(&broken, None).unwrap_err();
        assert!(matches!(err, BotError::MissingField("price")));
        assert_eq!(order, before);
    }

    #[test]
    fn test_unknown_status_is_not_active() {
        let mut payload = pending_payload();
        payload["status"] = json!("active");

        let order = Order::from_exchange(&payload, None).unwrap();
        assert_eq!(order.status, OrderStatus::Other("active".to_string()));
        assert!(!order.is_active());
    }

    #[test]
    fn test_mark_cancelled() {
        let mut order = Order::from_exchange(&pending_payload(), None).unwrap();
        order.mark_cancelled();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(!order.is_active());
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in ["open", "pending", "done", "cancelled", "rejected", "received"] {
            assert_eq!(OrderStatus::from(status).as_str(), status);
        }
    }
}
