use chrono::{Duration, Utc};
use mockito::{Matcher, Mock, ServerGuard};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use trailbot::api::{ApiCredentials, CoinbaseClient};
use trailbot::db::{OrderStore, SqlitePersistence};
use trailbot::execution::{Driver, RunOutcome, TrailParams};
use trailbot::notify::WebhookNotifier;
use trailbot::{Order, OrderSide, OrderStatus};

fn credentials() -> ApiCredentials {
    ApiCredentials {
        api_key: "sandbox-key".to_string(),
        api_secret: "c2FuZGJveA==".to_string(),
        passphrase: "sandbox-pass".to_string(),
    }
}

fn params() -> TrailParams {
    TrailParams {
        market: "BTC-USD".to_string(),
        side: OrderSide::Buy,
        amount: dec!(14),
        amount_currency: "USD".to_string(),
        percent_diff: dec!(-10.0),
        use_ma_limit: false,
    }
}

fn order_json(id: &str, price: &str, status: &str, created_minutes_ago: i64) -> Value {
    json!({
        "id": id,
        "price": price,
        "size": "0.00155556",
        "product_id": "BTC-USD",
        "side": "buy",
        "stp": "dc",
        "type": "limit",
        "time_in_force": "GTC",
        "post_only": false,
        "created_at": (Utc::now() - Duration::minutes(created_minutes_ago)).to_rfc3339(),
        "fill_fees": "0.0000000000000000",
        "filled_size": "0.00000000",
        "executed_value": "0.0000000000000000",
        "status": status,
        "settled": false
    })
}

/// Market endpoints every run touches: recent high 10000.00, last trade 9950
async fn mock_market(server: &mut ServerGuard) -> Vec<Mock> {
    let now = Utc::now().timestamp();
    let candles = json!([
        [now - 60, 9940, 9960, 9950, 9950, 1.5],
        [now - 120, 9950, 10000, 9960, 9990, 2.0],
        [now - 180, 9900, 9980, 9910, 9970, 0.7]
    ]);

    vec![
        server
            .mock("GET", "/products")
            .with_body(
                json!([{
                    "id": "BTC-USD",
                    "base_currency": "BTC",
                    "quote_currency": "USD",
                    "base_min_size": "0.0001",
                    "base_increment": "0.00000001",
                    "quote_increment": "0.01000000"
                }])
                .to_string(),
            )
            .create_async()
            .await,
        server
            .mock("GET", "/accounts")
            .with_body(
                json!([
                    {"currency": "USD", "balance": "100.00", "hold": "0.00", "available": "100.00"},
                    {"currency": "BTC", "balance": "0.01", "hold": "0.00", "available": "0.01"}
                ])
                .to_string(),
            )
            .create_async()
            .await,
        server
            .mock("GET", "/products/BTC-USD/candles")
            .match_query(Matcher::UrlEncoded("granularity".into(), "60".into()))
            .with_body(candles.to_string())
            .create_async()
            .await,
        server
            .mock("GET", "/products/BTC-USD/stats")
            .with_body(
                json!({
                    "open": "9800.00", "high": "10000.00", "low": "9700.00",
                    "last": "9950.00", "volume": "1200.5"
                })
                .to_string(),
            )
            .create_async()
            .await,
    ]
}

#[tokio::test]
async fn test_cold_start_places_and_records_order() {
    let mut server = mockito::Server::new_async().await;
    let _market = mock_market(&mut server).await;
    let placement = server
        .mock("POST", "/orders")
        .match_header("CB-ACCESS-KEY", "sandbox-key")
        .match_body(Matcher::PartialJson(json!({
            "product_id": "BTC-USD",
            "side": "buy",
            "price": "9000.00",
            "size": "0.00155556",
            "type": "limit"
        })))
        .with_body(order_json("new-order", "9000.00000000", "pending", 0).to_string())
        .create_async()
        .await;

    let exchange = CoinbaseClient::new(&server.url(), Some(credentials())).unwrap();
    let store = SqlitePersistence::new("sqlite::memory:").await.unwrap();
    let notifier = WebhookNotifier::new(None);

    let outcome = Driver::new(&exchange, &store, &notifier, params())
        .unwrap()
        .run()
        .await
        .unwrap();

    placement.assert_async().await;
    assert!(matches!(outcome, RunOutcome::Placed(ref o) if o.order_id == "new-order"));

    let stored = store
        .latest_order("BTC-USD", OrderSide::Buy, &OrderStatus::ACTIVE)
        .await
        .unwrap()
        .expect("placed order should be tracked");
    assert_eq!(stored.target_price, dec!(9000.00));
    assert_eq!(stored.size, dec!(0.00155556));
}

#[tokio::test]
async fn test_filled_order_is_announced_and_replaced() {
    let mut server = mockito::Server::new_async().await;
    let _market = mock_market(&mut server).await;

    let store = SqlitePersistence::new("sqlite::memory:").await.unwrap();
    let tracked = Order::from_exchange(&order_json("filled", "8000.00", "open", 600), Some(dec!(-10.0))).unwrap();
    store.save_order(&tracked).await.unwrap();

    let mut done = order_json("filled", "8000.00", "done", 600);
    done["done_at"] = json!((Utc::now() - Duration::minutes(5)).to_rfc3339());
    done["done_reason"] = json!("filled");
    let lookup = server
        .mock("GET", "/orders/filled")
        .with_body(done.to_string())
        .create_async()
        .await;

    let hook = server
        .mock("POST", "/hook")
        .match_body(Matcher::Regex("Bought the dip! BTC-USD buy order of 14 USD done".to_string()))
        .expect(1)
        .create_async()
        .await;

    let placement = server
        .mock("POST", "/orders")
        .with_body(order_json("next-order", "9000.00", "pending", 0).to_string())
        .expect(1)
        .create_async()
        .await;

    let exchange = CoinbaseClient::new(&server.url(), Some(credentials())).unwrap();
    let notifier = WebhookNotifier::new(Some(format!("{}/hook", server.url())));

    Driver::new(&exchange, &store, &notifier, params())
        .unwrap()
        .run()
        .await
        .unwrap();

    lookup.assert_async().await;
    hook.assert_async().await;
    placement.assert_async().await;

    let active = store
        .latest_order("BTC-USD", OrderSide::Buy, &OrderStatus::ACTIVE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.order_id, "next-order");

    let history = store.snapshots(tracked.id).await.unwrap();
    assert_eq!(history.last().unwrap().status, OrderStatus::Done);
}

#[tokio::test]
async fn test_rejected_placement_is_recorded_but_inactive() {
    let mut server = mockito::Server::new_async().await;
    let _market = mock_market(&mut server).await;
    let _placement = server
        .mock("POST", "/orders")
        .with_body(order_json("rejected-order", "9000.00", "rejected", 0).to_string())
        .create_async()
        .await;

    let exchange = CoinbaseClient::new(&server.url(), Some(credentials())).unwrap();
    let store = SqlitePersistence::new("sqlite::memory:").await.unwrap();
    let notifier = WebhookNotifier::new(None);

    let outcome = Driver::new(&exchange, &store, &notifier, params())
        .unwrap()
        .run()
        .await
        .unwrap();

    let RunOutcome::Placed(order) = outcome else {
        panic!("expected the rejected order to be recorded");
    };
    assert_eq!(order.status, OrderStatus::Rejected);
    assert!(store
        .latest_order("BTC-USD", OrderSide::Buy, &OrderStatus::ACTIVE)
        .await
        .unwrap()
        .is_none());
}
