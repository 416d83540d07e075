use crate::db::OrderStore;
use crate::models::{Order, OrderSide, OrderStatus};
use crate::{BotError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_id, percent_diff, target_price, size, market_name, side, \
                             status, done_reason, created, updated, raw_data";

/// One saved state of an order, oldest first
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub target_price: Decimal,
    pub raw_data: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// SQLite persistence for tracked orders
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    /// Open (creating if needed) the database and run migrations
    ///
    /// # Arguments
    /// * `database_url` - e.g. `sqlite://data.db` or `sqlite::memory:`
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Single writer; also keeps an in-memory database alive between queries
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::debug!("Opened order database at {}", database_url);

        Ok(Self { pool })
    }

    /// Every saved state of the order with local id `id`
    pub async fn snapshots(&self, id: Uuid) -> Result<Vec<OrderSnapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT status, target_price, raw_data, recorded_at
            FROM order_snapshots
            WHERE order_row_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<OrderSnapshot> {
                let status: String = row.try_get("status")?;
                let target_price: String = row.try_get("target_price")?;
                let raw_data: String = row.try_get("raw_data")?;
                Ok(OrderSnapshot {
                    status: OrderStatus::from(status.as_str()),
                    target_price: Decimal::from_str(&target_price)?,
                    raw_data: serde_json::from_str(&raw_data)?,
                    recorded_at: row.try_get("recorded_at")?,
                })
            })
            .collect()
    }
}

impl OrderStore for SqlitePersistence {
    async fn latest_order(
        &self,
        market: &str,
        side: OrderSide,
        statuses: &[OrderStatus],
    ) -> Result<Option<Order>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM orders WHERE market_name = ", ORDER_COLUMNS));
        query.push_bind(market.to_string());
        query.push(" AND side = ");
        query.push_bind(side.as_str());
        query.push(" AND status IN (");
        let mut in_list = query.separated(", ");
        for status in statuses {
            in_list.push_bind(status.as_str().to_string());
        }
        in_list.push_unseparated(") ORDER BY created DESC LIMIT 1");

        let row = query.build().fetch_optional(&self.pool).await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn save_order(&self, order: &Order) -> Result<()> {
        let raw_data = serde_json::to_string(&order.raw_data)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_id, percent_diff, target_price, size, market_name,
                side, status, done_reason, created, updated, raw_data
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                order_id = excluded.order_id,
                percent_diff = excluded.percent_diff,
                target_price = excluded.target_price,
                size = excluded.size,
                market_name = excluded.market_name,
                side = excluded.side,
                status = excluded.status,
                done_reason = excluded.done_reason,
                created = excluded.created,
                updated = excluded.updated,
                raw_data = excluded.raw_data
            "#,
        )
        .bind(order.id)
        .bind(&order.order_id)
        .bind(order.percent_diff.map(|d| d.to_string()))
        .bind(order.target_price.to_string())
        .bind(order.size.to_string())
        .bind(&order.market_name)
        .bind(order.side.as_str())
        .bind(order.status.as_str())
        .bind(&order.done_reason)
        .bind(order.created)
        .bind(order.updated)
        .bind(&raw_data)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO order_snapshots (order_row_id, status, target_price, raw_data, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id)
        .bind(order.status.as_str())
        .bind(order.target_price.to_string())
        .bind(&raw_data)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            "Saved order {} ({}) as {}",
            order.id,
            order.order_id,
            order.status
        );

        Ok(())
    }
}

fn order_from_row(row: &SqliteRow) -> Result<Order> {
    let percent_diff: Option<String> = row.try_get("percent_diff")?;
    let target_price: String = row.try_get("target_price")?;
    let size: String = row.try_get("size")?;
    let side: String = row.try_get("side")?;
    let status: String = row.try_get("status")?;
    let raw_data: String = row.try_get("raw_data")?;

    Ok(Order {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        percent_diff: percent_diff.as_deref().map(Decimal::from_str).transpose()?,
        target_price: Decimal::from_str(&target_price)?,
        size: Decimal::from_str(&size)?,
        market_name: row.try_get("market_name")?,
        side: OrderSide::parse(&side)
            .ok_or_else(|| BotError::InvalidParameter(format!("stored order has side {side}")))?,
        status: OrderStatus::from(status.as_str()),
        done_reason: row.try_get("done_reason")?,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
        raw_data: serde_json::from_str(&raw_data)?,
    })
}
