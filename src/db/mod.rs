// Order persistence
pub mod sqlite;

pub use sqlite::{OrderSnapshot, SqlitePersistence};

use crate::models::{Order, OrderSide, OrderStatus};
use crate::Result;

/// Where the bot keeps the orders it is tracking
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// Most recently created order for (market, side) whose status is in `statuses`
    async fn latest_order(
        &self,
        market: &str,
        side: OrderSide,
        statuses: &[OrderStatus],
    ) -> Result<Option<Order>>;

    /// Insert or update `order` and append a snapshot of it
    async fn save_order(&self, order: &Order) -> Result<()>;
}
