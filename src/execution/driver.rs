use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::api::{Exchange, LimitOrderRequest, OrderLookup, PlacementOutcome};
use crate::db::OrderStore;
use crate::indicators::{find_ma_limit, MA_PERIOD};
use crate::models::{AmountDenomination, Granularity, Order, OrderSide, OrderStatus, Product};
use crate::notify::Notifier;
use crate::strategy::{decide, order_size, target_price, Direction, ExtremeScanner, ReplacementAction};
use crate::{BotError, Result};

/// What one invocation is asked to do
#[derive(Debug, Clone)]
pub struct TrailParams {
    pub market: String,
    pub side: OrderSide,
    /// Order value, in `amount_currency`
    pub amount: Decimal,
    /// Either side of the market, e.g. `USD` or `BTC` for `BTC-USD`
    pub amount_currency: String,
    /// Offset from the recent extreme in percent; negative buys dips, positive sells pumps
    pub percent_diff: Decimal,
    /// Cap the recent extreme at the last breached 200-period MA of 15-minute closes
    pub use_ma_limit: bool,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The tracked order already covers the target
    Unchanged(Order),
    /// A new order was accepted (possibly already `rejected`)
    Placed(Order),
    /// The exchange would not take the price right now
    PriceInvalid(String),
}

/// State carried from the order check into the scan
struct Tracked {
    order: Option<Order>,
    cutoff: Option<DateTime<Utc>>,
}

/// Runs one trailing cycle: reconcile the tracked order, rescan the market,
/// move the order if the target trailed.
pub struct Driver<'a, E, S, N> {
    exchange: &'a E,
    store: &'a S,
    notifier: &'a N,
    params: TrailParams,
    direction: Direction,
}

impl<'a, E, S, N> Driver<'a, E, S, N>
where
    E: Exchange,
    S: OrderStore,
    N: Notifier,
{
    pub fn new(exchange: &'a E, store: &'a S, notifier: &'a N, params: TrailParams) -> Result<Self> {
        let direction = Direction::from_percent_diff(params.percent_diff)?;
        if params.amount <= Decimal::ZERO {
            return Err(BotError::InvalidParameter(format!(
                "amount must be positive, got {}",
                params.amount
            )));
        }

        Ok(Self {
            exchange,
            store,
            notifier,
            params,
            direction,
        })
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let product = self.exchange.product(&self.params.market).await?;
        let denomination = product
            .denomination_of(&self.params.amount_currency)
            .ok_or_else(|| BotError::UnknownCurrency {
                currency: self.params.amount_currency.clone(),
                market: self.params.market.clone(),
            })?;

        tracing::info!(
            "Trailing {} {} {} {} at {}%",
            self.params.market,
            self.params.side,
            self.params.amount,
            self.params.amount_currency,
            self.params.percent_diff
        );
        self.log_balances(&product).await?;

        let tracked = self.reconcile_tracked_order(&product).await?;
        let cutoff = match tracked.cutoff {
            Some(cutoff) => Some(cutoff),
            None => self.last_done_cutoff().await?,
        };
        match cutoff {
            Some(cutoff) => tracing::info!("Scanning candles after {} (UTC)", cutoff),
            None => tracing::info!("Scanning the whole candle window"),
        }

        let ma_limit = if self.params.use_ma_limit {
            let candles = self
                .exchange
                .candles(&self.params.market, Granularity::FifteenMinutes)
                .await?;
            find_ma_limit(&candles, MA_PERIOD, self.direction, product.quote_increment)
        } else {
            None
        };

        let candles = self
            .exchange
            .candles(&self.params.market, Granularity::OneMinute)
            .await?;
        let stats = self.exchange.stats_24h(&self.params.market).await?;
        let current_price = product.round_quote(stats.last);

        let scan = ExtremeScanner::new(self.direction, product.quote_increment).scan(
            &candles,
            cutoff,
            current_price,
            ma_limit,
        );
        let target = target_price(scan.recent_extreme, self.params.percent_diff, product.quote_increment);

        tracing::info!(
            "recent_extreme: {} {} | target_price: {} {} ({}%) | current_price: {} {}",
            scan.recent_extreme,
            product.quote_currency,
            target,
            product.quote_currency,
            self.params.percent_diff,
            current_price,
            product.quote_currency
        );
        if let Some(order) = &tracked.order {
            tracing::info!(
                "current_order: {} {}",
                product.round_quote(order.target_price),
                product.quote_currency
            );
        }

        let decision = decide(
            tracked.order.as_ref().map(|o| o.target_price),
            target,
            self.direction,
        );
        tracing::info!("{}", decision.reason);

        match decision.action {
            ReplacementAction::Keep => match tracked.order {
                Some(order) => Ok(RunOutcome::Unchanged(order)),
                None => Err(BotError::InvalidParameter(
                    "keep decision without a tracked order".to_string(),
                )),
            },
            ReplacementAction::Replace { target_price } => {
                if let Some(mut existing) = tracked.order {
                    tracing::info!("Cancelling order {}", existing.order_id);
                    // On refusal the row stays active so the next run re-reads its real state
                    self.exchange
                        .cancel_order(&existing.order_id)
                        .await
                        .inspect_err(|e| {
                            tracing::warn!("Keeping order {} tracked: {}", existing.order_id, e)
                        })?;
                    existing.mark_cancelled();
                    self.store.save_order(&existing).await?;
                }
                self.place(&product, denomination, target_price).await
            }
        }
    }

    async fn log_balances(&self, product: &Product) -> Result<()> {
        let accounts = self.exchange.accounts().await?;
        for currency in [&product.base_currency, &product.quote_currency] {
            match accounts.iter().find(|a| &a.currency == currency) {
                Some(account) => tracing::info!(
                    "{} balance: {} (hold {}, available {})",
                    currency,
                    account.balance,
                    account.hold,
                    account.available
                ),
                None => tracing::warn!("No {} account found", currency),
            }
        }
        Ok(())
    }

    /// Load the active order, bring it up to date, and retire it if it
    /// finished since the last run.
    async fn reconcile_tracked_order(&self, product: &Product) -> Result<Tracked> {
        let Some(mut order) = self
            .store
            .latest_order(&self.params.market, self.params.side, &OrderStatus::ACTIVE)
            .await?
        else {
            tracing::info!("No open order. Creating a new one");
            return Ok(Tracked {
                order: None,
                cutoff: None,
            });
        };

        tracing::info!("Retrieved order {}: {}", order.id, order.order_id);

        let payload = match self.exchange.get_order(&order.order_id).await? {
            OrderLookup::NotFound => {
                tracing::warn!(
                    "Order {} not found on the exchange; marking it cancelled",
                    order.order_id
                );
                order.mark_cancelled();
                self.store.save_order(&order).await?;
                return Ok(Tracked {
                    order: None,
                    cutoff: None,
                });
            }
            OrderLookup::Found(payload) => payload,
        };

        let mut cutoff = Some(order.created);
        order.refresh(&payload, Some(self.params.percent_diff))?;
        self.store.save_order(&order).await?;

        if order.is_active() {
            return Ok(Tracked {
                order: Some(order),
                cutoff,
            });
        }

        tracing::debug!("Final order payload: {}", payload);
        let subject = if order.status == OrderStatus::Done {
            cutoff = Some(order.updated.unwrap_or(order.created));
            match self.direction {
                Direction::DipBuy => "Bought the dip!",
                Direction::PumpSell => "Sold the pump!",
            }
        } else {
            "ERROR:"
        };

        let summary = format!(
            "{} {} order of {} {} {} @ {} {}",
            self.params.market,
            self.params.side,
            self.params.amount,
            self.params.amount_currency,
            order.status,
            order.target_price,
            product.quote_currency
        );
        tracing::info!("DONE: {}", summary);
        self.notifier
            .publish(&format!("{} {}", subject, summary), &pretty(&payload))
            .await;

        Ok(Tracked { order: None, cutoff })
    }

    /// Creation time of the last filled order, so a cold start picks up
    /// where it left off.
    async fn last_done_cutoff(&self) -> Result<Option<DateTime<Utc>>> {
        let previous = self
            .store
            .latest_order(&self.params.market, self.params.side, &[OrderStatus::Done])
            .await?;

        Ok(previous.map(|order| {
            tracing::info!("Using order {}'s created: {}", order.id, order.created);
            order.created
        }))
    }

    async fn place(
        &self,
        product: &Product,
        denomination: AmountDenomination,
        target_price: Decimal,
    ) -> Result<RunOutcome> {
        let size = order_size(self.params.amount, denomination, target_price, product.base_increment)?;
        if size < product.base_min_size {
            tracing::warn!(
                "Order size {} {} is below the market minimum {}",
                size,
                product.base_currency,
                product.base_min_size
            );
        }

        tracing::info!(
            "Placing limit order: {} {} {} {} @ {} {} (value {} {})",
            self.params.market,
            self.params.side,
            size,
            product.base_currency,
            target_price,
            product.quote_currency,
            product.round_quote(size * target_price),
            product.quote_currency
        );

        let request = LimitOrderRequest::new(&product.id, self.params.side, target_price, size);
        match self.exchange.place_limit_order(&request).await? {
            PlacementOutcome::Placed(payload) => {
                tracing::debug!("Placement response: {}", payload);
                let order = Order::from_exchange(&payload, Some(self.params.percent_diff))?;
                if order.status == OrderStatus::Rejected {
                    tracing::warn!(
                        "{} order rejected @ {} {}",
                        self.params.market,
                        target_price,
                        product.quote_currency
                    );
                }
                self.store.save_order(&order).await?;
                Ok(RunOutcome::Placed(order))
            }
            PlacementOutcome::PriceInvalid(message) => {
                tracing::info!("{} at {} {}", message, target_price, product.quote_currency);
                Ok(RunOutcome::PriceInvalid(message))
            }
            PlacementOutcome::Failed(payload) => {
                let subject = format!(
                    "Could not place {} {} order for {} {}",
                    self.params.market, self.params.side, self.params.amount, self.params.amount_currency
                );
                tracing::error!("{}: {}", subject, payload);
                self.notifier.publish(&subject, &pretty(&payload)).await;

                let message = payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string());
                Err(BotError::PlacementFailed(message))
            }
        }
    }
}

fn pretty(payload: &Value) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}
