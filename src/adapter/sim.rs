//! In-memory simulated adapter. Used by the integration test suite to drive
//! the six end-to-end scenarios deterministically, and usable as a
//! paper-trading mode — mirroring the teacher's `SimExchange` role for its
//! `ExchangeClient` trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    AdapterFeatures, Balance, ExchangeAdapter, MarketInfo, OpenOrder, OrderStatus,
    PlaceOrderResult, Rates,
};
use crate::errors::Result;
use crate::types::Side;

#[derive(Debug, Clone)]
struct SimOrder {
    order: OpenOrder,
    pair: String,
}

pub struct SimAdapter {
    orders: Mutex<HashMap<String, SimOrder>>,
    balances: Mutex<HashMap<String, Balance>>,
    rates: Mutex<Rates>,
    market: MarketInfo,
    features: AdapterFeatures,
}

impl SimAdapter {
    pub fn new(mid: Decimal, base: &str, quote: &str, base_free: Decimal, quote_free: Decimal) -> Self {
        let mut balances = HashMap::new();
        balances.insert(
            base.to_string(),
            Balance {
                code: base.to_string(),
                free: base_free,
                frozen: Decimal::ZERO,
                total: base_free,
            },
        );
        balances.insert(
            quote.to_string(),
            Balance {
                code: quote.to_string(),
                free: quote_free,
                frozen: Decimal::ZERO,
                total: quote_free,
            },
        );
        SimAdapter {
            orders: Mutex::new(HashMap::new()),
            balances: Mutex::new(balances),
            rates: Mutex::new(Rates {
                bid: mid,
                ask: mid,
                volume: Decimal::ZERO,
                high: mid,
                low: mid,
            }),
            market: MarketInfo {
                coin1_decimals: 8,
                coin2_decimals: 2,
                coin1_min_amount: Decimal::new(1, 4),
                coin1_max_amount: Decimal::new(1_000_000, 0),
            },
            features: AdapterFeatures {
                open_orders_cache_sec: 1,
                order_number_limit: None,
                supports_order_detail: true,
            },
        }
    }

    /// Test hook: mark an order `filled` as the adapter's next reported
    /// truth, the way a real venue would after matching a trade.
    pub fn mark_filled(&self, order_id: &str) {
        let mut orders = self.orders.lock().unwrap();
        if let Some(entry) = orders.get_mut(order_id) {
            entry.order.status = OrderStatus::Filled;
            entry.order.amount_executed = entry.order.amount;
            entry.order.amount_left = Decimal::ZERO;
        }
    }

    pub fn set_balance(&self, code: &str, free: Decimal) {
        let mut balances = self.balances.lock().unwrap();
        balances.insert(
            code.to_string(),
            Balance {
                code: code.to_string(),
                free,
                frozen: Decimal::ZERO,
                total: free,
            },
        );
    }
}

#[async_trait]
impl ExchangeAdapter for SimAdapter {
    async fn place_order(
        &self,
        side: Side,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlaceOrderResult> {
        let id = Uuid::new_v4().to_string();
        let mut orders = self.orders.lock().unwrap();
        orders.insert(
            id.clone(),
            SimOrder {
                order: OpenOrder {
                    order_id: id.clone(),
                    side,
                    price,
                    amount,
                    amount_executed: Decimal::ZERO,
                    amount_left: amount,
                    status: OrderStatus::New,
                },
                pair: pair.to_string(),
            },
        );
        Ok(PlaceOrderResult {
            order_id: Some(id),
            message: None,
        })
    }

    async fn cancel_order(&self, order_id: &str, _side: Side, _pair: &str) -> Result<bool> {
        let mut orders = self.orders.lock().unwrap();
        Ok(orders.remove(order_id).is_some())
    }

    async fn cancel_all_orders(&self, pair: &str) -> Result<bool> {
        let mut orders = self.orders.lock().unwrap();
        orders.retain(|_, o| o.pair != pair);
        Ok(true)
    }

    async fn get_open_orders(&self, pair: &str) -> Result<Vec<OpenOrder>> {
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.pair == pair)
            .map(|o| o.order.clone())
            .collect())
    }

    async fn get_order_details(&self, order_id: &str, _pair: &str) -> Result<Option<OpenOrder>> {
        let orders = self.orders.lock().unwrap();
        Ok(orders.get(order_id).map(|o| o.order.clone()))
    }

    async fn get_balances(&self, nonzero_only: bool) -> Result<Vec<Balance>> {
        let balances = self.balances.lock().unwrap();
        Ok(balances
            .values()
            .filter(|b| !nonzero_only || b.total != Decimal::ZERO)
            .cloned()
            .collect())
    }

    async fn get_rates(&self, _pair: &str) -> Result<Rates> {
        Ok(self.rates.lock().unwrap().clone())
    }

    async fn market_info(&self, _pair: &str) -> Result<MarketInfo> {
        Ok(self.market.clone())
    }

    fn features(&self) -> AdapterFeatures {
        self.features.clone()
    }
}
