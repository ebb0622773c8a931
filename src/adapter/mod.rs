//! Exchange Adapter contract (spec §6): the venue-agnostic surface the
//! ladder engine drives. One concrete implementation is provided
//! (`bitfinex`, HMAC-REST) plus an in-memory `sim` adapter used by tests and
//! as a paper-trading mode.

pub mod bitfinex;
pub mod sim;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartFilled,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub amount_executed: Decimal,
    pub amount_left: Decimal,
    pub status: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderResult {
    pub order_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Balance {
    pub code: String,
    pub free: Decimal,
    pub frozen: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone)]
pub struct Rates {
    pub bid: Decimal,
    pub ask: Decimal,
    pub volume: Decimal,
    pub high: Decimal,
    pub low: Decimal,
}

impl Rates {
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

#[derive(Debug, Clone)]
pub struct MarketInfo {
    pub coin1_decimals: u32,
    pub coin2_decimals: u32,
    pub coin1_min_amount: Decimal,
    pub coin1_max_amount: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct AdapterFeatures {
    pub open_orders_cache_sec: u64,
    pub order_number_limit: Option<u32>,
    pub supports_order_detail: bool,
}

/// Uniform operations the core requires from a venue. Every call suspends;
/// no operation may block the executor thread.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    async fn place_order(
        &self,
        side: Side,
        pair: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Result<PlaceOrderResult>;

    async fn cancel_order(&self, order_id: &str, side: Side, pair: &str) -> Result<bool>;

    async fn cancel_all_orders(&self, pair: &str) -> Result<bool>;

    async fn get_open_orders(&self, pair: &str) -> Result<Vec<OpenOrder>>;

    /// Optional capability; adapters that cannot look up a single order
    /// should return `Ok(None)` rather than erroring, and callers fall back
    /// to `get_open_orders`.
    async fn get_order_details(&self, order_id: &str, pair: &str) -> Result<Option<OpenOrder>>;

    async fn get_balances(&self, nonzero_only: bool) -> Result<Vec<Balance>>;

    async fn get_rates(&self, pair: &str) -> Result<Rates>;

    async fn market_info(&self, pair: &str) -> Result<MarketInfo>;

    fn features(&self) -> AdapterFeatures;
}
