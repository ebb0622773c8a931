//! Core data types shared across the ladder engine: sides, ladder states, and
//! the persisted order record.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The ladder state machine. Variants map to the exact string labels the
/// journal persists, so renaming a variant is a breaking change to stored
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum LadderState {
    #[serde(rename = "Not placed")]
    NotPlaced(NotPlacedReason),
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "Partly filled")]
    PartlyFilled,
    #[serde(rename = "Filled")]
    Filled,
    #[serde(rename = "Missed")]
    Missed,
    #[serde(rename = "To be removed")]
    ToBeRemoved,
    #[serde(rename = "Removed")]
    Removed,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl LadderState {
    /// `undefined` is never persisted; it is represented as "no record at
    /// this slot" rather than a state variant.
    pub fn label(&self) -> &'static str {
        match self {
            LadderState::NotPlaced(_) => "Not placed",
            LadderState::Open => "Open",
            LadderState::PartlyFilled => "Partly filled",
            LadderState::Filled => "Filled",
            LadderState::Missed => "Missed",
            LadderState::ToBeRemoved => "To be removed",
            LadderState::Removed => "Removed",
            LadderState::Cancelled => "Cancelled",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(
            self,
            LadderState::Open | LadderState::PartlyFilled | LadderState::NotPlaced(_)
        )
    }

    pub fn is_replaceable(&self) -> bool {
        matches!(
            self,
            LadderState::NotPlaced(_) | LadderState::Cancelled | LadderState::Missed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotPlacedReason {
    MinimalOrderAmountNotMet,
    NotEnoughBalances,
    NoOrderIdReturned,
    RatesUnavailable,
    AdapterError(String),
}

impl std::fmt::Display for NotPlacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            NotPlacedReason::MinimalOrderAmountNotMet => "Minimal order amount is not met",
            NotPlacedReason::NotEnoughBalances => "Not enough balances",
            NotPlacedReason::NoOrderIdReturned => "No order id returned",
            NotPlacedReason::RatesUnavailable => "rates unavailable",
            NotPlacedReason::AdapterError(m) => m.as_str(),
        };
        write!(f, "{}", msg)
    }
}

/// Provenance captured on the cross-side order when a fill marks it for
/// removal. Kept as its own struct (rather than a splat copy of the filled
/// order) so the target record's own identity fields are never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossOrderInfo {
    pub cross_order_id: Option<String>,
    pub cross_order_index: Option<u32>,
    pub cross_order_type: Option<Side>,
    pub cross_order_price: Option<Decimal>,
}

/// A single ladder rung's persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub purpose: String,
    pub pair: String,
    pub exchange: String,
    pub side: Side,

    pub order_id: String,
    pub is_virtual: bool,

    pub price: Decimal,
    pub coin1_amount: Decimal,
    pub coin2_amount: Decimal,
    pub coin1_amount_initial: Decimal,

    pub ladder_index: i64,
    pub ladder_previous_index: Option<i64>,
    pub ladder_previous_order_id: Option<String>,
    pub ladder_replaced_by_order_id: Option<String>,

    pub ladder_state: LadderState,
    pub ladder_previous_state: Option<LadderState>,

    #[serde(default)]
    pub cross_order: CrossOrderInfo,

    pub is_processed: bool,
    pub is_executed: bool,
    pub is_closed: bool,
    pub is_cancelled: bool,

    pub created_at: DateTime<Utc>,
    pub ladder_update_date: DateTime<Utc>,
}

impl OrderRecord {
    /// A brand-new virtual rung before its first placement attempt.
    pub fn new_virtual(
        pair: &str,
        exchange: &str,
        side: Side,
        ladder_index: i64,
        price: Decimal,
        coin1_amount: Decimal,
        coin2_amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        OrderRecord {
            purpose: "ladder".to_string(),
            pair: pair.to_string(),
            exchange: exchange.to_string(),
            side,
            order_id: format!("virtual-{}", Uuid::new_v4()),
            is_virtual: true,
            price,
            coin1_amount,
            coin2_amount,
            coin1_amount_initial: coin1_amount,
            ladder_index,
            ladder_previous_index: None,
            ladder_previous_order_id: None,
            ladder_replaced_by_order_id: None,
            ladder_state: LadderState::NotPlaced(NotPlacedReason::NoOrderIdReturned),
            ladder_previous_state: None,
            cross_order: CrossOrderInfo::default(),
            is_processed: false,
            is_executed: false,
            is_closed: false,
            is_cancelled: false,
            created_at: now,
            ladder_update_date: now,
        }
    }

    pub fn set_state(&mut self, state: LadderState) {
        self.ladder_previous_state = Some(self.ladder_state.clone());
        self.ladder_state = state;
        self.ladder_update_date = Utc::now();
    }

    pub fn mark_processed(&mut self, replaced_by: Option<String>) {
        self.is_processed = true;
        self.is_closed = true;
        self.ladder_replaced_by_order_id = replaced_by;
        self.ladder_update_date = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn opposite_side_round_trips() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn not_placed_is_replaceable_open_is_not() {
        let reason = LadderState::NotPlaced(NotPlacedReason::NotEnoughBalances);
        assert!(reason.is_replaceable());
        assert!(!LadderState::Open.is_replaceable());
    }

    #[test]
    fn new_virtual_order_starts_not_placed() {
        let rec = OrderRecord::new_virtual(
            "BTC/USDT",
            "bitfinex",
            Side::Buy,
            0,
            dec!(99.00),
            dec!(0.1),
            dec!(9.9),
        );
        assert!(rec.is_virtual);
        assert!(!rec.is_processed);
        assert_eq!(rec.ladder_state.label(), "Not placed");
    }

    #[test]
    fn set_state_tracks_previous() {
        let mut rec = OrderRecord::new_virtual(
            "BTC/USDT",
            "bitfinex",
            Side::Buy,
            0,
            dec!(99.00),
            dec!(0.1),
            dec!(9.9),
        );
        rec.set_state(LadderState::Open);
        assert_eq!(rec.ladder_state, LadderState::Open);
        assert_eq!(
            rec.ladder_previous_state,
            Some(LadderState::NotPlaced(NotPlacedReason::NoOrderIdReturned))
        );
    }
}
