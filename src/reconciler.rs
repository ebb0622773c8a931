//! Reconciler (spec §4.3): classifies each persisted order's actual state
//! against exchange truth, confirms or demotes ambiguous local fills, and
//! tracks the per-side fill bookkeeping the Builder needs for index
//! shifting and mid-price recomputation.
//!
//! Grounded on the teacher's `InternalInventory::reconcile` (diff internal
//! vs. live state, log and correct on mismatch) and
//! `MmExecutionEngine::reconcile_after_reconnect` (cancel → fetch live →
//! diff → resume), generalized from a net-position diff into a per-order
//! state-machine classification.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::adapter::OrderStatus;
use crate::types::{LadderState, OrderRecord, Side};

/// Per-iteration bookkeeping of confirmed fills, keyed by side. Zeroed at
/// the start of every iteration; never persisted.
#[derive(Debug, Default)]
pub struct IterationFills {
    max_filled_order_index: HashMap<Side, i64>,
    filled_order_prices: HashMap<Side, Vec<Decimal>>,
}

impl IterationFills {
    pub fn new() -> Self {
        IterationFills::default()
    }

    pub fn record_fill(&mut self, side: Side, index: i64, price: Decimal) {
        let max = self.max_filled_order_index.entry(side).or_insert(-1);
        if index > *max {
            *max = index;
        }
        self.filled_order_prices.entry(side).or_default().push(price);
    }

    /// `maxFilledOrderIndex[side]`. `None` means no fill observed this side
    /// this iteration.
    pub fn max_filled_index(&self, side: Side) -> Option<i64> {
        self.max_filled_order_index.get(&side).copied()
    }

    /// Count of confirmed fills on `side` this iteration — the `m` used by
    /// the Builder's index-shift formula.
    pub fn fill_count(&self, side: Side) -> i64 {
        self.filled_order_prices.get(&side).map(|v| v.len() as i64).unwrap_or(0)
    }

    /// `filledOrderPrices[side]`, indexed by fill-observation order within
    /// this iteration's walk (0 = first fill encountered) per the Open
    /// Question resolution recorded in DESIGN.md.
    pub fn prices(&self, side: Side) -> &[Decimal] {
        self.filled_order_prices
            .get(&side)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// The result of reconciling one order against adapter truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No state change, or a change (e.g. Open -> Partly filled) that
    /// doesn't affect cross-side bookkeeping.
    Unchanged,
    /// A locally `Filled` record could not be confirmed and was demoted.
    Demoted,
    /// A fill was confirmed; the cross-side rung at `cross_index` must be
    /// flagged `To be removed`.
    ConfirmedFill { cross_index: i64 },
}

/// Normalizes an adapter-reported `OpenOrder` status into the ladder
/// engine's vocabulary. `None` means the adapter could not be queried
/// (transient I/O failure) — reconciliation must treat this conservatively.
pub fn reconcile_order(
    order: &mut OrderRecord,
    ladder_count: usize,
    adapter_status: Option<OrderStatus>,
    previous_same_side_state: Option<&LadderState>,
    previous_filled_order_states: &[String],
    fills: &mut IterationFills,
) -> ReconcileOutcome {
    match order.ladder_state.clone() {
        LadderState::Open | LadderState::PartlyFilled => match adapter_status {
            Some(OrderStatus::Filled) => {
                order.set_state(LadderState::Filled);
                confirm_fill(order, ladder_count, fills)
            }
            Some(OrderStatus::PartFilled) => {
                order.set_state(LadderState::PartlyFilled);
                ReconcileOutcome::Unchanged
            }
            Some(OrderStatus::Cancelled) => {
                order.set_state(LadderState::Cancelled);
                ReconcileOutcome::Unchanged
            }
            Some(OrderStatus::New) | None => ReconcileOutcome::Unchanged,
        },
        LadderState::Filled => {
            let api_confirms = matches!(
                adapter_status,
                Some(OrderStatus::Filled) | Some(OrderStatus::PartFilled)
            );
            let heuristic_confirms = previous_same_side_state
                .map(|s| previous_filled_order_states.iter().any(|allowed| allowed == s.label()))
                .unwrap_or(false);

            if api_confirms || heuristic_confirms {
                confirm_fill(order, ladder_count, fills)
            } else {
                order.set_state(LadderState::Missed);
                ReconcileOutcome::Demoted
            }
        }
        _ => ReconcileOutcome::Unchanged,
    }
}

fn confirm_fill(order: &mut OrderRecord, ladder_count: usize, fills: &mut IterationFills) -> ReconcileOutcome {
    order.is_executed = true;
    order.mark_processed(None);
    fills.record_fill(order.side, order.ladder_index, order.price);
    let cross_index = ladder_count as i64 - 1 - order.ladder_index;
    ReconcileOutcome::ConfirmedFill { cross_index }
}
