//! Closer (spec §4.5): idempotent bulk cancellation of orders flagged
//! `To be removed` or sitting at an out-of-range index, plus the one-shot
//! `ladderReInit` full-ladder wipe. Grounded on
//! `other_examples/286888ed_feothyuth-lr__examples-order_management-grid_batch_cancel_replace.rs.rs`
//! (batch cancel-then-replace) and the teacher's `MmExecutionEngine::cancel_all`.

use crate::adapter::ExchangeAdapter;
use crate::errors::Result;
use crate::journal::OrderJournal;
use crate::types::{LadderState, OrderRecord};

/// Outcome of one Closer pass. `residue` holds orders that *should* have
/// been cancelled but weren't (the adapter call failed) — their presence
/// tells the Builder the iteration must abort before placing anything new,
/// per spec §4.5.
pub struct CloseSummary {
    pub removed: Vec<String>,
    pub residue: Vec<OrderRecord>,
}

impl CloseSummary {
    pub fn is_clean(&self) -> bool {
        self.residue.is_empty()
    }
}

fn out_of_range(order: &OrderRecord, ladder_count: usize) -> bool {
    order.ladder_index < 0 || order.ladder_index >= ladder_count as i64
}

fn should_close(order: &OrderRecord, ladder_count: usize, close_all: bool) -> bool {
    close_all || order.ladder_state == LadderState::ToBeRemoved || out_of_range(order, ladder_count)
}

/// Cancels every qualifying order in `live_orders`, persisting each
/// transition to `Removed` as it succeeds. `pair` is passed straight to the
/// adapter's `cancel_order`; `close_all` implements the `ladderReInit`
/// one-shot wipe (spec §4.5: cancel regardless of state).
pub async fn close_orders(
    adapter: &dyn ExchangeAdapter,
    journal: &dyn OrderJournal,
    pair: &str,
    ladder_count: usize,
    live_orders: &[OrderRecord],
    close_all: bool,
) -> Result<CloseSummary> {
    let mut removed = Vec::new();
    let mut residue = Vec::new();

    for order in live_orders {
        if !should_close(order, ladder_count, close_all) {
            continue;
        }

        let cancelled = if order.is_virtual {
            // Nothing resting on the venue; a purely local record can be
            // dropped without a network round-trip.
            true
        } else {
            adapter.cancel_order(&order.order_id, order.side, pair).await?
        };

        if cancelled {
            let mut closed = order.clone();
            closed.set_state(LadderState::Removed);
            closed.mark_processed(None);
            closed.is_cancelled = true;
            journal.save(&closed).await?;
            removed.push(closed.order_id);
        } else {
            log::warn!(
                "closer: cancel failed for order {} ({} idx {}); leaving as residue",
                order.order_id,
                order.side,
                order.ladder_index
            );
            residue.push(order.clone());
        }
    }

    Ok(CloseSummary { removed, residue })
}

/// Filters a live set down to what the Closer would act on without running
/// the (async) cancellation pass — used by the Builder's
/// pre-reconciliation residue check.
pub fn has_closeable(live_orders: &[OrderRecord], ladder_count: usize) -> bool {
    live_orders
        .iter()
        .any(|o| should_close(o, ladder_count, false))
}
