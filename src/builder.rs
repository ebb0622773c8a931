//! Ladder Builder (spec §4.4): the per-iteration orchestrator. For each
//! side, walks indices `0..N-1`, reconciling the existing slot against
//! exchange truth, placing a fresh rung wherever a slot is empty or
//! re-placeable, then (once both sides are done) shifts surviving indices
//! and recomputes the mid-price from this iteration's confirmed fills.
//!
//! Grounded on `market_maker::compute_quote_grid`'s per-tier loop structure
//! (`examples/aibysid-HyperLiquidMM`), generalized from a fixed 3-tier grid
//! to an arbitrary-`N` walk with persisted per-rung state.

use std::collections::HashSet;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;

use crate::adapter::{ExchangeAdapter, MarketInfo};
use crate::balance_guard::BalanceGuard;
use crate::closer::close_orders;
use crate::errors::Result;
use crate::journal::{JournalQuery, OrderJournal};
use crate::notify::{Notification, NotificationSink};
use crate::pricing::{next_price, size_order, AmountCoin};
use crate::ratelimit::RateLimiter;
use crate::reconciler::{reconcile_order, IterationFills, ReconcileOutcome};
use crate::types::{LadderState, NotPlacedReason, OrderRecord, Side};

/// Static per-market parameters the Builder needs every iteration. Carries
/// the config fields relevant to laddering without coupling the Builder to
/// the whole `LadderConfig` (so it stays testable against hand-built
/// fixtures).
#[derive(Debug, Clone)]
pub struct LadderParams {
    pub pair: String,
    pub exchange: String,
    pub base_coin: String,
    pub quote_coin: String,
    pub ladder_count: usize,
    pub step: Decimal,
    pub nominal_amount: Decimal,
    pub amount_coin: AmountCoin,
    pub size_jitter: Decimal,
    pub previous_filled_order_states: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub mid_price: Decimal,
    pub re_init: bool,
    pub placed: usize,
    pub aborted: bool,
}

/// Runs one complete ladder iteration. `mid_price`/`re_init` are the
/// parameter-store fields the caller (the Engine) persists across
/// iterations; the returned `BuildOutcome` carries their next values.
#[allow(clippy::too_many_arguments)]
pub async fn run_iteration(
    adapter: &dyn ExchangeAdapter,
    journal: &dyn OrderJournal,
    notifier: &dyn NotificationSink,
    balance_guard: &mut BalanceGuard,
    rates_limiter: &mut RateLimiter,
    params: &LadderParams,
    mid_price: Decimal,
    re_init: bool,
    rng: &mut impl Rng,
) -> Result<BuildOutcome> {
    let query = JournalQuery::ladder(&params.pair, &params.exchange);

    if mid_price <= Decimal::ZERO {
        place_rates_unavailable(journal, notifier, rates_limiter, &query, params).await?;
        return Ok(BuildOutcome {
            mid_price,
            re_init,
            placed: 0,
            aborted: false,
        });
    }

    let live = journal.query_live(&query).await?;

    let purge = close_orders(adapter, journal, &params.pair, params.ladder_count, &live, false).await?;
    if !purge.is_clean() {
        log::warn!(
            "builder: {} order(s) could not be closed for {}; aborting iteration",
            purge.residue.len(),
            params.pair
        );
        return Ok(BuildOutcome {
            mid_price,
            re_init,
            placed: 0,
            aborted: true,
        });
    }
    let removed: HashSet<String> = purge.removed.into_iter().collect();
    let mut live: Vec<OrderRecord> = live.into_iter().filter(|o| !removed.contains(&o.order_id)).collect();

    if re_init {
        let wipe = close_orders(adapter, journal, &params.pair, params.ladder_count, &live, true).await?;
        return if wipe.is_clean() {
            log::info!("builder: re-init wipe complete for {}; rebuilding next iteration", params.pair);
            Ok(BuildOutcome {
                mid_price,
                re_init: false,
                placed: 0,
                aborted: false,
            })
        } else {
            Ok(BuildOutcome {
                mid_price,
                re_init: true,
                placed: 0,
                aborted: true,
            })
        };
    }

    let market = match adapter.market_info(&params.pair).await {
        Ok(m) => m,
        Err(e) => {
            log::warn!("builder: market_info failed for {}: {}; using a zero minimum", params.pair, e);
            MarketInfo {
                coin1_decimals: 8,
                coin2_decimals: 8,
                coin1_min_amount: Decimal::ZERO,
                coin1_max_amount: Decimal::MAX,
            }
        }
    };

    let mut fills = IterationFills::new();
    let mut placed = 0usize;

    for side in [Side::Buy, Side::Sell] {
        let mut previous_price: Option<Decimal> = None;
        let mut previous_initial_state: Option<LadderState> = None;

        for index in 0..params.ladder_count as i64 {
            let slot = live.iter().position(|o| o.side == side && o.ladder_index == index);

            let mut prior: Option<OrderRecord> = None;
            let need_place;
            let mut this_initial_state: Option<LadderState> = None;

            match slot {
                Some(pos) => {
                    let mut record = live[pos].clone();
                    this_initial_state = Some(record.ladder_state.clone());

                    let adapter_status = if !record.is_virtual {
                        match adapter.get_order_details(&record.order_id, &params.pair).await {
                            Ok(Some(detail)) => Some(detail.status),
                            Ok(None) => None,
                            Err(e) => {
                                log::warn!(
                                    "builder: order-detail lookup failed for {}: {}",
                                    record.order_id,
                                    e
                                );
                                None
                            }
                        }
                    } else {
                        None
                    };

                    let outcome = reconcile_order(
                        &mut record,
                        params.ladder_count,
                        adapter_status,
                        previous_initial_state.as_ref(),
                        &params.previous_filled_order_states,
                        &mut fills,
                    );
                    journal.save(&record).await?;

                    if let ReconcileOutcome::ConfirmedFill { cross_index } = outcome {
                        mark_cross_removed(journal, &mut live, params, side, &record, cross_index).await?;
                    }

                    previous_price = Some(record.price);
                    need_place = record.ladder_state.is_replaceable();
                    live[pos] = record.clone();
                    if need_place {
                        prior = Some(record);
                    }
                }
                None => {
                    need_place = true;
                }
            }
            previous_initial_state = this_initial_state;

            if need_place {
                let price = match previous_price {
                    Some(p) => next_price(p, params.step, side),
                    None => next_price(mid_price, params.step, side),
                };

                let new_record = place_slot(
                    adapter,
                    journal,
                    notifier,
                    balance_guard,
                    &market,
                    params,
                    side,
                    index,
                    price,
                    prior.as_ref(),
                    rng,
                )
                .await?;

                if let Some(mut prior) = prior {
                    prior.mark_processed(Some(new_record.order_id.clone()));
                    journal.save(&prior).await?;
                }

                previous_price = Some(new_record.price);
                if new_record.ladder_state == LadderState::Open {
                    placed += 1;
                }
                match slot {
                    Some(pos) => live[pos] = new_record,
                    None => live.push(new_record),
                }
            }
        }
    }

    let live_after = journal.query_live(&query).await?;
    let own_shift = |s: Side| fills.max_filled_index(s).map(|m| m + 1).unwrap_or(0);
    for mut order in live_after {
        let new_index = order.ladder_index - own_shift(order.side) + own_shift(order.side.opposite());
        if new_index != order.ladder_index {
            order.ladder_previous_index = Some(order.ladder_index);
            order.ladder_index = new_index;
            order.ladder_update_date = Utc::now();
            journal.save(&order).await?;
        }
    }

    let new_mid = compute_new_mid(&fills, mid_price);

    Ok(BuildOutcome {
        mid_price: new_mid,
        re_init: false,
        placed,
        aborted: false,
    })
}

async fn mark_cross_removed(
    journal: &dyn OrderJournal,
    live: &mut [OrderRecord],
    params: &LadderParams,
    filled_side: Side,
    filled_order: &OrderRecord,
    cross_index: i64,
) -> Result<()> {
    if let Some(mut cross) = journal
        .find(&params.pair, &params.exchange, filled_side.opposite(), cross_index)
        .await?
    {
        cross.cross_order.cross_order_id = Some(filled_order.order_id.clone());
        cross.cross_order.cross_order_index = Some(filled_order.ladder_index as u32);
        cross.cross_order.cross_order_type = Some(filled_order.side);
        cross.cross_order.cross_order_price = Some(filled_order.price);
        cross.set_state(LadderState::ToBeRemoved);
        journal.save(&cross).await?;

        if let Some(pos) = live
            .iter()
            .position(|o| o.side == filled_side.opposite() && o.ladder_index == cross_index)
        {
            live[pos] = cross;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn place_slot(
    adapter: &dyn ExchangeAdapter,
    journal: &dyn OrderJournal,
    notifier: &dyn NotificationSink,
    balance_guard: &mut BalanceGuard,
    market: &MarketInfo,
    params: &LadderParams,
    side: Side,
    index: i64,
    price: Decimal,
    prior: Option<&OrderRecord>,
    rng: &mut impl Rng,
) -> Result<OrderRecord> {
    let (coin1_amount, coin2_amount) = size_order(
        price,
        params.nominal_amount,
        params.amount_coin,
        params.size_jitter,
        rng,
    );
    let (coin1_amount, coin2_amount) = truncate_to_venue_precision(coin1_amount, coin2_amount, price, market);

    let mut record = OrderRecord::new_virtual(
        &params.pair,
        &params.exchange,
        side,
        index,
        price,
        coin1_amount,
        coin2_amount,
    );
    if let Some(prior) = prior {
        record.ladder_previous_index = Some(prior.ladder_index);
        record.ladder_previous_order_id = Some(prior.order_id.clone());
        record.ladder_previous_state = Some(prior.ladder_state.clone());
    }

    if coin1_amount < market.coin1_min_amount {
        record.set_state(LadderState::NotPlaced(NotPlacedReason::MinimalOrderAmountNotMet));
        journal.save(&record).await?;
        return Ok(record);
    }

    let balance_check = balance_guard
        .check(adapter, &params.base_coin, &params.quote_coin, side, coin1_amount, coin2_amount)
        .await?;
    if !balance_check.sufficient {
        record.set_state(LadderState::NotPlaced(NotPlacedReason::NotEnoughBalances));
        journal.save(&record).await?;
        if balance_guard.should_notify(index, params.ladder_count) {
            notifier
                .notify(Notification::new(
                    "balances",
                    format!("{} {} rung {} skipped: not enough balances", params.pair, side, index),
                ))
                .await;
        }
        return Ok(record);
    }

    match adapter.place_order(side, &params.pair, price, coin1_amount).await {
        Ok(result) => match result.order_id {
            Some(order_id) => {
                record.order_id = order_id;
                record.is_virtual = false;
                record.set_state(LadderState::Open);
            }
            None => {
                let reason = result
                    .message
                    .map(NotPlacedReason::AdapterError)
                    .unwrap_or(NotPlacedReason::NoOrderIdReturned);
                record.set_state(LadderState::NotPlaced(reason));
            }
        },
        Err(e) => {
            record.set_state(LadderState::NotPlaced(NotPlacedReason::AdapterError(e.to_string())));
        }
    }

    journal.save(&record).await?;
    Ok(record)
}

/// Pre-flight amount normalization (spec §6: "numeric amounts pre-truncated
/// to venue precision"). Clamps to `coin1_max_amount`, truncates the base
/// leg to `coin1_decimals`, then rebuilds the quote leg from the truncated
/// base amount so invariant 6 (`coin2Amount = coin1Amount * price`) still
/// holds after rounding.
fn truncate_to_venue_precision(
    coin1_amount: Decimal,
    coin2_amount: Decimal,
    price: Decimal,
    market: &MarketInfo,
) -> (Decimal, Decimal) {
    let clamped = coin1_amount.min(market.coin1_max_amount);
    let truncated = clamped.trunc_with_scale(market.coin1_decimals);
    if truncated == coin1_amount {
        return (coin1_amount, coin2_amount);
    }
    let rebuilt_coin2 = (truncated * price).round_dp(market.coin2_decimals);
    (truncated, rebuilt_coin2)
}

async fn place_rates_unavailable(
    journal: &dyn OrderJournal,
    notifier: &dyn NotificationSink,
    rates_limiter: &mut RateLimiter,
    query: &JournalQuery,
    params: &LadderParams,
) -> Result<()> {
    let live = journal.query_live(query).await?;
    for side in [Side::Buy, Side::Sell] {
        for index in 0..params.ladder_count as i64 {
            if live.iter().any(|o| o.side == side && o.ladder_index == index) {
                continue;
            }
            let mut record = OrderRecord::new_virtual(
                &params.pair,
                &params.exchange,
                side,
                index,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
            );
            record.set_state(LadderState::NotPlaced(NotPlacedReason::RatesUnavailable));
            journal.save(&record).await?;
        }
    }
    if rates_limiter.try_fire("rates") {
        notifier
            .notify(Notification::new(
                "rates",
                format!("{}: no valid mid-price available, ladder not built", params.pair),
            ))
            .await;
    }
    Ok(())
}

fn compute_new_mid(fills: &IterationFills, prior_mid: Decimal) -> Decimal {
    let m_buy = fills.max_filled_index(Side::Buy);
    let m_sell = fills.max_filled_index(Side::Sell);

    let candidate = match (m_buy, m_sell) {
        (Some(mb), Some(ms)) => {
            let d = mb - ms;
            if d > 0 {
                fills.prices(Side::Buy).get((d - 1) as usize).copied()
            } else if d < 0 {
                fills.prices(Side::Sell).get((-d - 1) as usize).copied()
            } else {
                Some(prior_mid)
            }
        }
        (Some(_), None) => fills.prices(Side::Buy).last().copied(),
        (None, Some(_)) => fills.prices(Side::Sell).last().copied(),
        (None, None) => Some(prior_mid),
    };

    match candidate {
        Some(mid) if mid > Decimal::ZERO => mid,
        Some(_) => {
            log::warn!("builder: computed mid-price was not positive; reverting to prior mid");
            prior_mid
        }
        None => {
            log::warn!("builder: mid-price shift index out of range; reverting to prior mid");
            prior_mid
        }
    }
}
