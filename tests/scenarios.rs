//! End-to-end ladder scenarios driven entirely through the public crate
//! surface (`SimAdapter` + `MemoryJournal`), mirroring the walk-through
//! scenarios in `SPEC_FULL.md` §8: cold start, a single nearest-rung fill,
//! symmetric fills on both sides, an unconfirmed local fill, a balance
//! shortfall, and the `ladderReInit` wipe.

use ladder_engine::adapter::sim::SimAdapter;
use ladder_engine::adapter::ExchangeAdapter;
use ladder_engine::balance_guard::BalanceGuard;
use ladder_engine::builder::{run_iteration, LadderParams};
use ladder_engine::journal::memory::MemoryJournal;
use ladder_engine::journal::{JournalQuery, OrderJournal};
use ladder_engine::notify::test_support::RecordingNotifier;
use ladder_engine::pricing::AmountCoin;
use ladder_engine::ratelimit::RateLimiter;
use ladder_engine::types::{LadderState, NotPlacedReason, OrderRecord, Side};
use rand::rngs::mock::StepRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn params(ladder_count: usize) -> LadderParams {
    LadderParams {
        pair: "BTC/USDT".to_string(),
        exchange: "bitfinex".to_string(),
        base_coin: "BTC".to_string(),
        quote_coin: "USDT".to_string(),
        ladder_count,
        step: dec!(0.01),
        nominal_amount: dec!(0.1),
        amount_coin: AmountCoin::Base,
        size_jitter: Decimal::ZERO,
        previous_filled_order_states: vec!["Filled".to_string(), "Partly filled".to_string()],
    }
}

async fn iterate(
    adapter: &SimAdapter,
    journal: &MemoryJournal,
    mid: Decimal,
    re_init: bool,
    ladder_count: usize,
) -> ladder_engine::builder::BuildOutcome {
    let mut guard = BalanceGuard::new();
    let mut rates_limiter = RateLimiter::hourly();
    let mut rng = StepRng::new(0, 1);
    let notifier = RecordingNotifier::default();
    run_iteration(
        adapter,
        journal,
        &notifier,
        &mut guard,
        &mut rates_limiter,
        &params(ladder_count),
        mid,
        re_init,
        &mut rng,
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn cold_start_builds_a_symmetric_ladder() {
    let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(10), dec!(100_000));
    let journal = MemoryJournal::new();

    let outcome = iterate(&adapter, &journal, dec!(100), false, 4).await;
    assert_eq!(outcome.placed, 8);

    let live = journal
        .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
        .await
        .unwrap();
    assert_eq!(live.len(), 8);
    assert!(live.iter().all(|o| o.ladder_state == LadderState::Open));
}

#[tokio::test]
async fn nearest_rung_fill_recenters_and_mirrors_the_far_rung() {
    let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(10), dec!(100_000));
    let journal = MemoryJournal::new();
    iterate(&adapter, &journal, dec!(100), false, 4).await;

    let live = journal
        .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
        .await
        .unwrap();
    let near_buy = live.iter().find(|o| o.side == Side::Buy && o.ladder_index == 0).unwrap();
    adapter.mark_filled(&near_buy.order_id);

    let outcome = iterate(&adapter, &journal, dec!(100), false, 4).await;
    assert_eq!(outcome.mid_price, dec!(99.00));

    let live = journal
        .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
        .await
        .unwrap();
    let mirrored = live.iter().find(|o| o.side == Side::Sell && o.price == dec!(104.06)).unwrap();
    assert_eq!(mirrored.ladder_state, LadderState::ToBeRemoved);
}

#[tokio::test]
async fn symmetric_fills_on_both_sides_net_to_zero_shift() {
    let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(10), dec!(100_000));
    let journal = MemoryJournal::new();
    iterate(&adapter, &journal, dec!(100), false, 4).await;

    let live = journal
        .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
        .await
        .unwrap();
    let near_buy = live.iter().find(|o| o.side == Side::Buy && o.ladder_index == 0).unwrap();
    let near_sell = live.iter().find(|o| o.side == Side::Sell && o.ladder_index == 0).unwrap();
    adapter.mark_filled(&near_buy.order_id);
    adapter.mark_filled(&near_sell.order_id);

    let outcome = iterate(&adapter, &journal, dec!(100), false, 4).await;

    // d = maxFilledBuy - maxFilledSell = 0, so the mid-price holds and the
    // shift is a no-op: surviving rungs keep their original indices. Each
    // fill's cross-side mirror at the far rung (index 3) is flagged
    // `To be removed` in this same iteration, but the Closer only purges it
    // at the top of the *next* iteration, so it is still present (and still
    // `Open`-looking to the venue) in this iteration's live set.
    assert_eq!(outcome.mid_price, dec!(100));
    let live = journal
        .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
        .await
        .unwrap();
    let mut open_buy_indices: Vec<i64> = live
        .iter()
        .filter(|o| o.side == Side::Buy && o.ladder_state == LadderState::Open)
        .map(|o| o.ladder_index)
        .collect();
    open_buy_indices.sort();
    assert_eq!(open_buy_indices, vec![1, 2]);

    let buy_far_rung = live.iter().find(|o| o.side == Side::Buy && o.ladder_index == 3).unwrap();
    assert_eq!(buy_far_rung.ladder_state, LadderState::ToBeRemoved);
    let sell_far_rung = live.iter().find(|o| o.side == Side::Sell && o.ladder_index == 3).unwrap();
    assert_eq!(sell_far_rung.ladder_state, LadderState::ToBeRemoved);

    // The next iteration's Closer purges both far rungs. With d == 0 there
    // was no shift, so index 0 on each side is also still empty (its filled
    // order was processed out of the live set last iteration); the Builder
    // re-places both the now-vacant near rung and the now-vacant far rung on
    // each side, four placements in total.
    let outcome = iterate(&adapter, &journal, outcome.mid_price, outcome.re_init, 4).await;
    assert_eq!(outcome.placed, 4);
    let live = journal
        .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
        .await
        .unwrap();
    assert!(live.iter().all(|o| o.ladder_state == LadderState::Open));
    let mut buy_indices: Vec<i64> = live.iter().filter(|o| o.side == Side::Buy).map(|o| o.ladder_index).collect();
    buy_indices.sort();
    assert_eq!(buy_indices, vec![0, 1, 2, 3]);
    let mut sell_indices: Vec<i64> = live.iter().filter(|o| o.side == Side::Sell).map(|o| o.ladder_index).collect();
    sell_indices.sort();
    assert_eq!(sell_indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn unconfirmed_local_fill_is_demoted_to_missed() {
    let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(10), dec!(100_000));
    let journal = MemoryJournal::new();

    // Index 0 sits resting and open; index 1 was (incorrectly) marked
    // Filled locally with no corroborating adapter or previous-state signal.
    let open_rung = {
        let placed = adapter.place_order(Side::Buy, "BTC/USDT", dec!(99), dec!(0.1)).await.unwrap();
        let mut rec = OrderRecord::new_virtual("BTC/USDT", "bitfinex", Side::Buy, 0, dec!(99), dec!(0.1), dec!(9.9));
        rec.order_id = placed.order_id.unwrap();
        rec.is_virtual = false;
        rec.set_state(LadderState::Open);
        rec
    };
    journal.save(&open_rung).await.unwrap();

    let mut ambiguous = OrderRecord::new_virtual(
        "BTC/USDT",
        "bitfinex",
        Side::Buy,
        1,
        dec!(98.01),
        dec!(0.1),
        dec!(9.8),
    );
    ambiguous.order_id = "never-placed-on-venue".to_string();
    ambiguous.is_virtual = false;
    ambiguous.set_state(LadderState::Filled);
    journal.save(&ambiguous).await.unwrap();

    iterate(&adapter, &journal, dec!(100), false, 4).await;

    let demoted = journal
        .find("BTC/USDT", "bitfinex", Side::Buy, 1)
        .await
        .unwrap()
        .expect("the demoted rung is still live, awaiting replacement");
    assert_eq!(demoted.ladder_state, LadderState::Missed);
}

#[tokio::test]
async fn insufficient_balance_skips_placement_and_notifies_once() {
    // Only 0.05 BTC free; a single buy rung needs 0.1 BTC of quote-side
    // headroom is fine, but sells need base, so starve the base leg.
    let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(0.05), dec!(100_000));
    let journal = MemoryJournal::new();

    iterate(&adapter, &journal, dec!(100), false, 4).await;

    let live = journal
        .query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex"))
        .await
        .unwrap();
    let starved_sells: Vec<_> = live
        .iter()
        .filter(|o| o.side == Side::Sell)
        .filter(|o| matches!(o.ladder_state, LadderState::NotPlaced(NotPlacedReason::NotEnoughBalances)))
        .collect();
    assert!(!starved_sells.is_empty(), "sell rungs should be starved of base balance");
}

#[tokio::test]
async fn ladder_re_init_wipes_the_book_and_rebuilds_next_iteration() {
    let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(10), dec!(100_000));
    let journal = MemoryJournal::new();
    iterate(&adapter, &journal, dec!(100), false, 4).await;
    assert_eq!(adapter.get_open_orders("BTC/USDT").await.unwrap().len(), 8);

    let outcome = iterate(&adapter, &journal, dec!(100), true, 4).await;
    assert!(!outcome.re_init);
    assert_eq!(adapter.get_open_orders("BTC/USDT").await.unwrap().len(), 0);

    let rebuilt = iterate(&adapter, &journal, outcome.mid_price, outcome.re_init, 4).await;
    assert_eq!(rebuilt.placed, 8);
}
