//! Property-based invariants for the ladder builder, run across randomized
//! ladder sizes, steps, and mid-prices. Grounded on
//! `examples/guribe94-bog/bog-core/src/core/fixed_point_proptest.rs`'s
//! `proptest!` style; `run_iteration` is async, so each property block wraps
//! it in its own single-threaded `tokio::runtime::Runtime`.

use ladder_engine::adapter::sim::SimAdapter;
use ladder_engine::balance_guard::BalanceGuard;
use ladder_engine::builder::{run_iteration, LadderParams};
use ladder_engine::journal::memory::MemoryJournal;
use ladder_engine::journal::{JournalQuery, OrderJournal};
use ladder_engine::notify::test_support::RecordingNotifier;
use ladder_engine::pricing::AmountCoin;
use ladder_engine::ratelimit::RateLimiter;
use ladder_engine::types::Side;
use proptest::prelude::*;
use rand::rngs::mock::StepRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn params(ladder_count: usize, step: Decimal) -> LadderParams {
    LadderParams {
        pair: "BTC/USDT".to_string(),
        exchange: "bitfinex".to_string(),
        base_coin: "BTC".to_string(),
        quote_coin: "USDT".to_string(),
        ladder_count,
        step,
        nominal_amount: dec!(0.1),
        amount_coin: AmountCoin::Base,
        size_jitter: Decimal::ZERO,
        previous_filled_order_states: vec!["Filled".to_string(), "Partly filled".to_string()],
    }
}

fn run_once(
    adapter: &SimAdapter,
    journal: &MemoryJournal,
    ladder_count: usize,
    step: Decimal,
    mid: Decimal,
) -> ladder_engine::builder::BuildOutcome {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    rt.block_on(async {
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
            &params(ladder_count, step),
            mid,
            false,
            &mut rng,
        )
        .await
        .unwrap()
    })
}

fn live(journal: &MemoryJournal) -> Vec<ladder_engine::types::OrderRecord> {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    rt.block_on(async { journal.query_live(&JournalQuery::ladder("BTC/USDT", "bitfinex")).await.unwrap() })
}

proptest! {
    /// Every cold start fills the full `2*N` ladder with no duplicate index
    /// on either side, regardless of `N`, step size, or mid-price, as long
    /// as balances are ample and the step keeps prices above the venue's
    /// minimum order amount.
    #[test]
    fn cold_start_has_no_duplicate_index_per_side(
        ladder_count in 1usize..8,
        step_bp in 10i64..500,
        mid_units in 100i64..100_000,
    ) {
        let step = Decimal::new(step_bp, 4);
        let mid = Decimal::new(mid_units, 0);
        let adapter = SimAdapter::new(mid, "BTC", "USDT", dec!(1000), dec!(10_000_000));
        let journal = MemoryJournal::new();

        let outcome = run_once(&adapter, &journal, ladder_count, step, mid);
        prop_assert!(!outcome.aborted);

        let orders = live(&journal);
        for side in [Side::Buy, Side::Sell] {
            let mut indices: Vec<i64> = orders.iter().filter(|o| o.side == side).map(|o| o.ladder_index).collect();
            let before = indices.len();
            indices.sort();
            indices.dedup();
            prop_assert_eq!(indices.len(), before, "duplicate ladder_index found on {:?}", side);
        }
    }

    /// A second iteration with nothing filled on the venue is a no-op: it
    /// places nothing new and leaves every rung's price untouched.
    #[test]
    fn idle_iteration_is_idempotent(
        ladder_count in 1usize..6,
        step_bp in 10i64..300,
    ) {
        let step = Decimal::new(step_bp, 4);
        let mid = dec!(100);
        let adapter = SimAdapter::new(mid, "BTC", "USDT", dec!(1000), dec!(10_000_000));
        let journal = MemoryJournal::new();

        run_once(&adapter, &journal, ladder_count, step, mid);
        let before: Vec<Decimal> = {
            let mut p: Vec<Decimal> = live(&journal).iter().map(|o| o.price).collect();
            p.sort();
            p
        };

        let outcome = run_once(&adapter, &journal, ladder_count, step, mid);
        prop_assert_eq!(outcome.placed, 0);

        let after: Vec<Decimal> = {
            let mut p: Vec<Decimal> = live(&journal).iter().map(|o| o.price).collect();
            p.sort();
            p
        };
        prop_assert_eq!(before, after);
    }

    /// The recomputed mid-price is always strictly positive, even after an
    /// arbitrary subset of near-side rungs fill in the same iteration.
    #[test]
    fn mid_price_stays_positive_after_fills(
        ladder_count in 2usize..6,
        fill_buy in any::<bool>(),
        fill_sell in any::<bool>(),
    ) {
        let mid = dec!(100);
        let adapter = SimAdapter::new(mid, "BTC", "USDT", dec!(1000), dec!(10_000_000));
        let journal = MemoryJournal::new();
        run_once(&adapter, &journal, ladder_count, dec!(0.01), mid);

        let orders = live(&journal);
        if fill_buy {
            if let Some(o) = orders.iter().find(|o| o.side == Side::Buy && o.ladder_index == 0) {
                adapter.mark_filled(&o.order_id);
            }
        }
        if fill_sell {
            if let Some(o) = orders.iter().find(|o| o.side == Side::Sell && o.ladder_index == 0) {
                adapter.mark_filled(&o.order_id);
            }
        }

        let outcome = run_once(&adapter, &journal, ladder_count, dec!(0.01), mid);
        prop_assert!(outcome.mid_price > Decimal::ZERO);
    }
}

#[test]
fn single_rung_ladder_places_exactly_one_per_side() {
    let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(1000), dec!(10_000_000));
    let journal = MemoryJournal::new();
    let outcome = run_once(&adapter, &journal, 1, dec!(0.01), dec!(100));
    assert_eq!(outcome.placed, 2);

    let orders = live(&journal);
    assert_eq!(orders.iter().filter(|o| o.side == Side::Buy).count(), 1);
    assert_eq!(orders.iter().filter(|o| o.side == Side::Sell).count(), 1);
}

#[test]
fn zero_mid_price_never_panics_regardless_of_ladder_count() {
    for count in [1usize, 2, 5] {
        let adapter = SimAdapter::new(dec!(100), "BTC", "USDT", dec!(1000), dec!(10_000_000));
        let journal = MemoryJournal::new();
        let outcome = run_once(&adapter, &journal, count, dec!(0.01), Decimal::ZERO);
        assert_eq!(outcome.placed, 0);
        assert!(!outcome.aborted);
    }
}
