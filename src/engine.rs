//! Engine: owns the long-lived collaborators for one market (adapter,
//! journal, notifier, balance guard) and the mutable parameter-store fields
//! (`mid_price`, `re_init`) that persist across iterations, the way the
//! teacher's `MmExecutionEngine` owns its exchange client, inventory, and
//! session stats for the lifetime of a run.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::adapter::ExchangeAdapter;
use crate::balance_guard::BalanceGuard;
use crate::builder::{self, LadderParams};
use crate::config::LadderConfig;
use crate::errors::Result;
use crate::journal::OrderJournal;
use crate::notify::NotificationSink;
use crate::ratelimit::RateLimiter;

pub struct LadderEngine {
    adapter: Arc<dyn ExchangeAdapter>,
    journal: Arc<dyn OrderJournal>,
    notifier: Arc<dyn NotificationSink>,
    params: LadderParams,
    balance_guard: Mutex<BalanceGuard>,
    rates_limiter: Mutex<RateLimiter>,
    rng: Mutex<StdRng>,
    mid_price: Mutex<Decimal>,
    re_init: Mutex<bool>,
}

impl LadderEngine {
    pub fn new(
        config: &LadderConfig,
        adapter: Arc<dyn ExchangeAdapter>,
        journal: Arc<dyn OrderJournal>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (base_coin, quote_coin) = split_pair(&config.pair);
        let params = LadderParams {
            pair: config.pair.clone(),
            exchange: config.exchange.clone(),
            base_coin,
            quote_coin,
            ladder_count: config.ladder_count,
            step: config.step(),
            nominal_amount: config.ladder_amount,
            amount_coin: config.ladder_amount_coin,
            size_jitter: crate::pricing::DEFAULT_SIZE_JITTER,
            previous_filled_order_states: config.previous_filled_order_states.clone(),
        };

        LadderEngine {
            adapter,
            journal,
            notifier,
            params,
            balance_guard: Mutex::new(BalanceGuard::new()),
            rates_limiter: Mutex::new(RateLimiter::hourly()),
            rng: Mutex::new(StdRng::from_entropy()),
            mid_price: Mutex::new(config.ladder_mid_price.unwrap_or(Decimal::ZERO)),
            re_init: Mutex::new(config.ladder_re_init),
        }
    }

    pub fn open_orders_cache_sec(&self) -> u64 {
        self.adapter.features().open_orders_cache_sec
    }

    /// Runs one iteration and persists the returned mid-price / re-init
    /// state for the next call. Returns whether the market stayed in a
    /// normal (non-aborted) state, used by the Scheduler only for logging —
    /// the strategy-active flag that governs the inactive-poll shortcut
    /// lives in config, not in iteration outcome.
    pub async fn tick(&self) -> Result<bool> {
        let mid_price = *self.mid_price.lock().await;
        let re_init = *self.re_init.lock().await;

        let mut balance_guard = self.balance_guard.lock().await;
        let mut rates_limiter = self.rates_limiter.lock().await;
        let mut rng = self.rng.lock().await;

        let outcome = builder::run_iteration(
            self.adapter.as_ref(),
            self.journal.as_ref(),
            self.notifier.as_ref(),
            &mut balance_guard,
            &mut rates_limiter,
            &self.params,
            mid_price,
            re_init,
            &mut *rng,
        )
        .await?;

        *self.mid_price.lock().await = outcome.mid_price;
        *self.re_init.lock().await = outcome.re_init;

        Ok(!outcome.aborted)
    }
}

fn split_pair(pair: &str) -> (String, String) {
    match pair.split_once('/') {
        Some((base, quote)) => (base.to_string(), quote.to_string()),
        None => (pair.to_string(), String::new()),
    }
}
