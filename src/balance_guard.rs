//! Balance Guard (spec §4.7): pre-flight funds check with rate-limited
//! alerting restricted to near-spread rungs. Grounded on the teacher's
//! `MmExecutionEngine::has_sufficient_margin`-style pre-flight check,
//! narrowed from a PnL/margin circuit breaker to a pure balance check — the
//! teacher's drawdown/kill-switch logic has no counterpart in this spec.

use rust_decimal::Decimal;

use crate::adapter::{Balance, ExchangeAdapter};
use crate::errors::Result;
use crate::ratelimit::RateLimiter;
use crate::types::Side;

#[derive(Debug, Clone)]
pub struct BalanceCheckResult {
    pub sufficient: bool,
    pub message: Option<String>,
}

pub struct BalanceGuard {
    rate_limiter: RateLimiter,
}

impl BalanceGuard {
    pub fn new() -> Self {
        BalanceGuard {
            rate_limiter: RateLimiter::hourly(),
        }
    }

    /// Reads the full balance snapshot (including zero balances, per spec)
    /// and checks the leg the proposed order would draw down: base for a
    /// sell, quote for a buy.
    pub async fn check(
        &self,
        adapter: &dyn ExchangeAdapter,
        base_coin: &str,
        quote_coin: &str,
        side: Side,
        coin1_amount: Decimal,
        coin2_amount: Decimal,
    ) -> Result<BalanceCheckResult> {
        let balances = adapter.get_balances(false).await?;
        let find = |code: &str| -> Decimal {
            balances
                .iter()
                .find(|b| b.code == code)
                .map(|b: &Balance| b.free)
                .unwrap_or(Decimal::ZERO)
        };

        let sufficient = match side {
            Side::Sell => find(base_coin) >= coin1_amount,
            Side::Buy => find(quote_coin) >= coin2_amount,
        };

        Ok(BalanceCheckResult {
            sufficient,
            message: if sufficient {
                None
            } else {
                Some("Not enough balances".to_string())
            },
        })
    }

    /// Spec §4.7: alert at most once per hour, and only when the failing
    /// rung is within the first `ceil(N * 0.33)` indices (far-rung
    /// shortfalls don't impede trading near the spread and are logged
    /// silently by the caller instead).
    pub fn should_notify(&mut self, failing_index: i64, ladder_count: usize) -> bool {
        let near_spread_cutoff = near_spread_cutoff(ladder_count);
        if failing_index >= near_spread_cutoff {
            return false;
        }
        self.rate_limiter.try_fire("balances")
    }
}

impl Default for BalanceGuard {
    fn default() -> Self {
        BalanceGuard::new()
    }
}

fn near_spread_cutoff(ladder_count: usize) -> i64 {
    ((ladder_count as f64) * 0.33).ceil() as i64
}
