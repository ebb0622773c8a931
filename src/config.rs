//! Configuration loader (spec §6, §4.10): environment-variable-driven
//! startup configuration with validation. Grounded on the teacher's
//! `main.rs` `std::env::var(...)` + `dotenvy::dotenv()` pattern; failures
//! here are `anyhow::Error`s raised once at startup, never a runtime
//! `LadderError`, because the engine must not start in an invalid state.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;

use crate::pricing::AmountCoin;

/// Recognized options (spec §6). `mm_ladderPreviousFilledOrderStates`
/// (Design Notes §9) is the configurable whitelist the spec explicitly
/// refuses to let an implementer guess at.
#[derive(Debug, Clone)]
pub struct LadderConfig {
    pub pair: String,
    pub exchange: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_password: Option<String>,

    pub is_active: bool,
    pub strategy: String,

    pub ladder_count: usize,
    pub ladder_price_step_percent: Decimal,
    pub ladder_amount: Decimal,
    pub ladder_amount_coin: AmountCoin,

    pub ladder_mid_price: Option<Decimal>,
    pub ladder_re_init: bool,

    pub notify_name: String,
    pub silent_mode: bool,

    pub previous_filled_order_states: Vec<String>,
}

impl LadderConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let pair = require_env("pair")?;
        let exchange = require_env("exchange")?;
        let api_key = require_env("apikey")?;
        let api_secret = require_env("apisecret")?;
        let api_password = std::env::var("apipassword").ok();

        let is_active = bool_env("co_isActive", true);
        let strategy = std::env::var("co_strategy").unwrap_or_else(|_| "ld".to_string());

        let ladder_count: usize = require_env("mm_ladderCount")?
            .parse()
            .context("mm_ladderCount must be a positive integer")?;
        let ladder_price_step_percent: Decimal = require_env("mm_ladderPriceStepPercent")?
            .parse()
            .context("mm_ladderPriceStepPercent must be a decimal number")?;
        let ladder_amount: Decimal = require_env("mm_ladderAmount")?
            .parse()
            .context("mm_ladderAmount must be a decimal number")?;
        let ladder_amount_coin = match require_env("mm_ladderAmountCoin")?.to_lowercase().as_str() {
            "coin1" | "base" => AmountCoin::Base,
            "coin2" | "quote" => AmountCoin::Quote,
            other => bail!("mm_ladderAmountCoin must be 'coin1'/'base' or 'coin2'/'quote', got {other}"),
        };

        let ladder_mid_price = std::env::var("mm_ladderMidPrice")
            .ok()
            .and_then(|v| v.parse::<Decimal>().ok());
        let ladder_re_init = bool_env("mm_ladderReInit", false);

        let notify_name = std::env::var("notifyName").unwrap_or_else(|_| "ladder-engine".to_string());
        let silent_mode = bool_env("silent_mode", false);

        let previous_filled_order_states = std::env::var("mm_ladderPreviousFilledOrderStates")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["Filled".to_string(), "Partly filled".to_string()]);

        let config = LadderConfig {
            pair,
            exchange,
            api_key,
            api_secret,
            api_password,
            is_active,
            strategy,
            ladder_count,
            ladder_price_step_percent,
            ladder_amount,
            ladder_amount_coin,
            ladder_mid_price,
            ladder_re_init,
            notify_name,
            silent_mode,
            previous_filled_order_states,
        };
        config.validate()?;
        Ok(config)
    }

    /// Structural validation run once at startup (spec §8 Boundaries:
    /// `step = 0` must be refused).
    pub fn validate(&self) -> Result<()> {
        if self.ladder_count == 0 {
            bail!("mm_ladderCount must be >= 1");
        }
        if self.ladder_price_step_percent <= Decimal::ZERO {
            bail!("mm_ladderPriceStepPercent must be > 0 (step = 0 is rejected)");
        }
        if self.ladder_amount <= Decimal::ZERO {
            bail!("mm_ladderAmount must be > 0");
        }
        Ok(())
    }

    pub fn step(&self) -> Decimal {
        self.ladder_price_step_percent / Decimal::ONE_HUNDRED
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required configuration option: {key}"))
}

fn bool_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}
