//! Price and amount derivation for a single ladder rung (spec §4.6).
//!
//! Pricing is deterministic (`previous * (1 +/- step)`), sizing carries a
//! bounded random jitter so the engine does not paint an obviously
//! mechanical footprint on the order book.

use rand::Rng;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::Side;

/// Default jitter bound applied to both amount legs: `[1 - d, 1 + d]`.
pub const DEFAULT_SIZE_JITTER: Decimal = dec!(0.02);

/// Which leg of the pair the configured nominal amount is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountCoin {
    Base,
    Quote,
}

/// Derive the price for the next rung on `side` from the previous rung's
/// price (or the mid-price for index 0).
pub fn next_price(previous: Decimal, step: Decimal, side: Side) -> Decimal {
    let multiplier = match side {
        Side::Buy => Decimal::ONE - step,
        Side::Sell => Decimal::ONE + step,
    };
    round_to_significant_digits(previous * multiplier, 5)
}

/// Round a decimal to a fixed significant-digit budget, mirroring the
/// teacher's `round_to_5_sig_figs` float helper but operating on `Decimal`
/// so the ladder's repeated multiplications do not accumulate float error.
pub fn round_to_significant_digits(value: Decimal, digits: u32) -> Decimal {
    if value.is_zero() {
        return value;
    }
    let abs_f64 = value.abs().to_f64().unwrap_or(1.0);
    let exponent = abs_f64.log10().floor() as i64;
    let shift = digits as i64 - 1 - exponent;
    let scale = Decimal::from_i64(10_i64.pow(shift.unsigned_abs() as u32)).unwrap_or(Decimal::ONE);
    let scaled = if shift >= 0 { value * scale } else { value / scale };
    let rounded = scaled.round();
    if shift >= 0 {
        rounded / scale
    } else {
        rounded * scale
    }
}

/// Compute base (`coin1`) and quote (`coin2`) amounts for a rung at `price`,
/// given a nominal amount denominated in `coin`, jittered by a uniform
/// factor in `[1 - jitter, 1 + jitter]`.
pub fn size_order(
    price: Decimal,
    nominal_amount: Decimal,
    coin: AmountCoin,
    jitter: Decimal,
    rng: &mut impl Rng,
) -> (Decimal, Decimal) {
    let factor = jittered_factor(jitter, rng);
    let jittered_nominal = nominal_amount * factor;
    match coin {
        AmountCoin::Base => {
            let coin1 = jittered_nominal;
            let coin2 = coin1 * price;
            (coin1, coin2)
        }
        AmountCoin::Quote => {
            let coin2 = jittered_nominal;
            let coin1 = if price.is_zero() { Decimal::ZERO } else { coin2 / price };
            (coin1, coin2)
        }
    }
}

fn jittered_factor(jitter: Decimal, rng: &mut impl Rng) -> Decimal {
    if jitter.is_zero() {
        return Decimal::ONE;
    }
    let lower = (Decimal::ONE - jitter)
        .to_f64()
        .unwrap_or(1.0 - jitter.to_f64().unwrap_or(0.0));
    let upper = (Decimal::ONE + jitter).to_f64().unwrap_or(1.0);
    let sampled: f64 = rng.gen_range(lower..=upper);
    Decimal::from_f64(sampled).unwrap_or(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn next_buy_price_steps_down() {
        let p = next_price(dec!(100), dec!(0.01), Side::Buy);
        assert_eq!(p, dec!(99.00));
    }

    #[test]
    fn next_sell_price_steps_up() {
        let p = next_price(dec!(100), dec!(0.01), Side::Sell);
        assert_eq!(p, dec!(101.00));
    }

    #[test]
    fn chained_buy_prices_match_scenario_one() {
        let step = dec!(0.01);
        let p1 = next_price(dec!(100), step, Side::Buy);
        let p2 = next_price(p1, step, Side::Buy);
        let p3 = next_price(p2, step, Side::Buy);
        let p4 = next_price(p3, step, Side::Buy);
        assert_eq!(p1, dec!(99.00));
        assert_eq!(p2, dec!(98.01));
        assert_eq!(p3, dec!(97.03));
        assert_eq!(p4, dec!(96.06));
    }

    #[test]
    fn zero_jitter_is_exact() {
        let mut rng = StepRng::new(0, 1);
        let (coin1, coin2) = size_order(dec!(100), dec!(0.1), AmountCoin::Base, dec!(0), &mut rng);
        assert_eq!(coin1, dec!(0.1));
        assert_eq!(coin2, dec!(10.0));
    }

    #[test]
    fn quote_denominated_sizing_derives_base() {
        let mut rng = StepRng::new(0, 1);
        let (coin1, coin2) = size_order(dec!(100), dec!(10), AmountCoin::Quote, dec!(0), &mut rng);
        assert_eq!(coin2, dec!(10));
        assert_eq!(coin1, dec!(0.1));
    }

    #[test]
    fn rounding_respects_five_significant_digits() {
        let rounded = round_to_significant_digits(dec!(96.0596), 5);
        assert_eq!(rounded, dec!(96.060));
    }
}
