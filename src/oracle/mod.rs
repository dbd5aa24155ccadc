use serde::{Deserialize, Serialize};

use crate::ledger::Amount;

/// Decimal precision of native amounts.
pub const NATIVE_DECIMALS: u32 = 18;

/// Latest exchange rate reported by a feed: a scaled fixed-point answer
/// plus the precision it is scaled to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub answer: u128,
    pub decimals: u32,
}

/// The price-feed seam. The contract takes an implementation at
/// construction; tests and local runs substitute [`MockAggregator`].
pub trait PriceFeed {
    fn latest_quote(&self) -> PriceQuote;

    /// Feed interface version, mirroring aggregator contracts that report
    /// one.
    fn version(&self) -> u64;

    fn description(&self) -> &str;
}

/// Convert a native amount (18 decimals) into reference-currency units at
/// the quoted rate. The feed's precision is folded into the divisor so the
/// 18-decimal result never needs the answer scaled up first.
///
/// Returns `None` when the converted value overflows `u128`.
pub fn to_reference_units(amount: Amount, quote: &PriceQuote) -> Option<Amount> {
    let (answer, divisor) = if quote.decimals <= NATIVE_DECIMALS {
        (quote.answer, 10u128.pow(quote.decimals))
    } else {
        // precision above 18 decimals is dropped from the answer; the
        // discarded digits sit below one reference unit
        let excess = 10u128.checked_pow(quote.decimals - NATIVE_DECIMALS)?;
        (quote.answer / excess, 10u128.pow(NATIVE_DECIMALS))
    };
    mul_div(amount, answer, divisor)
}

/// Floor of `amount * answer / divisor` without a 256-bit intermediate.
///
/// Both factors are split by the divisor so every partial product stays
/// in range. Requires `divisor <= 10^18`, which both branches above
/// guarantee.
fn mul_div(amount: u128, answer: u128, divisor: u128) -> Option<u128> {
    let (whole, rem) = (amount / divisor, amount % divisor);
    let (rate_whole, rate_rem) = (answer / divisor, answer % divisor);
    // rem and rate_rem are below the divisor, so this product stays
    // under 10^36
    let tail = rem * rate_rem / divisor;
    whole
        .checked_mul(answer)?
        .checked_add(rem.checked_mul(rate_whole)?)?
        .checked_add(tail)
}

/// Stand-in aggregator with a fixed precision and an updatable answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockAggregator {
    decimals: u32,
    answer: u128,
}

impl MockAggregator {
    pub fn new(decimals: u32, initial_answer: u128) -> Self {
        Self {
            decimals,
            answer: initial_answer,
        }
    }

    /// Conventional ETH/USD shape: 8-decimal answer.
    pub fn eth_usd(initial_answer: u128) -> Self {
        Self::new(8, initial_answer)
    }

    pub fn update_answer(&mut self, answer: u128) {
        self.answer = answer;
    }
}

impl PriceFeed for MockAggregator {
    fn latest_quote(&self) -> PriceQuote {
        PriceQuote {
            answer: self.answer,
            decimals: self.decimals,
        }
    }

    fn version(&self) -> u64 {
        0
    }

    fn description(&self) -> &str {
        "mock aggregator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::NATIVE_SCALE;

    // 2000 USD at 8 decimals
    const ETH_USD_2000: u128 = 2_000 * 100_000_000;

    #[test]
    fn converts_whole_coin_at_eight_decimal_feed() {
        let quote = PriceQuote {
            answer: ETH_USD_2000,
            decimals: 8,
        };
        let usd = to_reference_units(NATIVE_SCALE, &quote).unwrap();
        assert_eq!(usd, 2_000 * NATIVE_SCALE);
    }

    #[test]
    fn converts_fractions_proportionally() {
        let quote = PriceQuote {
            answer: ETH_USD_2000,
            decimals: 8,
        };
        // 0.01 coin at 2000 USD/coin = 20 USD
        let usd = to_reference_units(NATIVE_SCALE / 100, &quote).unwrap();
        assert_eq!(usd, 20 * NATIVE_SCALE);
    }

    #[test]
    fn converts_large_contributions_without_overflow() {
        let quote = PriceQuote {
            answer: ETH_USD_2000,
            decimals: 8,
        };
        // a million coins at 2000 USD/coin = 2e9 USD
        let usd = to_reference_units(1_000_000 * NATIVE_SCALE, &quote).unwrap();
        assert_eq!(usd, 2_000_000_000 * NATIVE_SCALE);
    }

    #[test]
    fn conversion_is_exact_for_odd_amounts() {
        let quote = PriceQuote {
            answer: ETH_USD_2000,
            decimals: 8,
        };
        let amount: u128 = 1_234_567_890_123_456_789;
        let usd = to_reference_units(amount, &quote).unwrap();
        assert_eq!(usd, amount * 2_000);
    }

    #[test]
    fn normalizes_feeds_above_native_precision() {
        let quote = PriceQuote {
            answer: 2_000 * 10u128.pow(20),
            decimals: 20,
        };
        let usd = to_reference_units(NATIVE_SCALE, &quote).unwrap();
        assert_eq!(usd, 2_000 * NATIVE_SCALE);
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let quote = PriceQuote {
            answer: ETH_USD_2000,
            decimals: 8,
        };
        assert_eq!(to_reference_units(u128::MAX, &quote), None);
    }

    #[test]
    fn mock_reports_interface_version_and_description() {
        let feed = MockAggregator::eth_usd(ETH_USD_2000);
        assert_eq!(feed.version(), 0);
        assert_eq!(feed.description(), "mock aggregator");
    }

    #[test]
    fn mock_answer_is_updatable() {
        let mut feed = MockAggregator::eth_usd(ETH_USD_2000);
        assert_eq!(feed.latest_quote().answer, ETH_USD_2000);
        feed.update_answer(ETH_USD_2000 / 2);
        assert_eq!(feed.latest_quote().answer, ETH_USD_2000 / 2);
        assert_eq!(feed.latest_quote().decimals, 8);
    }
}
