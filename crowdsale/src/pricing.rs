//! Contribution pricing and founder allocation
//!
//! All arithmetic is integer-only and truncating:
//! `tokens = floor(value / base_token_price) * bonus_bps / 1000`

use ico_token::Balance;
use serde::{Deserialize, Serialize};

use crate::bonus::{Bps, BASE_BPS};
use crate::error::{CrowdsaleError, Result};

/// Founders' share of the post-allocation supply (percent)
pub const FOUNDER_SHARE_PERCENT: Balance = 14;

/// Investors' share of the post-allocation supply (percent)
pub const INVESTOR_SHARE_PERCENT: Balance = 100 - FOUNDER_SHARE_PERCENT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseQuote {
    /// Value contributed
    pub value: Balance,
    /// Whole base-price units bought before the bonus
    pub base_units: Balance,
    pub bonus_bps: Bps,
    /// Tokens to mint
    pub tokens: Balance,
}

pub struct PriceCalculator;

impl PriceCalculator {
    pub fn quote(value: Balance, base_token_price: Balance, bonus_bps: Bps) -> Result<PurchaseQuote> {
        if base_token_price == 0 {
            return Err(CrowdsaleError::InvalidAmount(
                "base token price must be positive".to_string(),
            ));
        }

        let base_units = value / base_token_price;
        let tokens = base_units
            .checked_mul(Balance::from(bonus_bps))
            .ok_or(CrowdsaleError::Overflow)?
            / Balance::from(BASE_BPS);

        Ok(PurchaseQuote {
            value,
            base_units,
            bonus_bps,
            tokens,
        })
    }

    /// Tokens minted to the founders for `coins_issued` investor tokens
    ///
    /// `floor(coins_issued * 14 / 86)`, so founders hold 14% of the supply
    /// once the allocation is minted.
    pub fn founder_allocation(coins_issued: Balance) -> Result<Balance> {
        coins_issued
            .checked_mul(FOUNDER_SHARE_PERCENT)
            .map(|scaled| scaled / INVESTOR_SHARE_PERCENT)
            .ok_or(CrowdsaleError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHER: Balance = 1_000_000_000_000_000_000;
    const BASE_PRICE: Balance = ETHER / 1000;

    #[test]
    fn test_quote_ten_ether() {
        let quote = PriceCalculator::quote(10 * ETHER, BASE_PRICE, 1499).unwrap();
        assert_eq!(quote.base_units, 10_000);
        assert_eq!(quote.tokens, 14_990);
    }

    #[test]
    fn test_quote_truncates() {
        // 1.5 base units -> 1 unit; 1 * 1499 / 1000 -> 1
        let quote = PriceCalculator::quote(BASE_PRICE + BASE_PRICE / 2, BASE_PRICE, 1499).unwrap();
        assert_eq!(quote.base_units, 1);
        assert_eq!(quote.tokens, 1);

        let dust = PriceCalculator::quote(BASE_PRICE - 1, BASE_PRICE, 1499).unwrap();
        assert_eq!(dust.tokens, 0);
    }

    #[test]
    fn test_quote_is_deterministic() {
        let first = PriceCalculator::quote(7 * ETHER + 123, BASE_PRICE, 1250).unwrap();
        for _ in 0..10 {
            assert_eq!(PriceCalculator::quote(7 * ETHER + 123, BASE_PRICE, 1250).unwrap(), first);
        }
        assert_eq!(first.tokens, 7_000 * 1250 / 1000);
    }

    #[test]
    fn test_quote_rejects_zero_price() {
        assert!(matches!(
            PriceCalculator::quote(ETHER, 0, 1000),
            Err(CrowdsaleError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_quote_overflow() {
        assert_eq!(
            PriceCalculator::quote(Balance::MAX, 1, 1499),
            Err(CrowdsaleError::Overflow)
        );
    }

    #[test]
    fn test_founder_allocation() {
        assert_eq!(PriceCalculator::founder_allocation(22_485).unwrap(), 3_660);
        assert_eq!(PriceCalculator::founder_allocation(86).unwrap(), 14);
        assert_eq!(PriceCalculator::founder_allocation(0).unwrap(), 0);
        assert_eq!(
            PriceCalculator::founder_allocation(Balance::MAX),
            Err(CrowdsaleError::Overflow)
        );
    }
}
