//! Sale configuration file (TOML)
//!
//! ```toml
//! [sale]
//! owner = "0x..."
//! multisig = "0x..."
//! controller = "0x..."
//! base_token_price = "0.001eth"
//!
//! [[bonus.time_tiers]]
//! until = 86400
//! bonus_bps = 1499
//! ```
//!
//! Without a `[bonus]` table the default schedule applies.

use ico_crowdsale::{
    Address, Balance, BonusSchedule, CrowdsaleError, SaleConfig, Tier, DEFAULT_BASE_TOKEN_PRICE,
    ETHER,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

const ETHER_DECIMALS: usize = 18;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid sale configuration: {0}")]
    InvalidSale(#[from] CrowdsaleError),
}

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub sale: SaleSection,
    pub bonus: Option<BonusSection>,
}

#[derive(Debug, Deserialize)]
pub struct SaleSection {
    pub owner: Address,
    pub multisig: Address,
    pub controller: Address,
    pub base_token_price: Option<AmountField>,
}

#[derive(Debug, Deserialize, Default)]
pub struct BonusSection {
    #[serde(default)]
    pub time_tiers: Vec<TierEntry<u64>>,
    #[serde(default)]
    pub volume_tiers: Vec<TierEntry<AmountField>>,
}

#[derive(Debug, Deserialize)]
pub struct TierEntry<T> {
    pub until: T,
    pub bonus_bps: u32,
}

/// TOML integers stop at i64, so large amounts are written as strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Integer(u64),
    Text(String),
}

impl AmountField {
    pub fn to_balance(&self) -> Result<Balance, ConfigError> {
        match self {
            AmountField::Integer(n) => Ok(Balance::from(*n)),
            AmountField::Text(s) => parse_amount(s).map_err(ConfigError::InvalidAmount),
        }
    }
}

impl ConfigFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_sale_config(&self) -> Result<SaleConfig, ConfigError> {
        let base_token_price = match &self.sale.base_token_price {
            Some(price) => price.to_balance()?,
            None => DEFAULT_BASE_TOKEN_PRICE,
        };

        let schedule = match &self.bonus {
            Some(bonus) => {
                let time_tiers = bonus
                    .time_tiers
                    .iter()
                    .map(|t| Tier::new(t.until, t.bonus_bps))
                    .collect();
                let volume_tiers = bonus
                    .volume_tiers
                    .iter()
                    .map(|t| Ok(Tier::new(t.until.to_balance()?, t.bonus_bps)))
                    .collect::<Result<Vec<_>, ConfigError>>()?;
                BonusSchedule::new(time_tiers, volume_tiers)?
            }
            None => BonusSchedule::default(),
        };

        let config = SaleConfig::new(self.sale.owner, self.sale.multisig, self.sale.controller)
            .with_base_token_price(base_token_price)
            .with_schedule(schedule);
        config.validate()?;
        Ok(config)
    }
}

/// Parse a wei amount: `"15000"`, `"10eth"`, `"0.001 ether"`
pub fn parse_amount(s: &str) -> Result<Balance, String> {
    let s = s.trim().replace('_', "");
    let lower = s.to_ascii_lowercase();

    let ether_part = lower
        .strip_suffix("ether")
        .or_else(|| lower.strip_suffix("eth"))
        .map(str::trim);

    let Some(ether) = ether_part else {
        return lower
            .parse::<Balance>()
            .map_err(|e| format!("{}: {}", s, e));
    };

    let (whole, frac) = ether.split_once('.').unwrap_or((ether, ""));
    if frac.len() > ETHER_DECIMALS {
        return Err(format!("{}: more than {} decimals", s, ETHER_DECIMALS));
    }
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("{}: missing number", s));
    }

    let whole: Balance = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|e| format!("{}: {}", s, e))?
    };
    let frac: Balance = if frac.is_empty() {
        0
    } else {
        format!("{:0<width$}", frac, width = ETHER_DECIMALS)
            .parse()
            .map_err(|e| format!("{}: {}", s, e))?
    };

    whole
        .checked_mul(ETHER)
        .and_then(|wei| wei.checked_add(frac))
        .ok_or_else(|| format!("{}: amount too large", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = include_str!("../config/sale.example.toml");

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("15000").unwrap(), 15_000);
        assert_eq!(parse_amount("10eth").unwrap(), 10 * ETHER);
        assert_eq!(parse_amount("0.001 ether").unwrap(), ETHER / 1000);
        assert_eq!(parse_amount("1.5ETH").unwrap(), 3 * ETHER / 2);
        assert_eq!(parse_amount(".25eth").unwrap(), ETHER / 4);
        assert_eq!(parse_amount("1_000").unwrap(), 1_000);
    }

    #[test]
    fn test_parse_amount_rejects() {
        assert!(parse_amount("eth").is_err());
        assert!(parse_amount("1.0000000000000000001eth").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn test_example_config() {
        let file = ConfigFile::parse(EXAMPLE).unwrap();
        let config = file.to_sale_config().unwrap();

        assert_eq!(config.base_token_price, ETHER / 1000);
        assert_eq!(config.schedule.time_tiers().len(), 5);
        assert_eq!(config.schedule.volume_tiers()[0].until, 2000 * ETHER);
        assert_eq!(config.schedule.max_bonus(), 1499);
        assert_eq!(
            config.multisig.to_string(),
            "0xaec3ae5d2be00bfc91597d7a1b2c43818d84396a"
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = ConfigFile::parse(
            r#"
            [sale]
            owner = "0x1000000000000000000000000000000000000001"
            multisig = "0x2000000000000000000000000000000000000002"
            controller = "0x3000000000000000000000000000000000000003"
            "#,
        )
        .unwrap();
        let config = file.to_sale_config().unwrap();

        assert_eq!(config.base_token_price, DEFAULT_BASE_TOKEN_PRICE);
        assert_eq!(config.schedule, BonusSchedule::default());
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        let file = ConfigFile::parse(
            r#"
            [sale]
            owner = "0x1000000000000000000000000000000000000001"
            multisig = "0x2000000000000000000000000000000000000002"
            controller = "0x3000000000000000000000000000000000000003"

            [[bonus.time_tiers]]
            until = 100
            bonus_bps = 900
            "#,
        )
        .unwrap();

        assert!(matches!(
            file.to_sale_config(),
            Err(ConfigError::InvalidSale(CrowdsaleError::InvalidSchedule(_)))
        ));
    }
}
