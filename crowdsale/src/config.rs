//! Sale configuration

use ico_token::{Address, Balance};
use serde::{Deserialize, Serialize};

use crate::bonus::BonusSchedule;
use crate::error::{CrowdsaleError, Result};

/// 1 ether in wei
pub const ETHER: Balance = 1_000_000_000_000_000_000;

/// 0.001 ether per token before the bonus
pub const DEFAULT_BASE_TOKEN_PRICE: Balance = ETHER / 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleConfig {
    /// Account allowed to start, credit and finish the sale
    pub owner: Address,
    /// Beneficiary of the founder allocation
    pub multisig: Address,
    /// The controller's own ledger identity; must be the emission authority
    pub controller: Address,
    /// Value per token before the bonus
    pub base_token_price: Balance,
    pub schedule: BonusSchedule,
}

impl SaleConfig {
    pub fn new(owner: Address, multisig: Address, controller: Address) -> Self {
        Self {
            owner,
            multisig,
            controller,
            base_token_price: DEFAULT_BASE_TOKEN_PRICE,
            schedule: BonusSchedule::default(),
        }
    }

    pub fn with_base_token_price(mut self, base_token_price: Balance) -> Self {
        self.base_token_price = base_token_price;
        self
    }

    pub fn with_schedule(mut self, schedule: BonusSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_token_price == 0 {
            return Err(CrowdsaleError::InvalidAmount(
                "base token price must be positive".to_string(),
            ));
        }

        // Re-run tier validation in case the schedule came from a snapshot
        BonusSchedule::new(
            self.schedule.time_tiers().to_vec(),
            self.schedule.volume_tiers().to_vec(),
        )?;

        if self.controller == self.owner || self.controller == self.multisig {
            return Err(CrowdsaleError::InvalidState(format!(
                "controller {} must be distinct from owner and multisig",
                self.controller
            )));
        }
        Ok(())
    }
}
