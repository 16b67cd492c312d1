//! Crowdsale controller
//!
//! Owns the token ledger and drives the sale lifecycle. Every operation
//! takes the caller identity and the current unix timestamp explicitly.
//!
//! Mutating operations follow one order: validate everything (including the
//! accumulator arithmetic), mint on the ledger, then commit the accumulators.
//! A rejected call leaves ledger and controller exactly as they were.

use ico_token::{Address, Balance, TokenLedger};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::bonus::{Bps, SaleProgress, BASE_BPS};
use crate::config::SaleConfig;
use crate::error::{CrowdsaleError, Result};
use crate::pricing::{PriceCalculator, PurchaseQuote};
use crate::state::{Operation, SaleState};

/// Where a contribution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingSource {
    /// Value attached by the investor
    Direct,
    /// Off-chain contribution attested by the owner
    Attested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crowdsale {
    config: SaleConfig,
    state: SaleState,
    ico_balance: Balance,
    coins_issued: Balance,
    direct_raised: Balance,
    attested_raised: Balance,
    founder_allocation: Balance,
    ledger: TokenLedger,
}

/// Read-only summary of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrowdsaleStatus {
    pub state: SaleState,
    pub ico_balance: Balance,
    pub coins_issued: Balance,
    pub direct_raised: Balance,
    pub attested_raised: Balance,
    pub founder_allocation: Balance,
    pub total_supply: Balance,
    pub bonus_bps: Bps,
}

impl Crowdsale {
    /// Create an inactive sale over `ledger`
    ///
    /// The ledger must not have issued anything yet. The ledger owner still
    /// has to make `config.controller` the emission authority before any
    /// contribution can be minted.
    pub fn new(config: SaleConfig, ledger: TokenLedger) -> Result<Self> {
        config.validate()?;
        if ledger.total_supply() != 0 {
            return Err(CrowdsaleError::InvalidState(format!(
                "ledger already carries a supply of {}",
                ledger.total_supply()
            )));
        }
        Ok(Self {
            config,
            state: SaleState::Inactive,
            ico_balance: 0,
            coins_issued: 0,
            direct_raised: 0,
            attested_raised: 0,
            founder_allocation: 0,
            ledger,
        })
    }

    pub fn start_ico(&mut self, caller: &Address, now: u64) -> Result<()> {
        self.require_owner(caller, "start the sale")?;
        self.state = self.state.next(Operation::Start, now)?;
        info!("crowdsale started at {}", now);
        Ok(())
    }

    /// Direct contribution of `value` by `caller`
    pub fn fund(&mut self, caller: &Address, value: Balance, now: u64) -> Result<PurchaseQuote> {
        self.state.check(Operation::Fund)?;
        self.credit_contribution(caller, value, FundingSource::Direct, now)
    }

    /// Owner-attested contribution credited to `beneficiary`
    pub fn fund_btc(
        &mut self,
        caller: &Address,
        beneficiary: &Address,
        value: Balance,
        now: u64,
    ) -> Result<PurchaseQuote> {
        self.require_owner(caller, "credit off-chain contributions")?;
        self.state.check(Operation::FundBtc)?;
        self.credit_contribution(beneficiary, value, FundingSource::Attested, now)
    }

    /// Current bonus in basis points
    ///
    /// Before the start this previews the opening bonus; after the finish no
    /// bonus applies.
    pub fn get_bonus(&self, now: u64) -> Bps {
        match self.state {
            SaleState::Inactive => self.config.schedule.max_bonus(),
            SaleState::Active { .. } => self.config.schedule.bonus_at(self.progress(now)),
            SaleState::Finished { .. } => BASE_BPS,
        }
    }

    /// Close the sale and mint the founder allocation to the multisig
    pub fn finish_crowdsale(&mut self, caller: &Address, now: u64) -> Result<Balance> {
        self.require_owner(caller, "finish the sale")?;
        let next = self.state.next(Operation::Finish, now)?;

        let founder_bonus = PriceCalculator::founder_allocation(self.coins_issued)?;
        let controller = self.config.controller;
        self.ledger
            .mint(&controller, &self.config.multisig, founder_bonus)?;
        self.ledger.unlock(&controller)?;

        self.founder_allocation = founder_bonus;
        self.state = next;
        info!(
            "crowdsale finished at {}: raised {}, issued {}, founders {}",
            now, self.ico_balance, self.coins_issued, founder_bonus
        );
        Ok(founder_bonus)
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn state(&self) -> SaleState {
        self.state
    }

    pub fn config(&self) -> &SaleConfig {
        &self.config
    }

    pub fn ico_balance(&self) -> Balance {
        self.ico_balance
    }

    pub fn coins_issued(&self) -> Balance {
        self.coins_issued
    }

    pub fn raised_by(&self, source: FundingSource) -> Balance {
        match source {
            FundingSource::Direct => self.direct_raised,
            FundingSource::Attested => self.attested_raised,
        }
    }

    pub fn founder_allocation(&self) -> Balance {
        self.founder_allocation
    }

    pub fn owner(&self) -> &Address {
        &self.config.owner
    }

    pub fn multisig(&self) -> &Address {
        &self.config.multisig
    }

    pub fn address(&self) -> &Address {
        &self.config.controller
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    /// Ledger access for its own owner-gated operations (authority changes,
    /// transfers). Minting still requires the emission authority identity.
    pub fn ledger_mut(&mut self) -> &mut TokenLedger {
        &mut self.ledger
    }

    pub fn balance_of(&self, account: &Address) -> Balance {
        self.ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> Balance {
        self.ledger.total_supply()
    }

    pub fn status(&self, now: u64) -> CrowdsaleStatus {
        CrowdsaleStatus {
            state: self.state,
            ico_balance: self.ico_balance,
            coins_issued: self.coins_issued,
            direct_raised: self.direct_raised,
            attested_raised: self.attested_raised,
            founder_allocation: self.founder_allocation,
            total_supply: self.ledger.total_supply(),
            bonus_bps: self.get_bonus(now),
        }
    }

    /// Check a controller rebuilt from outside (e.g. a snapshot)
    ///
    /// The configuration must still validate and the accumulators must agree
    /// with each other and with the ledger.
    pub fn verify(&self) -> Result<()> {
        self.config.validate()?;

        if !self.ledger.is_conserved() {
            return Err(CrowdsaleError::InvalidState(
                "ledger supply does not match its balances".to_string(),
            ));
        }
        if checked_add(self.direct_raised, self.attested_raised)? != self.ico_balance {
            return Err(CrowdsaleError::InvalidState(format!(
                "raised split {} + {} does not add up to {}",
                self.direct_raised, self.attested_raised, self.ico_balance
            )));
        }
        if checked_add(self.coins_issued, self.founder_allocation)? != self.ledger.total_supply() {
            return Err(CrowdsaleError::InvalidState(format!(
                "issued {} + founders {} does not match supply {}",
                self.coins_issued,
                self.founder_allocation,
                self.ledger.total_supply()
            )));
        }
        if !matches!(self.state, SaleState::Finished { .. }) && self.founder_allocation != 0 {
            return Err(CrowdsaleError::InvalidState(
                "founder allocation recorded before the finish".to_string(),
            ));
        }
        Ok(())
    }

    /// Shared pricing, minting and accounting for both funding paths.
    /// Callers have already checked the lifecycle and caller role.
    fn credit_contribution(
        &mut self,
        beneficiary: &Address,
        value: Balance,
        source: FundingSource,
        now: u64,
    ) -> Result<PurchaseQuote> {
        if value == 0 {
            return Err(CrowdsaleError::InvalidAmount(
                "contribution must be positive".to_string(),
            ));
        }

        let bonus_bps = self.config.schedule.bonus_at(self.progress(now));
        let quote = PriceCalculator::quote(value, self.config.base_token_price, bonus_bps)?;
        if quote.tokens == 0 {
            return Err(CrowdsaleError::InvalidAmount(format!(
                "contribution {} buys no tokens at base price {}",
                value, self.config.base_token_price
            )));
        }
        debug!(
            "priced {} ({:?}) at {} bps: {} tokens",
            value, source, bonus_bps, quote.tokens
        );

        let ico_balance = checked_add(self.ico_balance, value)?;
        let coins_issued = checked_add(self.coins_issued, quote.tokens)?;
        let path_raised = checked_add(self.raised_by(source), value)?;

        let controller = self.config.controller;
        self.ledger.mint(&controller, beneficiary, quote.tokens)?;

        self.ico_balance = ico_balance;
        self.coins_issued = coins_issued;
        match source {
            FundingSource::Direct => self.direct_raised = path_raised,
            FundingSource::Attested => self.attested_raised = path_raised,
        }

        info!(
            "credited {} tokens to {} for {} ({:?})",
            quote.tokens, beneficiary, value, source
        );
        Ok(quote)
    }

    fn progress(&self, now: u64) -> SaleProgress {
        SaleProgress {
            elapsed_secs: self
                .state
                .started_at()
                .map(|started| now.saturating_sub(started))
                .unwrap_or(0),
            raised: self.ico_balance,
        }
    }

    fn require_owner(&self, caller: &Address, action: &str) -> Result<()> {
        if *caller != self.config.owner {
            warn!("{} tried to {} without being the owner", caller, action);
            return Err(CrowdsaleError::Unauthorized(format!(
                "only the owner may {}",
                action
            )));
        }
        Ok(())
    }
}

fn checked_add(a: Balance, b: Balance) -> Result<Balance> {
    a.checked_add(b).ok_or(CrowdsaleError::Overflow)
}
