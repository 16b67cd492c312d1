//! Token ledger state
//!
//! Balances, allowances and the supply counter. Minting is reserved for the
//! single emission authority; the owner may replace that authority at any
//! time. Transfers stay disabled until the ledger is unlocked.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::Address;
use crate::error::{Result, TokenError};
use crate::Balance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLedger {
    owner: Address,
    emission_authority: Option<Address>,
    balances: HashMap<Address, Balance>,
    allowances: HashMap<Address, HashMap<Address, Balance>>,
    total_supply: Balance,
    locked: bool,
}

impl TokenLedger {
    /// Create an empty, locked ledger controlled by `owner`
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            emission_authority: None,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
            locked: true,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn emission_authority(&self) -> Option<&Address> {
        self.emission_authority.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Replace the sole account allowed to mint
    pub fn set_emission_authority(&mut self, caller: &Address, authority: Address) -> Result<()> {
        if *caller != self.owner {
            warn!("rejected emission authority change from {}", caller);
            return Err(TokenError::Unauthorized(format!(
                "{} is not the ledger owner",
                caller
            )));
        }

        info!(
            "emission authority changed: {:?} -> {}",
            self.emission_authority, authority
        );
        self.emission_authority = Some(authority);
        Ok(())
    }

    /// Mint `amount` new units to `to`
    ///
    /// Both the recipient balance and the supply are computed before either
    /// is written, so an overflow leaves the ledger untouched.
    pub fn mint(&mut self, caller: &Address, to: &Address, amount: Balance) -> Result<()> {
        if self.emission_authority.as_ref() != Some(caller) {
            warn!("rejected mint of {} from {}", amount, caller);
            return Err(TokenError::Unauthorized(format!(
                "{} is not the emission authority",
                caller
            )));
        }

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        if amount > 0 {
            self.balances.insert(*to, new_balance);
            self.total_supply = new_supply;
        }

        debug!("minted {} to {} (supply {})", amount, to, self.total_supply);
        Ok(())
    }

    pub fn balance_of(&self, account: &Address) -> Balance {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> Balance {
        self.total_supply
    }

    pub fn allowance(&self, holder: &Address, spender: &Address) -> Balance {
        self.allowances
            .get(holder)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Enable transfers. Only the owner or the emission authority may unlock.
    pub fn unlock(&mut self, caller: &Address) -> Result<()> {
        let permitted =
            *caller == self.owner || self.emission_authority.as_ref() == Some(caller);
        if !permitted {
            return Err(TokenError::Unauthorized(format!(
                "{} may not unlock transfers",
                caller
            )));
        }

        if self.locked {
            info!("token transfers unlocked by {}", caller);
            self.locked = false;
        }
        Ok(())
    }

    pub fn transfer(&mut self, caller: &Address, to: &Address, amount: Balance) -> Result<()> {
        self.ensure_transferable(amount)?;
        self.move_balance(caller, to, amount)
    }

    /// Set the amount `spender` may move out of the caller's balance
    pub fn approve(&mut self, caller: &Address, spender: &Address, amount: Balance) -> Result<()> {
        self.allowances
            .entry(*caller)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Balance,
    ) -> Result<()> {
        self.ensure_transferable(amount)?;

        let allowed = self.allowance(from, caller);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }

        self.move_balance(from, to, amount)?;
        self.allowances
            .entry(*from)
            .or_default()
            .insert(*caller, allowed - amount);
        Ok(())
    }

    /// Accounts holding a non-zero balance, sorted by address
    pub fn holders(&self) -> Vec<(Address, Balance)> {
        let mut holders: Vec<_> = self
            .balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(account, balance)| (*account, *balance))
            .collect();
        holders.sort();
        holders
    }

    /// True when the recorded supply equals the sum of all balances
    pub fn is_conserved(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, balance| acc.checked_add(*balance));
        sum == Some(self.total_supply)
    }

    fn ensure_transferable(&self, amount: Balance) -> Result<()> {
        if self.locked {
            return Err(TokenError::InvalidState(
                "transfers are locked".to_string(),
            ));
        }
        if amount == 0 {
            return Err(TokenError::InvalidAmount(
                "zero transfer".to_string(),
            ));
        }
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Balance) -> Result<()> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                have: from_balance,
                need: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, to_balance);
        Ok(())
    }
}
