//! Thread-safe handle around a single crowdsale
//!
//! Each call holds the lock for the whole operation, which gives the total
//! order the controller assumes between mutations.

use ico_token::{Address, Balance};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::bonus::Bps;
use crate::controller::{Crowdsale, CrowdsaleStatus};
use crate::error::Result;
use crate::pricing::PurchaseQuote;

#[derive(Debug, Clone)]
pub struct SharedCrowdsale {
    inner: Arc<Mutex<Crowdsale>>,
}

impl SharedCrowdsale {
    pub fn new(sale: Crowdsale) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sale)),
        }
    }

    pub fn start_ico(&self, caller: &Address, now: u64) -> Result<()> {
        self.inner.lock().start_ico(caller, now)
    }

    pub fn fund(&self, caller: &Address, value: Balance, now: u64) -> Result<PurchaseQuote> {
        self.inner.lock().fund(caller, value, now)
    }

    pub fn fund_btc(
        &self,
        caller: &Address,
        beneficiary: &Address,
        value: Balance,
        now: u64,
    ) -> Result<PurchaseQuote> {
        self.inner.lock().fund_btc(caller, beneficiary, value, now)
    }

    pub fn get_bonus(&self, now: u64) -> Bps {
        self.inner.lock().get_bonus(now)
    }

    pub fn finish_crowdsale(&self, caller: &Address, now: u64) -> Result<Balance> {
        self.inner.lock().finish_crowdsale(caller, now)
    }

    pub fn balance_of(&self, account: &Address) -> Balance {
        self.inner.lock().balance_of(account)
    }

    pub fn status(&self, now: u64) -> CrowdsaleStatus {
        self.inner.lock().status(now)
    }

    /// Run `f` with exclusive access to the controller
    pub fn with<R>(&self, f: impl FnOnce(&mut Crowdsale) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Copy of the current state, e.g. for persisting
    pub fn snapshot(&self) -> Crowdsale {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaleConfig, ETHER};
    use ico_token::TokenLedger;
    use std::thread;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    #[test]
    fn test_concurrent_funding_is_serialized() {
        let owner = addr(1);
        let controller = addr(3);
        let mut ledger = TokenLedger::new(owner);
        ledger.set_emission_authority(&owner, controller).unwrap();
        let sale = Crowdsale::new(SaleConfig::new(owner, addr(2), controller), ledger).unwrap();

        let shared = SharedCrowdsale::new(sale);
        shared.start_ico(&owner, 0).unwrap();

        thread::scope(|scope| {
            for n in 10..18u8 {
                let shared = shared.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        shared.fund(&addr(n), ETHER, 0).unwrap();
                    }
                });
            }
        });

        let status = shared.status(0);
        assert_eq!(status.ico_balance, 8 * 50 * ETHER);
        assert_eq!(status.coins_issued, 8 * 50 * 1499);
        assert_eq!(status.total_supply, status.coins_issued);
        assert!(shared.with(|sale| sale.ledger().is_conserved()));
        assert_eq!(shared.balance_of(&addr(10)), 50 * 1499);
    }
}
