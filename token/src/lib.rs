//! Crowdsale Token Ledger
//!
//! Authoritative balances and total supply for the issued asset:
//! - Mint-only supply, gated by a single emission authority
//! - Owner-controlled replacement of the emission authority
//! - Standard debit/credit transfers once the ledger is unlocked
//!
//! Every mutation keeps `sum(balances) == total_supply`.

pub mod address;
pub mod error;
pub mod ledger;

pub use address::{Address, AddressError};
pub use error::{Result, TokenError};
pub use ledger::TokenLedger;

/// Token and value amounts (smallest indivisible unit)
pub type Balance = u128;

