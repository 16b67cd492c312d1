//! Bonused Crowdsale Controller
//!
//! Sells newly minted tokens at a base price with a decaying bonus:
//! - Direct contributions from any investor while the sale is active
//! - Owner-attested off-chain (BTC) contributions credited to a beneficiary
//! - One-shot finalization minting the founders' 14% to the multisig
//!
//! The controller owns the [`ico_token::TokenLedger`] and mints through it
//! as the ledger's emission authority.

pub mod bonus;
pub mod config;
pub mod controller;
pub mod error;
pub mod pricing;
pub mod shared;
pub mod state;

pub use bonus::{bonus_permille, BonusSchedule, Bps, SaleProgress, Tier, BASE_BPS};
pub use config::{SaleConfig, DEFAULT_BASE_TOKEN_PRICE, ETHER};
pub use controller::{Crowdsale, CrowdsaleStatus, FundingSource};
pub use error::{CrowdsaleError, Result};
pub use pricing::{PriceCalculator, PurchaseQuote, FOUNDER_SHARE_PERCENT, INVESTOR_SHARE_PERCENT};
pub use shared::SharedCrowdsale;
pub use state::{Operation, SaleState};

pub use ico_token::{Address, Balance, TokenError, TokenLedger};
