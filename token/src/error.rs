//! Token ledger error types

use crate::Balance;
use thiserror::Error;

/// Token ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Balance, need: Balance },

    #[error("Insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: Balance, need: Balance },
}

pub type Result<T> = std::result::Result<T, TokenError>;
