//! Crowdsale error types

use ico_token::TokenError;
use thiserror::Error;

/// Crowdsale controller errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrowdsaleError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid bonus schedule: {0}")]
    InvalidSchedule(String),

    #[error("Ledger error: {0}")]
    Token(#[from] TokenError),
}

pub type Result<T> = std::result::Result<T, CrowdsaleError>;
