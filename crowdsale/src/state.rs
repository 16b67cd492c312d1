//! Sale lifecycle
//!
//! `Inactive -> Active -> Finished`. `Finished` is terminal. Every operation
//! on the controller is checked against [`SaleState::check`] before it
//! touches any state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CrowdsaleError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleState {
    /// Created, not yet accepting funds
    Inactive,
    /// Accepting contributions
    Active { started_at: u64 },
    /// Closed for good; founder allocation minted
    Finished { started_at: u64, finished_at: u64 },
}

/// Controller operations subject to the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Fund,
    FundBtc,
    Finish,
}

impl SaleState {
    /// Transition table
    pub fn check(&self, op: Operation) -> Result<()> {
        let permitted = matches!(
            (self, op),
            (SaleState::Inactive, Operation::Start)
                | (SaleState::Active { .. }, Operation::Fund)
                | (SaleState::Active { .. }, Operation::FundBtc)
                | (SaleState::Active { .. }, Operation::Finish)
        );

        if permitted {
            Ok(())
        } else {
            Err(CrowdsaleError::InvalidState(format!(
                "{:?} is not allowed while the sale is {}",
                op, self
            )))
        }
    }

    /// State after `op` succeeds at time `now`
    pub fn next(&self, op: Operation, now: u64) -> Result<SaleState> {
        self.check(op)?;
        Ok(match (*self, op) {
            (SaleState::Inactive, Operation::Start) => SaleState::Active { started_at: now },
            (SaleState::Active { started_at }, Operation::Finish) => SaleState::Finished {
                started_at,
                finished_at: now,
            },
            (state, _) => state,
        })
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SaleState::Active { .. })
    }

    pub fn started_at(&self) -> Option<u64> {
        match self {
            SaleState::Inactive => None,
            SaleState::Active { started_at } | SaleState::Finished { started_at, .. } => {
                Some(*started_at)
            }
        }
    }
}

impl Default for SaleState {
    fn default() -> Self {
        SaleState::Inactive
    }
}

impl fmt::Display for SaleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleState::Inactive => write!(f, "inactive"),
            SaleState::Active { .. } => write!(f, "active"),
            SaleState::Finished { .. } => write!(f, "finished"),
        }
    }
}
