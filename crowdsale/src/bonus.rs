//! Bonus schedule
//!
//! Maps sale progress to a multiplier in basis points, where 1000 is the
//! undiscounted price and every point above it adds 0.1% (1499 = 49.9%).
//!
//! Two tier tables are supported, one keyed by seconds elapsed since the sale
//! started and one keyed by value raised so far. A tier applies while
//! progress is strictly below its threshold; past the last tier the bonus is
//! the 1000 floor. When both tables are configured the lower bonus wins.

use ico_token::Balance;
use serde::{Deserialize, Serialize};

use crate::error::{CrowdsaleError, Result};

/// Basis-point multiplier
pub type Bps = u32;

/// No bonus
pub const BASE_BPS: Bps = 1000;

const SECS_PER_DAY: u64 = 86_400;

/// One step in a tier table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier<T> {
    /// Exclusive upper bound of the progress this tier covers
    pub until: T,
    pub bonus_bps: Bps,
}

impl<T> Tier<T> {
    pub fn new(until: T, bonus_bps: Bps) -> Self {
        Self { until, bonus_bps }
    }
}

/// How far the sale has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaleProgress {
    pub elapsed_secs: u64,
    pub raised: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusSchedule {
    time_tiers: Vec<Tier<u64>>,
    volume_tiers: Vec<Tier<Balance>>,
}

impl BonusSchedule {
    pub fn new(time_tiers: Vec<Tier<u64>>, volume_tiers: Vec<Tier<Balance>>) -> Result<Self> {
        validate_tiers("time", &time_tiers)?;
        validate_tiers("volume", &volume_tiers)?;
        Ok(Self {
            time_tiers,
            volume_tiers,
        })
    }

    /// A schedule that never grants a bonus
    pub fn flat() -> Self {
        Self {
            time_tiers: Vec::new(),
            volume_tiers: Vec::new(),
        }
    }

    pub fn time_tiers(&self) -> &[Tier<u64>] {
        &self.time_tiers
    }

    pub fn volume_tiers(&self) -> &[Tier<Balance>] {
        &self.volume_tiers
    }

    /// Bonus applicable at `progress`
    pub fn bonus_at(&self, progress: SaleProgress) -> Bps {
        let by_time = lookup(&self.time_tiers, progress.elapsed_secs);
        let by_volume = lookup(&self.volume_tiers, progress.raised);

        match (by_time, by_volume) {
            (Some(t), Some(v)) => t.min(v),
            (Some(t), None) => t,
            (None, Some(v)) => v,
            (None, None) => BASE_BPS,
        }
    }

    /// Largest bonus the schedule can grant
    pub fn max_bonus(&self) -> Bps {
        self.bonus_at(SaleProgress::default())
    }
}

impl Default for BonusSchedule {
    /// 49.9% on the first day, stepping down weekly to no bonus after four weeks
    fn default() -> Self {
        Self {
            time_tiers: vec![
                Tier::new(SECS_PER_DAY, 1499),
                Tier::new(7 * SECS_PER_DAY, 1250),
                Tier::new(14 * SECS_PER_DAY, 1150),
                Tier::new(21 * SECS_PER_DAY, 1100),
                Tier::new(28 * SECS_PER_DAY, 1050),
            ],
            volume_tiers: Vec::new(),
        }
    }
}

/// Bonus as a percentage scaled by ten (1499 -> 499, i.e. 49.9%)
pub fn bonus_permille(bps: Bps) -> Bps {
    bps.saturating_sub(BASE_BPS)
}

/// `None` means the table is empty and does not constrain the bonus
fn lookup<T: PartialOrd>(tiers: &[Tier<T>], progress: T) -> Option<Bps> {
    if tiers.is_empty() {
        return None;
    }
    Some(
        tiers
            .iter()
            .find(|tier| progress < tier.until)
            .map(|tier| tier.bonus_bps)
            .unwrap_or(BASE_BPS),
    )
}

fn validate_tiers<T>(name: &str, tiers: &[Tier<T>]) -> Result<()>
where
    T: PartialOrd + Default + std::fmt::Debug,
{
    let mut previous: Option<&Tier<T>> = None;

    for (i, tier) in tiers.iter().enumerate() {
        if tier.bonus_bps < BASE_BPS {
            return Err(CrowdsaleError::InvalidSchedule(format!(
                "{} tier {} grants {} bps, below the {} floor",
                name, i, tier.bonus_bps, BASE_BPS
            )));
        }

        match previous {
            None if tier.until <= T::default() => {
                return Err(CrowdsaleError::InvalidSchedule(format!(
                    "{} tier {} has an empty range",
                    name, i
                )));
            }
            Some(prev) if tier.until <= prev.until => {
                return Err(CrowdsaleError::InvalidSchedule(format!(
                    "{} tier {} threshold {:?} does not exceed {:?}",
                    name, i, tier.until, prev.until
                )));
            }
            Some(prev) if tier.bonus_bps > prev.bonus_bps => {
                return Err(CrowdsaleError::InvalidSchedule(format!(
                    "{} tier {} raises the bonus from {} to {} bps",
                    name, i, prev.bonus_bps, tier.bonus_bps
                )));
            }
            _ => {}
        }

        previous = Some(tier);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(elapsed_secs: u64, raised: Balance) -> SaleProgress {
        SaleProgress {
            elapsed_secs,
            raised,
        }
    }

    #[test]
    fn test_default_schedule_starts_at_49_9_percent() {
        let schedule = BonusSchedule::default();
        assert_eq!(schedule.bonus_at(at(0, 0)), 1499);
        assert_eq!(bonus_permille(schedule.max_bonus()), 499);
    }

    #[test]
    fn test_default_schedule_steps_down() {
        let schedule = BonusSchedule::default();
        assert_eq!(schedule.bonus_at(at(SECS_PER_DAY - 1, 0)), 1499);
        assert_eq!(schedule.bonus_at(at(SECS_PER_DAY, 0)), 1250);
        assert_eq!(schedule.bonus_at(at(10 * SECS_PER_DAY, 0)), 1150);
        assert_eq!(schedule.bonus_at(at(27 * SECS_PER_DAY, 0)), 1050);
        assert_eq!(schedule.bonus_at(at(28 * SECS_PER_DAY, 0)), BASE_BPS);
        assert_eq!(schedule.bonus_at(at(u64::MAX, 0)), BASE_BPS);
    }

    #[test]
    fn test_lower_of_time_and_volume() {
        let schedule = BonusSchedule::new(
            vec![Tier::new(100, 1400), Tier::new(200, 1200)],
            vec![Tier::new(1_000, 1300), Tier::new(5_000, 1100)],
        )
        .unwrap();

        assert_eq!(schedule.bonus_at(at(0, 0)), 1300);
        assert_eq!(schedule.bonus_at(at(150, 0)), 1200);
        assert_eq!(schedule.bonus_at(at(150, 1_000)), 1100);
        assert_eq!(schedule.bonus_at(at(0, 5_000)), BASE_BPS);
    }

    #[test]
    fn test_monotonic_non_increasing() {
        let schedule = BonusSchedule::default();
        let mut last = Bps::MAX;
        for hour in 0..(30 * 24) {
            let bonus = schedule.bonus_at(at(hour * 3600, 0));
            assert!(bonus <= last);
            assert!(bonus >= BASE_BPS);
            last = bonus;
        }
    }

    #[test]
    fn test_flat_schedule() {
        assert_eq!(BonusSchedule::flat().bonus_at(at(0, 0)), BASE_BPS);
    }

    #[test]
    fn test_rejects_invalid_tables() {
        let below_floor = BonusSchedule::new(vec![Tier::new(10, 999)], vec![]);
        assert!(matches!(below_floor, Err(CrowdsaleError::InvalidSchedule(_))));

        let unordered = BonusSchedule::new(vec![Tier::new(10, 1200), Tier::new(10, 1100)], vec![]);
        assert!(matches!(unordered, Err(CrowdsaleError::InvalidSchedule(_))));

        let rising = BonusSchedule::new(vec![], vec![Tier::new(10, 1100), Tier::new(20, 1200)]);
        assert!(matches!(rising, Err(CrowdsaleError::InvalidSchedule(_))));

        let empty_range = BonusSchedule::new(vec![Tier::new(0, 1200)], vec![]);
        assert!(matches!(empty_range, Err(CrowdsaleError::InvalidSchedule(_))));
    }
}
