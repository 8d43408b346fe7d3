use chrono::Timelike;

use crate::models::{PlayerStats, Predicate};

impl Predicate {
    /// Checks the rule against a stats snapshot. `requirement` is the owning badge's
    /// threshold, used by counter-based rules.
    pub fn holds(&self, stats: &PlayerStats, requirement: Option<u64>) -> bool {
        match *self {
            Predicate::EarlyBird { before_hour } => stats
                .completed_at
                .is_some_and(|time| time.hour() < before_hour),
            Predicate::NightOwl { until_hour } => stats
                .completed_at
                .is_some_and(|time| time.hour() < until_hour),
            Predicate::Founder { max_rank } => stats
                .signup_rank
                .is_some_and(|rank| u64::try_from(rank).is_ok_and(|rank| rank <= max_rank)),
            Predicate::WeekendWarrior => requirement
                .is_some_and(|needed| at_least(stats.weekend_completions, needed)),
        }
    }
}

/// `value >= needed` for a validated (non-negative) counter.
pub(crate) fn at_least(value: i64, needed: u64) -> bool {
    u64::try_from(value).is_ok_and(|value| value >= needed)
}
