use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Grouping for badges. Decides which stat a badge's requirement is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeCategory {
    Streak,
    Speed,
    Accuracy,
    Progress,
    Special,
}

impl BadgeCategory {
    pub const ALL: [BadgeCategory; 5] = [
        BadgeCategory::Streak,
        BadgeCategory::Speed,
        BadgeCategory::Accuracy,
        BadgeCategory::Progress,
        BadgeCategory::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeCategory::Streak => "streak",
            BadgeCategory::Speed => "speed",
            BadgeCategory::Accuracy => "accuracy",
            BadgeCategory::Progress => "progress",
            BadgeCategory::Special => "special",
        }
    }
}

impl std::fmt::Display for BadgeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BadgeCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BadgeCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown badge category: {s}"))
    }
}

/// Bespoke qualification rule for `special` badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum Predicate {
    /// Puzzle completed strictly before `before_hour` local time.
    EarlyBird { before_hour: u32 },
    /// Puzzle completed after local midnight, strictly before `until_hour`.
    NightOwl { until_hour: u32 },
    /// Signed up among the first `max_rank` players.
    Founder { max_rank: u64 },
    /// Weekend completions reached the badge's requirement.
    WeekendWarrior,
}

/// An achievement definition. Never mutated once the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub description: String,
    pub category: BadgeCategory,
    pub tier: u8,

    /// Days for streak, puzzles for progress, seconds for speed, first-attempt
    /// solves for accuracy. `None` for predicate-only badges.
    pub requirement: Option<u64>,
    pub predicate: Option<Predicate>,

    pub color: String,
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} **{}** [{} / tier {}]\n\
             \t{}",
            self.emoji, self.name, self.category, self.tier, self.description
        )
    }
}

/// Snapshot of a player's running statistics, as handed over by the backend.
///
/// Counters are signed so a malformed snapshot can be represented and rejected
/// by [`PlayerStats::validate`] instead of failing somewhere less obvious.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub current_streak: i64,
    pub longest_streak: i64,
    pub total_solved: i64,
    pub first_attempt_solves: i64,

    #[serde(default)]
    pub best_time_secs: Option<f64>,
    #[serde(default)]
    pub last_time_secs: Option<f64>,

    /// Local time-of-day of the completion that triggered this evaluation.
    #[serde(default)]
    pub completed_at: Option<NaiveTime>,

    pub weekend_completions: i64,

    #[serde(default)]
    pub signup_rank: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {value})")]
    NegativeCounter { field: &'static str, value: i64 },

    #[error("{field} ({value}) exceeds {bound_field} ({bound})")]
    Inconsistent {
        field: &'static str,
        value: i64,
        bound_field: &'static str,
        bound: i64,
    },

    #[error("{field} must be a positive number of seconds (got {value})")]
    InvalidTime { field: &'static str, value: f64 },

    #[error("signupRank starts at 1 (got {0})")]
    InvalidRank(i64),

    #[error("Malformed stats snapshot: {0}")]
    Malformed(String),
}

impl PlayerStats {
    /// Parses a JSON snapshot. Missing counters and bad JSON are validation failures.
    pub fn from_json(raw: &str) -> Result<Self, ValidationError> {
        let stats: PlayerStats =
            serde_json::from_str(raw).map_err(|err| ValidationError::Malformed(err.to_string()))?;
        stats.validate()?;
        Ok(stats)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let counters = [
            ("currentStreak", self.current_streak),
            ("longestStreak", self.longest_streak),
            ("totalSolved", self.total_solved),
            ("firstAttemptSolves", self.first_attempt_solves),
            ("weekendCompletions", self.weekend_completions),
        ];
        if let Some(&(field, value)) = counters.iter().find(|(_, value)| *value < 0) {
            return Err(ValidationError::NegativeCounter { field, value });
        }

        let bounded = [
            ("currentStreak", self.current_streak, "longestStreak", self.longest_streak),
            ("firstAttemptSolves", self.first_attempt_solves, "totalSolved", self.total_solved),
            ("weekendCompletions", self.weekend_completions, "totalSolved", self.total_solved),
        ];
        if let Some(&(field, value, bound_field, bound)) =
            bounded.iter().find(|(_, value, _, bound)| value > bound)
        {
            return Err(ValidationError::Inconsistent { field, value, bound_field, bound });
        }

        for (field, time) in [("bestTimeSecs", self.best_time_secs), ("lastTimeSecs", self.last_time_secs)] {
            if let Some(value) = time {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ValidationError::InvalidTime { field, value });
                }
            }
        }

        match self.signup_rank {
            Some(rank) if rank < 1 => Err(ValidationError::InvalidRank(rank)),
            _ => Ok(()),
        }
    }

    /// The fastest completion time we know of, if any.
    pub fn fastest_time_secs(&self) -> Option<f64> {
        match (self.best_time_secs, self.last_time_secs) {
            (Some(best), Some(last)) => Some(best.min(last)),
            (best, last) => best.or(last),
        }
    }
}

/// A badge a player holds. Append-only: rows are never rewritten or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    #[serde(rename = "id")]
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

/// A catalog badge joined with the moment it was earned, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedBadge {
    #[serde(flatten)]
    pub badge: Badge,
    pub earned_at: DateTime<Utc>,
}

impl std::fmt::Display for HydratedBadge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n\tEarned: {}", self.badge, self.earned_at.format("%Y-%m-%d %H:%M UTC"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> PlayerStats {
        PlayerStats {
            current_streak: 4,
            longest_streak: 9,
            total_solved: 20,
            first_attempt_solves: 12,
            best_time_secs: Some(140.0),
            last_time_secs: Some(210.5),
            completed_at: NaiveTime::from_hms_opt(6, 45, 0),
            weekend_completions: 5,
            signup_rank: Some(42),
        }
    }

    #[test]
    fn well_formed_stats_validate() {
        assert_eq!(stats().validate(), Ok(()));
    }

    #[test]
    fn negative_counter_is_rejected() {
        let stats = PlayerStats { total_solved: -1, ..stats() };
        assert!(matches!(
            stats.validate(),
            Err(ValidationError::NegativeCounter { field: "totalSolved", value: -1 })
        ));
    }

    #[test]
    fn streak_longer_than_longest_is_rejected() {
        let stats = PlayerStats { current_streak: 10, ..stats() };
        assert!(matches!(
            stats.validate(),
            Err(ValidationError::Inconsistent { field: "currentStreak", .. })
        ));
    }

    #[test]
    fn zero_time_is_rejected() {
        let stats = PlayerStats { last_time_secs: Some(0.0), ..stats() };
        assert!(matches!(stats.validate(), Err(ValidationError::InvalidTime { .. })));
    }

    #[test]
    fn rank_zero_is_rejected() {
        let stats = PlayerStats { signup_rank: Some(0), ..stats() };
        assert_eq!(stats.validate(), Err(ValidationError::InvalidRank(0)));
    }

    #[test]
    fn missing_counter_is_malformed() {
        let raw = r#"{ "currentStreak": 1, "longestStreak": 1, "totalSolved": 1 }"#;
        assert!(matches!(PlayerStats::from_json(raw), Err(ValidationError::Malformed(_))));
    }

    #[test]
    fn json_snapshot_parses_with_nullable_fields_omitted() {
        let raw = r#"{
            "currentStreak": 2, "longestStreak": 3, "totalSolved": 8,
            "firstAttemptSolves": 1, "weekendCompletions": 0,
            "completedAt": "23:59:10"
        }"#;
        let stats = PlayerStats::from_json(raw).unwrap();
        assert_eq!(stats.best_time_secs, None);
        assert_eq!(stats.completed_at, NaiveTime::from_hms_opt(23, 59, 10));
    }

    #[test]
    fn fastest_time_prefers_the_smaller_value() {
        assert_eq!(stats().fastest_time_secs(), Some(140.0));
        let only_last = PlayerStats { best_time_secs: None, ..stats() };
        assert_eq!(only_last.fastest_time_secs(), Some(210.5));
    }

    #[test]
    fn categories_parse_case_insensitively() {
        assert_eq!("Speed".parse::<BadgeCategory>().unwrap(), BadgeCategory::Speed);
        assert!("gold".parse::<BadgeCategory>().is_err());
    }
}
