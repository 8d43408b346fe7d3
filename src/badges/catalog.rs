use std::collections::HashMap;
use std::sync::LazyLock;

use itertools::Itertools;

use crate::models::{Badge, BadgeCategory, EarnedBadge, HydratedBadge, Predicate};

static STANDARD: LazyLock<BadgeCatalog> = LazyLock::new(|| {
    let badges = standard_badges();
    BadgeCatalog { index: index_of(&badges), badges }
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("Badge id '{0}' is defined more than once")]
    DuplicateId(String),
    #[error("Badge '{id}' has tier {tier}; tiers run from 1 to 4")]
    TierOutOfRange { id: String, tier: u8 },
}

/// Immutable lookup table of badge definitions.
///
/// Built once and only ever read afterwards, so a shared reference can be handed to
/// any number of concurrent evaluations.
#[derive(Debug, Clone)]
pub struct BadgeCatalog {
    badges: Vec<Badge>,
    index: HashMap<String, usize>,
}

impl BadgeCatalog {
    pub fn new(badges: Vec<Badge>) -> Result<Self, CatalogError> {
        if let Some(badge) = badges.iter().find(|badge| !(1..=4).contains(&badge.tier)) {
            return Err(CatalogError::TierOutOfRange { id: badge.id.clone(), tier: badge.tier });
        }
        if let Some(id) = badges.iter().map(|badge| &badge.id).duplicates().next() {
            return Err(CatalogError::DuplicateId(id.clone()));
        }

        log::debug!("[BadgeCatalog::new] Built catalog with {} badges.", badges.len());
        Ok(Self { index: index_of(&badges), badges })
    }

    /// The built-in catalog shipped with the daily crossword.
    pub fn standard() -> &'static BadgeCatalog {
        &STANDARD
    }

    pub fn get(&self, id: &str) -> Option<&Badge> {
        self.index.get(id).map(|&i| &self.badges[i])
    }

    pub fn all(&self) -> &[Badge] {
        &self.badges
    }

    /// Badges of one category, easiest tier first.
    pub fn by_category(&self, category: BadgeCategory) -> Vec<&Badge> {
        self.badges
            .iter()
            .filter(|badge| badge.category == category)
            .sorted_by_key(|badge| badge.tier)
            .collect()
    }

    /// Joins earned records against the catalog. Records whose badge no longer
    /// exists are dropped.
    pub fn hydrate(&self, earned: &[EarnedBadge]) -> Vec<HydratedBadge> {
        earned
            .iter()
            .filter_map(|record| match self.get(&record.badge_id) {
                Some(badge) => Some(HydratedBadge { badge: badge.clone(), earned_at: record.earned_at }),
                None => {
                    log::trace!("[hydrate] Dropping unknown badge id '{}'.", record.badge_id);
                    None
                }
            })
            .collect()
    }
}

fn index_of(badges: &[Badge]) -> HashMap<String, usize> {
    badges.iter().enumerate().map(|(i, badge)| (badge.id.clone(), i)).collect()
}

fn numeric(
    id: &str,
    name: &str,
    emoji: &str,
    description: &str,
    category: BadgeCategory,
    tier: u8,
    requirement: u64,
    color: &str,
) -> Badge {
    Badge {
        id: id.to_string(),
        name: name.to_string(),
        emoji: emoji.to_string(),
        description: description.to_string(),
        category,
        tier,
        requirement: Some(requirement),
        predicate: None,
        color: color.to_string(),
    }
}

fn special(
    id: &str,
    name: &str,
    emoji: &str,
    description: &str,
    tier: u8,
    requirement: Option<u64>,
    predicate: Predicate,
    color: &str,
) -> Badge {
    Badge {
        id: id.to_string(),
        name: name.to_string(),
        emoji: emoji.to_string(),
        description: description.to_string(),
        category: BadgeCategory::Special,
        tier,
        requirement,
        predicate: Some(predicate),
        color: color.to_string(),
    }
}

fn standard_badges() -> Vec<Badge> {
    use BadgeCategory::*;

    vec![
        numeric("streak-3", "Warming Up", "🔥", "Solve 3 days in a row", Streak, 1, 3, "#f97316"),
        numeric("streak-7", "Week Warrior", "⚡", "Solve 7 days in a row", Streak, 2, 7, "#eab308"),
        numeric("streak-30", "Monthly Master", "💎", "Solve 30 days in a row", Streak, 3, 30, "#06b6d4"),
        numeric("streak-100", "Centurion", "👑", "Solve 100 days in a row", Streak, 4, 100, "#a855f7"),

        numeric("speed-600", "Steady Solver", "⏱️", "Finish a puzzle in under 10 minutes", Speed, 1, 600, "#22c55e"),
        numeric("speed-300", "Quick Thinker", "🏃", "Finish a puzzle in under 5 minutes", Speed, 2, 300, "#10b981"),
        numeric("speed-180", "Lightning Fingers", "⚡", "Finish a puzzle in under 3 minutes", Speed, 3, 180, "#14b8a6"),
        numeric("speed-90", "Speed Demon", "🚀", "Finish a puzzle in under 90 seconds", Speed, 4, 90, "#0ea5e9"),

        numeric("accuracy-10", "Sharp Eye", "🎯", "Solve 10 puzzles on the first attempt", Accuracy, 1, 10, "#ef4444"),
        numeric("accuracy-50", "Precision", "🔍", "Solve 50 puzzles on the first attempt", Accuracy, 2, 50, "#f43f5e"),
        numeric("accuracy-100", "Flawless", "✨", "Solve 100 puzzles on the first attempt", Accuracy, 3, 100, "#ec4899"),
        numeric("accuracy-250", "Perfectionist", "🏅", "Solve 250 puzzles on the first attempt", Accuracy, 4, 250, "#d946ef"),

        numeric("progress-1", "First Steps", "🌱", "Solve your first daily puzzle", Progress, 1, 1, "#84cc16"),
        numeric("progress-10", "Regular", "📅", "Solve 10 daily puzzles", Progress, 2, 10, "#65a30d"),
        numeric("progress-50", "Dedicated", "📚", "Solve 50 daily puzzles", Progress, 3, 50, "#4d7c0f"),
        numeric("progress-100", "Wordsmith", "🏆", "Solve 100 daily puzzles", Progress, 4, 100, "#ca8a04"),

        special("early-bird", "Early Bird", "🐦", "Finish a puzzle before 7 AM", 1, None,
                Predicate::EarlyBird { before_hour: 7 }, "#fbbf24"),
        special("night-owl", "Night Owl", "🦉", "Finish a puzzle between midnight and 4 AM", 1, None,
                Predicate::NightOwl { until_hour: 4 }, "#6366f1"),
        special("weekend-warrior", "Weekend Warrior", "🎉", "Finish 10 puzzles on weekends", 2, Some(10),
                Predicate::WeekendWarrior, "#f59e0b"),
        special("founder", "Founding Solver", "🌟", "One of the first 100 players to sign up", 3, None,
                Predicate::Founder { max_rank: 100 }, "#facc15"),
    ]
}
