use std::collections::{BTreeSet, HashSet};

use crate::badges::{catalog::BadgeCatalog, predicates::at_least};
use crate::models::{Badge, BadgeCategory, PlayerStats, ValidationError};

/// Computes the ids of badges the player qualifies for but does not hold yet.
///
/// Pure: nothing is persisted here. The snapshot is validated before any badge is
/// looked at, so a malformed snapshot never yields a partial result. Ids in `held`
/// that the catalog doesn't know about are ignored.
pub fn evaluate(
    catalog: &BadgeCatalog,
    stats: &PlayerStats,
    held: &HashSet<String>,
) -> Result<BTreeSet<String>, ValidationError> {
    stats.validate()?;

    let earned = catalog
        .all()
        .iter()
        .filter(|badge| !held.contains(&badge.id))
        .filter(|badge| qualifies(badge, stats))
        .map(|badge| badge.id.clone())
        .collect::<BTreeSet<_>>();

    if !earned.is_empty() {
        log::trace!("[evaluate] Newly qualified for: {earned:?}");
    }
    Ok(earned)
}

/// Whether `stats` meets `badge`'s threshold or rule, regardless of what is held.
///
/// Speed compares "at most", every other threshold "at least".
pub fn qualifies(badge: &Badge, stats: &PlayerStats) -> bool {
    let requirement = badge.requirement;
    match badge.category {
        BadgeCategory::Streak => requirement.is_some_and(|days| at_least(stats.current_streak, days)),
        BadgeCategory::Progress => requirement.is_some_and(|solved| at_least(stats.total_solved, solved)),
        BadgeCategory::Accuracy => {
            requirement.is_some_and(|count| at_least(stats.first_attempt_solves, count))
        }
        BadgeCategory::Speed => requirement.is_some_and(|limit| {
            stats.fastest_time_secs().is_some_and(|secs| secs <= limit as f64)
        }),
        BadgeCategory::Special => match &badge.predicate {
            Some(predicate) => predicate.holds(stats, requirement),
            None => {
                log::warn!("[qualifies] Special badge '{}' has no predicate.", badge.id);
                false
            }
        },
    }
}
