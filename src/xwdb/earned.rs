use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::badges::{self, BadgeCatalog};
use crate::models::{self, PlayerStats};
use crate::xwdb::DBResult;

/////*============== EARNED BADGE QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for models::EarnedBadge {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            badge_id: row.get("badge_id")?,
            earned_at: row.get("earned_at")?,
        })
    }
}

/// Records that `player` earned a badge.
/// Returns `true` if it was newly added, `false` if the player already held it.
pub fn insert_earned(connection: &Connection, player: &str, earned: &models::EarnedBadge) -> DBResult<bool> {
    log::trace!("[insert_earned] Inserting {} for {player}...", earned.badge_id);

    let query_params = rusqlite::named_params! {
            ":player":    player,
            ":badge_id":  earned.badge_id,
            ":earned_at": earned.earned_at,
    };

    connection
        .prepare(
            "INSERT INTO EarnedBadges ( player,  badge_id,  earned_at)
             VALUES                   (:player, :badge_id, :earned_at)",
        )?
        .execute(query_params)
        .map_or_else(crate::xwdb::swallow_constraint_violation, |_| Ok(true))
}

/// Every badge `player` holds, oldest first.
pub fn query_earned(connection: &Connection, player: &str) -> DBResult<Vec<models::EarnedBadge>> {
    log::trace!("[query_earned] Querying earned badges for {player}...");

    let mut stmt = connection.prepare(
        "SELECT badge_id, earned_at
         FROM EarnedBadges
         WHERE player = :player
         ORDER BY earned_at, badge_id",
    )?;

    let earned = stmt
        .query_map(rusqlite::named_params! { ":player": player }, |row| models::EarnedBadge::try_from(row))?
        .collect::<DBResult<Vec<models::EarnedBadge>>>()?;

    Ok(earned)
}

pub fn query_held_ids(connection: &Connection, player: &str) -> DBResult<HashSet<String>> {
    connection
        .prepare("SELECT badge_id FROM EarnedBadges WHERE player = :player")?
        .query_map(rusqlite::named_params! { ":player": player }, |row| row.get("badge_id"))?
        .collect()
}

/// Evaluates `stats` against what `player` already holds and records whatever is
/// new, all in one transaction. Returns only the rows this call inserted.
///
/// Invalid stats fail before anything is written.
pub fn record_new_badges(
    connection: &mut Connection,
    catalog: &BadgeCatalog,
    player: &str,
    stats: &PlayerStats,
    now: DateTime<Utc>,
) -> Result<Vec<models::EarnedBadge>> {
    let tx = connection.transaction()?;

    let held = query_held_ids(&tx, player)
        .with_context(|| format!("Could not read badges held by {player}"))?;
    let qualified = badges::evaluate(catalog, stats, &held)?;

    let mut recorded = Vec::with_capacity(qualified.len());
    for badge_id in qualified {
        let earned = models::EarnedBadge { badge_id, earned_at: now };
        if insert_earned(&tx, player, &earned)? {
            recorded.push(earned);
        }
    }

    tx.commit()?;

    if !recorded.is_empty() {
        log::info!(
            "[record_new_badges] {player} earned: {}",
            recorded.iter().map(|earned| earned.badge_id.as_str()).collect::<Vec<_>>().join(", ")
        );
    }
    Ok(recorded)
}
