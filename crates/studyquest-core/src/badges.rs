//! Badge catalog and unlock evaluation.
//!
//! The evaluator is pure: it compares an explicit progression snapshot
//! against the catalog and reports which badges newly qualify. It never
//! mutates state or grants rewards -- callers hand its results to the
//! claim coordinator.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProgressionError;
use crate::storage::Database;

/// Unlock condition of a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCondition {
    /// At least one completed mission exists.
    FirstMission,
    /// Streak count has reached `days`.
    StreakMilestone { days: u32 },
    /// Lifetime XP has reached `xp`.
    XpMilestone { xp: u64 },
    /// Every unit of `region` is completed.
    RegionMaster { region: String },
}

/// One entry of the static badge catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub condition: BadgeCondition,
    pub xp_reward: u32,
}

/// Unit completion counts within one region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionProgress {
    pub completed_units: u32,
    pub total_units: u32,
}

/// Point-in-time view of a player's progression, built by the store and
/// passed by value. Evaluators never reach into a shared profile cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub xp_total: u64,
    pub streak_count: u32,
    pub completed_missions: u32,
    pub unlocked_badge_ids: BTreeSet<String>,
    pub regions: HashMap<String, RegionProgress>,
}

impl BadgeCondition {
    fn holds(&self, snapshot: &ProgressSnapshot) -> bool {
        match self {
            BadgeCondition::FirstMission => snapshot.completed_missions >= 1,
            BadgeCondition::StreakMilestone { days } => snapshot.streak_count >= *days,
            BadgeCondition::XpMilestone { xp } => snapshot.xp_total >= *xp,
            BadgeCondition::RegionMaster { region } => snapshot
                .regions
                .get(region)
                .map(|p| p.total_units > 0 && p.completed_units >= p.total_units)
                .unwrap_or(false),
        }
    }
}

/// Ids of badges whose condition holds and which the player has not
/// unlocked yet. Already-unlocked badges are never re-reported, even when
/// their condition still holds.
pub fn evaluate(snapshot: &ProgressSnapshot, definitions: &[BadgeDefinition]) -> Vec<String> {
    definitions
        .iter()
        .filter(|def| !snapshot.unlocked_badge_ids.contains(&def.id))
        .filter(|def| def.condition.holds(snapshot))
        .map(|def| def.id.clone())
        .collect()
}

/// Catalog seeded into fresh databases.
pub fn default_catalog() -> Vec<BadgeDefinition> {
    vec![
        BadgeDefinition {
            id: "first-steps".into(),
            condition: BadgeCondition::FirstMission,
            xp_reward: 50,
        },
        BadgeDefinition {
            id: "week-streak".into(),
            condition: BadgeCondition::StreakMilestone { days: 7 },
            xp_reward: 100,
        },
        BadgeDefinition {
            id: "month-streak".into(),
            condition: BadgeCondition::StreakMilestone { days: 30 },
            xp_reward: 500,
        },
        BadgeDefinition {
            id: "xp-1000".into(),
            condition: BadgeCondition::XpMilestone { xp: 1000 },
            xp_reward: 100,
        },
        BadgeDefinition {
            id: "xp-10000".into(),
            condition: BadgeCondition::XpMilestone { xp: 10_000 },
            xp_reward: 1000,
        },
        BadgeDefinition {
            id: "basics-master".into(),
            condition: BadgeCondition::RegionMaster {
                region: "basics".into(),
            },
            xp_reward: 200,
        },
    ]
}

/// The `evaluateBadges` operation: snapshot the player's progression from
/// the store and return the catalog entries they newly qualify for.
pub fn pending_badges(
    db: &Database,
    profile_id: Uuid,
) -> Result<Vec<BadgeDefinition>, ProgressionError> {
    let snapshot = db
        .progress_snapshot(profile_id)?
        .ok_or(ProgressionError::NotFound {
            kind: "profile",
            id: profile_id,
        })?;
    let definitions = db.badge_definitions()?;
    let unlockable = evaluate(&snapshot, &definitions);
    Ok(definitions
        .into_iter()
        .filter(|def| unlockable.contains(&def.id))
        .collect())
}
