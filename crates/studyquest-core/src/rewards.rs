//! Reward descriptors and experience math.
//!
//! The calculators here are pure: no I/O, no clock, identical inputs give
//! identical outputs. Coordinators call them synchronously and persist the
//! results themselves.

use serde::{Deserialize, Serialize};

/// Streak bonus granted per consecutive day, as a fraction of base XP.
pub const STREAK_BONUS_STEP: f64 = 0.1;
/// Ceiling for the streak bonus, reached at a 5-day streak.
pub const STREAK_BONUS_CAP: f64 = 0.5;

/// What a claimable pays out, one validated shape per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reward {
    Xp { amount: u32 },
    Credits { amount: u32 },
    Item { item_id: String },
    Hearts { amount: u8 },
    StreakFreeze { amount: u32 },
}

/// Base XP scaled by the streak bonus, rounded half away from zero.
///
/// The bonus is `streak_count * 0.1` capped at 50%.
pub fn calculate_xp(base_xp: u32, streak_count: u32) -> u32 {
    let bonus = (streak_count as f64 * STREAK_BONUS_STEP).min(STREAK_BONUS_CAP);
    (base_xp as f64 * (1.0 + bonus)).round() as u32
}

/// Scale `xp` by an optional multiplier, same rounding as
/// [`calculate_xp`]. `None` means no scaling.
pub fn apply_multiplier(xp: u32, multiplier: Option<f64>) -> u32 {
    (xp as f64 * multiplier.unwrap_or(1.0)).round() as u32
}
