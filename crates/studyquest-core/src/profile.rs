//! Player profile types.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hearts are capped at 5; refills clamp here.
pub const MAX_HEARTS: u8 = 5;

/// A player's authoritative progression state.
///
/// Mutated only by the streak tracker (daily activity) and the claim
/// coordinator (payouts). Everything else works on snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: Uuid,
    pub xp_total: u64,
    pub streak_count: u32,
    pub last_active_date: Option<NaiveDate>,
    pub current_hearts: u8,
    pub is_premium: bool,
    pub credits: u64,
    /// Unused streak freezes in inventory.
    pub streak_freezes: u32,
    /// Whether one freeze is armed to cover the next missed day.
    pub freeze_armed: bool,
    pub unlocked_badge_ids: BTreeSet<String>,
}

impl PlayerProfile {
    /// Fresh profile: full hearts, no history.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            xp_total: 0,
            streak_count: 0,
            last_active_date: None,
            current_hearts: MAX_HEARTS,
            is_premium: false,
            credits: 0,
            streak_freezes: 0,
            freeze_armed: false,
            unlocked_badge_ids: BTreeSet::new(),
        }
    }
}

/// Net effect of a single payout on a profile.
///
/// Hearts are a requested refill; the store clamps the balance at
/// [`MAX_HEARTS`] when applying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDelta {
    pub xp: u64,
    pub credits: u64,
    pub hearts: u8,
    pub streak_freezes: u32,
    pub items: Vec<String>,
    pub badge_id: Option<String>,
}

impl ProfileDelta {
    /// True when applying this delta would not change any profile field.
    pub fn is_empty(&self) -> bool {
        *self == ProfileDelta::default()
    }
}
