//! Idempotent reward claims.
//!
//! `claim` is the sole path through which a claimable's reward reaches a
//! profile. The store flips `is_claimed` under a conditional UPDATE and
//! applies the payout in the same transaction, so two concurrent calls
//! against the same claimable race safely: exactly one pays out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{retry_on_conflict, ProgressionError};
use crate::profile::{PlayerProfile, ProfileDelta};
use crate::rewards::{apply_multiplier, calculate_xp, Reward};
use crate::storage::config::RewardsConfig;
use crate::storage::Database;

/// Where a claimable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimableSource {
    Mission,
    Gift,
    BadgeUnlock,
}

/// A reward-bearing record that transitions from earned to claimed
/// exactly once. Created externally (mission tracker, gift grant, badge
/// unlock); only [`ClaimCoordinator::claim`] mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claimable {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub source: ClaimableSource,
    pub reward: Reward,
    /// For badge unlocks: the badge recorded on the profile at payout.
    pub badge_id: Option<String>,
    pub is_completed: bool,
    pub is_claimed: bool,
    pub created_at: DateTime<Utc>,
}

impl Claimable {
    fn new(owner_id: Uuid, source: ClaimableSource, reward: Reward, is_completed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            source,
            reward,
            badge_id: None,
            is_completed,
            is_claimed: false,
            created_at: Utc::now(),
        }
    }

    /// A mission reward; stays ineligible until the external progress
    /// tracker marks it completed.
    pub fn mission(owner_id: Uuid, reward: Reward) -> Self {
        Self::new(owner_id, ClaimableSource::Mission, reward, false)
    }

    /// A gift is claimable as soon as it is granted.
    pub fn gift(owner_id: Uuid, reward: Reward) -> Self {
        Self::new(owner_id, ClaimableSource::Gift, reward, true)
    }

    /// A badge unlock: pays XP and records the badge on the profile.
    pub fn badge_unlock(owner_id: Uuid, badge_id: &str, xp_reward: u32) -> Self {
        let mut claimable = Self::new(
            owner_id,
            ClaimableSource::BadgeUnlock,
            Reward::Xp { amount: xp_reward },
            true,
        );
        claimable.badge_id = Some(badge_id.to_string());
        claimable
    }
}

/// What a successful claim paid out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub reward: Reward,
    pub profile_delta: ProfileDelta,
}

/// Performs exactly-once reward payouts.
pub struct ClaimCoordinator<'a> {
    db: &'a Database,
    rewards: RewardsConfig,
}

impl<'a> ClaimCoordinator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_config(db, RewardsConfig::default())
    }

    pub fn with_config(db: &'a Database, rewards: RewardsConfig) -> Self {
        Self { db, rewards }
    }

    /// The `claim` operation.
    ///
    /// Eligibility is checked first (`NotEligible`); the conditional
    /// update decides the race (`AlreadyClaimed` for the loser); payout
    /// happens only when the update took effect.
    pub fn claim(
        &self,
        claimable_id: Uuid,
        actor_id: Uuid,
    ) -> Result<ClaimReceipt, ProgressionError> {
        retry_on_conflict(|| {
            let claimable =
                self.db
                    .get_claimable(claimable_id)?
                    .ok_or(ProgressionError::NotFound {
                        kind: "claimable",
                        id: claimable_id,
                    })?;

            if claimable.owner_id != actor_id {
                return Err(ProgressionError::NotEligible {
                    reason: "reward belongs to another player".into(),
                });
            }
            if !claimable.is_completed {
                return Err(ProgressionError::NotEligible {
                    reason: "completion condition not met".into(),
                });
            }
            if claimable.is_claimed {
                // Fast path; the conditional update below remains the authority.
                return Err(ProgressionError::AlreadyClaimed { claimable_id });
            }

            let profile =
                self.db
                    .get_profile(claimable.owner_id)?
                    .ok_or(ProgressionError::NotFound {
                        kind: "profile",
                        id: claimable.owner_id,
                    })?;
            let delta = self.payout_delta(&claimable, &profile);

            let applied = self
                .db
                .apply_claim(claimable.id, claimable.owner_id, &delta)?;
            if !applied {
                return Err(ProgressionError::AlreadyClaimed { claimable_id });
            }

            Ok(ClaimReceipt {
                reward: claimable.reward,
                profile_delta: delta,
            })
        })
    }

    fn payout_delta(&self, claimable: &Claimable, profile: &PlayerProfile) -> ProfileDelta {
        let mut delta = ProfileDelta::default();
        match &claimable.reward {
            Reward::Xp { amount } => {
                let with_streak = calculate_xp(*amount, profile.streak_count);
                let multiplier = profile
                    .is_premium
                    .then_some(self.rewards.premium_xp_multiplier);
                delta.xp = apply_multiplier(with_streak, multiplier) as u64;
            }
            Reward::Credits { amount } => delta.credits = *amount as u64,
            Reward::Hearts { amount } => delta.hearts = *amount,
            Reward::Item { item_id } => delta.items.push(item_id.clone()),
            Reward::StreakFreeze { amount } => delta.streak_freezes = *amount,
        }
        delta.badge_id = claimable.badge_id.clone();
        delta
    }
}
