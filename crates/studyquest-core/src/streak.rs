//! Daily streak evaluation and recording.
//!
//! The calendar rules live in [`evaluate_streak`], a pure function over a
//! profile snapshot and an injected "today". [`StreakTracker`] wraps it
//! with the durable step: streak count and last-active day are written
//! together through one guarded statement, so a duplicate or retried call
//! on the same calendar day can never increment twice.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::TodaySource;
use crate::error::{retry_on_conflict, ProgressionError};
use crate::profile::PlayerProfile;
use crate::storage::Database;

/// Outcome of a streak evaluation.
///
/// `should_notify` is a presentation hint: it tells the caller a "streak
/// extended" notice is pending for today. It is never part of the
/// authoritative profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakEvaluation {
    pub new_streak_count: u32,
    pub changed: bool,
    pub should_notify: bool,
    /// An armed streak freeze was consumed to bridge one missed day.
    pub used_freeze: bool,
}

/// Decide the new streak value for `today`.
///
/// Comparisons are by calendar-day equality; `pred_opt` handles month and
/// year boundaries. For a same-day call `should_notify` is left `false`
/// here -- the tracker overlays the pending-notice marker, which a pure
/// function cannot see.
pub fn evaluate_streak(profile: &PlayerProfile, today: NaiveDate) -> StreakEvaluation {
    let yesterday = today.pred_opt();
    let day_before = yesterday.and_then(|d| d.pred_opt());

    match profile.last_active_date {
        Some(last) if last == today => StreakEvaluation {
            new_streak_count: profile.streak_count,
            changed: false,
            should_notify: false,
            used_freeze: false,
        },
        Some(last) if Some(last) == yesterday => StreakEvaluation {
            new_streak_count: profile.streak_count + 1,
            changed: true,
            should_notify: true,
            used_freeze: false,
        },
        // Exactly one missed day, bridged by an armed freeze.
        Some(last)
            if Some(last) == day_before && profile.freeze_armed && profile.streak_freezes > 0 =>
        {
            StreakEvaluation {
                new_streak_count: profile.streak_count + 1,
                changed: true,
                should_notify: true,
                used_freeze: true,
            }
        }
        _ => StreakEvaluation {
            new_streak_count: 1,
            changed: true,
            should_notify: true,
            used_freeze: false,
        },
    }
}

/// Evaluates and records daily activity against the profile store.
pub struct StreakTracker<'a> {
    db: &'a Database,
}

impl<'a> StreakTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// The `evaluateStreak` operation: decide the streak transition for
    /// today and persist it.
    ///
    /// Fails with `Clock` (before any mutation) when the source cannot
    /// supply a trusted calendar day.
    pub fn evaluate(
        &self,
        profile_id: Uuid,
        source: &dyn TodaySource,
    ) -> Result<StreakEvaluation, ProgressionError> {
        let today = source.today().ok_or(ProgressionError::Clock)?;
        retry_on_conflict(|| self.evaluate_on(profile_id, today))
    }

    fn evaluate_on(
        &self,
        profile_id: Uuid,
        today: NaiveDate,
    ) -> Result<StreakEvaluation, ProgressionError> {
        let profile = self
            .db
            .get_profile(profile_id)?
            .ok_or(ProgressionError::NotFound {
                kind: "profile",
                id: profile_id,
            })?;

        let mut evaluation = evaluate_streak(&profile, today);
        if !evaluation.changed {
            evaluation.should_notify = self.db.streak_notice_pending(profile_id, today)?;
            return Ok(evaluation);
        }

        let applied = self.db.record_daily_activity(
            profile_id,
            today,
            evaluation.new_streak_count,
            evaluation.used_freeze,
        )?;
        if !applied {
            // A duplicate call for the same day won the guard between our
            // read and this write. Report the stored state instead.
            let current = self
                .db
                .get_profile(profile_id)?
                .ok_or(ProgressionError::NotFound {
                    kind: "profile",
                    id: profile_id,
                })?;
            return Ok(StreakEvaluation {
                new_streak_count: current.streak_count,
                changed: false,
                should_notify: self.db.streak_notice_pending(profile_id, today)?,
                used_freeze: false,
            });
        }

        self.db.set_streak_notice(profile_id, today)?;
        Ok(evaluation)
    }

    /// Clear today's pending streak notice once the caller has shown it.
    pub fn acknowledge(
        &self,
        profile_id: Uuid,
        source: &dyn TodaySource,
    ) -> Result<(), ProgressionError> {
        let today = source.today().ok_or(ProgressionError::Clock)?;
        self.db.clear_streak_notice(profile_id, today)?;
        Ok(())
    }

    /// Arm one streak freeze from inventory so it covers the next single
    /// missed day. Freezes never apply silently.
    pub fn arm_streak_freeze(&self, profile_id: Uuid) -> Result<(), ProgressionError> {
        let profile = self
            .db
            .get_profile(profile_id)?
            .ok_or(ProgressionError::NotFound {
                kind: "profile",
                id: profile_id,
            })?;
        if profile.freeze_armed {
            return Err(ProgressionError::Validation(
                "a streak freeze is already armed".into(),
            ));
        }
        if !self.db.arm_streak_freeze(profile_id)? {
            return Err(ProgressionError::NotEligible {
                reason: "no streak freeze in inventory".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with(last_active: Option<&str>, streak: u32) -> PlayerProfile {
        let mut profile = PlayerProfile::new(Uuid::new_v4());
        profile.last_active_date = last_active.map(|d| d.parse().unwrap());
        profile.streak_count = streak;
        profile
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn same_day_is_a_no_op() {
        let profile = profile_with(Some("2025-12-01"), 6);
        let eval = evaluate_streak(&profile, day("2025-12-01"));
        assert!(!eval.changed);
        assert_eq!(eval.new_streak_count, 6);
    }

    #[test]
    fn consecutive_day_increments_across_month_boundary() {
        let profile = profile_with(Some("2025-11-30"), 3);
        let eval = evaluate_streak(&profile, day("2025-12-01"));
        assert!(eval.changed);
        assert!(eval.should_notify);
        assert_eq!(eval.new_streak_count, 4);
    }

    #[test]
    fn consecutive_day_increments_across_year_boundary() {
        let profile = profile_with(Some("2025-12-31"), 9);
        let eval = evaluate_streak(&profile, day("2026-01-01"));
        assert_eq!(eval.new_streak_count, 10);
    }

    #[test]
    fn multi_day_gap_resets_to_one() {
        let profile = profile_with(Some("2025-11-28"), 14);
        let eval = evaluate_streak(&profile, day("2025-12-01"));
        assert!(eval.changed);
        assert_eq!(eval.new_streak_count, 1);
        assert!(!eval.used_freeze);
    }

    #[test]
    fn first_activity_starts_at_one() {
        let profile = profile_with(None, 0);
        let eval = evaluate_streak(&profile, day("2025-12-01"));
        assert_eq!(eval.new_streak_count, 1);
        assert!(eval.changed);
    }

    #[test]
    fn armed_freeze_bridges_a_single_missed_day() {
        let mut profile = profile_with(Some("2025-11-29"), 7);
        profile.streak_freezes = 1;
        profile.freeze_armed = true;
        let eval = evaluate_streak(&profile, day("2025-12-01"));
        assert_eq!(eval.new_streak_count, 8);
        assert!(eval.used_freeze);
    }

    #[test]
    fn unarmed_freeze_does_not_apply() {
        let mut profile = profile_with(Some("2025-11-29"), 7);
        profile.streak_freezes = 3;
        profile.freeze_armed = false;
        let eval = evaluate_streak(&profile, day("2025-12-01"));
        assert_eq!(eval.new_streak_count, 1);
        assert!(!eval.used_freeze);
    }

    #[test]
    fn armed_freeze_cannot_bridge_two_missed_days() {
        let mut profile = profile_with(Some("2025-11-28"), 7);
        profile.streak_freezes = 1;
        profile.freeze_armed = true;
        let eval = evaluate_streak(&profile, day("2025-12-01"));
        assert_eq!(eval.new_streak_count, 1);
        assert!(!eval.used_freeze);
    }
}
