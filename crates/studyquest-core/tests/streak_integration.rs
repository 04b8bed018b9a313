//! Integration tests for streak evaluation against the store.
//!
//! Covers calendar-boundary increments, gap resets, same-day idempotency,
//! the pending-notice marker, and armed streak freezes.

use chrono::NaiveDate;
use studyquest_core::{
    Database, FixedToday, PlayerProfile, ProgressionError, StreakTracker, TodaySource,
};
use uuid::Uuid;

struct NoToday;

impl TodaySource for NoToday {
    fn today(&self) -> Option<NaiveDate> {
        None
    }
}

fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn seeded_profile(db: &Database, last_active: Option<&str>, streak: u32) -> PlayerProfile {
    let mut profile = PlayerProfile::new(Uuid::new_v4());
    profile.last_active_date = last_active.map(|d| d.parse().unwrap());
    profile.streak_count = streak;
    db.insert_profile(&profile).unwrap();
    profile
}

#[test]
fn consecutive_day_extends_streak_across_month_boundary() {
    let db = Database::open_memory().unwrap();
    let profile = seeded_profile(&db, Some("2025-11-30"), 3);
    let tracker = StreakTracker::new(&db);

    let eval = tracker
        .evaluate(profile.id, &FixedToday(day("2025-12-01")))
        .unwrap();
    assert!(eval.changed);
    assert!(eval.should_notify);
    assert_eq!(eval.new_streak_count, 4);

    let stored = db.get_profile(profile.id).unwrap().unwrap();
    assert_eq!(stored.streak_count, 4);
    assert_eq!(stored.last_active_date, Some(day("2025-12-01")));
}

#[test]
fn multi_day_gap_resets_streak() {
    let db = Database::open_memory().unwrap();
    let profile = seeded_profile(&db, Some("2025-11-28"), 14);
    let tracker = StreakTracker::new(&db);

    let eval = tracker
        .evaluate(profile.id, &FixedToday(day("2025-12-01")))
        .unwrap();
    assert_eq!(eval.new_streak_count, 1);
    assert_eq!(db.get_profile(profile.id).unwrap().unwrap().streak_count, 1);
}

#[test]
fn repeated_same_day_call_never_double_increments() {
    let db = Database::open_memory().unwrap();
    let profile = seeded_profile(&db, Some("2025-11-30"), 3);
    let tracker = StreakTracker::new(&db);
    let today = FixedToday(day("2025-12-01"));

    let first = tracker.evaluate(profile.id, &today).unwrap();
    assert!(first.changed);
    assert_eq!(first.new_streak_count, 4);

    // Retry (duplicate request) on the same calendar day.
    let second = tracker.evaluate(profile.id, &today).unwrap();
    assert!(!second.changed);
    assert_eq!(second.new_streak_count, 4);
    // The notice set by the first call is still pending.
    assert!(second.should_notify);

    assert_eq!(db.get_profile(profile.id).unwrap().unwrap().streak_count, 4);
}

#[test]
fn acknowledge_clears_the_pending_notice() {
    let db = Database::open_memory().unwrap();
    let profile = seeded_profile(&db, None, 0);
    let tracker = StreakTracker::new(&db);
    let today = FixedToday(day("2025-12-01"));

    let first = tracker.evaluate(profile.id, &today).unwrap();
    assert!(first.should_notify);

    tracker.acknowledge(profile.id, &today).unwrap();

    let again = tracker.evaluate(profile.id, &today).unwrap();
    assert!(!again.changed);
    assert!(!again.should_notify);
}

#[test]
fn missing_trusted_day_fails_without_mutation() {
    let db = Database::open_memory().unwrap();
    let profile = seeded_profile(&db, Some("2025-11-30"), 3);
    let tracker = StreakTracker::new(&db);

    let err = tracker.evaluate(profile.id, &NoToday).unwrap_err();
    assert!(matches!(err, ProgressionError::Clock));

    let stored = db.get_profile(profile.id).unwrap().unwrap();
    assert_eq!(stored.streak_count, 3);
    assert_eq!(stored.last_active_date, Some(day("2025-11-30")));
}

#[test]
fn unknown_profile_is_not_found() {
    let db = Database::open_memory().unwrap();
    let tracker = StreakTracker::new(&db);
    let err = tracker
        .evaluate(Uuid::new_v4(), &FixedToday(day("2025-12-01")))
        .unwrap_err();
    assert!(matches!(err, ProgressionError::NotFound { kind: "profile", .. }));
}

#[test]
fn armed_freeze_bridges_one_missed_day_and_is_consumed() {
    let db = Database::open_memory().unwrap();
    let mut profile = PlayerProfile::new(Uuid::new_v4());
    profile.last_active_date = Some(day("2025-11-29"));
    profile.streak_count = 7;
    profile.streak_freezes = 2;
    db.insert_profile(&profile).unwrap();

    let tracker = StreakTracker::new(&db);
    tracker.arm_streak_freeze(profile.id).unwrap();

    let eval = tracker
        .evaluate(profile.id, &FixedToday(day("2025-12-01")))
        .unwrap();
    assert!(eval.used_freeze);
    assert_eq!(eval.new_streak_count, 8);

    let stored = db.get_profile(profile.id).unwrap().unwrap();
    assert_eq!(stored.streak_count, 8);
    assert_eq!(stored.streak_freezes, 1);
    assert!(!stored.freeze_armed);
}

#[test]
fn freeze_in_inventory_but_not_armed_does_not_apply() {
    let db = Database::open_memory().unwrap();
    let mut profile = PlayerProfile::new(Uuid::new_v4());
    profile.last_active_date = Some(day("2025-11-29"));
    profile.streak_count = 7;
    profile.streak_freezes = 2;
    db.insert_profile(&profile).unwrap();

    let tracker = StreakTracker::new(&db);
    let eval = tracker
        .evaluate(profile.id, &FixedToday(day("2025-12-01")))
        .unwrap();
    assert!(!eval.used_freeze);
    assert_eq!(eval.new_streak_count, 1);
    // Inventory untouched: freezes never apply silently.
    let stored = db.get_profile(profile.id).unwrap().unwrap();
    assert_eq!(stored.streak_freezes, 2);
}

#[test]
fn arming_requires_inventory() {
    let db = Database::open_memory().unwrap();
    let profile = seeded_profile(&db, None, 0);
    let tracker = StreakTracker::new(&db);

    let err = tracker.arm_streak_freeze(profile.id).unwrap_err();
    assert!(matches!(err, ProgressionError::NotEligible { .. }));
}

#[test]
fn arming_twice_is_rejected() {
    let db = Database::open_memory().unwrap();
    let mut profile = PlayerProfile::new(Uuid::new_v4());
    profile.streak_freezes = 2;
    db.insert_profile(&profile).unwrap();

    let tracker = StreakTracker::new(&db);
    tracker.arm_streak_freeze(profile.id).unwrap();
    let err = tracker.arm_streak_freeze(profile.id).unwrap_err();
    assert!(matches!(err, ProgressionError::Validation(_)));
}
