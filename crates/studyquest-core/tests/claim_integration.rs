//! Integration tests for exactly-once reward claims.
//!
//! Covers eligibility checks, payout application per reward kind, the
//! already-claimed guard, and the concurrent-claim race on a shared
//! on-disk database.

use std::sync::{Arc, Barrier};
use std::thread;

use studyquest_core::{
    ClaimCoordinator, Claimable, Database, PlayerProfile, ProgressionError, Reward, MAX_HEARTS,
};
use uuid::Uuid;

fn seeded_profile(db: &Database, streak: u32, premium: bool) -> PlayerProfile {
    let mut profile = PlayerProfile::new(Uuid::new_v4());
    profile.streak_count = streak;
    profile.is_premium = premium;
    db.insert_profile(&profile).unwrap();
    profile
}

#[test]
fn gift_xp_pays_out_once_with_streak_bonus() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let profile = seeded_profile(&db, 3, false);

    let gift = Claimable::gift(profile.id, Reward::Xp { amount: 100 });
    db.insert_claimable(&gift).unwrap();

    let receipt = claims.claim(gift.id, profile.id).unwrap();
    assert_eq!(receipt.profile_delta.xp, 130);
    assert_eq!(db.get_profile(profile.id).unwrap().unwrap().xp_total, 130);

    let err = claims.claim(gift.id, profile.id).unwrap_err();
    assert!(matches!(err, ProgressionError::AlreadyClaimed { .. }));
    // Exactly one payout, never two.
    assert_eq!(db.get_profile(profile.id).unwrap().unwrap().xp_total, 130);
}

#[test]
fn premium_profiles_get_the_configured_multiplier() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let profile = seeded_profile(&db, 3, true);

    let gift = Claimable::gift(profile.id, Reward::Xp { amount: 100 });
    db.insert_claimable(&gift).unwrap();

    let receipt = claims.claim(gift.id, profile.id).unwrap();
    // round(100 * 1.3) * 1.5
    assert_eq!(receipt.profile_delta.xp, 195);
}

#[test]
fn mission_reward_requires_completion_first() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let profile = seeded_profile(&db, 0, false);

    let mission = Claimable::mission(profile.id, Reward::Credits { amount: 20 });
    db.insert_claimable(&mission).unwrap();

    let err = claims.claim(mission.id, profile.id).unwrap_err();
    assert!(matches!(err, ProgressionError::NotEligible { .. }));
    assert_eq!(db.get_profile(profile.id).unwrap().unwrap().credits, 0);

    db.mark_claimable_completed(mission.id).unwrap();
    claims.claim(mission.id, profile.id).unwrap();
    assert_eq!(db.get_profile(profile.id).unwrap().unwrap().credits, 20);
}

#[test]
fn only_the_owner_may_claim() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let owner = seeded_profile(&db, 0, false);
    let intruder = seeded_profile(&db, 0, false);

    let gift = Claimable::gift(owner.id, Reward::Credits { amount: 20 });
    db.insert_claimable(&gift).unwrap();

    let err = claims.claim(gift.id, intruder.id).unwrap_err();
    assert!(matches!(err, ProgressionError::NotEligible { .. }));

    // Still claimable by its owner afterwards.
    claims.claim(gift.id, owner.id).unwrap();
}

#[test]
fn unknown_claimable_is_not_found() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let err = claims.claim(Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
    assert!(matches!(
        err,
        ProgressionError::NotFound { kind: "claimable", .. }
    ));
}

#[test]
fn heart_refills_clamp_at_the_cap() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let mut profile = PlayerProfile::new(Uuid::new_v4());
    profile.current_hearts = 4;
    db.insert_profile(&profile).unwrap();

    let gift = Claimable::gift(profile.id, Reward::Hearts { amount: 3 });
    db.insert_claimable(&gift).unwrap();
    claims.claim(gift.id, profile.id).unwrap();

    assert_eq!(
        db.get_profile(profile.id).unwrap().unwrap().current_hearts,
        MAX_HEARTS
    );
}

#[test]
fn item_rewards_land_in_the_inventory() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let profile = seeded_profile(&db, 0, false);

    let gift = Claimable::gift(
        profile.id,
        Reward::Item {
            item_id: "golden-owl".into(),
        },
    );
    db.insert_claimable(&gift).unwrap();
    claims.claim(gift.id, profile.id).unwrap();

    assert_eq!(
        db.inventory_items(profile.id).unwrap(),
        vec!["golden-owl".to_string()]
    );
}

#[test]
fn streak_freeze_rewards_stock_the_inventory() {
    let db = Database::open_memory().unwrap();
    let claims = ClaimCoordinator::new(&db);
    let profile = seeded_profile(&db, 0, false);

    let gift = Claimable::gift(profile.id, Reward::StreakFreeze { amount: 2 });
    db.insert_claimable(&gift).unwrap();
    claims.claim(gift.id, profile.id).unwrap();

    assert_eq!(
        db.get_profile(profile.id).unwrap().unwrap().streak_freezes,
        2
    );
}

#[test]
fn concurrent_claims_pay_out_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studyquest.db");

    let setup = Database::open_at(&path).unwrap();
    let profile = seeded_profile(&setup, 0, false);
    let gift = Claimable::gift(profile.id, Reward::Xp { amount: 100 });
    setup.insert_claimable(&gift).unwrap();

    // Independent connections, as two concurrent request handlers would hold.
    let databases: Vec<Database> = (0..2).map(|_| Database::open_at(&path).unwrap()).collect();
    let barrier = Arc::new(Barrier::new(databases.len()));

    let mut handles = Vec::new();
    for db in databases {
        let barrier = Arc::clone(&barrier);
        let (gift_id, actor_id) = (gift.id, profile.id);
        handles.push(thread::spawn(move || {
            let claims = ClaimCoordinator::new(&db);
            barrier.wait();
            claims.claim(gift_id, actor_id)
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let already_claimed = results
        .iter()
        .filter(|r| matches!(r, Err(ProgressionError::AlreadyClaimed { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(already_claimed, 1);

    // Final balance reflects exactly one payout, never zero or two.
    assert_eq!(setup.get_profile(profile.id).unwrap().unwrap().xp_total, 100);
}
