//! # Studyquest Core Library
//!
//! This library implements the progression engine for Studyquest: the
//! logic deciding how a player's daily streak evolves, how two players'
//! asynchronous quiz duels are created and resolved, how experience and
//! badge rewards are computed, and how one-time reward claims stay safe
//! under concurrent retries.
//!
//! ## Architecture
//!
//! - **Calculators**: pure functions -- XP math ([`rewards`]) and badge
//!   unlock evaluation ([`badges`]) over explicit snapshots
//! - **Coordinators**: request-scoped operations -- [`StreakTracker`],
//!   [`DuelCoordinator`], [`ClaimCoordinator`] -- each performing one
//!   atomic store step per call
//! - **Storage**: SQLite-based persistence and TOML-based configuration;
//!   the store's conditional writes are the sole arbiter of every
//!   race-sensitive invariant
//! - **Notifier**: fire-and-forget push delivery behind a trait
//!
//! ## Key Components
//!
//! - [`Database`]: progression store
//! - [`StreakTracker`]: daily streak evaluation and recording
//! - [`DuelCoordinator`]: challenge lifecycle
//! - [`ClaimCoordinator`]: exactly-once reward payouts
//! - [`Notifier`]: trait for push transports

pub mod badges;
pub mod claim;
pub mod clock;
pub mod duel;
pub mod error;
pub mod notifier;
pub mod profile;
pub mod rewards;
pub mod storage;
pub mod streak;

pub use badges::{pending_badges, BadgeCondition, BadgeDefinition, ProgressSnapshot};
pub use claim::{ClaimCoordinator, ClaimReceipt, Claimable, ClaimableSource};
pub use clock::{FixedToday, SystemToday, TodaySource};
pub use duel::{Challenge, ChallengeStatus, DuelCoordinator, DuelOutcome};
pub use error::{ConfigError, CoreError, DatabaseError, ProgressionError};
pub use notifier::{NoopNotifier, Notifier, NotifyError, WebhookNotifier};
pub use profile::{PlayerProfile, ProfileDelta, MAX_HEARTS};
pub use rewards::{apply_multiplier, calculate_xp, Reward};
pub use storage::{Config, Database};
pub use streak::{evaluate_streak, StreakEvaluation, StreakTracker};
