//! Asynchronous two-party duels.
//!
//! A challenge moves through exactly one transition:
//!
//! ```text
//! Pending --(both scores set)--> Completed
//! ```
//!
//! Completed is terminal. Uniqueness of the Pending row per ordered
//! (challenger, opponent) pair and the write-then-finalize step are
//! enforced by the store, not by application-level read-then-write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{retry_on_conflict, ProgressionError};
use crate::notifier::Notifier;
use crate::storage::database::{ChallengeInsert, ScoreSubmission};
use crate::storage::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    Completed,
}

/// How a completed duel ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelOutcome {
    Winner(Uuid),
    Draw,
}

/// Which score slot an actor writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelRole {
    Challenger,
    Opponent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub challenger_id: Uuid,
    pub opponent_id: Uuid,
    pub quiz_id: Uuid,
    pub status: ChallengeStatus,
    pub challenger_score: Option<i64>,
    pub opponent_score: Option<i64>,
    /// Present only when Completed.
    pub outcome: Option<DuelOutcome>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn role_of(&self, actor_id: Uuid) -> Option<DuelRole> {
        if actor_id == self.challenger_id {
            Some(DuelRole::Challenger)
        } else if actor_id == self.opponent_id {
            Some(DuelRole::Opponent)
        } else {
            None
        }
    }
}

/// Higher score wins; equal scores are a draw.
pub(crate) fn decide_outcome(
    challenger_score: i64,
    opponent_score: i64,
    challenger_id: Uuid,
    opponent_id: Uuid,
) -> DuelOutcome {
    match challenger_score.cmp(&opponent_score) {
        std::cmp::Ordering::Greater => DuelOutcome::Winner(challenger_id),
        std::cmp::Ordering::Less => DuelOutcome::Winner(opponent_id),
        std::cmp::Ordering::Equal => DuelOutcome::Draw,
    }
}

/// Creates and resolves challenges.
pub struct DuelCoordinator<'a> {
    db: &'a Database,
    notifier: &'a dyn Notifier,
}

impl<'a> DuelCoordinator<'a> {
    pub fn new(db: &'a Database, notifier: &'a dyn Notifier) -> Self {
        Self { db, notifier }
    }

    /// The `createChallenge` operation.
    ///
    /// A repeated create for the same ordered pair surfaces
    /// [`ProgressionError::DuplicateChallenge`] carrying the existing row;
    /// no second Pending row is ever created. The opponent notification is
    /// best-effort and never rolls back the insert.
    pub fn create_challenge(
        &self,
        challenger_id: Uuid,
        opponent_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Challenge, ProgressionError> {
        if challenger_id == opponent_id {
            return Err(ProgressionError::Validation(
                "players cannot challenge themselves".into(),
            ));
        }

        let challenge = retry_on_conflict(|| {
            match self.db.insert_challenge(challenger_id, opponent_id, quiz_id)? {
                ChallengeInsert::Created(challenge) => Ok(challenge),
                ChallengeInsert::AlreadyPending(existing) => {
                    Err(ProgressionError::DuplicateChallenge {
                        existing: Box::new(existing),
                    })
                }
            }
        })?;

        self.notify(
            opponent_id,
            "You've been challenged!",
            "A rival wants to duel you. First to answer wins.",
            &format!("/duels/{}", challenge.id),
        );
        Ok(challenge)
    }

    /// The `submitScore` operation.
    ///
    /// Writes only the actor's own slot (a resubmission overwrites it),
    /// then finalizes inside the same atomic step once both slots are
    /// present.
    pub fn submit_score(
        &self,
        challenge_id: Uuid,
        actor_id: Uuid,
        score: i64,
    ) -> Result<Challenge, ProgressionError> {
        retry_on_conflict(|| {
            let challenge =
                self.db
                    .get_challenge(challenge_id)?
                    .ok_or(ProgressionError::NotFound {
                        kind: "challenge",
                        id: challenge_id,
                    })?;
            let role = challenge
                .role_of(actor_id)
                .ok_or(ProgressionError::NotAParticipant {
                    challenge_id,
                    actor_id,
                })?;

            let submitted = self
                .db
                .submit_challenge_score(challenge_id, role, score)?
                .ok_or(ProgressionError::NotFound {
                    kind: "challenge",
                    id: challenge_id,
                })?;
            match submitted {
                ScoreSubmission::Closed => {
                    Err(ProgressionError::ChallengeClosed { challenge_id })
                }
                ScoreSubmission::Updated(updated) => {
                    if updated.status == ChallengeStatus::Completed {
                        self.announce_result(&updated);
                    }
                    Ok(updated)
                }
            }
        })
    }

    fn announce_result(&self, challenge: &Challenge) {
        let body = match challenge.outcome {
            Some(DuelOutcome::Winner(winner)) if winner == challenge.challenger_id => {
                "The challenger takes it."
            }
            Some(DuelOutcome::Winner(_)) => "The defender takes it.",
            _ => "It's a draw.",
        };
        let url = format!("/duels/{}", challenge.id);
        self.notify(challenge.challenger_id, "Duel finished", body, &url);
        self.notify(challenge.opponent_id, "Duel finished", body, &url);
    }

    fn notify(&self, user_id: Uuid, title: &str, body: &str, url: &str) {
        if let Err(e) = self.notifier.send(user_id, title, body, url) {
            tracing::warn!(%user_id, error = %e, "notification delivery failed");
        }
    }
}
