//! SQLite-based progression store.
//!
//! The store is the sole arbiter of every race-sensitive invariant:
//! claim-exactly-once is an affected-row-checked conditional UPDATE,
//! pending-challenge uniqueness is a partial unique index, and score
//! finalization happens inside one transaction. Coordinators never do
//! read-then-write for state the store guards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{data_dir, migrations};
use crate::badges::{BadgeCondition, BadgeDefinition, ProgressSnapshot, RegionProgress};
use crate::claim::{Claimable, ClaimableSource};
use crate::duel::{decide_outcome, Challenge, ChallengeStatus, DuelOutcome, DuelRole};
use crate::error::{CoreError, DatabaseError};
use crate::profile::{PlayerProfile, ProfileDelta, MAX_HEARTS};
use crate::rewards::Reward;

const CHALLENGE_COLUMNS: &str = "id, challenger_id, opponent_id, quiz_id, status, \
     challenger_score, opponent_score, winner, created_at";

const CLAIMABLE_COLUMNS: &str =
    "id, owner_id, source, reward, badge_id, is_completed, is_claimed, created_at";

/// Result of inserting a challenge under the pending-uniqueness index.
#[derive(Debug)]
pub enum ChallengeInsert {
    Created(Challenge),
    /// The index rejected the insert; carries the row that already exists.
    AlreadyPending(Challenge),
}

/// Result of the atomic score-write-then-finalize step.
#[derive(Debug)]
pub enum ScoreSubmission {
    /// The challenge was already completed; nothing written.
    Closed,
    /// Score written; the returned row reflects any finalization.
    Updated(Challenge),
}

/// SQLite database for progression storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/studyquest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("studyquest.db");
        Self::open_at(&path)
    }

    /// Open (and migrate) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoreError> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(DatabaseError::from)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── Profiles ─────────────────────────────────────────────────────

    pub fn insert_profile(&self, profile: &PlayerProfile) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO profiles (id, xp_total, streak_count, last_active_date,
                current_hearts, is_premium, credits, streak_freezes, freeze_armed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                profile.id.to_string(),
                profile.xp_total,
                profile.streak_count,
                profile.last_active_date.map(|d| d.to_string()),
                profile.current_hearts,
                profile.is_premium,
                profile.credits,
                profile.streak_freezes,
                profile.freeze_armed,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<PlayerProfile>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, xp_total, streak_count, last_active_date, current_hearts,
                    is_premium, credits, streak_freezes, freeze_armed
             FROM profiles WHERE id = ?1",
        )?;
        let profile = stmt
            .query_row(params![id.to_string()], row_to_profile)
            .optional()?;
        let Some(mut profile) = profile else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare("SELECT badge_id FROM profile_badges WHERE profile_id = ?1")?;
        let rows = stmt.query_map(params![id.to_string()], |row| row.get::<_, String>(0))?;
        for badge in rows {
            profile.unlocked_badge_ids.insert(badge?);
        }
        Ok(Some(profile))
    }

    /// Write today's activity: streak count and last-active day together,
    /// optionally consuming the armed freeze, in one guarded statement.
    ///
    /// Returns `false` when the guard rejected the write because the
    /// profile was already active today -- a duplicate or retried call
    /// can never increment twice.
    pub fn record_daily_activity(
        &self,
        profile_id: Uuid,
        today: NaiveDate,
        new_streak: u32,
        consume_freeze: bool,
    ) -> Result<bool, DatabaseError> {
        let affected = self.conn.execute(
            "UPDATE profiles SET
                streak_count = ?3,
                last_active_date = ?2,
                streak_freezes = streak_freezes - (CASE WHEN ?4 THEN 1 ELSE 0 END),
                freeze_armed = (CASE WHEN ?4 THEN 0 ELSE freeze_armed END)
             WHERE id = ?1
               AND (last_active_date IS NULL OR last_active_date <> ?2)",
            params![
                profile_id.to_string(),
                today.to_string(),
                new_streak,
                consume_freeze,
            ],
        )?;
        Ok(affected > 0)
    }

    /// Arm one streak freeze from inventory. Returns `false` when there
    /// is nothing to arm or one is armed already.
    pub fn arm_streak_freeze(&self, profile_id: Uuid) -> Result<bool, DatabaseError> {
        let affected = self.conn.execute(
            "UPDATE profiles SET freeze_armed = 1
             WHERE id = ?1 AND freeze_armed = 0 AND streak_freezes > 0",
            params![profile_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ── Streak notices ───────────────────────────────────────────────
    //
    // The per-day notification marker is presentation state, kept in the
    // kv table under a date-scoped key so stale entries are inert.

    fn notice_key(profile_id: Uuid, day: NaiveDate) -> String {
        format!("streak_notice:{profile_id}:{day}")
    }

    pub fn set_streak_notice(&self, profile_id: Uuid, day: NaiveDate) -> Result<(), DatabaseError> {
        self.kv_set(&Self::notice_key(profile_id, day), "pending")
    }

    pub fn streak_notice_pending(
        &self,
        profile_id: Uuid,
        day: NaiveDate,
    ) -> Result<bool, DatabaseError> {
        Ok(self.kv_get(&Self::notice_key(profile_id, day))?.is_some())
    }

    pub fn clear_streak_notice(
        &self,
        profile_id: Uuid,
        day: NaiveDate,
    ) -> Result<(), DatabaseError> {
        self.kv_delete(&Self::notice_key(profile_id, day))
    }

    // ── Challenges ───────────────────────────────────────────────────

    /// Insert a new pending challenge. The partial unique index on
    /// `(challenger_id, opponent_id) WHERE status = 'pending'` makes this
    /// the race-safe uniqueness check; on rejection the existing row is
    /// returned instead.
    pub fn insert_challenge(
        &self,
        challenger_id: Uuid,
        opponent_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<ChallengeInsert, DatabaseError> {
        let challenge = Challenge {
            id: Uuid::new_v4(),
            challenger_id,
            opponent_id,
            quiz_id,
            status: ChallengeStatus::Pending,
            challenger_score: None,
            opponent_score: None,
            outcome: None,
            created_at: Utc::now(),
        };

        let inserted = self.conn.execute(
            "INSERT INTO challenges (id, challenger_id, opponent_id, quiz_id, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            params![
                challenge.id.to_string(),
                challenger_id.to_string(),
                opponent_id.to_string(),
                quiz_id.to_string(),
                challenge.created_at.to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => Ok(ChallengeInsert::Created(challenge)),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                // The pending row may complete between the rejection and
                // this lookup; report a conflict so the caller's retry
                // re-attempts the insert.
                self.pending_challenge(challenger_id, opponent_id)?
                    .map(ChallengeInsert::AlreadyPending)
                    .ok_or(DatabaseError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>, DatabaseError> {
        Ok(challenge_by_id(&self.conn, id)?)
    }

    pub fn pending_challenge(
        &self,
        challenger_id: Uuid,
        opponent_id: Uuid,
    ) -> Result<Option<Challenge>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHALLENGE_COLUMNS} FROM challenges
             WHERE challenger_id = ?1 AND opponent_id = ?2 AND status = 'pending'"
        ))?;
        Ok(stmt
            .query_row(
                params![challenger_id.to_string(), opponent_id.to_string()],
                row_to_challenge,
            )
            .optional()?)
    }

    /// Write the actor's score slot and, inside the same transaction,
    /// re-read both slots and finalize when both are present. Two
    /// near-simultaneous submissions cannot both observe a missing
    /// opposing score and both skip finalization.
    ///
    /// Returns `None` when the challenge does not exist.
    pub fn submit_challenge_score(
        &self,
        challenge_id: Uuid,
        role: DuelRole,
        score: i64,
    ) -> Result<Option<ScoreSubmission>, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        let Some(challenge) = challenge_by_id(&tx, challenge_id)? else {
            return Ok(None);
        };
        if challenge.status == ChallengeStatus::Completed {
            return Ok(Some(ScoreSubmission::Closed));
        }

        let column = match role {
            DuelRole::Challenger => "challenger_score",
            DuelRole::Opponent => "opponent_score",
        };
        tx.execute(
            &format!("UPDATE challenges SET {column} = ?2 WHERE id = ?1"),
            params![challenge_id.to_string(), score],
        )?;

        let updated = challenge_by_id(&tx, challenge_id)?
            .ok_or_else(|| DatabaseError::QueryFailed("challenge vanished mid-transaction".into()))?;

        let finalized = match (updated.challenger_score, updated.opponent_score) {
            (Some(challenger_score), Some(opponent_score)) => {
                let outcome = decide_outcome(
                    challenger_score,
                    opponent_score,
                    updated.challenger_id,
                    updated.opponent_id,
                );
                tx.execute(
                    "UPDATE challenges SET status = 'completed', winner = ?2 WHERE id = ?1",
                    params![challenge_id.to_string(), format_outcome(&outcome)],
                )?;
                Challenge {
                    status: ChallengeStatus::Completed,
                    outcome: Some(outcome),
                    ..updated
                }
            }
            _ => updated,
        };

        tx.commit()?;
        Ok(Some(ScoreSubmission::Updated(finalized)))
    }

    // ── Claimables ───────────────────────────────────────────────────

    pub fn insert_claimable(&self, claimable: &Claimable) -> Result<(), DatabaseError> {
        let reward = serde_json::to_string(&claimable.reward)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO claimables (id, owner_id, source, reward, badge_id,
                is_completed, is_claimed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                claimable.id.to_string(),
                claimable.owner_id.to_string(),
                format_source(claimable.source),
                reward,
                claimable.badge_id,
                claimable.is_completed,
                claimable.is_claimed,
                claimable.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_claimable(&self, id: Uuid) -> Result<Option<Claimable>, DatabaseError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLAIMABLE_COLUMNS} FROM claimables WHERE id = ?1"
        ))?;
        Ok(stmt
            .query_row(params![id.to_string()], row_to_claimable)
            .optional()?)
    }

    /// Mark a mission claimable as completed (called on behalf of the
    /// external mission progress tracker).
    pub fn mark_claimable_completed(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let affected = self.conn.execute(
            "UPDATE claimables SET is_completed = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// The claim-exactly-once step: flip `is_claimed` under its guard and
    /// apply the payout in the same transaction.
    ///
    /// Returns `false` (and applies nothing) when the guard finds the
    /// claimable already claimed -- the losing side of a concurrent race
    /// lands here.
    pub fn apply_claim(
        &self,
        claimable_id: Uuid,
        owner_id: Uuid,
        delta: &ProfileDelta,
    ) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        let claimed = tx.execute(
            "UPDATE claimables SET is_claimed = 1 WHERE id = ?1 AND is_claimed = 0",
            params![claimable_id.to_string()],
        )?;
        if claimed == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE profiles SET
                xp_total = xp_total + ?2,
                credits = credits + ?3,
                streak_freezes = streak_freezes + ?4,
                current_hearts = MIN(current_hearts + ?5, ?6)
             WHERE id = ?1",
            params![
                owner_id.to_string(),
                delta.xp,
                delta.credits,
                delta.streak_freezes,
                delta.hearts,
                MAX_HEARTS,
            ],
        )?;

        let now = Utc::now().to_rfc3339();
        for item_id in &delta.items {
            tx.execute(
                "INSERT INTO inventory (profile_id, item_id, acquired_at) VALUES (?1, ?2, ?3)",
                params![owner_id.to_string(), item_id, now],
            )?;
        }
        if let Some(badge_id) = &delta.badge_id {
            tx.execute(
                "INSERT OR IGNORE INTO profile_badges (profile_id, badge_id, unlocked_at)
                 VALUES (?1, ?2, ?3)",
                params![owner_id.to_string(), badge_id, now],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    pub fn inventory_items(&self, profile_id: Uuid) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id FROM inventory WHERE profile_id = ?1 ORDER BY acquired_at")?;
        let rows = stmt.query_map(params![profile_id.to_string()], |row| {
            row.get::<_, String>(0)
        })?;
        let mut items = Vec::new();
        for item in rows {
            items.push(item?);
        }
        Ok(items)
    }

    // ── Badge catalog and region progress ────────────────────────────

    pub fn badge_definitions(&self) -> Result<Vec<BadgeDefinition>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, condition, xp_reward FROM badge_definitions ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let condition_json: String = row.get(1)?;
            let condition: BadgeCondition = serde_json::from_str(&condition_json)
                .map_err(|e| invalid_column(1, e))?;
            Ok(BadgeDefinition {
                id: row.get(0)?,
                condition,
                xp_reward: row.get(2)?,
            })
        })?;
        let mut definitions = Vec::new();
        for def in rows {
            definitions.push(def?);
        }
        Ok(definitions)
    }

    pub fn upsert_unit(&self, unit_id: &str, region: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO units (id, region) VALUES (?1, ?2)",
            params![unit_id, region],
        )?;
        Ok(())
    }

    pub fn complete_unit(&self, profile_id: Uuid, unit_id: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO profile_units (profile_id, unit_id, completed_at)
             VALUES (?1, ?2, ?3)",
            params![profile_id.to_string(), unit_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Build the point-in-time progression snapshot the badge evaluator
    /// consumes. Returns `None` for an unknown profile.
    pub fn progress_snapshot(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<ProgressSnapshot>, DatabaseError> {
        let Some(profile) = self.get_profile(profile_id)? else {
            return Ok(None);
        };

        let completed_missions: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM claimables
             WHERE owner_id = ?1 AND source = 'mission' AND is_completed = 1",
            params![profile_id.to_string()],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT u.region, COUNT(*), COUNT(pu.unit_id)
             FROM units u
             LEFT JOIN profile_units pu
               ON pu.unit_id = u.id AND pu.profile_id = ?1
             GROUP BY u.region",
        )?;
        let rows = stmt.query_map(params![profile_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;
        let mut regions = HashMap::new();
        for row in rows {
            let (region, total_units, completed_units) = row?;
            regions.insert(
                region,
                RegionProgress {
                    completed_units,
                    total_units,
                },
            );
        }

        Ok(Some(ProgressSnapshot {
            xp_total: profile.xp_total,
            streak_count: profile.streak_count,
            completed_missions,
            unlocked_badge_ids: profile.unlocked_badge_ids,
            regions,
        }))
    }

    // ── Key-value store ──────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        Ok(stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a key from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// === Row mapping helpers ===

fn invalid_column<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_uuid_col(row: &rusqlite::Row, index: usize) -> Result<Uuid, rusqlite::Error> {
    let value: String = row.get(index)?;
    Uuid::parse_str(&value).map_err(|e| invalid_column(index, e))
}

fn parse_date_col(value: &str, index: usize) -> Result<NaiveDate, rusqlite::Error> {
    value
        .parse::<NaiveDate>()
        .map_err(|e| invalid_column(index, e))
}

fn parse_datetime_col(value: &str, index: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid_column(index, e))
}

fn parse_status(status: &str) -> ChallengeStatus {
    match status {
        "completed" => ChallengeStatus::Completed,
        _ => ChallengeStatus::Pending,
    }
}

fn format_source(source: ClaimableSource) -> &'static str {
    match source {
        ClaimableSource::Mission => "mission",
        ClaimableSource::Gift => "gift",
        ClaimableSource::BadgeUnlock => "badge_unlock",
    }
}

fn parse_source(source: &str) -> ClaimableSource {
    match source {
        "gift" => ClaimableSource::Gift,
        "badge_unlock" => ClaimableSource::BadgeUnlock,
        _ => ClaimableSource::Mission,
    }
}

fn format_outcome(outcome: &DuelOutcome) -> String {
    match outcome {
        DuelOutcome::Winner(id) => id.to_string(),
        DuelOutcome::Draw => "draw".to_string(),
    }
}

fn parse_outcome(value: &str, index: usize) -> Result<DuelOutcome, rusqlite::Error> {
    if value == "draw" {
        return Ok(DuelOutcome::Draw);
    }
    Uuid::parse_str(value)
        .map(DuelOutcome::Winner)
        .map_err(|e| invalid_column(index, e))
}

fn row_to_profile(row: &rusqlite::Row) -> Result<PlayerProfile, rusqlite::Error> {
    let last_active: Option<String> = row.get(3)?;
    Ok(PlayerProfile {
        id: parse_uuid_col(row, 0)?,
        xp_total: row.get(1)?,
        streak_count: row.get(2)?,
        last_active_date: last_active
            .map(|value| parse_date_col(&value, 3))
            .transpose()?,
        current_hearts: row.get(4)?,
        is_premium: row.get(5)?,
        credits: row.get(6)?,
        streak_freezes: row.get(7)?,
        freeze_armed: row.get(8)?,
        unlocked_badge_ids: Default::default(),
    })
}

fn row_to_challenge(row: &rusqlite::Row) -> Result<Challenge, rusqlite::Error> {
    let winner: Option<String> = row.get(7)?;
    let created_at: String = row.get(8)?;
    Ok(Challenge {
        id: parse_uuid_col(row, 0)?,
        challenger_id: parse_uuid_col(row, 1)?,
        opponent_id: parse_uuid_col(row, 2)?,
        quiz_id: parse_uuid_col(row, 3)?,
        status: parse_status(&row.get::<_, String>(4)?),
        challenger_score: row.get(5)?,
        opponent_score: row.get(6)?,
        outcome: winner.map(|value| parse_outcome(&value, 7)).transpose()?,
        created_at: parse_datetime_col(&created_at, 8)?,
    })
}

fn row_to_claimable(row: &rusqlite::Row) -> Result<Claimable, rusqlite::Error> {
    let reward_json: String = row.get(3)?;
    let reward: Reward = serde_json::from_str(&reward_json).map_err(|e| invalid_column(3, e))?;
    let created_at: String = row.get(7)?;
    Ok(Claimable {
        id: parse_uuid_col(row, 0)?,
        owner_id: parse_uuid_col(row, 1)?,
        source: parse_source(&row.get::<_, String>(2)?),
        reward,
        badge_id: row.get(4)?,
        is_completed: row.get(5)?,
        is_claimed: row.get(6)?,
        created_at: parse_datetime_col(&created_at, 7)?,
    })
}

fn challenge_by_id(conn: &Connection, id: Uuid) -> Result<Option<Challenge>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = ?1"
    ))?;
    stmt.query_row(params![id.to_string()], row_to_challenge)
        .optional()
}
