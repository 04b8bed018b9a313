//! Database schema migrations for studyquest.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current migration
//! version.

use rusqlite::{params, Connection, Result as SqliteResult};

use crate::badges;

/// Apply all pending migrations to bring the database to the current
/// schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: initial schema.
///
/// Profiles, challenges, claimables, the badge catalog, the unit/region
/// catalog with per-player completion marks, item inventory, and the kv
/// store for ephemeral markers. The partial unique index on challenges is
/// what enforces at-most-one Pending row per ordered pair.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS profiles (
            id               TEXT PRIMARY KEY,
            xp_total         INTEGER NOT NULL DEFAULT 0,
            streak_count     INTEGER NOT NULL DEFAULT 0,
            last_active_date TEXT,
            current_hearts   INTEGER NOT NULL DEFAULT 5,
            is_premium       INTEGER NOT NULL DEFAULT 0,
            credits          INTEGER NOT NULL DEFAULT 0,
            streak_freezes   INTEGER NOT NULL DEFAULT 0,
            freeze_armed     INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS challenges (
            id               TEXT PRIMARY KEY,
            challenger_id    TEXT NOT NULL,
            opponent_id      TEXT NOT NULL,
            quiz_id          TEXT NOT NULL,
            status           TEXT NOT NULL DEFAULT 'pending',
            challenger_score INTEGER,
            opponent_score   INTEGER,
            winner           TEXT,
            created_at       TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_challenges_pending
            ON challenges(challenger_id, opponent_id) WHERE status = 'pending';
        CREATE INDEX IF NOT EXISTS idx_challenges_opponent ON challenges(opponent_id);

        CREATE TABLE IF NOT EXISTS claimables (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL,
            source       TEXT NOT NULL,
            reward       TEXT NOT NULL,
            badge_id     TEXT,
            is_completed INTEGER NOT NULL DEFAULT 0,
            is_claimed   INTEGER NOT NULL DEFAULT 0,
            created_at   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_claimables_owner ON claimables(owner_id);

        CREATE TABLE IF NOT EXISTS badge_definitions (
            id        TEXT PRIMARY KEY,
            condition TEXT NOT NULL,
            xp_reward INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS units (
            id     TEXT PRIMARY KEY,
            region TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_units_region ON units(region);

        CREATE TABLE IF NOT EXISTS profile_units (
            profile_id   TEXT NOT NULL,
            unit_id      TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            PRIMARY KEY (profile_id, unit_id)
        );

        CREATE TABLE IF NOT EXISTS profile_badges (
            profile_id  TEXT NOT NULL,
            badge_id    TEXT NOT NULL,
            unlocked_at TEXT NOT NULL,
            PRIMARY KEY (profile_id, badge_id)
        );

        CREATE TABLE IF NOT EXISTS inventory (
            profile_id  TEXT NOT NULL,
            item_id     TEXT NOT NULL,
            acquired_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: seed the badge catalog.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    for def in badges::default_catalog() {
        let condition = serde_json::to_string(&def.condition).map_err(|e| {
            rusqlite::Error::ToSqlConversionFailure(Box::new(e))
        })?;
        tx.execute(
            "INSERT OR IGNORE INTO badge_definitions (id, condition, xp_reward)
             VALUES (?1, ?2, ?3)",
            params![def.id, condition, def.xp_reward],
        )?;
    }

    set_schema_version(&tx, 2)?;
    tx.commit()
}
