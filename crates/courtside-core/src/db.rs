// SQLite persistence layer for roster lookups, lineups, set scores and the
// match aggregate.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::warn;

use crate::model::{
    Availability, CourtNumber, LeagueFormat, LineupId, LineupRecord, MatchId, MatchRecord,
    MatchResult, MemberId, RosterMember, SetScoreRecord, TeamId,
};
use crate::store::{LineupStore, StoreError, StoreTransaction};

/// SQLite-backed implementation of the lineup persistence boundary.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS roster_members (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id      INTEGER NOT NULL,
                display_name TEXT NOT NULL,
                rating       REAL NOT NULL,
                UNIQUE(team_id, display_name)
            );

            CREATE TABLE IF NOT EXISTS matches (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id    INTEGER NOT NULL,
                format     TEXT NOT NULL,
                rating_cap REAL,
                result     TEXT,
                summary    TEXT,
                updated_at TEXT
            );

            CREATE TABLE IF NOT EXISTS availability (
                match_id  INTEGER NOT NULL REFERENCES matches(id),
                member_id INTEGER NOT NULL REFERENCES roster_members(id),
                status    TEXT NOT NULL,
                PRIMARY KEY (match_id, member_id)
            );

            CREATE TABLE IF NOT EXISTS lineups (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id     INTEGER NOT NULL REFERENCES matches(id),
                court_number INTEGER NOT NULL,
                seat_a       INTEGER REFERENCES roster_members(id),
                seat_b       INTEGER REFERENCES roster_members(id),
                updated_at   TEXT NOT NULL,
                UNIQUE(match_id, court_number)
            );

            CREATE TABLE IF NOT EXISTS set_scores (
                lineup_id  INTEGER NOT NULL REFERENCES lineups(id),
                set_number INTEGER NOT NULL,
                games_home INTEGER NOT NULL,
                games_away INTEGER NOT NULL,
                tiebreak   INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (lineup_id, set_number)
            );
            ",
        )
        .context("failed to create database schema")?;

        // The UNIQUE(match_id, court_number) index already serves lookups by
        // match; availability is keyed by match first as well.
        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_roster_members_team_id ON roster_members(team_id);",
        )
        .context("failed to create roster index")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Seeding (roster and match management live outside this crate)
    // ------------------------------------------------------------------

    /// Insert a roster member or update their rating if a
    /// `(team_id, display_name)` row already exists. Returns the member id.
    pub fn upsert_member(&self, team_id: TeamId, display_name: &str, rating: f64) -> Result<MemberId> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO roster_members (team_id, display_name, rating)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(team_id, display_name) DO UPDATE SET
                    rating = excluded.rating
                 RETURNING id",
                params![team_id, display_name, rating],
                |row| row.get(0),
            )
            .context("failed to upsert roster member")?;
        Ok(id)
    }

    /// Create a match with no result yet.
    pub fn insert_match(
        &self,
        team_id: TeamId,
        format: LeagueFormat,
        rating_cap: Option<f64>,
    ) -> Result<MatchId> {
        let conn = self.conn();
        let id: i64 = conn
            .query_row(
                "INSERT INTO matches (team_id, format, rating_cap) VALUES (?1, ?2, ?3)
                 RETURNING id",
                params![team_id, format.as_str(), rating_cap],
                |row| row.get(0),
            )
            .context("failed to insert match")?;
        Ok(id)
    }

    /// Record a member's availability answer. `NoResponse` clears it.
    pub fn set_availability(
        &self,
        match_id: MatchId,
        member_id: MemberId,
        status: Availability,
    ) -> Result<()> {
        let conn = self.conn();
        if status == Availability::NoResponse {
            conn.execute(
                "DELETE FROM availability WHERE match_id = ?1 AND member_id = ?2",
                params![match_id, member_id],
            )
            .context("failed to clear availability")?;
        } else {
            conn.execute(
                "INSERT OR REPLACE INTO availability (match_id, member_id, status)
                 VALUES (?1, ?2, ?3)",
                params![match_id, member_id, status.as_str()],
            )
            .context("failed to record availability")?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Load a match by id. Returns `None` if it does not exist.
    pub fn load_match(&self, match_id: MatchId) -> Result<Option<MatchRecord>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, team_id, format, rating_cap, result, summary
                 FROM matches WHERE id = ?1",
                params![match_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()
            .context("failed to query match")?;

        let Some((id, team_id, format, rating_cap, result, summary)) = row else {
            return Ok(None);
        };

        let format = LeagueFormat::from_str_format(&format)
            .with_context(|| format!("match {id} has unknown league format {format:?}"))?;
        let result = result.as_deref().and_then(|r| {
            let parsed = MatchResult::from_str_result(r);
            if parsed.is_none() {
                warn!("Match {} has unknown stored result {:?}; treating as unset", id, r);
            }
            parsed
        });

        Ok(Some(MatchRecord {
            id,
            team_id,
            format,
            rating_cap,
            result,
            summary,
        }))
    }

    /// Roster of a team ordered by display name.
    pub fn load_roster(&self, team_id: TeamId) -> Result<Vec<RosterMember>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, display_name, rating FROM roster_members
                 WHERE team_id = ?1 ORDER BY display_name COLLATE NOCASE, id",
            )
            .context("failed to prepare load_roster query")?;

        let members = stmt
            .query_map(params![team_id], |row| {
                Ok(RosterMember {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    rating: row.get(2)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;

        Ok(members)
    }

    /// Availability answers for a match. Rows with an unrecognised status are
    /// skipped with a warning.
    pub fn load_availability(&self, match_id: MatchId) -> Result<Vec<(MemberId, Availability)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT member_id, status FROM availability WHERE match_id = ?1")
            .context("failed to prepare load_availability query")?;

        let rows = stmt
            .query_map(params![match_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .context("failed to query availability")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map availability rows")?;

        Ok(rows
            .into_iter()
            .filter_map(|(member_id, status)| match Availability::from_str_status(&status) {
                Some(parsed) => Some((member_id, parsed)),
                None => {
                    warn!(
                        "Ignoring unknown availability {:?} for member {} in match {}",
                        status, member_id, match_id
                    );
                    None
                }
            })
            .collect())
    }

    /// Lineups of a match ordered by court number.
    pub fn load_lineups(&self, match_id: MatchId) -> Result<Vec<LineupRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, match_id, court_number, seat_a, seat_b FROM lineups
                 WHERE match_id = ?1 ORDER BY court_number",
            )
            .context("failed to prepare load_lineups query")?;

        let lineups = stmt
            .query_map(params![match_id], |row| {
                Ok(LineupRecord {
                    id: row.get(0)?,
                    match_id: row.get(1)?,
                    court: row.get(2)?,
                    seat_a: row.get(3)?,
                    seat_b: row.get(4)?,
                })
            })
            .context("failed to query lineups")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map lineup rows")?;

        Ok(lineups)
    }

    /// Set scores of the given lineups, ordered by lineup then set number.
    pub fn load_set_scores(&self, lineup_ids: &[LineupId]) -> Result<Vec<SetScoreRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT lineup_id, set_number, games_home, games_away, tiebreak
                 FROM set_scores WHERE lineup_id = ?1 ORDER BY set_number",
            )
            .context("failed to prepare load_set_scores query")?;

        let mut scores = Vec::new();
        for &lineup_id in lineup_ids {
            let rows = stmt
                .query_map(params![lineup_id], |row| {
                    Ok(SetScoreRecord {
                        lineup_id: row.get(0)?,
                        set_number: row.get(1)?,
                        games_home: row.get(2)?,
                        games_away: row.get(3)?,
                        tiebreak: row.get(4)?,
                    })
                })
                .context("failed to query set scores")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("failed to map set score rows")?;
            scores.extend(rows);
        }

        Ok(scores)
    }
}

// ---------------------------------------------------------------------------
// LineupStore implementation
// ---------------------------------------------------------------------------

impl LineupStore for Database {
    fn match_record(&self, match_id: MatchId) -> Result<MatchRecord, StoreError> {
        self.load_match(match_id)?
            .ok_or(StoreError::MatchNotFound(match_id))
    }

    fn roster(&self, team_id: TeamId) -> Result<Vec<RosterMember>, StoreError> {
        Ok(self.load_roster(team_id)?)
    }

    fn availability(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<(MemberId, Availability)>, StoreError> {
        Ok(self.load_availability(match_id)?)
    }

    fn lineups(&self, match_id: MatchId) -> Result<Vec<LineupRecord>, StoreError> {
        Ok(self.load_lineups(match_id)?)
    }

    fn set_scores(&self, lineup_ids: &[LineupId]) -> Result<Vec<SetScoreRecord>, StoreError> {
        Ok(self.load_set_scores(lineup_ids)?)
    }

    /// Runs `f` inside a SQLite transaction. Returning early drops the
    /// transaction, which rolls it back.
    fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, StoreError>,
    {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| write_error("begin transaction", e))?;
        let value = {
            let mut writer = SqliteWriter { conn: &tx };
            f(&mut writer)?
        };
        tx.commit().map_err(|e| write_error("commit transaction", e))?;
        Ok(value)
    }
}

/// Lock contention that outlasted the busy timeout is reported as
/// [`StoreError::Unavailable`]; anything else is a backend error.
fn write_error(operation: &'static str, e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            warn!("SQLite busy during {operation}: {e}");
            StoreError::Unavailable { operation }
        }
        _ => StoreError::Backend(anyhow::Error::new(e).context(format!("failed to {operation}"))),
    }
}

/// Write half of a running SQLite transaction.
struct SqliteWriter<'t> {
    conn: &'t Connection,
}

impl StoreTransaction for SqliteWriter<'_> {
    fn upsert_lineup(
        &mut self,
        match_id: MatchId,
        court: CourtNumber,
        seat_a: Option<MemberId>,
        seat_b: Option<MemberId>,
    ) -> Result<LineupId, StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let id: i64 = self
            .conn
            .query_row(
                "INSERT INTO lineups (match_id, court_number, seat_a, seat_b, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(match_id, court_number) DO UPDATE SET
                    seat_a     = excluded.seat_a,
                    seat_b     = excluded.seat_b,
                    updated_at = excluded.updated_at
                 RETURNING id",
                params![match_id, court, seat_a, seat_b, now],
                |row| row.get(0),
            )
            .map_err(|e| write_error("upsert lineup", e))?;
        Ok(id)
    }

    fn delete_set_scores(&mut self, lineup_ids: &[LineupId]) -> Result<usize, StoreError> {
        let mut stmt = self
            .conn
            .prepare("DELETE FROM set_scores WHERE lineup_id = ?1")
            .map_err(|e| write_error("delete set scores", e))?;
        let mut removed = 0;
        for &lineup_id in lineup_ids {
            removed += stmt
                .execute(params![lineup_id])
                .map_err(|e| write_error("delete set scores", e))?;
        }
        Ok(removed)
    }

    fn insert_set_score(&mut self, score: &SetScoreRecord) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO set_scores (lineup_id, set_number, games_home, games_away, tiebreak)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    score.lineup_id,
                    score.set_number,
                    score.games_home,
                    score.games_away,
                    score.tiebreak,
                ],
            )
            .map_err(|e| write_error("insert set score", e))?;
        Ok(())
    }

    fn update_match_aggregate(
        &mut self,
        match_id: MatchId,
        result: MatchResult,
        summary: &str,
    ) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let updated = self
            .conn
            .execute(
                "UPDATE matches SET result = ?1, summary = ?2, updated_at = ?3 WHERE id = ?4",
                params![result.as_str(), summary, now, match_id],
            )
            .map_err(|e| write_error("update match aggregate", e))?;
        if updated == 0 {
            return Err(StoreError::MatchNotFound(match_id));
        }
        Ok(())
    }
}
