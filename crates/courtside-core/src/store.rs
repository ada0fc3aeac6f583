// Persistence boundary consumed by the lineup pipeline.
//
// Reads happen directly on the store. Writes only happen inside
// `LineupStore::transact`, so a failed save never leaves a partial result
// behind.

use thiserror::Error;

use crate::model::{
    Availability, CourtNumber, LineupId, LineupRecord, MatchId, MatchRecord, MatchResult,
    MemberId, RosterMember, SetScoreRecord, TeamId,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("store unavailable during {operation}")]
    Unavailable { operation: &'static str },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Read access plus a transactional write scope.
pub trait LineupStore {
    fn match_record(&self, match_id: MatchId) -> Result<MatchRecord, StoreError>;

    /// Roster members of a team, in roster display order.
    fn roster(&self, team_id: TeamId) -> Result<Vec<RosterMember>, StoreError>;

    /// Recorded availability answers for a match. Members without a row have
    /// not answered.
    fn availability(&self, match_id: MatchId)
        -> Result<Vec<(MemberId, Availability)>, StoreError>;

    /// Persisted lineups of a match, ordered by court number.
    fn lineups(&self, match_id: MatchId) -> Result<Vec<LineupRecord>, StoreError>;

    fn set_scores(&self, lineup_ids: &[LineupId]) -> Result<Vec<SetScoreRecord>, StoreError>;

    /// Run `f` atomically. Everything `f` wrote is committed if it returns
    /// `Ok`, and nothing is if it (or the commit) fails.
    fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, StoreError>;
}

/// Writes available inside [`LineupStore::transact`].
pub trait StoreTransaction {
    /// Insert or update the lineup for (`match_id`, `court`) and return its id.
    fn upsert_lineup(
        &mut self,
        match_id: MatchId,
        court: CourtNumber,
        seat_a: Option<MemberId>,
        seat_b: Option<MemberId>,
    ) -> Result<LineupId, StoreError>;

    /// Remove all set scores of the given lineups. Returns the rows removed.
    fn delete_set_scores(&mut self, lineup_ids: &[LineupId]) -> Result<usize, StoreError>;

    fn insert_set_score(&mut self, score: &SetScoreRecord) -> Result<(), StoreError>;

    fn update_match_aggregate(
        &mut self,
        match_id: MatchId,
        result: MatchResult,
        summary: &str,
    ) -> Result<(), StoreError>;
}
