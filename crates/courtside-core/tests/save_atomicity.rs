// Save atomicity: a store failure at any step of the save leaves lineups, set
// scores and the match aggregate exactly as they were.

use courtside_core::db::Database;
use courtside_core::lineup::save::SaveError;
use courtside_core::lineup::scores::SetEntry;
use courtside_core::lineup::session::{LineupSession, SessionSettings};
use courtside_core::model::{
    Availability, CourtNumber, LeagueFormat, LineupId, LineupRecord, MatchId, MatchRecord,
    MatchResult, MemberId, RosterMember, Seat, SetScoreRecord, TeamId,
};
use courtside_core::store::{LineupStore, StoreError, StoreTransaction};

// ===========================================================================
// Fault-injecting store
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    UpsertLineup,
    DeleteScores,
    InsertScore,
    UpdateAggregate,
}

/// Delegates to a real database but fails the `nth` call (1-based) of one
/// write step.
struct FaultyStore<'a> {
    inner: &'a Database,
    step: Step,
    nth: usize,
}

impl LineupStore for FaultyStore<'_> {
    fn match_record(&self, match_id: MatchId) -> Result<MatchRecord, StoreError> {
        self.inner.match_record(match_id)
    }

    fn roster(&self, team_id: TeamId) -> Result<Vec<RosterMember>, StoreError> {
        self.inner.roster(team_id)
    }

    fn availability(
        &self,
        match_id: MatchId,
    ) -> Result<Vec<(MemberId, Availability)>, StoreError> {
        self.inner.availability(match_id)
    }

    fn lineups(&self, match_id: MatchId) -> Result<Vec<LineupRecord>, StoreError> {
        self.inner.lineups(match_id)
    }

    fn set_scores(&self, lineup_ids: &[LineupId]) -> Result<Vec<SetScoreRecord>, StoreError> {
        self.inner.set_scores(lineup_ids)
    }

    fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, StoreError>,
    {
        let (step, nth) = (self.step, self.nth);
        self.inner.transact(move |tx| {
            let mut faulty = FaultyTransaction {
                inner: tx,
                step,
                nth,
                calls: 0,
            };
            f(&mut faulty)
        })
    }
}

struct FaultyTransaction<'t> {
    inner: &'t mut dyn StoreTransaction,
    step: Step,
    nth: usize,
    calls: usize,
}

impl FaultyTransaction<'_> {
    fn check(&mut self, step: Step, operation: &'static str) -> Result<(), StoreError> {
        if step != self.step {
            return Ok(());
        }
        self.calls += 1;
        if self.calls == self.nth {
            return Err(StoreError::Unavailable { operation });
        }
        Ok(())
    }
}

impl StoreTransaction for FaultyTransaction<'_> {
    fn upsert_lineup(
        &mut self,
        match_id: MatchId,
        court: CourtNumber,
        seat_a: Option<MemberId>,
        seat_b: Option<MemberId>,
    ) -> Result<LineupId, StoreError> {
        self.check(Step::UpsertLineup, "upsert_lineup")?;
        self.inner.upsert_lineup(match_id, court, seat_a, seat_b)
    }

    fn delete_set_scores(&mut self, lineup_ids: &[LineupId]) -> Result<usize, StoreError> {
        self.check(Step::DeleteScores, "delete_set_scores")?;
        self.inner.delete_set_scores(lineup_ids)
    }

    fn insert_set_score(&mut self, score: &SetScoreRecord) -> Result<(), StoreError> {
        self.check(Step::InsertScore, "insert_set_score")?;
        self.inner.insert_set_score(score)
    }

    fn update_match_aggregate(
        &mut self,
        match_id: MatchId,
        result: MatchResult,
        summary: &str,
    ) -> Result<(), StoreError> {
        self.check(Step::UpdateAggregate, "update_match_aggregate")?;
        self.inner.update_match_aggregate(match_id, result, summary)
    }
}

// ===========================================================================
// Helpers
// ===========================================================================

const TEAM: TeamId = 2;

#[derive(Debug, PartialEq)]
struct Snapshot {
    lineups: Vec<LineupRecord>,
    scores: Vec<SetScoreRecord>,
    result: Option<MatchResult>,
    summary: Option<String>,
}

fn snapshot(db: &Database, match_id: MatchId) -> Snapshot {
    let lineups = db.load_lineups(match_id).unwrap();
    let ids: Vec<LineupId> = lineups.iter().map(|l| l.id).collect();
    let scores = db.load_set_scores(&ids).unwrap();
    let record = db.load_match(match_id).unwrap().unwrap();
    Snapshot {
        lineups,
        scores,
        result: record.result,
        summary: record.summary,
    }
}

fn settings() -> SessionSettings {
    SessionSettings {
        courts: 3,
        ..SessionSettings::default()
    }
}

/// A match with two saved courts (home won both) and a session holding
/// unsaved edits on top: court 2 flipped to a loss, court 3 newly filled.
fn saved_then_edited() -> (Database, MatchId, LineupSession) {
    let db = Database::open(":memory:").unwrap();
    let members: Vec<MemberId> = ["Avery", "Blake", "Casey", "Devon", "Emery", "Finley"]
        .iter()
        .map(|name| db.upsert_member(TEAM, name, 3.5).unwrap())
        .collect();
    let match_id = db.insert_match(TEAM, LeagueFormat::Usta, None).unwrap();

    let mut session = LineupSession::load(&db, match_id, &settings()).unwrap();
    session.assign(1, Seat::A, members[0]).unwrap();
    session.assign(1, Seat::B, members[1]).unwrap();
    session.assign(2, Seat::A, members[2]).unwrap();
    session.assign(2, Seat::B, members[3]).unwrap();
    session.record_set(1, 1, SetEntry::games(6, 1)).unwrap();
    session.record_set(1, 2, SetEntry::games(6, 2)).unwrap();
    session.record_set(2, 1, SetEntry::games(6, 3)).unwrap();
    session.save(&db).unwrap();

    session.record_set(2, 1, SetEntry::games(3, 6)).unwrap();
    session.assign(3, Seat::A, members[4]).unwrap();
    session.assign(3, Seat::B, members[5]).unwrap();
    session.record_set(3, 1, SetEntry::games(7, 5)).unwrap();

    (db, match_id, session)
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn failure_at_any_step_leaves_store_untouched() {
    let cases = [
        (Step::UpsertLineup, 1),
        (Step::UpsertLineup, 3),
        (Step::DeleteScores, 1),
        (Step::InsertScore, 1),
        (Step::InsertScore, 4),
        (Step::UpdateAggregate, 1),
    ];

    for (step, nth) in cases {
        let (db, match_id, mut session) = saved_then_edited();
        let before = snapshot(&db, match_id);
        let board_before = session.board().slots().to_vec();

        let faulty = FaultyStore {
            inner: &db,
            step,
            nth,
        };
        let err = session.save(&faulty).unwrap_err();
        assert!(
            matches!(err, SaveError::Store(StoreError::Unavailable { .. })),
            "{step:?}#{nth}: unexpected error {err}"
        );

        assert_eq!(snapshot(&db, match_id), before, "{step:?}#{nth} leaked writes");
        assert!(session.is_dirty(), "{step:?}#{nth}: edits should be kept");
        assert_eq!(session.board().slots(), board_before.as_slice());
        assert!(!session.save_guard().is_saving(), "guard released after failure");
    }
}

#[test]
fn retry_after_failure_succeeds_and_matches_direct_save() {
    let (db, match_id, mut session) = saved_then_edited();
    let faulty = FaultyStore {
        inner: &db,
        step: Step::UpdateAggregate,
        nth: 1,
    };
    assert!(session.save(&faulty).is_err());

    let receipt = session.save(&db).unwrap();
    let agg = receipt.aggregate.unwrap();
    // Court 1 home, court 2 away, court 3 home.
    assert_eq!(agg.summary, "2-1");
    assert_eq!(agg.result, MatchResult::Win);

    let after = snapshot(&db, match_id);
    assert_eq!(after.lineups.len(), 3);
    assert_eq!(after.scores.len(), 4);
    assert_eq!(after.result, Some(MatchResult::Win));
    assert_eq!(after.summary.as_deref(), Some("2-1"));
}

#[test]
fn faulty_store_passes_through_when_step_not_reached() {
    let (db, match_id, mut session) = saved_then_edited();
    // Three occupied courts mean three upserts; a fourth never happens.
    let faulty = FaultyStore {
        inner: &db,
        step: Step::UpsertLineup,
        nth: 4,
    };
    session.save(&faulty).unwrap();
    assert!(!session.is_dirty());
    assert_eq!(snapshot(&db, match_id).lineups.len(), 3);
}
