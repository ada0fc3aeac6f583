// Lineup editing session: the single state object behind the lineup screen.
//
// Holds the assignment board, the score sheet, the pending seat selection and
// the save guard. Every edit is a plain method call; persistence happens only
// in `save`.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::aggregate::{self, CourtResult, MatchAggregate};
use super::availability::AvailabilityIndex;
use super::board::{BoardError, CourtBoard};
use super::gesture::{Gesture, SeatPicker, SeatRef};
use super::save::{commit, SaveError, SaveGuard, SavePlan, SaveReceipt};
use super::scores::{ScoreError, ScoreSheet, SetEntry, SetRule};
use crate::config::Config;
use crate::model::{
    Availability, CourtNumber, LineupId, MatchId, MatchRecord, MemberId, RosterMember, Seat,
};
use crate::notify::Notifier;
use crate::store::{LineupStore, StoreError};

/// Per-session knobs taken from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Courts on a fresh board. Raised to the highest persisted court.
    pub courts: CourtNumber,
    pub set_rule: SetRule,
    /// Used when the match has no cap of its own.
    pub default_rating_cap: Option<f64>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        SessionSettings {
            courts: config.league.courts,
            set_rule: config.scoring.set_rule,
            default_rating_cap: config.league.rating_cap,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            courts: 3,
            set_rule: SetRule::Tennis,
            default_rating_cap: None,
        }
    }
}

/// Result of [`LineupSession::save_and_publish`].
#[derive(Debug)]
pub struct PublishedSave {
    pub receipt: SaveReceipt,
    /// The detached publish task, if one was started.
    pub publish: Option<JoinHandle<()>>,
}

pub struct LineupSession {
    match_info: MatchRecord,
    board: CourtBoard,
    scores: ScoreSheet,
    picker: SeatPicker,
    guard: SaveGuard,
    dirty: bool,
}

impl LineupSession {
    /// A session with empty courts and the whole roster in the pool.
    pub fn new(
        match_info: MatchRecord,
        roster: Vec<RosterMember>,
        availability: Vec<(MemberId, Availability)>,
        settings: &SessionSettings,
    ) -> Self {
        Self::with_courts(match_info, roster, availability, settings, settings.courts)
    }

    fn with_courts(
        match_info: MatchRecord,
        roster: Vec<RosterMember>,
        availability: Vec<(MemberId, Availability)>,
        settings: &SessionSettings,
        courts: CourtNumber,
    ) -> Self {
        let index = AvailabilityIndex::new(roster, availability);
        let rating_cap = match_info.rating_cap.or(settings.default_rating_cap);
        let board = CourtBoard::new(index, courts, rating_cap);
        let scores = ScoreSheet::new(match_info.format, settings.set_rule, courts);
        LineupSession {
            match_info,
            board,
            scores,
            picker: SeatPicker::new(),
            guard: SaveGuard::new(),
            dirty: false,
        }
    }

    /// Open a session for `match_id` from the store, restoring persisted
    /// lineups and set scores.
    ///
    /// Persisted rows that no longer fit (members who left the roster, sets
    /// outside the format's range) are skipped with a warning.
    pub fn load<S: LineupStore>(
        store: &S,
        match_id: MatchId,
        settings: &SessionSettings,
    ) -> Result<Self, StoreError> {
        let match_info = store.match_record(match_id)?;
        let roster = store.roster(match_info.team_id)?;
        let availability = store.availability(match_id)?;
        let lineups = store.lineups(match_id)?;

        let highest = lineups.iter().map(|l| l.court).max().unwrap_or(0);
        let courts = settings.courts.max(highest);
        let mut session = Self::with_courts(match_info, roster, availability, settings, courts);

        let mut court_of: HashMap<LineupId, CourtNumber> = HashMap::new();
        for lineup in &lineups {
            if lineup.court == 0 {
                warn!("Match {} has a lineup on court 0 (id {}); ignoring it", match_id, lineup.id);
                continue;
            }
            session.board.attach_lineup(lineup.court, lineup.id);
            court_of.insert(lineup.id, lineup.court);

            for (seat, member) in [(Seat::A, lineup.seat_a), (Seat::B, lineup.seat_b)] {
                let Some(member) = member else { continue };
                if let Err(e) = session.board.assign(lineup.court, seat, member) {
                    warn!(
                        "Match {} court {} seat {}: {e}; leaving the seat empty",
                        match_id,
                        lineup.court,
                        seat.as_str()
                    );
                }
            }
        }

        let lineup_ids: Vec<LineupId> = court_of.keys().copied().collect();
        let mut restored = 0;
        for record in store.set_scores(&lineup_ids)? {
            let Some(&court) = court_of.get(&record.lineup_id) else {
                continue;
            };
            let entry = SetEntry::new(
                Some(record.games_home),
                Some(record.games_away),
                record.tiebreak,
            );
            match session.scores.record_set(court, record.set_number, entry) {
                Ok(()) => restored += 1,
                Err(e) => warn!("Match {} court {}: skipping stored set: {e}", match_id, court),
            }
        }

        info!(
            "Loaded lineup session for match {} ({} courts, {} lineups, {} sets)",
            match_id,
            courts,
            lineups.len(),
            restored
        );
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn match_info(&self) -> &MatchRecord {
        &self.match_info
    }

    pub fn board(&self) -> &CourtBoard {
        &self.board
    }

    pub fn scores(&self) -> &ScoreSheet {
        &self.scores
    }

    /// Seat selected for the next member pick, if any.
    pub fn pending_seat(&self) -> Option<SeatRef> {
        self.picker.pending()
    }

    /// Edits not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// A handle on this session's save guard.
    pub fn save_guard(&self) -> SaveGuard {
        self.guard.clone()
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Seat a member; see [`CourtBoard::assign`].
    pub fn assign(
        &mut self,
        court: CourtNumber,
        seat: Seat,
        member: MemberId,
    ) -> Result<Option<MemberId>, BoardError> {
        let displaced = self.board.assign(court, seat, member).inspect_err(|e| {
            debug!("assign rejected: {e}");
        })?;
        self.dirty = true;
        if self.board.is_over_rating_limit(court) {
            debug!(
                "Court {} combined rating {:.1} is over the cap",
                court,
                self.board.combined_rating(court)
            );
        }
        Ok(displaced)
    }

    pub fn unassign(
        &mut self,
        court: CourtNumber,
        seat: Seat,
    ) -> Result<Option<MemberId>, BoardError> {
        let previous = self.board.unassign(court, seat)?;
        if previous.is_some() {
            self.dirty = true;
        }
        Ok(previous)
    }

    /// Feed a drag/drop or select/pick gesture through to the board.
    pub fn apply_gesture(&mut self, gesture: Gesture) -> Result<Option<MemberId>, BoardError> {
        match self.picker.handle(gesture) {
            Some(command) => {
                let displaced = self.board.apply(command)?;
                self.dirty = true;
                Ok(displaced)
            }
            None => Ok(None),
        }
    }

    pub fn record_set(
        &mut self,
        court: CourtNumber,
        set_number: u8,
        entry: SetEntry,
    ) -> Result<(), ScoreError> {
        self.scores.record_set(court, set_number, entry)?;
        self.dirty = true;
        Ok(())
    }

    /// Record a set from the raw text of the two game fields.
    pub fn record_set_input(
        &mut self,
        court: CourtNumber,
        set_number: u8,
        games_home: &str,
        games_away: &str,
        tiebreak: bool,
    ) -> Result<(), ScoreError> {
        self.scores
            .record_set_input(court, set_number, games_home, games_away, tiebreak)?;
        self.dirty = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derived state
    // ------------------------------------------------------------------

    pub fn court_results(&self) -> Vec<CourtResult> {
        aggregate::court_results(&self.board, &self.scores)
    }

    /// The aggregate the current state would produce.
    pub fn aggregate(&self) -> MatchAggregate {
        aggregate::aggregate(&self.court_results())
    }

    /// Some occupied court has a fully entered set.
    pub fn has_scored_court(&self) -> bool {
        self.board
            .slots()
            .iter()
            .any(|slot| !slot.is_empty() && self.scores.is_scored(slot.court))
    }

    // ------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------

    /// Persist lineups, set scores and (when some court is scored) the match
    /// aggregate in one transaction.
    ///
    /// On failure nothing is written and the session keeps its edits.
    pub fn save<S: LineupStore>(&mut self, store: &S) -> Result<SaveReceipt, SaveError> {
        let Some(_ticket) = self.guard.try_begin() else {
            warn!("Save for match {} ignored: already saving", self.match_info.id);
            return Err(SaveError::InFlight);
        };

        for court in self.board.courts_over_limit() {
            warn!(
                "Match {} court {} combined rating {:.1} exceeds cap {:.1}; saving anyway",
                self.match_info.id,
                court,
                self.board.combined_rating(court),
                self.board.rating_cap().unwrap_or_default()
            );
        }

        let plan = SavePlan::build(self.match_info.id, &self.board, &self.scores);
        let receipt = commit(store, &plan)?;

        for (&court, &lineup_id) in &receipt.lineup_ids {
            self.board.attach_lineup(court, lineup_id);
        }
        if let Some(agg) = &receipt.aggregate {
            self.match_info.result = Some(agg.result);
            self.match_info.summary = Some(agg.summary.clone());
        }
        self.dirty = false;
        Ok(receipt)
    }

    /// [`save`](Self::save), then fire the publish event without awaiting it.
    pub fn save_and_publish<S: LineupStore>(
        &mut self,
        store: &S,
        notifier: &Notifier,
    ) -> Result<PublishedSave, SaveError> {
        let receipt = self.save(store)?;
        let publish = notifier.publish_detached(self.match_info.id, self.match_info.team_id);
        Ok(PublishedSave { receipt, publish })
    }
}
