// Save protocol: lineups, set scores and the match aggregate written through a
// single store transaction.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::aggregate::{aggregate, court_results, MatchAggregate};
use super::board::CourtBoard;
use super::scores::ScoreSheet;
use crate::model::{CourtNumber, LineupId, MatchId, MemberId, Seat, SetScoreRecord};
use crate::store::{LineupStore, StoreError};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("a save is already in progress")]
    InFlight,

    #[error("save failed: {0}")]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// One set as it will be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSet {
    pub set_number: u8,
    pub games_home: u8,
    pub games_away: u8,
    pub tiebreak: bool,
}

/// One lineup row as it will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLineup {
    pub court: CourtNumber,
    pub seat_a: Option<MemberId>,
    pub seat_b: Option<MemberId>,
    /// Id from an earlier save, if any.
    pub known_id: Option<LineupId>,
    pub sets: Vec<PlannedSet>,
}

/// Everything a save writes, computed up front from the session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePlan {
    pub match_id: MatchId,
    pub lineups: Vec<PlannedLineup>,
    /// `None` when no occupied court has a recorded set.
    pub aggregate: Option<MatchAggregate>,
}

impl SavePlan {
    /// Occupied courts are written with their recorded sets. Courts that were
    /// saved before and are now empty are written with both seats cleared and
    /// no sets. Empty courts that were never saved are left out.
    pub fn build(match_id: MatchId, board: &CourtBoard, sheet: &ScoreSheet) -> Self {
        let mut lineups = Vec::new();
        let mut scored = false;

        for slot in board.slots() {
            if slot.is_empty() {
                if slot.lineup_id.is_some() {
                    lineups.push(PlannedLineup {
                        court: slot.court,
                        seat_a: None,
                        seat_b: None,
                        known_id: slot.lineup_id,
                        sets: Vec::new(),
                    });
                }
                continue;
            }

            let sets: Vec<PlannedSet> = sheet
                .recorded_sets(slot.court)
                .into_iter()
                .map(|(set_number, games_home, games_away, tiebreak)| PlannedSet {
                    set_number,
                    games_home,
                    games_away,
                    tiebreak,
                })
                .collect();
            scored |= !sets.is_empty();

            lineups.push(PlannedLineup {
                court: slot.court,
                seat_a: slot.occupant(Seat::A),
                seat_b: slot.occupant(Seat::B),
                known_id: slot.lineup_id,
                sets,
            });
        }

        let aggregate = scored.then(|| aggregate(&court_results(board, sheet)));

        SavePlan {
            match_id,
            lineups,
            aggregate,
        }
    }

    pub fn score_count(&self) -> usize {
        self.lineups.iter().map(|l| l.sets.len()).sum()
    }
}

/// What a committed save wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReceipt {
    pub lineup_ids: BTreeMap<CourtNumber, LineupId>,
    pub scores_removed: usize,
    pub scores_written: usize,
    pub aggregate: Option<MatchAggregate>,
}

/// Run the plan inside one store transaction.
///
/// Steps: upsert lineups, delete their old set scores, insert the current
/// ones, then write the aggregate when there is one. Any failure rolls the
/// whole transaction back.
pub fn commit<S: LineupStore>(store: &S, plan: &SavePlan) -> Result<SaveReceipt, StoreError> {
    let match_id = plan.match_id;
    debug!(
        match_id,
        lineups = plan.lineups.len(),
        scores = plan.score_count(),
        "committing lineup save"
    );

    let outcome = store.transact(|tx| {
        // 1. Lineups
        let mut lineup_ids = BTreeMap::new();
        for lineup in &plan.lineups {
            let id = tx.upsert_lineup(match_id, lineup.court, lineup.seat_a, lineup.seat_b)?;
            if lineup.known_id.is_some_and(|known| known != id) {
                warn!(
                    match_id,
                    court = lineup.court,
                    "lineup row was replaced since it was loaded; now id {id}"
                );
            }
            lineup_ids.insert(lineup.court, id);
        }

        // 2. Remove previous scores
        let ids: Vec<LineupId> = lineup_ids.values().copied().collect();
        let scores_removed = tx.delete_set_scores(&ids)?;

        // 3. Current scores
        let mut scores_written = 0;
        for lineup in &plan.lineups {
            let lineup_id = lineup_ids[&lineup.court];
            for set in &lineup.sets {
                tx.insert_set_score(&SetScoreRecord {
                    lineup_id,
                    set_number: set.set_number,
                    games_home: set.games_home,
                    games_away: set.games_away,
                    tiebreak: set.tiebreak,
                })?;
                scores_written += 1;
            }
        }

        // 4. Aggregate
        if let Some(agg) = &plan.aggregate {
            tx.update_match_aggregate(match_id, agg.result, &agg.summary)?;
        }

        Ok(SaveReceipt {
            lineup_ids,
            scores_removed,
            scores_written,
            aggregate: plan.aggregate.clone(),
        })
    });

    match &outcome {
        Ok(receipt) => info!(
            match_id,
            lineups = receipt.lineup_ids.len(),
            scores = receipt.scores_written,
            result = receipt
                .aggregate
                .as_ref()
                .map(|a| a.result.as_str())
                .unwrap_or("unchanged"),
            "lineup saved"
        ),
        Err(e) => error!(match_id, "lineup save rolled back: {e}"),
    }
    outcome
}

// ---------------------------------------------------------------------------
// Save guard
// ---------------------------------------------------------------------------

/// Shared flag that lets only one save run at a time.
#[derive(Debug, Clone, Default)]
pub struct SaveGuard {
    in_flight: Arc<AtomicBool>,
}

impl SaveGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard. `None` while another save holds it.
    pub fn try_begin(&self) -> Option<SaveTicket> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SaveTicket {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Held for the duration of one save; releases the guard on drop.
#[derive(Debug)]
pub struct SaveTicket {
    in_flight: Arc<AtomicBool>,
}

impl Drop for SaveTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
