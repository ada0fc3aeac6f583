// Match result aggregation: a pure reduction from court outcomes to the
// match-level result and summary.

use serde::{Deserialize, Serialize};

use super::board::CourtBoard;
use super::scores::{CourtOutcome, ScoreSheet};
use crate::model::{CourtNumber, MatchResult, Side};

/// What the aggregator needs to know about one court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtResult {
    pub court: CourtNumber,
    /// Both seats are filled.
    pub complete: bool,
    pub outcome: CourtOutcome,
}

impl CourtResult {
    /// Counts toward the match result: complete with a decided outcome.
    pub fn contributes(&self) -> bool {
        self.complete && self.outcome.decided_sets() > 0 && self.outcome.winner.is_some()
    }
}

/// One [`CourtResult`] per court on the board, in court order.
pub fn court_results(board: &CourtBoard, sheet: &ScoreSheet) -> Vec<CourtResult> {
    board
        .slots()
        .iter()
        .map(|slot| CourtResult {
            court: slot.court,
            complete: slot.is_complete(),
            outcome: sheet.outcome(slot.court),
        })
        .collect()
}

/// Match-level aggregate written onto the match record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchAggregate {
    pub courts_won: u32,
    pub courts_lost: u32,
    pub result: MatchResult,
    pub summary: String,
}

/// Reduce court results to the match aggregate.
///
/// Courts missing a seat are ignored entirely. The result stays `Pending`
/// while any complete court lacks a decided outcome.
pub fn aggregate(courts: &[CourtResult]) -> MatchAggregate {
    let complete = courts.iter().filter(|c| c.complete).count();
    let contributing: Vec<&CourtResult> = courts.iter().filter(|c| c.contributes()).collect();

    let courts_won = contributing
        .iter()
        .filter(|c| c.outcome.winner == Some(Side::Home))
        .count() as u32;
    let courts_lost = contributing
        .iter()
        .filter(|c| c.outcome.winner == Some(Side::Away))
        .count() as u32;

    let result = if contributing.len() < complete {
        MatchResult::Pending
    } else {
        decide(courts_won, courts_lost)
    };

    MatchAggregate {
        courts_won,
        courts_lost,
        result,
        summary: summary(courts_won, courts_lost),
    }
}

/// Win, loss or tie from court counts.
pub fn decide(courts_won: u32, courts_lost: u32) -> MatchResult {
    match courts_won.cmp(&courts_lost) {
        std::cmp::Ordering::Greater => MatchResult::Win,
        std::cmp::Ordering::Less => MatchResult::Loss,
        std::cmp::Ordering::Equal => MatchResult::Tie,
    }
}

/// `"{won}-{lost}"`.
pub fn summary(courts_won: u32, courts_lost: u32) -> String {
    format!("{courts_won}-{courts_lost}")
}
