// Set score recording: per-court set entries, set completion rules, and the
// court outcome derived from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CourtNumber, LeagueFormat, Side};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Highest game count a tennis set can show (7-5, 7-6).
pub const MAX_SET_GAMES: u8 = 7;

/// Highest total-games count accepted for a CUP court.
pub const MAX_TOTAL_GAMES: u8 = 99;

/// Games needed to take a tennis set outright.
const GAMES_TO_WIN_SET: u8 = 6;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("court {court} is not on this score sheet (courts 1..={courts})")]
    UnknownCourt { court: CourtNumber, courts: CourtNumber },

    #[error("set {set_number} is out of range for {format} (1..={max})")]
    SetOutOfRange {
        set_number: u8,
        format: LeagueFormat,
        max: u8,
    },
}

// ---------------------------------------------------------------------------
// Set entry and rules
// ---------------------------------------------------------------------------

/// What was typed in for one set. Either count may still be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetEntry {
    pub games_home: Option<u8>,
    pub games_away: Option<u8>,
    pub tiebreak: bool,
}

impl SetEntry {
    pub fn new(games_home: Option<u8>, games_away: Option<u8>, tiebreak: bool) -> Self {
        SetEntry {
            games_home,
            games_away,
            tiebreak,
        }
    }

    /// A fully entered set.
    pub fn games(games_home: u8, games_away: u8) -> Self {
        Self::new(Some(games_home), Some(games_away), false)
    }

    /// Both counts, if both were entered.
    pub fn recorded(&self) -> Option<(u8, u8)> {
        Some((self.games_home?, self.games_away?))
    }

    pub fn is_blank(&self) -> bool {
        self.games_home.is_none() && self.games_away.is_none() && !self.tiebreak
    }
}

/// How a recorded tennis set is judged complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetRule {
    /// Standard tennis sets: 6 games by two, 7-5, 7-6, or a 1-0 match
    /// tiebreak in the third set.
    #[default]
    Tennis,
    /// Any unequal recorded set goes to the side with more games.
    MostGames,
}

/// Judgement of a single set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetStatus {
    NotRecorded,
    InProgress,
    Invalid,
    Decided(Side),
}

impl SetStatus {
    pub fn winner(&self) -> Option<Side> {
        match self {
            SetStatus::Decided(side) => Some(*side),
            _ => None,
        }
    }
}

/// The side with strictly more games, `None` when level.
pub fn set_winner(games_home: u8, games_away: u8) -> Option<Side> {
    match games_home.cmp(&games_away) {
        std::cmp::Ordering::Greater => Some(Side::Home),
        std::cmp::Ordering::Less => Some(Side::Away),
        std::cmp::Ordering::Equal => None,
    }
}

/// Judge one set of a court under the league format and set rule.
///
/// CUP courts always use most-games on their single total-games set; the
/// tiebreak flag does not apply there.
pub fn set_status(format: LeagueFormat, rule: SetRule, set_number: u8, entry: &SetEntry) -> SetStatus {
    let Some((home, away)) = entry.recorded() else {
        return SetStatus::NotRecorded;
    };

    if format.is_total_games() || rule == SetRule::MostGames {
        return match set_winner(home, away) {
            Some(side) => SetStatus::Decided(side),
            None => SetStatus::InProgress,
        };
    }

    tennis_set_status(format, set_number, home, away, entry.tiebreak)
}

fn tennis_set_status(
    format: LeagueFormat,
    set_number: u8,
    home: u8,
    away: u8,
    tiebreak: bool,
) -> SetStatus {
    let Some(leader) = set_winner(home, away) else {
        return SetStatus::InProgress;
    };
    let (high, low) = (home.max(away), home.min(away));

    // Match tiebreak played in lieu of the deciding set, entered as 1-0.
    if tiebreak && set_number == format.max_sets() && (high, low) == (1, 0) {
        return SetStatus::Decided(leader);
    }

    if high > MAX_SET_GAMES {
        return SetStatus::Invalid;
    }

    match (high, low) {
        (GAMES_TO_WIN_SET, 0..=4) | (MAX_SET_GAMES, 5) if !tiebreak => SetStatus::Decided(leader),
        (MAX_SET_GAMES, 6) => SetStatus::Decided(leader),
        (MAX_SET_GAMES, _) => SetStatus::Invalid,
        _ if tiebreak => SetStatus::Invalid,
        _ => SetStatus::InProgress,
    }
}

/// Lenient parse of a typed game count. Anything that is not a whole number
/// within the format's range is treated as not entered.
pub fn parse_games(input: &str, format: LeagueFormat) -> Option<u8> {
    let value: u8 = input.trim().parse().ok()?;
    let cap = if format.is_total_games() {
        MAX_TOTAL_GAMES
    } else {
        MAX_SET_GAMES
    };
    (value <= cap).then_some(value)
}

// ---------------------------------------------------------------------------
// Court outcome
// ---------------------------------------------------------------------------

/// Derived result of one court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CourtOutcome {
    pub sets_won_home: u8,
    pub sets_won_away: u8,
    /// `None` while no side leads on decided sets.
    pub winner: Option<Side>,
}

impl CourtOutcome {
    /// The home side took the court.
    pub fn won(&self) -> bool {
        self.winner == Some(Side::Home)
    }

    pub fn decided_sets(&self) -> u8 {
        self.sets_won_home + self.sets_won_away
    }
}

/// Derive a court outcome from its set entries, keyed by set number.
pub fn court_outcome(
    format: LeagueFormat,
    rule: SetRule,
    sets: &BTreeMap<u8, SetEntry>,
) -> CourtOutcome {
    let mut outcome = CourtOutcome::default();
    for (&set_number, entry) in sets {
        match set_status(format, rule, set_number, entry).winner() {
            Some(Side::Home) => outcome.sets_won_home += 1,
            Some(Side::Away) => outcome.sets_won_away += 1,
            None => {}
        }
    }
    outcome.winner = set_winner(outcome.sets_won_home, outcome.sets_won_away);
    outcome
}

// ---------------------------------------------------------------------------
// ScoreSheet
// ---------------------------------------------------------------------------

/// In-memory set entries for every court of a match.
#[derive(Debug, Clone)]
pub struct ScoreSheet {
    format: LeagueFormat,
    rule: SetRule,
    courts: CourtNumber,
    entries: BTreeMap<CourtNumber, BTreeMap<u8, SetEntry>>,
}

impl ScoreSheet {
    pub fn new(format: LeagueFormat, rule: SetRule, courts: CourtNumber) -> Self {
        ScoreSheet {
            format,
            rule,
            courts,
            entries: BTreeMap::new(),
        }
    }

    pub fn format(&self) -> LeagueFormat {
        self.format
    }

    pub fn rule(&self) -> SetRule {
        self.rule
    }

    fn check(&self, court: CourtNumber, set_number: u8) -> Result<(), ScoreError> {
        if court == 0 || court > self.courts {
            return Err(ScoreError::UnknownCourt {
                court,
                courts: self.courts,
            });
        }
        let max = self.format.max_sets();
        if set_number == 0 || set_number > max {
            return Err(ScoreError::SetOutOfRange {
                set_number,
                format: self.format,
                max,
            });
        }
        Ok(())
    }

    /// Store the entry for (`court`, `set_number`), replacing any previous
    /// one. A blank entry removes the set.
    pub fn record_set(
        &mut self,
        court: CourtNumber,
        set_number: u8,
        entry: SetEntry,
    ) -> Result<(), ScoreError> {
        self.check(court, set_number)?;
        if entry.is_blank() {
            if let Some(sets) = self.entries.get_mut(&court) {
                sets.remove(&set_number);
                if sets.is_empty() {
                    self.entries.remove(&court);
                }
            }
        } else {
            self.entries
                .entry(court)
                .or_default()
                .insert(set_number, entry);
        }
        Ok(())
    }

    /// Record a set from raw text fields. Unparseable counts become missing.
    pub fn record_set_input(
        &mut self,
        court: CourtNumber,
        set_number: u8,
        games_home: &str,
        games_away: &str,
        tiebreak: bool,
    ) -> Result<(), ScoreError> {
        let entry = SetEntry::new(
            parse_games(games_home, self.format),
            parse_games(games_away, self.format),
            tiebreak,
        );
        self.record_set(court, set_number, entry)
    }

    /// Drop every set of `court`.
    pub fn clear_court(&mut self, court: CourtNumber) {
        self.entries.remove(&court);
    }

    pub fn entry(&self, court: CourtNumber, set_number: u8) -> Option<&SetEntry> {
        self.entries.get(&court)?.get(&set_number)
    }

    /// Set entries of one court keyed by set number (empty if none).
    pub fn sets(&self, court: CourtNumber) -> BTreeMap<u8, SetEntry> {
        self.entries.get(&court).cloned().unwrap_or_default()
    }

    /// Fully entered sets of one court as `(set_number, home, away, tiebreak)`.
    pub fn recorded_sets(&self, court: CourtNumber) -> Vec<(u8, u8, u8, bool)> {
        self.entries
            .get(&court)
            .map(|sets| {
                sets.iter()
                    .filter_map(|(&n, e)| e.recorded().map(|(h, a)| (n, h, a, e.tiebreak)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The court has at least one fully entered set.
    pub fn is_scored(&self, court: CourtNumber) -> bool {
        !self.recorded_sets(court).is_empty()
    }

    pub fn set_status(&self, court: CourtNumber, set_number: u8) -> SetStatus {
        match self.entry(court, set_number) {
            Some(entry) => set_status(self.format, self.rule, set_number, entry),
            None => SetStatus::NotRecorded,
        }
    }

    pub fn outcome(&self, court: CourtNumber) -> CourtOutcome {
        match self.entries.get(&court) {
            Some(sets) => court_outcome(self.format, self.rule, sets),
            None => CourtOutcome::default(),
        }
    }
}
