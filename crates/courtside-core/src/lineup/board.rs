// Court assignment board: partitions roster members between the unassigned
// pool and court seats, and flags courts over the rating cap.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::availability::AvailabilityIndex;
use crate::model::{Availability, CourtNumber, LineupId, MemberId, RosterMember, Seat};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("unknown roster member {0}")]
    UnknownMember(MemberId),

    #[error("court {court} is not on this board (courts 1..={courts})")]
    UnknownCourt { court: CourtNumber, courts: CourtNumber },
}

/// A board mutation. Every input gesture ends up as one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardCommand {
    Assign {
        court: CourtNumber,
        seat: Seat,
        member: MemberId,
    },
    Unassign {
        court: CourtNumber,
        seat: Seat,
    },
}

/// One numbered court with two seats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtSlot {
    pub court: CourtNumber,
    /// Persisted lineup id, once this court has been saved.
    pub lineup_id: Option<LineupId>,
    seat_a: Option<MemberId>,
    seat_b: Option<MemberId>,
}

impl CourtSlot {
    fn new(court: CourtNumber) -> Self {
        CourtSlot {
            court,
            lineup_id: None,
            seat_a: None,
            seat_b: None,
        }
    }

    pub fn occupant(&self, seat: Seat) -> Option<MemberId> {
        match seat {
            Seat::A => self.seat_a,
            Seat::B => self.seat_b,
        }
    }

    fn set_occupant(&mut self, seat: Seat, member: Option<MemberId>) {
        match seat {
            Seat::A => self.seat_a = member,
            Seat::B => self.seat_b = member,
        }
    }

    /// Both seats filled.
    pub fn is_complete(&self) -> bool {
        self.seat_a.is_some() && self.seat_b.is_some()
    }

    /// Neither seat filled.
    pub fn is_empty(&self) -> bool {
        self.seat_a.is_none() && self.seat_b.is_none()
    }

    pub fn occupants(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.seat_a.iter().chain(self.seat_b.iter()).copied()
    }
}

/// The full assignment state for one match.
///
/// Invariants: every roster member is either in the pool exactly once or in
/// exactly one seat, never both. The pool is kept in roster order.
#[derive(Debug, Clone)]
pub struct CourtBoard {
    index: AvailabilityIndex,
    slots: Vec<CourtSlot>,
    pool: Vec<MemberId>,
    rating_cap: Option<f64>,
}

impl CourtBoard {
    /// Create a board with `courts` empty courts numbered from 1 and the
    /// whole roster in the pool.
    pub fn new(index: AvailabilityIndex, courts: CourtNumber, rating_cap: Option<f64>) -> Self {
        let slots = (1..=courts).map(CourtSlot::new).collect();
        let pool = index.members().iter().map(|m| m.id).collect();
        CourtBoard {
            index,
            slots,
            pool,
            rating_cap,
        }
    }

    /// Apply a command produced by any input gesture.
    pub fn apply(&mut self, command: BoardCommand) -> Result<Option<MemberId>, BoardError> {
        match command {
            BoardCommand::Assign {
                court,
                seat,
                member,
            } => self.assign(court, seat, member),
            BoardCommand::Unassign { court, seat } => self.unassign(court, seat),
        }
    }

    /// Seat `member` at (`court`, `seat`).
    ///
    /// The seat's previous occupant, if any, returns to the pool and is
    /// returned. The member is taken from wherever it currently is (pool or
    /// another seat). Assigning a member to the seat it already holds changes
    /// nothing. On error the board is unchanged.
    pub fn assign(
        &mut self,
        court: CourtNumber,
        seat: Seat,
        member: MemberId,
    ) -> Result<Option<MemberId>, BoardError> {
        let target = self.slot_index(court)?;
        if !self.index.contains(member) {
            return Err(BoardError::UnknownMember(member));
        }

        if self.slots[target].occupant(seat) == Some(member) {
            return Ok(None);
        }

        // Detach the member from its current place first.
        if let Some((from_court, from_seat)) = self.seat_of(member) {
            let from = self.slot_index(from_court)?;
            self.slots[from].set_occupant(from_seat, None);
        } else {
            self.pool.retain(|&id| id != member);
        }

        let displaced = self.slots[target].occupant(seat);
        self.slots[target].set_occupant(seat, Some(member));
        if let Some(previous) = displaced {
            self.return_to_pool(previous);
        }
        Ok(displaced)
    }

    /// Empty (`court`, `seat`), returning its occupant to the pool.
    pub fn unassign(
        &mut self,
        court: CourtNumber,
        seat: Seat,
    ) -> Result<Option<MemberId>, BoardError> {
        let target = self.slot_index(court)?;
        let previous = self.slots[target].occupant(seat);
        self.slots[target].set_occupant(seat, None);
        if let Some(member) = previous {
            self.return_to_pool(member);
        }
        Ok(previous)
    }

    /// Empty every seat of `court`.
    pub fn clear_court(&mut self, court: CourtNumber) -> Result<(), BoardError> {
        for seat in Seat::ALL {
            self.unassign(court, seat)?;
        }
        Ok(())
    }

    fn return_to_pool(&mut self, member: MemberId) {
        if self.pool.contains(&member) {
            return;
        }
        let rank = self.index.position(member).unwrap_or(usize::MAX);
        let at = self
            .pool
            .iter()
            .position(|&id| self.index.position(id).unwrap_or(usize::MAX) > rank)
            .unwrap_or(self.pool.len());
        self.pool.insert(at, member);
    }

    fn slot_index(&self, court: CourtNumber) -> Result<usize, BoardError> {
        self.slots
            .iter()
            .position(|s| s.court == court)
            .ok_or(BoardError::UnknownCourt {
                court,
                courts: self.court_count(),
            })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn slot(&self, court: CourtNumber) -> Option<&CourtSlot> {
        self.slots.iter().find(|s| s.court == court)
    }

    pub fn slots(&self) -> &[CourtSlot] {
        &self.slots
    }

    pub fn court_count(&self) -> CourtNumber {
        self.slots.len() as CourtNumber
    }

    /// Unassigned members, in roster order.
    pub fn pool(&self) -> &[MemberId] {
        &self.pool
    }

    /// Unassigned members grouped by availability for display.
    pub fn pool_by_availability(&self) -> Vec<(Availability, Vec<&RosterMember>)> {
        self.index.group(self.pool.iter())
    }

    /// Where `member` currently sits, if seated.
    pub fn seat_of(&self, member: MemberId) -> Option<(CourtNumber, Seat)> {
        self.slots.iter().find_map(|slot| {
            Seat::ALL
                .into_iter()
                .find(|&seat| slot.occupant(seat) == Some(member))
                .map(|seat| (slot.court, seat))
        })
    }

    pub fn index(&self) -> &AvailabilityIndex {
        &self.index
    }

    pub fn rating_cap(&self) -> Option<f64> {
        self.rating_cap
    }

    /// Sum of the seated members' ratings (0 for an empty or unknown court).
    pub fn combined_rating(&self, court: CourtNumber) -> f64 {
        self.slot(court)
            .map(|slot| {
                slot.occupants()
                    .filter_map(|id| self.index.member(id))
                    .map(|m| m.rating)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Whether the court's combined rating exceeds the cap. Advisory only.
    pub fn is_over_rating_limit(&self, court: CourtNumber) -> bool {
        match self.rating_cap {
            Some(cap) => self.combined_rating(court) > cap,
            None => false,
        }
    }

    /// Courts currently over the rating cap.
    pub fn courts_over_limit(&self) -> Vec<CourtNumber> {
        self.slots
            .iter()
            .map(|s| s.court)
            .filter(|&court| self.is_over_rating_limit(court))
            .collect()
    }

    /// Record the persisted lineup id of a court.
    pub(crate) fn attach_lineup(&mut self, court: CourtNumber, lineup_id: LineupId) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.court == court) {
            slot.lineup_id = Some(lineup_id);
        }
    }
}
