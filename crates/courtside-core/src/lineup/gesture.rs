// Input gestures for the assignment board.
//
// Two interaction styles are supported: dragging a member onto a seat, and
// selecting a seat first and then picking the member for it. Both reduce to
// the same `BoardCommand::Assign`, so displacement logic lives only in the
// board.

use serde::{Deserialize, Serialize};

use super::board::BoardCommand;
use crate::model::{CourtNumber, MemberId, Seat};

/// A seat on a specific court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatRef {
    pub court: CourtNumber,
    pub seat: Seat,
}

impl SeatRef {
    pub fn new(court: CourtNumber, seat: Seat) -> Self {
        SeatRef { court, seat }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    /// A member (from the pool or another seat) was dropped on a seat.
    Drop { member: MemberId, target: SeatRef },
    /// A seat was selected as the target of the next pick.
    SelectSeat(SeatRef),
    /// A member was picked while a seat may be selected.
    PickMember(MemberId),
    /// A member was dragged out of a seat and released over the pool.
    DropOnPool(SeatRef),
    /// Escape key or a click outside the board.
    Cancel,
}

/// Tracks a pending seat selection between gestures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatPicker {
    pending: Option<SeatRef>,
}

impl SeatPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The seat waiting for a member pick, if any.
    pub fn pending(&self) -> Option<SeatRef> {
        self.pending
    }

    /// Feed one gesture. Returns the board command it completes, if any.
    pub fn handle(&mut self, gesture: Gesture) -> Option<BoardCommand> {
        match gesture {
            Gesture::Drop { member, target } => {
                self.pending = None;
                Some(BoardCommand::Assign {
                    court: target.court,
                    seat: target.seat,
                    member,
                })
            }
            Gesture::DropOnPool(source) => {
                self.pending = None;
                Some(BoardCommand::Unassign {
                    court: source.court,
                    seat: source.seat,
                })
            }
            Gesture::SelectSeat(target) => {
                self.pending = Some(target);
                None
            }
            Gesture::PickMember(member) => {
                let target = self.pending.take()?;
                Some(BoardCommand::Assign {
                    court: target.court,
                    seat: target.seat,
                    member,
                })
            }
            Gesture::Cancel => {
                self.pending = None;
                None
            }
        }
    }
}
