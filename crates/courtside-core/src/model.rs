// Shared domain types: identifiers, league formats, sides, seats, and the
// records exchanged with the persistence layer.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type MemberId = i64;
pub type TeamId = i64;
pub type MatchId = i64;
pub type LineupId = i64;

/// Court numbers start at 1.
pub type CourtNumber = u8;

// ---------------------------------------------------------------------------
// League format
// ---------------------------------------------------------------------------

/// How a court is scored.
///
/// `Cup` plays a single total-games contest per court. `Usta` and `Flex`
/// play up to three tennis sets per court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeagueFormat {
    Cup,
    Usta,
    Flex,
}

impl LeagueFormat {
    /// Parse a format tag (`CUP`, `USTA`, `FLEX`, case-insensitive).
    pub fn from_str_format(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CUP" => Some(LeagueFormat::Cup),
            "USTA" => Some(LeagueFormat::Usta),
            "FLEX" => Some(LeagueFormat::Flex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeagueFormat::Cup => "CUP",
            LeagueFormat::Usta => "USTA",
            LeagueFormat::Flex => "FLEX",
        }
    }

    /// Highest set number a court may record in this format.
    pub fn max_sets(&self) -> u8 {
        match self {
            LeagueFormat::Cup => 1,
            LeagueFormat::Usta | LeagueFormat::Flex => 3,
        }
    }

    /// Whether the single "set" of a court holds total games rather than a
    /// tennis set.
    pub fn is_total_games(&self) -> bool {
        matches!(self, LeagueFormat::Cup)
    }
}

impl fmt::Display for LeagueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sides and seats
// ---------------------------------------------------------------------------

/// Which team a game count, set or court belongs to. `Home` is always the
/// team whose lineup is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// One of the two player seats on a court.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    pub const ALL: [Seat; 2] = [Seat::A, Seat::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Seat::A => "A",
            Seat::B => "B",
        }
    }
}

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

/// The match-level outcome written onto a match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Win,
    Loss,
    Tie,
    /// Some court with both seats filled has no decided outcome yet.
    Pending,
}

impl MatchResult {
    pub fn from_str_result(s: &str) -> Option<Self> {
        match s {
            "win" => Some(MatchResult::Win),
            "loss" => Some(MatchResult::Loss),
            "tie" => Some(MatchResult::Tie),
            "pending" => Some(MatchResult::Pending),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchResult::Win => "win",
            MatchResult::Loss => "loss",
            MatchResult::Tie => "tie",
            MatchResult::Pending => "pending",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// A roster member's answer for one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Maybe,
    Late,
    Unavailable,
    /// The member has not answered. Never stored; a missing row means this.
    NoResponse,
}

impl Availability {
    /// Display order for grouping the unassigned pool: the most useful
    /// candidates first.
    pub const DISPLAY_ORDER: [Availability; 5] = [
        Availability::Available,
        Availability::Late,
        Availability::Maybe,
        Availability::NoResponse,
        Availability::Unavailable,
    ];

    pub fn from_str_status(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "available" => Some(Availability::Available),
            "maybe" => Some(Availability::Maybe),
            "late" => Some(Availability::Late),
            "unavailable" => Some(Availability::Unavailable),
            "no_response" | "" => Some(Availability::NoResponse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Maybe => "maybe",
            Availability::Late => "late",
            Availability::Unavailable => "unavailable",
            Availability::NoResponse => "no_response",
        }
    }

    /// Human-readable group heading.
    pub fn label(&self) -> &'static str {
        match self {
            Availability::Available => "Available",
            Availability::Maybe => "Maybe",
            Availability::Late => "Running late",
            Availability::Unavailable => "Unavailable",
            Availability::NoResponse => "No response",
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// A roster member as seen by the lineup pipeline (read-only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: MemberId,
    pub display_name: String,
    /// Skill rating, e.g. 3.5 or 4.5.
    pub rating: f64,
}

/// A single match and its stored aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub team_id: TeamId,
    pub format: LeagueFormat,
    /// Maximum combined rating per court, if the league sets one.
    pub rating_cap: Option<f64>,
    /// `None` until the first save that includes a scored court.
    pub result: Option<MatchResult>,
    pub summary: Option<String>,
}

/// A persisted court assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupRecord {
    pub id: LineupId,
    pub match_id: MatchId,
    pub court: CourtNumber,
    pub seat_a: Option<MemberId>,
    pub seat_b: Option<MemberId>,
}

/// A persisted set score for one lineup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetScoreRecord {
    pub lineup_id: LineupId,
    pub set_number: u8,
    pub games_home: u8,
    pub games_away: u8,
    pub tiebreak: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn league_format_parses_case_insensitively() {
        assert_eq!(LeagueFormat::from_str_format("cup"), Some(LeagueFormat::Cup));
        assert_eq!(LeagueFormat::from_str_format(" USTA "), Some(LeagueFormat::Usta));
        assert_eq!(LeagueFormat::from_str_format("Flex"), Some(LeagueFormat::Flex));
        assert_eq!(LeagueFormat::from_str_format("singles"), None);
    }

    #[test]
    fn league_format_set_limits() {
        assert_eq!(LeagueFormat::Cup.max_sets(), 1);
        assert_eq!(LeagueFormat::Usta.max_sets(), 3);
        assert_eq!(LeagueFormat::Flex.max_sets(), 3);
        assert!(LeagueFormat::Cup.is_total_games());
        assert!(!LeagueFormat::Flex.is_total_games());
    }

    #[test]
    fn league_format_deserializes_from_uppercase_tag() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: LeagueFormat,
        }
        let w: Wrapper = toml::from_str("format = \"USTA\"").unwrap();
        assert_eq!(w.format, LeagueFormat::Usta);
    }

    #[test]
    fn match_result_string_round_trip() {
        for result in [
            MatchResult::Win,
            MatchResult::Loss,
            MatchResult::Tie,
            MatchResult::Pending,
        ] {
            assert_eq!(MatchResult::from_str_result(result.as_str()), Some(result));
        }
        assert_eq!(MatchResult::from_str_result("draw"), None);
    }

    #[test]
    fn availability_parsing() {
        assert_eq!(Availability::from_str_status("Late"), Some(Availability::Late));
        assert_eq!(Availability::from_str_status(""), Some(Availability::NoResponse));
        assert_eq!(Availability::from_str_status("perhaps"), None);
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Home.opposite(), Side::Away);
        assert_eq!(Side::Away.opposite(), Side::Home);
    }
}
