// Plain-text rendering of a lineup session for the terminal.

use std::fmt::Write;

use courtside_core::lineup::scores::SetStatus;
use courtside_core::lineup::session::LineupSession;
use courtside_core::model::{MemberId, Seat, Side};

pub fn render(session: &LineupSession) -> String {
    let mut out = String::new();
    let info = session.match_info();
    let board = session.board();
    let scores = session.scores();

    let _ = writeln!(
        out,
        "Match {} (team {}, {} format)",
        info.id, info.team_id, info.format
    );
    if let Some(cap) = board.rating_cap() {
        let _ = writeln!(out, "Rating cap per court: {cap:.1}");
    }

    let name = |id: Option<MemberId>| match id {
        Some(id) => match board.index().member(id) {
            Some(m) => format!("{} ({:.1})", m.display_name, m.rating),
            None => format!("#{id}"),
        },
        None => "-".to_string(),
    };

    for result in session.court_results() {
        let court = result.court;
        let Some(slot) = board.slot(court) else {
            continue;
        };
        let _ = write!(
            out,
            "Court {court}: {} / {}",
            name(slot.occupant(Seat::A)),
            name(slot.occupant(Seat::B))
        );
        if board.is_over_rating_limit(court) {
            let _ = write!(out, "  [over cap: {:.1}]", board.combined_rating(court));
        }
        let _ = writeln!(out);

        let sets: Vec<String> = scores
            .sets(court)
            .iter()
            .map(|(&n, entry)| {
                let shown = match entry.recorded() {
                    Some((h, a)) if entry.tiebreak => format!("{h}-{a} tb"),
                    Some((h, a)) => format!("{h}-{a}"),
                    None => "partial".to_string(),
                };
                match scores.set_status(court, n) {
                    SetStatus::Invalid => format!("{shown} (invalid)"),
                    SetStatus::InProgress => format!("{shown} (in progress)"),
                    _ => shown,
                }
            })
            .collect();
        if !sets.is_empty() {
            let verdict = match result.outcome.winner {
                Some(Side::Home) => "won",
                Some(Side::Away) => "lost",
                None => "undecided",
            };
            let _ = writeln!(out, "    sets: {}  => {verdict}", sets.join(", "));
        }
    }

    let groups = board.pool_by_availability();
    if !groups.is_empty() {
        let _ = writeln!(out, "Unassigned:");
        for (status, members) in groups {
            let names: Vec<&str> = members.iter().map(|m| m.display_name.as_str()).collect();
            let _ = writeln!(out, "    {}: {}", status.label(), names.join(", "));
        }
    }

    let agg = session.aggregate();
    let _ = writeln!(out, "Current result: {} ({})", agg.result, agg.summary);
    match (&info.result, &info.summary) {
        (Some(result), Some(summary)) => {
            let _ = writeln!(out, "Stored result:  {result} ({summary})");
        }
        _ => {
            let _ = writeln!(out, "Stored result:  none");
        }
    }

    out
}
