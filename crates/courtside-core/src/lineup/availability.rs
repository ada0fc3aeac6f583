// Roster availability index: joins roster members to their availability for
// a single match. Read-only once built.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{Availability, MemberId, RosterMember};

/// Roster members in roster order, with each member's answer for the match.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    members: Vec<RosterMember>,
    positions: HashMap<MemberId, usize>,
    statuses: HashMap<MemberId, Availability>,
}

impl AvailabilityIndex {
    /// Build the index from the team roster and the match's availability rows.
    ///
    /// Roster order is preserved. Duplicate member ids keep their first
    /// occurrence. Availability rows for members not on the roster are
    /// dropped.
    pub fn new(
        roster: Vec<RosterMember>,
        statuses: impl IntoIterator<Item = (MemberId, Availability)>,
    ) -> Self {
        let mut members = Vec::with_capacity(roster.len());
        let mut positions = HashMap::with_capacity(roster.len());
        for member in roster {
            if positions.contains_key(&member.id) {
                debug!("Duplicate roster entry for member {} ignored", member.id);
                continue;
            }
            positions.insert(member.id, members.len());
            members.push(member);
        }

        let statuses = statuses
            .into_iter()
            .filter(|(id, _)| {
                let known = positions.contains_key(id);
                if !known {
                    debug!("Availability for non-roster member {} ignored", id);
                }
                known
            })
            .collect();

        AvailabilityIndex {
            members,
            positions,
            statuses,
        }
    }

    pub fn member(&self, id: MemberId) -> Option<&RosterMember> {
        self.positions.get(&id).map(|&i| &self.members[i])
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.positions.contains_key(&id)
    }

    /// The member's answer, `NoResponse` if none was recorded.
    pub fn status(&self, id: MemberId) -> Availability {
        self.statuses
            .get(&id)
            .copied()
            .unwrap_or(Availability::NoResponse)
    }

    /// Index of the member in roster order.
    pub fn position(&self, id: MemberId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn members(&self) -> &[RosterMember] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of roster members with the given status.
    pub fn count(&self, status: Availability) -> usize {
        self.members
            .iter()
            .filter(|m| self.status(m.id) == status)
            .count()
    }

    /// Group the given members by availability, in
    /// [`Availability::DISPLAY_ORDER`]. Empty groups are omitted; unknown ids
    /// are skipped. Members keep their relative order within a group.
    pub fn group<'a>(
        &'a self,
        ids: impl IntoIterator<Item = &'a MemberId>,
    ) -> Vec<(Availability, Vec<&'a RosterMember>)> {
        let mut buckets: HashMap<Availability, Vec<&RosterMember>> = HashMap::new();
        for &id in ids {
            if let Some(member) = self.member(id) {
                buckets.entry(self.status(id)).or_default().push(member);
            }
        }

        Availability::DISPLAY_ORDER
            .iter()
            .filter_map(|status| buckets.remove(status).map(|members| (*status, members)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: MemberId, name: &str, rating: f64) -> RosterMember {
        RosterMember {
            id,
            display_name: name.to_string(),
            rating,
        }
    }

    fn sample_index() -> AvailabilityIndex {
        AvailabilityIndex::new(
            vec![
                member(1, "Avery", 4.0),
                member(2, "Blake", 3.5),
                member(3, "Casey", 4.5),
                member(4, "Devon", 3.0),
            ],
            vec![
                (1, Availability::Available),
                (2, Availability::Unavailable),
                (3, Availability::Late),
                (99, Availability::Available),
            ],
        )
    }

    #[test]
    fn lookup_by_id() {
        let index = sample_index();
        assert_eq!(index.len(), 4);
        assert_eq!(index.member(3).unwrap().display_name, "Casey");
        assert!(index.member(99).is_none());
        assert!(!index.contains(99));
        assert_eq!(index.position(4), Some(3));
    }

    #[test]
    fn missing_status_is_no_response() {
        let index = sample_index();
        assert_eq!(index.status(4), Availability::NoResponse);
        assert_eq!(index.status(1), Availability::Available);
    }

    #[test]
    fn statuses_for_unknown_members_are_dropped() {
        let index = sample_index();
        assert_eq!(index.count(Availability::Available), 1);
    }

    #[test]
    fn duplicate_roster_entries_keep_first() {
        let index = AvailabilityIndex::new(
            vec![member(1, "Avery", 4.0), member(1, "Avery again", 2.0)],
            Vec::new(),
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.member(1).unwrap().display_name, "Avery");
    }

    #[test]
    fn group_follows_display_order_and_skips_empty_groups() {
        let index = sample_index();
        let ids = [4, 3, 2, 1];
        let groups = index.group(ids.iter());

        let statuses: Vec<Availability> = groups.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            statuses,
            vec![
                Availability::Available,
                Availability::Late,
                Availability::NoResponse,
                Availability::Unavailable,
            ]
        );
        assert_eq!(groups[0].1[0].display_name, "Avery");
        assert_eq!(groups[2].1[0].display_name, "Devon");
    }
}
