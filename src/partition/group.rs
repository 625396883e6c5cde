//! Groups and the partition arena.

use super::view::MemberView;
use crate::roster::{Record, RecordId, Roster};
use crate::rule::{Rule, RuleId};

/// Index of a group inside its partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupId(pub usize);

impl GroupId {
    /// Position in the partition's group table.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A mutable bucket of records plus the rules bound to it.
#[derive(Debug, Clone)]
pub struct Group {
    label: usize,
    members: Vec<RecordId>,
    rules: Vec<RuleId>,
}

impl Group {
    pub(crate) fn new(label: usize, members: Vec<RecordId>) -> Self {
        Self {
            label,
            members,
            rules: Vec::new(),
        }
    }

    /// Group number shown to users.
    pub fn label(&self) -> usize {
        self.label
    }

    /// Member ids in slot order.
    pub fn members(&self) -> &[RecordId] {
        &self.members
    }

    /// Rules currently bound to this group.
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.members.contains(&id)
    }

    fn bind(&mut self, rule: RuleId) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    fn replace(&mut self, out: RecordId, incoming: RecordId) -> bool {
        match self.members.iter().position(|&m| m == out) {
            Some(slot) => {
                self.members[slot] = incoming;
                true
            }
            None => false,
        }
    }
}

/// Records and groups held in index-addressed tables.
///
/// Every record of the roster belongs to exactly one group; records refer
/// to their group by [`GroupId`] and groups to their members by
/// [`RecordId`].
#[derive(Debug, Clone)]
pub struct Partition {
    roster: Roster,
    groups: Vec<Group>,
}

impl Partition {
    /// Assembles a partition from explicit memberships.
    ///
    /// `groups` must cover every record of `roster` exactly once; the group
    /// back-references of the records are rewritten to match.
    pub fn from_groups(mut roster: Roster, groups: Vec<Group>) -> Self {
        for id in roster.ids().collect::<Vec<_>>() {
            roster.record_mut(id).set_group(None);
        }
        for (g, group) in groups.iter().enumerate() {
            for &m in &group.members {
                roster.record_mut(m).set_group(Some(GroupId(g)));
            }
        }
        Self { roster, groups }
    }

    /// The underlying roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Looks up a record.
    pub fn record(&self, id: RecordId) -> &Record {
        self.roster.record(id)
    }

    /// All groups in creation order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Looks up a group.
    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id.index()]
    }

    /// Ids of every group.
    pub fn group_ids(&self) -> Vec<GroupId> {
        (0..self.groups.len()).map(GroupId).collect()
    }

    /// Group currently holding `id`.
    pub fn group_of(&self, id: RecordId) -> Option<GroupId> {
        self.roster.record(id).group()
    }

    /// Multiset view over a group's current members.
    pub fn view(&self, group: GroupId) -> MemberView<'_> {
        MemberView::of_ids(&self.roster, self.group(group).members.iter().copied())
    }

    /// Binds `rule` to `group` (no-op if already bound).
    pub fn bind(&mut self, group: GroupId, rule: RuleId) {
        self.groups[group.index()].bind(rule);
    }

    /// Binds `rule` to every group.
    pub fn bind_all(&mut self, rule: RuleId) {
        for group in &mut self.groups {
            group.bind(rule);
        }
    }

    /// Whether `group` satisfies every rule bound to it.
    pub fn satisfied(&self, group: GroupId, rules: &[Rule]) -> bool {
        let view = self.view(group);
        self.group(group)
            .rules
            .iter()
            .all(|r| rules[r.index()].check(&view))
    }

    /// Exchanges two records between their groups.
    ///
    /// Both memberships and both back-references change together. Returns
    /// `false` and leaves everything untouched if the records are the same,
    /// share a group, or are unassigned. Swapping the same pair twice
    /// restores the previous groups slot for slot.
    pub fn swap(&mut self, a: RecordId, b: RecordId) -> bool {
        let (Some(ga), Some(gb)) = (self.group_of(a), self.group_of(b)) else {
            return false;
        };
        if a == b || ga == gb {
            return false;
        }
        if !self.groups[ga.index()].contains(a) || !self.groups[gb.index()].contains(b) {
            return false;
        }
        self.groups[ga.index()].replace(a, b);
        self.groups[gb.index()].replace(b, a);
        self.roster.record_mut(a).set_group(Some(gb));
        self.roster.record_mut(b).set_group(Some(ga));
        true
    }

    /// Consumes the partition, returning the roster and groups.
    pub fn into_parts(self) -> (Roster, Vec<Group>) {
        (self.roster, self.groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::GroupSizer;
    use proptest::prelude::*;

    fn partition(n: usize, size: usize) -> Partition {
        let records = (0..n)
            .map(|i| Record::from_pairs([("id", i.to_string())]))
            .collect();
        let roster =
            Roster::new("id", records, &GroupSizer::with_size(size, None).unwrap()).unwrap();
        let ids: Vec<RecordId> = roster.ids().collect();
        let groups = ids
            .chunks(roster.group_size())
            .enumerate()
            .map(|(i, c)| Group::new(i + 1, c.to_vec()))
            .collect();
        Partition::from_groups(roster, groups)
    }

    #[test]
    fn test_back_references_follow_membership() {
        let p = partition(6, 3);
        assert_eq!(p.group_of(RecordId(0)), Some(GroupId(0)));
        assert_eq!(p.group_of(RecordId(4)), Some(GroupId(1)));
        assert_eq!(p.group(GroupId(1)).label(), 2);
    }

    #[test]
    fn test_swap_moves_both_records() {
        let mut p = partition(6, 3);
        assert!(p.swap(RecordId(1), RecordId(4)));
        assert_eq!(p.group(GroupId(0)).members(), &[RecordId(0), RecordId(4), RecordId(2)]);
        assert_eq!(p.group(GroupId(1)).members(), &[RecordId(3), RecordId(1), RecordId(5)]);
        assert_eq!(p.group_of(RecordId(1)), Some(GroupId(1)));
        assert_eq!(p.group_of(RecordId(4)), Some(GroupId(0)));
    }

    #[test]
    fn test_swap_rejects_same_group_and_self() {
        let mut p = partition(6, 3);
        assert!(!p.swap(RecordId(0), RecordId(0)));
        assert!(!p.swap(RecordId(0), RecordId(2)));
        assert_eq!(p.group(GroupId(0)).members(), &[RecordId(0), RecordId(1), RecordId(2)]);
    }

    #[test]
    fn test_bind_is_idempotent() {
        let mut p = partition(6, 3);
        p.bind_all(RuleId(0));
        p.bind(GroupId(0), RuleId(0));
        p.bind(GroupId(0), RuleId(1));
        assert_eq!(p.group(GroupId(0)).rules(), &[RuleId(0), RuleId(1)]);
        assert_eq!(p.group(GroupId(1)).rules(), &[RuleId(0)]);
    }

    proptest! {
        #[test]
        fn prop_swap_is_an_involution(a in 0usize..12, b in 0usize..12) {
            let mut p = partition(12, 4);
            let before: Vec<Vec<RecordId>> =
                p.groups().iter().map(|g| g.members().to_vec()).collect();
            let moved = p.swap(RecordId(a), RecordId(b));
            if moved {
                prop_assert!(p.swap(RecordId(a), RecordId(b)));
            }
            let after: Vec<Vec<RecordId>> =
                p.groups().iter().map(|g| g.members().to_vec()).collect();
            prop_assert_eq!(before, after);
            for id in 0..12 {
                let g = p.group_of(RecordId(id)).unwrap();
                prop_assert!(p.group(g).contains(RecordId(id)));
            }
        }
    }
}
