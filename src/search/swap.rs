//! Guarded swaps between groups.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::trace;

use crate::partition::{GroupId, MemberView, Partition};
use crate::roster::{Record, RecordId};
use crate::rule::{Permission, Rule};

/// Verdict of every rule bound to either group on exchanging `a` and `b`.
///
/// `Rejected` if the records are the same, share a group, or any bound rule
/// rejects the change; `Tolerated` if some rule only tolerates it.
pub fn swap_permission(partition: &Partition, rules: &[Rule], a: RecordId, b: RecordId) -> Permission {
    let (Some(ga), Some(gb)) = (partition.group_of(a), partition.group_of(b)) else {
        return Permission::Rejected;
    };
    if a == b || ga == gb {
        return Permission::Rejected;
    }

    let mut verdict = Permission::Allowed;
    for (group, out, incoming) in [(ga, a, b), (gb, b, a)] {
        let bound = partition.group(group).rules();
        if bound.is_empty() {
            continue;
        }
        let old = partition.view(group);
        let new = MemberView::exchanged(
            partition.roster(),
            partition.group(group).members(),
            out,
            incoming,
        );
        for rule in bound {
            match rules[rule.index()].permissible(&old, &new) {
                Permission::Rejected => return Permission::Rejected,
                Permission::Tolerated => verdict = Permission::Tolerated,
                Permission::Allowed => {}
            }
        }
    }
    verdict
}

/// Mutable search state shared by the repair routines of every rule.
pub struct SwapContext<'a, R: Rng> {
    partition: &'a mut Partition,
    rules: &'a [Rule],
    rng: &'a mut R,
    swaps: usize,
}

impl<'a, R: Rng> SwapContext<'a, R> {
    pub fn new(partition: &'a mut Partition, rules: &'a [Rule], rng: &'a mut R) -> Self {
        Self {
            partition,
            rules,
            rng,
            swaps: 0,
        }
    }

    pub fn partition(&self) -> &Partition {
        &*self.partition
    }

    pub(crate) fn partition_mut(&mut self) -> &mut Partition {
        &mut *self.partition
    }

    pub fn rules(&self) -> &[Rule] {
        self.rules
    }

    pub fn rng(&mut self) -> &mut R {
        &mut *self.rng
    }

    /// Swaps performed through this context.
    pub fn swaps(&self) -> usize {
        self.swaps
    }

    /// Whether exchanging `a` and `b` keeps every bound rule acceptable.
    pub fn valid_swap(&self, a: RecordId, b: RecordId) -> bool {
        !swap_permission(&*self.partition, self.rules, a, b).is_rejected()
    }

    /// Finds a partner for `record` among the members of `candidates`.
    ///
    /// Groups and then members are tried in random order; the first member
    /// matching `accept` that forms a valid swap wins.
    pub fn find_swap_target(
        &mut self,
        record: RecordId,
        candidates: &[GroupId],
        accept: impl Fn(&Record) -> bool,
    ) -> Option<RecordId> {
        let mut groups = candidates.to_vec();
        groups.shuffle(&mut *self.rng);
        for group in groups {
            let mut members = self.partition.group(group).members().to_vec();
            members.shuffle(&mut *self.rng);
            let found = members
                .into_iter()
                .find(|&m| accept(self.partition.record(m)) && self.valid_swap(record, m));
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Finds a partner for `record` and swaps with it.
    pub fn find_target_and_swap(
        &mut self,
        record: RecordId,
        candidates: &[GroupId],
        accept: impl Fn(&Record) -> bool,
    ) -> bool {
        match self.find_swap_target(record, candidates, accept) {
            Some(partner) => self.swap(record, partner),
            None => false,
        }
    }

    /// One random swap that every bound rule permits.
    pub fn random_swap(&mut self) -> bool {
        let ids: Vec<RecordId> = self.partition.roster().ids().collect();
        let Some(&record) = ids.choose(&mut *self.rng) else {
            return false;
        };
        let groups = self.partition.group_ids();
        self.find_target_and_swap(record, &groups, |_| true)
    }

    fn swap(&mut self, a: RecordId, b: RecordId) -> bool {
        let (from, to) = (self.partition.group_of(a), self.partition.group_of(b));
        if !self.partition.swap(a, b) {
            return false;
        }
        self.swaps += 1;
        trace!(a = a.index(), b = b.index(), ?from, ?to, "swap");
        true
    }
}
