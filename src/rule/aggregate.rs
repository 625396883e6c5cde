//! Aggregate: each group holds members of at most one target category.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::selection::Selection;
use super::RuleId;
use crate::partition::{GroupId, MemberView};
use crate::roster::{Record, RecordId};
use crate::search::SwapContext;

/// Gathers same-category members into dedicated groups.
///
/// Records whose value is null or outside the targets never break a group.
#[derive(Debug, Clone)]
pub struct Aggregate {
    selection: Selection,
}

impl Aggregate {
    pub(crate) fn new(selection: Selection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// At most one distinct target category is present.
    pub fn check(&self, view: &MemberView<'_>) -> bool {
        self.selection.counts(view).iter().filter(|&&n| n > 0).count() <= 1
    }

    /// Most frequent category of `view`; ties go to the earlier category.
    pub fn plurality(&self, view: &MemberView<'_>) -> Option<usize> {
        let counts = self.selection.counts(view);
        let mut best: Option<(usize, usize)> = None;
        for (idx, &n) in counts.iter().enumerate() {
            if n > 0 && best.is_none_or(|(_, m)| n > m) {
                best = Some((idx, n));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Greedy pre-pass that claims a group per category.
    ///
    /// Categories are visited in random order. Each claims the unclaimed
    /// group holding most of its members, binds this rule to it and pulls
    /// matching or blank records in from the remaining unclaimed groups.
    /// A category keeps claiming groups while unclaimed members remain.
    /// Returns the number of claimed groups.
    pub(crate) fn prepare<R: Rng>(&self, id: RuleId, ctx: &mut SwapContext<'_, R>) -> usize {
        let sel = &self.selection;
        let mut order: Vec<usize> = (0..sel.len()).collect();
        order.shuffle(ctx.rng());
        let mut pool = ctx.partition().group_ids();
        pool.shuffle(ctx.rng());

        let mut claimed = 0;
        for idx in order {
            loop {
                let counts: Vec<usize> = pool
                    .iter()
                    .map(|&g| sel.count(&ctx.partition().view(g), idx))
                    .collect();
                let Some(best) = first_max(&counts) else { break };
                let group = pool.remove(best);
                ctx.partition_mut().bind(group, id);
                claimed += 1;

                let members = ctx.partition().group(group).members().to_vec();
                for member in members {
                    let stray = sel
                        .category(ctx.partition().record(member))
                        .is_some_and(|c| c != idx);
                    if stray {
                        ctx.find_target_and_swap(member, &pool, |r| {
                            sel.category(r) == Some(idx) || sel.is_blank(r)
                        });
                    }
                }
            }
        }
        debug!(attribute = sel.attribute(), claimed, "aggregate pre-pass");
        claimed
    }

    /// Tries one swap that evicts a minority `member` in exchange for a
    /// plurality or blank record, preferring groups where it would belong.
    pub(crate) fn fix<R: Rng>(
        &self,
        member: RecordId,
        group: GroupId,
        ctx: &mut SwapContext<'_, R>,
    ) -> bool {
        let sel = &self.selection;
        let Some(keep) = self.plurality(&ctx.partition().view(group)) else {
            return false;
        };
        let Some(own) = sel.category(ctx.partition().record(member)) else {
            return false;
        };
        if own == keep {
            return false;
        }

        let (home, rest): (Vec<GroupId>, Vec<GroupId>) = ctx
            .partition()
            .group_ids()
            .into_iter()
            .filter(|&g| g != group)
            .partition(|&g| {
                let p = self.plurality(&ctx.partition().view(g));
                p.is_none() || p == Some(own)
            });
        let fits = |r: &Record| sel.category(r) == Some(keep) || sel.is_blank(r);
        ctx.find_target_and_swap(member, &home, fits) || ctx.find_target_and_swap(member, &rest, fits)
    }
}

/// Index of the first maximal positive count.
fn first_max(counts: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, &n) in counts.iter().enumerate() {
        if n > 0 && best.is_none_or(|(_, m)| n > m) {
            best = Some((i, n));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Group, Partition};
    use crate::random::create_rng;
    use crate::roster::{GroupSizer, Roster};
    use crate::rule::{Rule, RuleSpec};

    fn partition(sections: &[&str], size: usize) -> Partition {
        let records = sections
            .iter()
            .enumerate()
            .map(|(i, s)| Record::from_pairs([("id", format!("s{i}")), ("Section", s.to_string())]))
            .collect();
        let roster = Roster::new("id", records, &GroupSizer::with_size(size, None).unwrap()).unwrap();
        let ids: Vec<RecordId> = roster.ids().collect();
        let groups = ids
            .chunks(size)
            .enumerate()
            .map(|(i, c)| Group::new(i + 1, c.to_vec()))
            .collect();
        Partition::from_groups(roster, groups)
    }

    fn aggregate(p: &Partition) -> Aggregate {
        match Rule::from_spec(&RuleSpec::new("aggregate", "Section"), p.roster()).unwrap() {
            Rule::Aggregate(rule) => rule,
            other => panic!("unexpected rule {other}"),
        }
    }

    #[test]
    fn test_blank_members_do_not_break_homogeneity() {
        let p = partition(&["A", "A", "", "A", "A", "B", "B", ""], 4);
        let rule = aggregate(&p);
        assert!(rule.check(&p.view(GroupId(0))));
        assert!(!rule.check(&p.view(GroupId(1))));
    }

    #[test]
    fn test_plurality_prefers_earlier_on_tie() {
        let p = partition(&["B", "A", "B", "A"], 4);
        let rule = aggregate(&p);
        assert_eq!(rule.plurality(&p.view(GroupId(0))), Some(0));
        assert_eq!(first_max(&[0, 0]), None);
        assert_eq!(first_max(&[1, 3, 3]), Some(1));
    }

    #[test]
    fn test_prepare_makes_groups_homogeneous() {
        let mut p = partition(&["A", "B", "C", "A", "B", "C", "A", "B", "C"], 3);
        let rule = aggregate(&p);
        let rules = vec![Rule::Aggregate(rule.clone())];
        let mut rng = create_rng(3);
        let mut ctx = SwapContext::new(&mut p, &rules, &mut rng);
        let claimed = rule.prepare(RuleId(0), &mut ctx);
        assert_eq!(claimed, 3);
        for g in p.group_ids() {
            assert!(rule.check(&p.view(g)));
            assert_eq!(p.group(g).rules(), &[RuleId(0)]);
        }
    }
}
