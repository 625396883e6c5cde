//! Cluster: no group may hold exactly one member of a target category.

use rand::Rng;

use super::selection::Selection;
use crate::partition::{GroupId, MemberView};
use crate::roster::RecordId;
use crate::search::SwapContext;

/// Keeps members of each target category together in pairs or more.
#[derive(Debug, Clone)]
pub struct Cluster {
    selection: Selection,
}

impl Cluster {
    pub(crate) fn new(selection: Selection) -> Self {
        Self { selection }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// No category appears exactly once.
    pub fn check(&self, view: &MemberView<'_>) -> bool {
        self.selection.counts(view).iter().all(|&n| n != 1)
    }

    /// Tries one swap that removes a lone category from `group`, either by
    /// moving the lone `member` out or by bringing a partner for it in.
    pub(crate) fn fix<R: Rng>(
        &self,
        member: RecordId,
        group: GroupId,
        ctx: &mut SwapContext<'_, R>,
    ) -> bool {
        let sel = &self.selection;
        let own = sel.category(ctx.partition().record(member));

        for idx in 0..sel.len() {
            if sel.count(&ctx.partition().view(group), idx) != 1 {
                continue;
            }
            let moved = if own == Some(idx) {
                // relocate into a group that already has some but not all
                let targets = other_groups(ctx, group, |view| {
                    let n = sel.count(view, idx);
                    n >= 1 && n < view.len()
                });
                ctx.find_target_and_swap(member, &targets, |r| {
                    !sel.is_blank(r) && sel.category(r) != Some(idx)
                })
            } else {
                // recruit a partner without leaving a new lone member behind
                let targets = other_groups(ctx, group, |view| {
                    let n = sel.count(view, idx);
                    n == 1 || n > 2
                });
                ctx.find_target_and_swap(member, &targets, |r| sel.category(r) == Some(idx))
            };
            if moved {
                return true;
            }
        }
        false
    }
}

pub(crate) fn other_groups<R: Rng>(
    ctx: &SwapContext<'_, R>,
    group: GroupId,
    keep: impl Fn(&MemberView<'_>) -> bool,
) -> Vec<GroupId> {
    let partition = ctx.partition();
    partition
        .group_ids()
        .into_iter()
        .filter(|&g| g != group && keep(&partition.view(g)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Group, Partition};
    use crate::random::create_rng;
    use crate::roster::{GroupSizer, Record, Roster};
    use crate::rule::{Rule, RuleId, RuleSpec};

    fn partition(majors: &[&str], size: usize) -> Partition {
        let records = majors
            .iter()
            .enumerate()
            .map(|(i, m)| Record::from_pairs([("id", format!("s{i}")), ("Major", m.to_string())]))
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

    #[test]
    fn test_lone_member_fails() {
        let p = partition(&["CS", "CS", "EE", "ME", "EE", "EE", "ME", "ME"], 4);
        let rule = Rule::from_spec(&RuleSpec::new("cluster", "Major"), p.roster()).unwrap();
        assert!(!rule.check(&p.view(GroupId(0))));
        assert!(rule.check(&p.view(GroupId(1))));
    }

    #[test]
    fn test_absent_categories_are_fine() {
        let p = partition(&["CS", "CS", "EE", "EE", "ME", "ME", "ME", "ME"], 4);
        // group 1 lacks CS and EE entirely
        let rule = Rule::from_spec(&RuleSpec::new("cluster", "Major"), p.roster()).unwrap();
        assert!(rule.check(&p.view(GroupId(0))));
        assert!(rule.check(&p.view(GroupId(1))));
    }

    #[test]
    fn test_repair_pairs_lone_members() {
        let mut p = partition(&["CS", "EE", "EE", "ME", "CS", "EE", "EE", "ME"], 4);
        let rules = vec![Rule::from_spec(&RuleSpec::new("cluster", "Major"), p.roster()).unwrap()];
        p.bind_all(RuleId(0));
        let mut rng = create_rng(5);
        let mut ctx = SwapContext::new(&mut p, &rules, &mut rng);
        for _ in 0..50 {
            let a = rules[0].repair(GroupId(0), &mut ctx);
            let b = rules[0].repair(GroupId(1), &mut ctx);
            if a && b {
                break;
            }
        }
        assert!(ctx.swaps() > 0);
        for g in p.group_ids() {
            assert!(p.satisfied(g, &rules));
        }
    }
}
