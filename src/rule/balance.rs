//! Balance: keep each group's mean of a numeric attribute near the class mean.

use rand::Rng;

use super::cluster::other_groups;
use super::selection::Selection;
use super::Permission;
use crate::error::{GroupingError, Result};
use crate::partition::{mean, std_dev, GroupId, MemberView};
use crate::roster::{RecordId, Roster};
use crate::search::SwapContext;

/// Tolerance in class standard deviations when none is configured.
pub const DEFAULT_TOLERANCE: f64 = 0.5;

const MEAN_EPSILON: f64 = 1e-9;

/// Holds group means within `tolerance` of the class mean.
///
/// Class statistics come from the real records only; placeholders count
/// toward group means at the strength assigned to them.
#[derive(Debug, Clone)]
pub struct Balance {
    selection: Selection,
    mean: f64,
    std: f64,
    tolerance: f64,
}

impl Balance {
    pub(crate) fn new(selection: Selection, factor: Option<f64>, roster: &Roster) -> Result<Self> {
        let factor = factor.unwrap_or(DEFAULT_TOLERANCE);
        if !factor.is_finite() || factor < 0.0 {
            return Err(GroupingError::Configuration(format!(
                "balance tolerance must be a non-negative number, got {factor}"
            )));
        }
        let values: Vec<f64> = roster
            .real_records()
            .filter_map(|r| r.get(selection.attribute()).as_number())
            .collect();
        let (Some(mean), Some(std)) = (mean(values.iter().copied()), std_dev(&values)) else {
            return Err(GroupingError::NoValidValues {
                rule: "Balance".into(),
                attribute: selection.attribute().to_string(),
            });
        };
        Ok(Self {
            selection,
            mean,
            std,
            tolerance: std * factor,
        })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Class mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Class population standard deviation.
    pub fn std(&self) -> f64 {
        self.std
    }

    /// Allowed absolute distance from the class mean.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn within(&self, group_mean: f64) -> bool {
        let gap = (group_mean - self.mean).abs();
        gap < self.tolerance || gap <= MEAN_EPSILON
    }

    fn group_mean(&self, view: &MemberView<'_>) -> Option<f64> {
        view.mean(self.selection.attribute())
    }

    /// Group mean lies strictly within tolerance. A group with no numeric
    /// values fails.
    pub fn check(&self, view: &MemberView<'_>) -> bool {
        self.group_mean(view).is_some_and(|m| self.within(m))
    }

    /// Allows moves toward the class mean and tolerates small drifts that
    /// stay within tolerance.
    pub fn permissible(&self, old: &MemberView<'_>, new: &MemberView<'_>) -> Permission {
        match (self.group_mean(old), self.group_mean(new)) {
            (Some(before), Some(after)) => {
                if (after - self.mean).abs() < (before - self.mean).abs() {
                    Permission::Allowed
                } else if self.within(after) {
                    Permission::Tolerated
                } else {
                    Permission::Rejected
                }
            }
            _ => Permission::default_for(self.check(old), self.check(new)),
        }
    }

    /// Tries one swap of `member` with a group on the other side of the
    /// class mean, most distant groups first.
    pub(crate) fn fix<R: Rng>(
        &self,
        member: RecordId,
        group: GroupId,
        ctx: &mut SwapContext<'_, R>,
    ) -> bool {
        let above = self
            .group_mean(&ctx.partition().view(group))
            .is_some_and(|m| m > self.mean);
        let opposite = |m: Option<f64>| match m {
            None => true,
            Some(m) if above => m < self.mean,
            Some(m) => m > self.mean,
        };

        let far = other_groups(ctx, group, |view| {
            let m = self.group_mean(view);
            opposite(m) && !m.is_some_and(|m| self.within(m))
        });
        let across = other_groups(ctx, group, |view| opposite(self.group_mean(view)));
        let any = other_groups(ctx, group, |_| true);

        ctx.find_target_and_swap(member, &far, |_| true)
            || ctx.find_target_and_swap(member, &across, |_| true)
            || ctx.find_target_and_swap(member, &any, |_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{Group, Partition};
    use crate::random::create_rng;
    use crate::roster::{GroupSizer, Record};
    use crate::rule::{Rule, RuleId, RuleSpec};

    fn partition(gpas: &[&str], size: usize) -> Partition {
        let records = gpas
            .iter()
            .enumerate()
            .map(|(i, g)| Record::from_pairs([("id", format!("s{i}")), ("GPA", g.to_string())]))
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

    fn balance(p: &Partition, tolerance: f64) -> Balance {
        let spec = RuleSpec::new("balance", "GPA").with_tolerance(tolerance);
        match Rule::from_spec(&spec, p.roster()).unwrap() {
            Rule::Balance(rule) => rule,
            other => panic!("unexpected rule {other}"),
        }
    }

    #[test]
    fn test_class_statistics() {
        // mean 3, population std 0.5
        let p = partition(&["2.5", "3.5", "2.5", "3.5"], 2);
        let rule = balance(&p, 0.5);
        assert!((rule.mean() - 3.0).abs() < 1e-12);
        assert!((rule.std() - 0.5).abs() < 1e-12);
        assert!((rule.tolerance() - 0.25).abs() < 1e-12);
        assert!(rule.check(&p.view(GroupId(0))));
    }

    #[test]
    fn test_tolerance_is_strict() {
        let p = partition(&["2.5", "2.5", "3.5", "3.5"], 2);
        let rule = balance(&p, 0.5);
        assert!(!rule.check(&p.view(GroupId(0))));
        assert!(!rule.check(&p.view(GroupId(1))));
    }

    #[test]
    fn test_zero_spread_is_satisfied() {
        let p = partition(&["3", "3", "3", "3"], 2);
        let rule = balance(&p, 0.5);
        assert_eq!(rule.tolerance(), 0.0);
        assert!(rule.check(&p.view(GroupId(0))));
    }

    #[test]
    fn test_no_numeric_values() {
        let p = partition(&["a", "b", "c", "d"], 2);
        let err = Rule::from_spec(&RuleSpec::new("balance", "GPA"), p.roster()).unwrap_err();
        assert!(matches!(err, GroupingError::NoValidValues { .. }));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let p = partition(&["1", "2", "3", "4"], 2);
        let spec = RuleSpec::new("balance", "GPA").with_tolerance(-1.0);
        assert!(matches!(
            Rule::from_spec(&spec, p.roster()),
            Err(GroupingError::Configuration(_))
        ));
    }

    #[test]
    fn test_permission_levels() {
        let p = partition(&["2", "4", "3", "3", "2.9", "3.2"], 2);
        let rule = balance(&p, 0.5);
        let roster = p.roster();
        let old = MemberView::of_ids(roster, [RecordId(4), RecordId(5)]);
        // 3.05 -> 3.0: closer
        let closer = MemberView::of_ids(roster, [RecordId(2), RecordId(3)]);
        assert_eq!(rule.permissible(&old, &closer), Permission::Allowed);
        // 3.05 -> 3.1: farther but within tolerance
        let drift = MemberView::of_ids(roster, [RecordId(2), RecordId(5)]);
        assert_eq!(rule.permissible(&old, &drift), Permission::Tolerated);
        // 3.05 -> 2.0: outside tolerance
        let far = MemberView::of_ids(roster, [RecordId(0), RecordId(0)]);
        assert_eq!(rule.permissible(&old, &far), Permission::Rejected);
    }

    #[test]
    fn test_empty_means_use_default_permission() {
        // class mean 3 from the numeric records only
        let p = partition(&["2", "4", "3", "3", "", ""], 2);
        let rule = balance(&p, 0.5);
        let roster = p.roster();
        let blank = MemberView::of_ids(roster, [RecordId(4), RecordId(5)]);
        let settled = MemberView::of_ids(roster, [RecordId(0), RecordId(1)]);
        assert!(!rule.check(&blank));
        assert!(rule.check(&settled));
        assert_eq!(rule.permissible(&blank, &blank), Permission::Allowed);
        assert_eq!(rule.permissible(&blank, &settled), Permission::Allowed);
        assert_eq!(rule.permissible(&settled, &blank), Permission::Rejected);
    }

    #[test]
    fn test_fix_takes_donor_without_mean() {
        // G1 has no GPA at all; swaps with G2 would leave a lone Major
        let rows = [("4", "ME"), ("4", "ME"), ("", "ME"), ("", "ME"), ("2", "CS"), ("2", "CS")];
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, (gpa, major))| {
                Record::from_pairs([
                    ("id", format!("s{i}")),
                    ("GPA", gpa.to_string()),
                    ("Major", major.to_string()),
                ])
            })
            .collect();
        let roster = Roster::new("id", records, &GroupSizer::with_size(2, None).unwrap()).unwrap();
        let groups = (0..3)
            .map(|g| Group::new(g + 1, vec![RecordId(2 * g), RecordId(2 * g + 1)]))
            .collect();
        let mut p = Partition::from_groups(roster, groups);
        let rules = vec![
            Rule::from_spec(&RuleSpec::new("cluster", "Major"), p.roster()).unwrap(),
            Rule::Balance(balance(&p, 0.5)),
        ];
        p.bind_all(RuleId(0));
        let Rule::Balance(rule) = &rules[1] else { unreachable!() };
        assert!(!rule.check(&p.view(GroupId(0))));

        let mut rng = create_rng(4);
        let mut ctx = SwapContext::new(&mut p, &rules, &mut rng);
        assert!(rule.fix(RecordId(0), GroupId(0), &mut ctx));
        assert_eq!(ctx.swaps(), 1);
        drop(ctx);
        assert_eq!(p.group_of(RecordId(0)), Some(GroupId(1)));
        assert_eq!(p.view(GroupId(1)).mean("GPA"), Some(4.0));
    }

    #[test]
    fn test_repair_pulls_means_together() {
        let gpas = ["2.0", "2.5", "2.5", "3.0", "3.0", "3.5", "3.5", "4.0"];
        let mut p = partition(&gpas, 4);
        let rules = vec![Rule::Balance(balance(&p, 0.5))];
        p.bind_all(RuleId(0));
        let mut rng = create_rng(8);
        let mut ctx = SwapContext::new(&mut p, &rules, &mut rng);
        for _ in 0..20 {
            let a = rules[0].repair(GroupId(0), &mut ctx);
            let b = rules[0].repair(GroupId(1), &mut ctx);
            if a && b {
                break;
            }
        }
        for g in p.group_ids() {
            assert!(p.satisfied(g, &rules));
            let m = p.view(g).mean("GPA").unwrap();
            assert!((m - 3.0).abs() <= 0.25, "group mean {m}");
        }
    }
}
