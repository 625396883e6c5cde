//! Distribute: spread each target category evenly over the groups.

use std::ops::RangeInclusive;

use rand::Rng;

use super::cluster::other_groups;
use super::selection::Selection;
use crate::partition::{GroupId, MemberView};
use crate::roster::{RecordId, Roster};
use crate::search::SwapContext;

/// Holds every group's count of each category within one of the class
/// total divided by the number of groups.
///
/// A category with total `t` over `n` groups targets `{t / n}` when `n`
/// divides `t` and `{⌊t/n⌋, ⌊t/n⌋ + 1}` otherwise. Categories are processed
/// rarest first.
#[derive(Debug, Clone)]
pub struct Distribute {
    selection: Selection,
    targets: Vec<RangeInclusive<usize>>,
}

impl Distribute {
    pub(crate) fn new(mut selection: Selection, roster: &Roster) -> Self {
        let n_groups = roster.n_groups().max(1);
        let totals: Vec<usize> = (0..selection.len())
            .map(|idx| {
                roster
                    .records()
                    .iter()
                    .filter(|r| selection.category(r) == Some(idx))
                    .count()
            })
            .collect();

        let mut order: Vec<usize> = (0..totals.len()).collect();
        order.sort_by_key(|&i| totals[i]);
        selection.reorder(&order);

        let targets = order
            .iter()
            .map(|&i| {
                let (t, n) = (totals[i], n_groups);
                if t % n == 0 {
                    t / n..=t / n
                } else {
                    t / n..=t / n + 1
                }
            })
            .collect();
        Self { selection, targets }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Allowed per-group counts of category `idx`.
    pub fn target(&self, idx: usize) -> RangeInclusive<usize> {
        self.targets[idx].clone()
    }

    /// Every category count lies in its target range.
    pub fn check(&self, view: &MemberView<'_>) -> bool {
        self.selection
            .counts(view)
            .iter()
            .zip(&self.targets)
            .all(|(n, target)| target.contains(n))
    }

    fn can_accept(&self, view: &MemberView<'_>, idx: usize) -> bool {
        self.targets[idx].contains(&(self.selection.count(view, idx) + 1))
    }

    fn can_spare(&self, view: &MemberView<'_>, idx: usize) -> bool {
        let n = self.selection.count(view, idx);
        n > 0 && self.targets[idx].contains(&(n - 1))
    }

    /// Tries one swap that moves `member` out of a surplus category or
    /// trades it for a member of a category the group lacks.
    pub(crate) fn fix<R: Rng>(
        &self,
        member: RecordId,
        group: GroupId,
        ctx: &mut SwapContext<'_, R>,
    ) -> bool {
        let sel = &self.selection;
        let own = sel.category(ctx.partition().record(member));

        if let Some(idx) = own {
            let n = sel.count(&ctx.partition().view(group), idx);
            if n > *self.targets[idx].end() {
                let targets = other_groups(ctx, group, |view| self.can_accept(view, idx));
                if ctx.find_target_and_swap(member, &targets, |r| sel.category(r) != Some(idx)) {
                    return true;
                }
            }
        }

        let expendable = match own {
            None => true,
            Some(j) => sel.count(&ctx.partition().view(group), j) > *self.targets[j].start(),
        };
        if !expendable {
            return false;
        }
        for idx in 0..sel.len() {
            if own == Some(idx) {
                continue;
            }
            if sel.count(&ctx.partition().view(group), idx) >= *self.targets[idx].start() {
                continue;
            }
            let targets = other_groups(ctx, group, |view| self.can_spare(view, idx));
            if ctx.find_target_and_swap(member, &targets, |r| sel.category(r) == Some(idx)) {
                return true;
            }
        }
        false
    }
}
