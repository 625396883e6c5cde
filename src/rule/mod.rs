//! Grouping rules.
//!
//! A rule is a predicate over a group's members plus a repair routine that
//! tries to satisfy it through swaps. Rules are built from a [`RuleSpec`]
//! against a roster; construction validates the attribute and the target
//! values and precomputes class-wide statistics.
//!
//! | Rule | Satisfied when |
//! |------|----------------|
//! | [`Cluster`] | no target category appears exactly once |
//! | [`Distribute`] | each category count is within the even share |
//! | [`Aggregate`] | at most one target category is present |
//! | [`Balance`] | the group mean is within tolerance of the class mean |

mod aggregate;
mod balance;
mod cluster;
mod distribute;
mod selection;

pub use aggregate::Aggregate;
pub use balance::{Balance, DEFAULT_TOLERANCE};
pub use cluster::Cluster;
pub use distribute::Distribute;
pub use selection::{RuleKind, RuleSpec, Selection};

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::Result;
use crate::partition::{GroupId, MemberView};
use crate::roster::{MatchSet, Roster, PHANTOM};
use crate::search::SwapContext;

/// Index of a rule in the active rule list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Verdict of a rule on a hypothetical membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// The change breaks the rule.
    Rejected,
    /// The change keeps or improves the rule.
    Allowed,
    /// The change worsens the rule's measure but stays acceptable.
    Tolerated,
}

impl Permission {
    /// Allowed when the new membership satisfies the rule or the old one
    /// did not.
    pub fn default_for(old_ok: bool, new_ok: bool) -> Self {
        if new_ok || !old_ok {
            Permission::Allowed
        } else {
            Permission::Rejected
        }
    }

    pub fn is_rejected(self) -> bool {
        self == Permission::Rejected
    }
}

/// A validated rule.
#[derive(Debug, Clone)]
pub enum Rule {
    Cluster(Cluster),
    Distribute(Distribute),
    Aggregate(Aggregate),
    Balance(Balance),
}

impl Rule {
    /// Builds and validates a rule against `roster`.
    ///
    /// # Errors
    ///
    /// [`UnknownRule`](crate::GroupingError::UnknownRule) for an unrecognized
    /// name, [`AttributeNotFound`](crate::GroupingError::AttributeNotFound),
    /// [`InvalidValues`](crate::GroupingError::InvalidValues) or
    /// [`NoValidValues`](crate::GroupingError::NoValidValues) for bad targets.
    pub fn from_spec(spec: &RuleSpec, roster: &Roster) -> Result<Self> {
        let kind = spec.kind()?;
        let selection = Selection::resolve(kind, spec, roster)?;
        Ok(match kind {
            RuleKind::Cluster => Rule::Cluster(Cluster::new(selection)),
            RuleKind::Distribute => Rule::Distribute(Distribute::new(selection, roster)),
            RuleKind::Aggregate => Rule::Aggregate(Aggregate::new(selection)),
            RuleKind::Balance => Rule::Balance(Balance::new(selection, spec.tolerance, roster)?),
        })
    }

    /// Spreads placeholder records evenly over the groups.
    pub fn placeholder(roster: &Roster) -> Result<Self> {
        let spec = RuleSpec::new("distribute", roster.identifier()).with_values([PHANTOM]);
        Self::from_spec(&spec, roster)
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Cluster(_) => RuleKind::Cluster,
            Rule::Distribute(_) => RuleKind::Distribute,
            Rule::Aggregate(_) => RuleKind::Aggregate,
            Rule::Balance(_) => RuleKind::Balance,
        }
    }

    pub fn selection(&self) -> &Selection {
        match self {
            Rule::Cluster(r) => r.selection(),
            Rule::Distribute(r) => r.selection(),
            Rule::Aggregate(r) => r.selection(),
            Rule::Balance(r) => r.selection(),
        }
    }

    pub fn attribute(&self) -> &str {
        self.selection().attribute()
    }

    pub fn values(&self) -> &[MatchSet] {
        self.selection().values()
    }

    pub fn weight(&self) -> Option<f64> {
        self.selection().weight()
    }

    /// Whether `view` satisfies the rule.
    pub fn check(&self, view: &MemberView<'_>) -> bool {
        match self {
            Rule::Cluster(r) => r.check(view),
            Rule::Distribute(r) => r.check(view),
            Rule::Aggregate(r) => r.check(view),
            Rule::Balance(r) => r.check(view),
        }
    }

    /// Whether a group may change from `old` to `new`.
    pub fn permissible(&self, old: &MemberView<'_>, new: &MemberView<'_>) -> Permission {
        match self {
            Rule::Balance(r) => r.permissible(old, new),
            _ => Permission::default_for(self.check(old), self.check(new)),
        }
    }

    /// Tries to make `group` satisfy this rule.
    ///
    /// Members are visited in random order; each one still in the group gets
    /// one rule-specific fix attempt. Stops as soon as the group passes.
    /// Returns whether it does.
    pub(crate) fn repair<R: Rng>(&self, group: GroupId, ctx: &mut SwapContext<'_, R>) -> bool {
        if self.check(&ctx.partition().view(group)) {
            return true;
        }
        let mut members = ctx.partition().group(group).members().to_vec();
        members.shuffle(ctx.rng());
        for member in members {
            if ctx.partition().group_of(member) != Some(group) {
                continue;
            }
            match self {
                Rule::Cluster(r) => r.fix(member, group, ctx),
                Rule::Distribute(r) => r.fix(member, group, ctx),
                Rule::Aggregate(r) => r.fix(member, group, ctx),
                Rule::Balance(r) => r.fix(member, group, ctx),
            };
            if self.check(&ctx.partition().view(group)) {
                return true;
            }
        }
        false
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Balance(r) => write!(
                f,
                "<Balance {} : mean {:.2} : tolerance {:.2}>",
                r.selection().attribute(),
                r.mean(),
                r.tolerance()
            ),
            _ => write!(f, "<{} {}>", self.kind(), self.selection()),
        }
    }
}
