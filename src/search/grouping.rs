//! End-to-end grouping entry point.
//!
//! # Pipeline
//!
//! 1. Pad the roster to an exact grid and validate every rule against it
//! 2. If the first rule is an aggregate, split the roster on its attribute
//! 3. Build every (sub-)roster's rules before any partition; a sub-roster
//!    without strength values balances against the class statistics
//! 4. Per (sub-)roster: stratified initial partition, then the solver with
//!    the placeholder distribution rule ahead of the user rules
//! 5. Strip placeholders and assemble per-group and per-rule reports

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info};

use super::config::SolverConfig;
use super::runner::{RuleOutcome, RuleState, Solver};
use crate::error::{GroupingError, Result};
use crate::partition::{mean, std_dev, GroupId, Partition};
use crate::random::create_rng;
use crate::roster::{GroupShape, GroupSizer, MatchSet, Record, Roster};
use crate::rule::{Rule, RuleKind, RuleSpec};

/// Class-level statistics of a balance rule over the final groups.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceSummary {
    /// Mean over the real records.
    pub class_mean: f64,

    /// Population standard deviation over the real records.
    pub class_std: f64,

    /// Allowed distance of a group mean from the class mean.
    pub tolerance: f64,

    /// Standard deviation of the group means.
    pub group_mean_std: f64,
}

/// Outcome of one user rule across every (sub-)roster.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleReport {
    pub kind: RuleKind,
    pub attribute: String,
    pub values: Vec<MatchSet>,
    pub weight: Option<f64>,

    /// Display form of the rule, e.g. `<Cluster Major [CS]>`.
    pub description: String,

    /// `Satisfied` only if every sub-roster satisfied it.
    pub state: RuleState,

    /// Labels of the groups failing the rule.
    pub failed_groups: Vec<usize>,

    /// Most repair passes any sub-roster needed.
    pub passes: usize,

    /// Swaps made while the rule was active.
    pub swaps: usize,

    /// Present for balance rules.
    pub balance: Option<BalanceSummary>,
}

impl RuleReport {
    fn new(rule: &Rule) -> Self {
        Self {
            kind: rule.kind(),
            attribute: rule.attribute().to_string(),
            values: rule.values().to_vec(),
            weight: rule.weight(),
            description: rule.to_string(),
            state: RuleState::Satisfied,
            failed_groups: Vec::new(),
            passes: 0,
            swaps: 0,
            balance: None,
        }
    }

    fn absorb(&mut self, outcome: &RuleOutcome, labels: &[usize]) {
        if outcome.state != RuleState::Satisfied {
            self.state = outcome.state;
        }
        self.failed_groups
            .extend(outcome.failed_groups.iter().map(|g| labels[g.index()]));
        self.passes = self.passes.max(outcome.passes);
        self.swaps += outcome.swaps;
    }

    pub fn satisfied(&self) -> bool {
        self.state == RuleState::Satisfied
    }
}

/// A group with its placeholders removed.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FinishedGroup {
    /// Group number, unique across sub-rosters.
    pub label: usize,

    /// Real records in identifier order.
    pub records: Vec<Record>,

    /// Descriptions of the user rules this group fails.
    pub failed_rules: Vec<String>,

    /// Mean of every balanced attribute over the real records.
    pub means: BTreeMap<String, f64>,
}

impl FinishedGroup {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of a grouping run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupingResult {
    /// Final groups sorted by label.
    pub groups: Vec<FinishedGroup>,

    /// One report per user rule, in input order.
    pub rules: Vec<RuleReport>,

    /// Whether every user rule was satisfied.
    pub success: bool,

    /// Total swaps performed.
    pub swaps: usize,

    /// Grid of every solved (sub-)roster.
    pub shapes: Vec<GroupShape>,

    /// Seed the run used; passing it back reproduces the result.
    pub seed: u64,
}

/// Runs the whole grouping pipeline.
pub struct GroupingRunner;

impl GroupingRunner {
    /// Groups `records` under `specs`.
    ///
    /// # Errors
    ///
    /// Setup errors (roster contract, sizing, rule construction) are returned
    /// before any partition is built. [`GroupingError::PlaceholdersUneven`]
    /// is returned if placeholders end up unevenly spread. Unsatisfied user
    /// rules are not errors.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_cohort::roster::{GroupSizer, Record};
    /// use u_cohort::rule::RuleSpec;
    /// use u_cohort::search::{GroupingRunner, SolverConfig};
    ///
    /// let records: Vec<Record> = (0..12)
    ///     .map(|i| Record::from_pairs([
    ///         ("id", format!("s{i}")),
    ///         ("Gender", if i % 3 == 0 { "F" } else { "M" }.to_string()),
    ///     ]))
    ///     .collect();
    /// let specs = [RuleSpec::new("distribute", "Gender").with_values(["F"])];
    /// let sizer = GroupSizer::parse_size("4").unwrap();
    /// let config = SolverConfig::default().with_seed(1);
    ///
    /// let result = GroupingRunner::run(records, "id", &sizer, &specs, &config).unwrap();
    /// assert_eq!(result.groups.len(), 3);
    /// assert!(result.success);
    /// ```
    pub fn run(
        records: Vec<Record>,
        identifier: &str,
        sizer: &GroupSizer,
        specs: &[RuleSpec],
        config: &SolverConfig,
    ) -> Result<GroupingResult> {
        let start = Instant::now();
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = create_rng(seed);

        let roster = Roster::new(identifier, records, sizer)?;
        let class_rules: Vec<Rule> = specs
            .iter()
            .map(|spec| Rule::from_spec(spec, &roster))
            .collect::<Result<_>>()?;
        info!(
            event = "grouping_start",
            records = roster.real_len(),
            rules = specs.len(),
            shape = %sizer.describe(roster.real_len()),
            seed,
        );

        let mut reports: Vec<RuleReport> = class_rules.iter().map(RuleReport::new).collect();
        let (rosters, skip) = match class_rules.first() {
            Some(Rule::Aggregate(aggregate)) => {
                let parts = roster.split_by(aggregate.selection().attribute(), sizer)?;
                info!(
                    event = "roster_split",
                    attribute = aggregate.selection().attribute(),
                    parts = parts.len(),
                );
                (parts, 1)
            }
            _ => (vec![roster], 0),
        };

        let plans = rosters
            .into_iter()
            .map(|sub| {
                let rules = roster_rules(&sub, &specs[skip..], &class_rules[skip..])?;
                Ok((sub, rules))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut groups: Vec<FinishedGroup> = Vec::new();
        let mut shapes = Vec::with_capacity(plans.len());
        let mut swaps = 0;
        for (sub, rules) in plans {
            shapes.push(sub.shape());
            let solved = solve_roster(sub, rules, groups.len(), config, &mut rng)?;
            swaps += solved.swaps;
            for (report, outcome) in reports[skip..].iter_mut().zip(&solved.outcomes) {
                report.absorb(outcome, &solved.labels);
            }
            groups.extend(solved.groups);
        }

        for (report, rule) in reports.iter_mut().zip(&class_rules) {
            if let Rule::Balance(balance) = rule {
                let means: Vec<f64> = groups
                    .iter()
                    .filter_map(|g| g.means.get(&report.attribute).copied())
                    .collect();
                report.balance = Some(BalanceSummary {
                    class_mean: balance.mean(),
                    class_std: balance.std(),
                    tolerance: balance.tolerance(),
                    group_mean_std: std_dev(&means).unwrap_or(0.0),
                });
            }
        }

        let success = reports.iter().all(RuleReport::satisfied);
        info!(
            event = "grouping_end",
            groups = groups.len(),
            success,
            swaps,
            duration_ms = start.elapsed().as_millis() as u64,
        );
        Ok(GroupingResult {
            groups,
            rules: reports,
            success,
            swaps,
            shapes,
            seed,
        })
    }
}

struct SolvedRoster {
    groups: Vec<FinishedGroup>,
    /// Outcomes of the user rules, placeholder rule excluded.
    outcomes: Vec<RuleOutcome>,
    /// Label of each local group id.
    labels: Vec<usize>,
    swaps: usize,
}

/// Placeholder rule followed by `specs` built against `roster`.
///
/// A balance rule whose attribute has no numeric value in `roster` keeps the
/// class-wide mean and tolerance of its counterpart in `class_rules`.
fn roster_rules(roster: &Roster, specs: &[RuleSpec], class_rules: &[Rule]) -> Result<Vec<Rule>> {
    let mut rules = vec![Rule::placeholder(roster)?];
    for (spec, class_rule) in specs.iter().zip(class_rules) {
        let rule = match Rule::from_spec(spec, roster) {
            Err(GroupingError::NoValidValues { .. }) if class_rule.kind() == RuleKind::Balance => {
                debug!(
                    attribute = class_rule.attribute(),
                    records = roster.real_len(),
                    "no strength values in sub-roster, using class statistics"
                );
                class_rule.clone()
            }
            other => other?,
        };
        rules.push(rule);
    }
    Ok(rules)
}

fn solve_roster<R: rand::Rng>(
    roster: Roster,
    rules: Vec<Rule>,
    group_offset: usize,
    config: &SolverConfig,
    rng: &mut R,
) -> Result<SolvedRoster> {
    let balanced: Vec<String> = rules
        .iter()
        .filter(|r| r.kind() == RuleKind::Balance)
        .map(|r| r.attribute().to_string())
        .collect();
    let balanced_refs: Vec<&str> = balanced.iter().map(String::as_str).collect();

    let mut partition = Partition::stratified(roster, &balanced_refs, group_offset, rng)?;
    let mut result = Solver::run(&mut partition, &rules, config, rng);
    ensure_placeholders_spread(&partition, &result.outcomes[0])?;

    let labels: Vec<usize> = partition.groups().iter().map(|g| g.label()).collect();
    let groups = partition
        .group_ids()
        .into_iter()
        .map(|g| finish_group(&partition, g, &rules[1..], &balanced, group_offset))
        .collect();
    let outcomes = result.outcomes.split_off(1);
    Ok(SolvedRoster {
        groups,
        outcomes,
        labels,
        swaps: result.swaps,
    })
}

fn ensure_placeholders_spread(partition: &Partition, outcome: &RuleOutcome) -> Result<()> {
    if outcome.failed_groups.is_empty() {
        return Ok(());
    }
    Err(GroupingError::PlaceholdersUneven {
        failed_groups: outcome
            .failed_groups
            .iter()
            .map(|&g| partition.group(g).label())
            .collect(),
    })
}

fn finish_group(
    partition: &Partition,
    group: GroupId,
    user_rules: &[Rule],
    balanced: &[String],
    group_offset: usize,
) -> FinishedGroup {
    let view = partition.view(group);
    let failed_rules = user_rules
        .iter()
        .filter(|r| !r.check(&view))
        .map(|r| r.to_string())
        .collect();

    let identifier = partition.roster().identifier();
    let mut records: Vec<Record> = view.iter().filter(|r| !r.is_phantom()).cloned().collect();
    records.sort_by(|a, b| a.get(identifier).cmp(b.get(identifier)));
    for record in &mut records {
        record.set_group(Some(GroupId(group_offset + group.index())));
    }

    let means = balanced
        .iter()
        .filter_map(|attr| {
            mean(records.iter().filter_map(|r| r.get(attr).as_number())).map(|m| (attr.clone(), m))
        })
        .collect();

    FinishedGroup {
        label: partition.group(group).label(),
        records,
        failed_rules,
        means,
    }
}
