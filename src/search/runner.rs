//! Rule-by-rule repair loop.

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use super::config::SolverConfig;
use super::swap::SwapContext;
use crate::partition::{GroupId, Partition};
use crate::rule::{Rule, RuleId};

/// Progress of one rule through the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RuleState {
    /// Not reached yet.
    Pending,
    /// Bound and being repaired.
    Applying,
    /// Every group satisfies the rule.
    Satisfied,
    /// Retries ran out with some groups still failing.
    Exhausted,
}

/// What the solver did for one rule.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    /// Final state.
    pub state: RuleState,

    /// Repair passes made.
    pub passes: usize,

    /// Swaps made while this rule was active, mixing included.
    pub swaps: usize,

    /// Groups still failing the rule at the end of its turn.
    pub failed_groups: Vec<GroupId>,
}

impl RuleOutcome {
    fn pending() -> Self {
        Self {
            state: RuleState::Pending,
            passes: 0,
            swaps: 0,
            failed_groups: Vec::new(),
        }
    }
}

/// Result of a solver run over one partition.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// One outcome per rule, in rule order.
    pub outcomes: Vec<RuleOutcome>,

    /// Total swaps performed.
    pub swaps: usize,
}

impl SolveResult {
    /// Whether every rule ended satisfied.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.state == RuleState::Satisfied)
    }
}

/// Applies rules one at a time in priority order.
///
/// Each rule is bound to every group and then repaired group by group.
/// Swaps are only made when all rules bound to both groups permit them,
/// so later rules cannot undo the satisfaction of earlier ones. A failed
/// pass is followed by a round of random permitted swaps before retrying.
pub struct Solver;

impl Solver {
    /// Runs every rule against `partition`.
    pub fn run<R: Rng>(
        partition: &mut Partition,
        rules: &[Rule],
        config: &SolverConfig,
        rng: &mut R,
    ) -> SolveResult {
        let start = Instant::now();
        let mut ctx = SwapContext::new(partition, rules, rng);
        let mut outcomes: Vec<RuleOutcome> = rules.iter().map(|_| RuleOutcome::pending()).collect();

        for (i, rule) in rules.iter().enumerate() {
            let id = RuleId(i);
            let before = ctx.swaps();
            outcomes[i].state = RuleState::Applying;
            info!(event = "rule_start", rule = %rule, rule_index = i);

            if let Rule::Aggregate(aggregate) = rule {
                if !failing_groups(ctx.partition(), rule).is_empty() {
                    aggregate.prepare(id, &mut ctx);
                }
            }
            ctx.partition_mut().bind_all(id);

            let mut passes = 0;
            let (state, failed) = loop {
                passes += 1;
                let mut groups = ctx.partition().group_ids();
                groups.shuffle(ctx.rng());
                for group in groups {
                    rule.repair(group, &mut ctx);
                }

                let failed = failing_groups(ctx.partition(), rule);
                debug!(rule = %rule, pass = passes, failing = failed.len(), "repair pass");
                if failed.is_empty() {
                    break (RuleState::Satisfied, failed);
                }
                if passes >= config.passes() {
                    warn!(
                        rule = %rule,
                        passes,
                        failing = failed.len(),
                        "rule not satisfied after all retries"
                    );
                    break (RuleState::Exhausted, failed);
                }
                for _ in 0..config.mixing_swaps {
                    ctx.random_swap();
                }
            };

            let satisfied = state == RuleState::Satisfied;
            let outcome = &mut outcomes[i];
            outcome.state = state;
            outcome.passes = passes;
            outcome.swaps = ctx.swaps() - before;
            outcome.failed_groups = failed;
            info!(
                event = "rule_end",
                rule = %rule,
                rule_index = i,
                passes,
                swaps = outcome.swaps,
                satisfied,
            );
        }

        let swaps = ctx.swaps();
        info!(
            event = "solve_end",
            rules = rules.len(),
            swaps,
            duration_ms = start.elapsed().as_millis() as u64,
        );
        SolveResult { outcomes, swaps }
    }
}

/// Groups whose current membership fails `rule`.
pub fn failing_groups(partition: &Partition, rule: &Rule) -> Vec<GroupId> {
    partition
        .group_ids()
        .into_iter()
        .filter(|&g| !rule.check(&partition.view(g)))
        .collect()
}
