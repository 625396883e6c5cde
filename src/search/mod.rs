//! Swap-based rule repair.
//!
//! The solver applies rules one at a time in priority order. Each rule is
//! bound to every group and repaired through pairwise swaps that all
//! previously bound rules must permit, so a satisfied rule is never silently
//! broken by a later one. Passes that leave failing groups are followed by a
//! round of random permitted swaps and retried a bounded number of times.
//!
//! [`GroupingRunner`] wraps the whole pipeline: roster padding, optional
//! split on a leading aggregate rule, stratified initial partition, solving
//! and result assembly.

mod config;
mod grouping;
mod runner;
mod swap;

pub use config::SolverConfig;
pub use grouping::{BalanceSummary, FinishedGroup, GroupingResult, GroupingRunner, RuleReport};
pub use runner::{failing_groups, RuleOutcome, RuleState, SolveResult, Solver};
pub use swap::{swap_permission, SwapContext};
