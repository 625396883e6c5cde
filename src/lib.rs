//! Constrained roster grouping.
//!
//! Partitions a roster of records into fixed-size groups that satisfy a
//! prioritized list of rules on record attributes:
//!
//! - **Cluster**: members of a target category never end up alone in a group.
//! - **Distribute**: target categories are spread evenly over the groups.
//! - **Aggregate**: each group holds a single target category.
//! - **Balance**: group means of a numeric attribute stay near the class mean.
//!
//! # Pipeline
//!
//! 1. [`roster::GroupSizer`] turns the roster length into an exact grid and
//!    the [`roster::Roster`] pads it with inert placeholder records
//! 2. [`partition::Partition::stratified`] deals records so every group gets
//!    one member from each strength band
//! 3. [`search::Solver`] applies the rules in order, repairing violations
//!    through guarded pairwise swaps that never break an earlier rule
//! 4. [`search::GroupingRunner`] strips placeholders and reports per-group
//!    and per-rule results
//!
//! The search is a best-effort heuristic. A rule that cannot be satisfied
//! within the retry budget is reported, not raised. A fixed seed reproduces a
//! run exactly.
//!
//! # Examples
//!
//! ```
//! use u_cohort::roster::{GroupSizer, Record};
//! use u_cohort::rule::RuleSpec;
//! use u_cohort::search::{GroupingRunner, SolverConfig};
//!
//! let records: Vec<Record> = (0..26)
//!     .map(|i| Record::from_pairs([
//!         ("Name", format!("student{i:02}")),
//!         ("Major", ["CS", "EE", "ME"][i % 3].to_string()),
//!         ("GPA", format!("{:.1}", 2.0 + (i % 5) as f64 * 0.5)),
//!     ]))
//!     .collect();
//! let specs = [
//!     RuleSpec::new("cluster", "Major"),
//!     RuleSpec::new("balance", "GPA"),
//! ];
//! let sizer = GroupSizer::parse_size("4+").unwrap();
//! let config = SolverConfig::default().with_seed(7);
//!
//! let result = GroupingRunner::run(records, "Name", &sizer, &specs, &config).unwrap();
//! assert_eq!(result.groups.len(), 6);
//! assert_eq!(result.groups.iter().map(|g| g.len()).sum::<usize>(), 26);
//! ```

pub mod error;
pub mod partition;
pub mod random;
pub mod roster;
pub mod rule;
pub mod search;

pub use error::{GroupingError, Result};
