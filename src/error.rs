//! Error types for roster grouping.
//!
//! Setup errors ([`Configuration`](GroupingError::Configuration),
//! [`InvalidRoster`](GroupingError::InvalidRoster) and the rule construction
//! errors) are raised before any partition is attempted. The two internal
//! errors are raised after partitioning and indicate a broken invariant rather
//! than bad input. A rule that cannot be satisfied is not an error; it is
//! reported through [`RuleState::Exhausted`](crate::search::RuleState).

use thiserror::Error;

/// Main error type for grouping operations.
#[derive(Debug, Error)]
pub enum GroupingError {
    /// Sizer or solver configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The supplied records violate the roster contract.
    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    /// A rule names an attribute that no record carries.
    #[error(
        "When creating rule <{rule} : {attribute}> attribute {attribute} not found, \
         valid attributes are: {available:?}"
    )]
    AttributeNotFound {
        rule: String,
        attribute: String,
        available: Vec<String>,
    },

    /// A rule lists values that never occur in the roster.
    #[error("When creating rule <{rule} : {attribute}>, values {values:?} do not exist in roster")]
    InvalidValues {
        rule: String,
        attribute: String,
        values: Vec<String>,
    },

    /// A rule resolved to an empty value set.
    #[error("When creating rule <{rule} : {attribute}>, no values were specified")]
    NoValidValues { rule: String, attribute: String },

    /// No rule with this name exists.
    #[error("No rule named {0:?}")]
    UnknownRule(String),

    /// Padded record count does not fill the group grid exactly.
    #[error(
        "Internal error: {records} records cannot fill {n_groups} groups of {group_size}"
    )]
    UnevenGroups {
        records: usize,
        group_size: usize,
        n_groups: usize,
    },

    /// Placeholders could not be spread evenly across groups.
    #[error("Internal error: placeholders unevenly distributed in groups {failed_groups:?}")]
    PlaceholdersUneven { failed_groups: Vec<usize> },
}

/// Result type alias for grouping operations.
pub type Result<T> = std::result::Result<T, GroupingError>;
