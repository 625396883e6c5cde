//! Group sizing.
//!
//! Turns a roster length into an exact grid of `n_groups` groups of
//! `group_size` slots. Any slack is filled with placeholder records by the
//! roster.

use std::fmt;

use tracing::warn;

use crate::error::{GroupingError, Result};

/// How to absorb a roster length that does not divide by the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UnevenPolicy {
    /// Grow the group size by one so most groups carry a placeholder slot.
    High,
    /// Keep the group size and add one group for the remainder.
    Low,
    /// The roster divides evenly.
    Exact,
}

impl UnevenPolicy {
    /// Parses `+`/`high` or `-`/`low` (case-insensitive).
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "+" | "high" => Ok(UnevenPolicy::High),
            "-" | "low" => Ok(UnevenPolicy::Low),
            other => Err(GroupingError::Configuration(format!(
                "{other} is not an uneven size policy, expected high or low"
            ))),
        }
    }

    /// Policy used when none is given: small groups grow, larger ones shrink.
    pub fn default_for(size: usize) -> Self {
        if size < 4 {
            UnevenPolicy::High
        } else {
            UnevenPolicy::Low
        }
    }
}

impl fmt::Display for UnevenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnevenPolicy::High => "uneven high",
            UnevenPolicy::Low => "uneven low",
            UnevenPolicy::Exact => "even",
        })
    }
}

/// Derived grid for one roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupShape {
    /// Slots per group.
    pub group_size: usize,
    /// Number of groups.
    pub n_groups: usize,
    /// Policy that produced this shape.
    pub policy: UnevenPolicy,
}

impl GroupShape {
    /// Total number of slots.
    pub fn slots(&self) -> usize {
        self.group_size * self.n_groups
    }

    /// Placeholders needed to fill the grid for `n` real records.
    pub fn placeholders(&self, n: usize) -> usize {
        self.slots().saturating_sub(n)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Size {
        size: usize,
        policy: Option<UnevenPolicy>,
    },
    Count(usize),
}

/// Sizing configuration as supplied by the input collaborator.
///
/// # Examples
///
/// ```
/// use u_cohort::roster::{GroupSizer, SizingConfig};
///
/// let config = SizingConfig::default().with_group_size("4+");
/// let shape = GroupSizer::from_config(&config).unwrap().shape(26).unwrap();
/// assert_eq!((shape.group_size, shape.n_groups), (5, 6));
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizingConfig {
    /// Target group size, optionally suffixed with `+` or `-`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub group_size: Option<String>,
    /// Explicit uneven size policy (`high` or `low`).
    #[cfg_attr(feature = "serde", serde(default))]
    pub uneven_size: Option<String>,
    /// Target number of groups; wins over `group_size`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub number_of_groups: Option<usize>,
}

impl SizingConfig {
    pub fn with_group_size(mut self, size: impl Into<String>) -> Self {
        self.group_size = Some(size.into());
        self
    }

    pub fn with_uneven_size(mut self, policy: impl Into<String>) -> Self {
        self.uneven_size = Some(policy.into());
        self
    }

    pub fn with_number_of_groups(mut self, n: usize) -> Self {
        self.number_of_groups = Some(n);
        self
    }

    /// Checks that the settings describe a usable sizer.
    pub fn validate(&self) -> Result<()> {
        GroupSizer::from_config(self).map(|_| ())
    }
}

/// Computes group size and count for a roster length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSizer {
    target: Target,
}

impl GroupSizer {
    /// Fixed group size; `policy` of `None` picks [`UnevenPolicy::default_for`].
    pub fn with_size(size: usize, policy: Option<UnevenPolicy>) -> Result<Self> {
        if size == 0 {
            return Err(GroupingError::Configuration(
                "group size must be positive".into(),
            ));
        }
        Ok(Self {
            target: Target::Size { size, policy },
        })
    }

    /// Fixed number of groups.
    pub fn with_count(n_groups: usize) -> Result<Self> {
        if n_groups == 0 {
            return Err(GroupingError::Configuration(
                "number of groups must be positive".into(),
            ));
        }
        Ok(Self {
            target: Target::Count(n_groups),
        })
    }

    /// Parses a size string such as `"3"`, `"4+"` or `"5-"`.
    pub fn parse_size(raw: &str) -> Result<Self> {
        let s = raw.trim();
        let (digits, policy) = match s.chars().last() {
            Some('+') => (&s[..s.len() - 1], Some(UnevenPolicy::High)),
            Some('-') => (&s[..s.len() - 1], Some(UnevenPolicy::Low)),
            _ => (s, None),
        };
        let size = digits.trim().parse::<usize>().map_err(|_| {
            GroupingError::Configuration(format!("{raw} cannot be interpreted as a group size"))
        })?;
        Self::with_size(size, policy)
    }

    /// Builds a sizer from collaborator configuration.
    pub fn from_config(config: &SizingConfig) -> Result<Self> {
        if let Some(n) = config.number_of_groups {
            if config.group_size.is_some() {
                warn!(
                    number_of_groups = n,
                    "fixed number of groups specified, ignoring group size"
                );
            }
            return Self::with_count(n);
        }
        let raw = config.group_size.as_deref().ok_or_else(|| {
            GroupingError::Configuration("neither group size nor number of groups given".into())
        })?;
        let mut sizer = Self::parse_size(raw)?;
        if let Some(explicit) = config.uneven_size.as_deref() {
            let policy = UnevenPolicy::parse(explicit)?;
            if let Target::Size { size, .. } = sizer.target {
                sizer.target = Target::Size {
                    size,
                    policy: Some(policy),
                };
            }
        }
        Ok(sizer)
    }

    /// Computes the grid for `n` records.
    ///
    /// Guarantees `group_size * n_groups >= n`, with equality whenever the
    /// returned policy is [`UnevenPolicy::Exact`].
    pub fn shape(&self, n: usize) -> Result<GroupShape> {
        if n == 0 {
            return Err(GroupingError::Configuration("cannot size an empty roster".into()));
        }
        match self.target {
            Target::Count(n_groups) => {
                if n_groups > n {
                    return Err(GroupingError::Configuration(format!(
                        "{n_groups} groups requested for only {n} records"
                    )));
                }
                let group_size = n.div_ceil(n_groups);
                let policy = if group_size * n_groups == n {
                    UnevenPolicy::Exact
                } else {
                    UnevenPolicy::Low
                };
                Ok(GroupShape {
                    group_size,
                    n_groups,
                    policy,
                })
            }
            Target::Size { size, policy } => {
                if n <= size {
                    return Ok(GroupShape {
                        group_size: n,
                        n_groups: 1,
                        policy: UnevenPolicy::Exact,
                    });
                }
                let mut policy = policy.unwrap_or_else(|| UnevenPolicy::default_for(size));
                // group count is fixed before any growth so `+` adds slots
                // to existing groups instead of mimicking `(size + 1)-`
                let mut n_groups = n / size;
                let mut group_size = size;
                if n % size == 0 {
                    policy = UnevenPolicy::Exact;
                } else if policy == UnevenPolicy::High {
                    group_size += 1;
                }
                if n_groups * group_size < n {
                    n_groups += 1;
                }
                Ok(GroupShape {
                    group_size,
                    n_groups,
                    policy,
                })
            }
        }
    }

    /// One-line description of the grid for `n` records.
    pub fn describe(&self, n: usize) -> String {
        match self.shape(n) {
            Ok(shape) => format!(
                "{n} records into {} groups of {} ({} placeholders, {})",
                shape.n_groups,
                shape.group_size,
                shape.placeholders(n),
                shape.policy
            ),
            Err(e) => format!("{n} records cannot be sized: {e}"),
        }
    }
}
