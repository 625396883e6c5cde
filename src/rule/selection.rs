//! Rule specifications and their validated value selections.

use std::fmt;
use std::str::FromStr;

use crate::error::{GroupingError, Result};
use crate::partition::MemberView;
use crate::roster::{MatchSet, Record, Roster, Value, PHANTOM};

/// The closed set of rule variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RuleKind {
    /// No group holds a lone member of a target category.
    Cluster,
    /// Target categories are spread evenly over groups.
    Distribute,
    /// Each group holds a single target category.
    Aggregate,
    /// Group means stay near the class mean.
    Balance,
}

impl RuleKind {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            RuleKind::Cluster => "Cluster",
            RuleKind::Distribute => "Distribute",
            RuleKind::Aggregate => "Aggregate",
            RuleKind::Balance => "Balance",
        }
    }
}

impl FromStr for RuleKind {
    type Err = GroupingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cluster" => Ok(RuleKind::Cluster),
            "distribute" => Ok(RuleKind::Distribute),
            "aggregate" => Ok(RuleKind::Aggregate),
            "balance" => Ok(RuleKind::Balance),
            _ => Err(GroupingError::UnknownRule(s.to_string())),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One rule as supplied by the input collaborator.
///
/// # Examples
///
/// ```
/// use u_cohort::rule::RuleSpec;
///
/// let spec = RuleSpec::new("distribute", "Gender").with_values(["F"]);
/// assert!(!spec.selects_all());
/// let spec = RuleSpec::new("balance", "GPA").with_tolerance(0.25);
/// assert!(spec.selects_all());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleSpec {
    /// Rule name, matched case-insensitively.
    pub name: String,
    /// Attribute the rule constrains.
    pub attribute: String,
    /// Target categories; `None` (or a lone `"all"`) selects every value.
    #[cfg_attr(feature = "serde", serde(default))]
    pub values: Option<Vec<MatchSet>>,
    /// Balance tolerance in class standard deviations.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tolerance: Option<f64>,
    /// Reserved priority weight. Stored and reported, not used for ordering.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weight: Option<f64>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
            values: None,
            tolerance: None,
            weight: None,
        }
    }

    /// Sets explicit target categories; text such as `"(a, b)"` becomes a
    /// compound category.
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<MatchSet>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Parses the rule name.
    pub fn kind(&self) -> Result<RuleKind> {
        self.name.parse()
    }

    /// Whether no target values were given, selecting every value.
    pub fn selects_all(&self) -> bool {
        match &self.values {
            None => true,
            Some(values) => matches!(
                values.as_slice(),
                [MatchSet::Single(Value::Text(s))] if s.eq_ignore_ascii_case("all")
            ),
        }
    }
}

/// A rule's attribute and validated target categories.
///
/// Placeholders are invisible to a selection unless it explicitly targets
/// the placeholder sentinel.
#[derive(Debug, Clone)]
pub struct Selection {
    attribute: String,
    values: Vec<MatchSet>,
    weight: Option<f64>,
    sees_phantoms: bool,
}

impl Selection {
    /// Validates `spec` against the roster's value domains.
    pub fn resolve(kind: RuleKind, spec: &RuleSpec, roster: &Roster) -> Result<Self> {
        let attribute = spec.attribute.clone();
        if !roster.has_attribute(&attribute) {
            return Err(GroupingError::AttributeNotFound {
                rule: kind.name().to_string(),
                attribute,
                available: roster.attributes().to_vec(),
            });
        }

        let domain = roster.value_domain(&attribute);
        let values: Vec<MatchSet> = match &spec.values {
            Some(explicit) if !spec.selects_all() => explicit.clone(),
            _ => domain.iter().cloned().map(MatchSet::Single).collect(),
        };

        let sentinel = Value::from(PHANTOM);
        let bad: Vec<String> = values
            .iter()
            .flat_map(|m| m.values())
            .filter(|v| !domain.contains(*v) && **v != sentinel)
            .map(|v| v.to_string())
            .collect();
        if !bad.is_empty() {
            return Err(GroupingError::InvalidValues {
                rule: kind.name().to_string(),
                attribute,
                values: bad,
            });
        }
        if values.is_empty() {
            return Err(GroupingError::NoValidValues {
                rule: kind.name().to_string(),
                attribute,
            });
        }

        let sees_phantoms = values.iter().any(|m| m.matches(&sentinel));
        Ok(Self {
            attribute,
            values,
            weight: spec.weight,
            sees_phantoms,
        })
    }

    /// Constrained attribute.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Target categories in processing order.
    pub fn values(&self) -> &[MatchSet] {
        &self.values
    }

    /// Reserved weight, carried through to reports.
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// Number of target categories.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the category `record` belongs to.
    pub fn category(&self, record: &Record) -> Option<usize> {
        if record.is_phantom() && !self.sees_phantoms {
            return None;
        }
        let value = record.get(&self.attribute);
        self.values.iter().position(|m| m.matches(value))
    }

    /// Whether `record` has no value this selection can see.
    pub fn is_blank(&self, record: &Record) -> bool {
        (record.is_phantom() && !self.sees_phantoms) || record.get(&self.attribute).is_null()
    }

    /// Members of `view` in category `idx`.
    pub fn count(&self, view: &MemberView<'_>, idx: usize) -> usize {
        view.count_where(|r| self.category(r) == Some(idx))
    }

    /// Member count of every category of `view`.
    pub fn counts(&self, view: &MemberView<'_>) -> Vec<usize> {
        let mut counts = vec![0; self.values.len()];
        for record in view.iter() {
            if let Some(idx) = self.category(record) {
                counts[idx] += 1;
            }
        }
        counts
    }

    /// Reorders categories; `order[i]` is the old index of new category `i`.
    pub(crate) fn reorder(&mut self, order: &[usize]) {
        self.values = order.iter().map(|&i| self.values[i].clone()).collect();
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "{} [{}]", self.attribute, values.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::GroupSizer;

    fn roster() -> Roster {
        let records = (0..9)
            .map(|i| {
                Record::from_pairs([
                    ("id", format!("s{i}")),
                    ("Major", ["CS", "EE", "ME"][i % 3].to_string()),
                    ("Minor", String::new()),
                ])
            })
            .collect();
        Roster::new("id", records, &GroupSizer::parse_size("4").unwrap()).unwrap()
    }

    #[test]
    fn test_rule_names_case_insensitive() {
        assert_eq!("Cluster".parse::<RuleKind>().unwrap(), RuleKind::Cluster);
        assert_eq!("BALANCE".parse::<RuleKind>().unwrap(), RuleKind::Balance);
        assert!(matches!(
            "spread".parse::<RuleKind>(),
            Err(GroupingError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_all_expands_to_domain() {
        let spec = RuleSpec::new("cluster", "Major").with_values(["all"]);
        let sel = Selection::resolve(RuleKind::Cluster, &spec, &roster()).unwrap();
        assert_eq!(sel.len(), 3);
        assert_eq!(sel.to_string(), "Major [CS, EE, ME]");
    }

    #[test]
    fn test_missing_attribute() {
        let spec = RuleSpec::new("cluster", "Year");
        let err = Selection::resolve(RuleKind::Cluster, &spec, &roster()).unwrap_err();
        assert!(matches!(err, GroupingError::AttributeNotFound { .. }));
    }

    #[test]
    fn test_unknown_value_rejected() {
        let spec = RuleSpec::new("distribute", "Major").with_values(["CS", "(EE, BIO)"]);
        match Selection::resolve(RuleKind::Distribute, &spec, &roster()).unwrap_err() {
            GroupingError::InvalidValues { values, .. } => assert_eq!(values, vec!["BIO"]),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_empty_domain_has_no_valid_values() {
        let spec = RuleSpec::new("cluster", "Minor");
        let err = Selection::resolve(RuleKind::Cluster, &spec, &roster()).unwrap_err();
        assert!(matches!(err, GroupingError::NoValidValues { .. }));
    }

    #[test]
    fn test_placeholder_sentinel_allowed_and_seen() {
        let roster = roster();
        let spec = RuleSpec::new("distribute", "id").with_values([PHANTOM]);
        let sel = Selection::resolve(RuleKind::Distribute, &spec, &roster).unwrap();
        let phantoms = roster.records().iter().filter(|r| sel.category(r) == Some(0)).count();
        assert_eq!(phantoms, 3);

        let majors = Selection::resolve(RuleKind::Cluster, &RuleSpec::new("cluster", "Major"), &roster)
            .unwrap();
        let phantom = roster.records().last().unwrap();
        assert!(majors.category(phantom).is_none());
        assert!(majors.is_blank(phantom));
    }

    #[test]
    fn test_compound_category_counts_once() {
        let roster = roster();
        let spec = RuleSpec::new("cluster", "Major").with_values(["(CS, EE)"]);
        let sel = Selection::resolve(RuleKind::Cluster, &spec, &roster).unwrap();
        let view = MemberView::of_ids(&roster, roster.ids());
        assert_eq!(sel.counts(&view), vec![6]);
    }
}
