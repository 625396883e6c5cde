//! Attribute values and target categories.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single attribute value of a record.
///
/// Values are totally ordered (`Null < Number < Text`, numbers by
/// [`f64::total_cmp`]) so they can key value domains and counters.
///
/// # Examples
///
/// ```
/// use u_cohort::roster::Value;
///
/// assert_eq!(Value::parse("3.5"), Value::Number(3.5));
/// assert_eq!(Value::parse(" M "), Value::from("M"));
/// assert!(Value::parse("").is_null());
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Missing value.
    #[default]
    Null,
    /// Numeric value.
    Number(f64),
    /// Free text value.
    Text(String),
}

impl Value {
    /// Interprets raw text: blank is `Null`, numeric text is a `Number`,
    /// anything else is trimmed `Text`.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Number(i as f64);
        }
        match s.parse::<f64>() {
            Ok(x) if x.is_finite() => Value::Number(x),
            _ => Value::Text(s.to_string()),
        }
    }

    /// Whether this value is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The numeric payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(x) => Some(*x),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Number(x) => x.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Number(x) if x.fract() == 0.0 && x.abs() < 1e15 => write!(f, "{}", *x as i64),
            Value::Number(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Number(x as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// A target category of a rule: one value, or several values counted as one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum MatchSet {
    /// Matches exactly this value.
    Single(Value),
    /// Matches any of these values (a compound category).
    AnyOf(BTreeSet<Value>),
}

impl MatchSet {
    /// Parses a category. `"(a, b, c)"` becomes a compound category, any
    /// other text a single value.
    ///
    /// ```
    /// use u_cohort::roster::{MatchSet, Value};
    ///
    /// let m = MatchSet::parse("(CS, EE)");
    /// assert!(m.matches(&Value::from("EE")));
    /// assert!(!m.matches(&Value::from("ME")));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            if inner.contains(',') {
                let parts = inner
                    .split(',')
                    .map(Value::parse)
                    .filter(|v| !v.is_null())
                    .collect();
                return MatchSet::AnyOf(parts);
            }
        }
        MatchSet::Single(Value::parse(s))
    }

    /// Whether `value` belongs to this category. `Null` never matches.
    pub fn matches(&self, value: &Value) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            MatchSet::Single(v) => v == value,
            MatchSet::AnyOf(vs) => vs.contains(value),
        }
    }

    /// Every concrete value this category names.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            MatchSet::Single(v) => vec![v],
            MatchSet::AnyOf(vs) => vs.iter().collect(),
        }
    }
}

impl From<Value> for MatchSet {
    fn from(v: Value) -> Self {
        MatchSet::Single(v)
    }
}

impl From<&str> for MatchSet {
    fn from(s: &str) -> Self {
        MatchSet::parse(s)
    }
}

impl fmt::Display for MatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSet::Single(v) => write!(f, "{v}"),
            MatchSet::AnyOf(vs) => {
                let parts: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers_and_text() {
        assert_eq!(Value::parse("42"), Value::Number(42.0));
        assert_eq!(Value::parse("3.25"), Value::Number(3.25));
        assert_eq!(Value::parse("abc"), Value::Text("abc".into()));
        assert_eq!(Value::parse("   "), Value::Null);
        assert_eq!(Value::parse("NaN"), Value::Text("NaN".into()));
    }

    #[test]
    fn test_value_ordering() {
        let mut vals = vec![
            Value::from("b"),
            Value::Number(2.0),
            Value::Null,
            Value::from("a"),
            Value::Number(-1.0),
        ];
        vals.sort();
        assert_eq!(
            vals,
            vec![
                Value::Null,
                Value::Number(-1.0),
                Value::Number(2.0),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_display_integral_numbers() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_compound_match_set() {
        let m = MatchSet::parse("(M, F)");
        assert_eq!(m.values().len(), 2);
        assert!(m.matches(&Value::from("M")));
        assert!(m.matches(&Value::from("F")));
        assert!(!m.matches(&Value::Null));
        assert_eq!(m.to_string(), "(F, M)");
    }

    #[test]
    fn test_parenthesised_single_is_not_compound() {
        assert_eq!(MatchSet::parse("(x)"), MatchSet::Single(Value::from("(x)")));
    }

    #[test]
    fn test_single_never_matches_null() {
        let m = MatchSet::Single(Value::Null);
        assert!(!m.matches(&Value::Null));
    }
}
