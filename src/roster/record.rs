//! Roster records.

use std::collections::BTreeMap;

use super::value::Value;
use crate::partition::GroupId;

/// Identifier value carried by placeholder records.
pub const PHANTOM: &str = "phantom";

/// Index of a record inside its roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordId(pub usize);

impl RecordId {
    /// Position in the roster's record table.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single entity to be grouped.
///
/// Attributes are looked up by name; absent names read as [`Value::Null`].
/// The group back-reference is maintained by
/// [`Partition`](crate::partition::Partition) and is `None` until the initial
/// partition is built.
///
/// # Examples
///
/// ```
/// use u_cohort::roster::{Record, Value};
///
/// let r = Record::from_pairs([("Name", "ada"), ("Major", "CS"), ("GPA", "3.9")]);
/// assert_eq!(r.get("GPA"), &Value::Number(3.9));
/// assert!(r.get("Missing").is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    attributes: BTreeMap<String, Value>,
    #[cfg_attr(feature = "serde", serde(default))]
    phantom: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    group: Option<GroupId>,
}

static NULL: Value = Value::Null;

impl Record {
    /// Creates a record from an attribute map.
    pub fn new(attributes: BTreeMap<String, Value>) -> Self {
        Self {
            attributes,
            phantom: false,
            group: None,
        }
    }

    /// Creates a record from raw `(attribute, text)` pairs, parsing each
    /// text with [`Value::parse`].
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::parse(v.as_ref())))
                .collect(),
        )
    }

    /// Creates a placeholder: every key null except `identifier`, which holds
    /// [`PHANTOM`].
    pub fn phantom<'a>(keys: impl IntoIterator<Item = &'a String>, identifier: &str) -> Self {
        let mut attributes: BTreeMap<String, Value> =
            keys.into_iter().map(|k| (k.clone(), Value::Null)).collect();
        attributes.insert(identifier.to_string(), Value::from(PHANTOM));
        Self {
            attributes,
            phantom: true,
            group: None,
        }
    }

    /// Reads an attribute.
    pub fn get(&self, attribute: &str) -> &Value {
        self.attributes.get(attribute).unwrap_or(&NULL)
    }

    /// Overwrites an attribute.
    pub fn set(&mut self, attribute: impl Into<String>, value: Value) {
        self.attributes.insert(attribute.into(), value);
    }

    /// Whether the record carries this attribute key (possibly null).
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.contains_key(attribute)
    }

    /// Attribute names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.attributes.keys()
    }

    /// All attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Whether this record is padding.
    pub fn is_phantom(&self) -> bool {
        self.phantom
    }

    /// The group currently holding this record.
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub(crate) fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phantom_is_null_except_identifier() {
        let keys = vec!["Name".to_string(), "GPA".to_string(), "Major".to_string()];
        let p = Record::phantom(&keys, "Name");
        assert!(p.is_phantom());
        assert_eq!(p.get("Name"), &Value::from(PHANTOM));
        assert!(p.get("GPA").is_null());
        assert!(p.get("Major").is_null());
        assert_eq!(p.keys().count(), 3);
        assert!(p.group().is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let mut r = Record::from_pairs([("id", "1"), ("score", "")]);
        assert!(r.get("score").is_null());
        r.set("score", Value::Number(2.0));
        assert_eq!(r.get("score").as_number(), Some(2.0));
        assert!(r.has_attribute("score"));
        assert!(!r.has_attribute("other"));
    }
}
