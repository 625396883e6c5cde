//! The padded roster.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use super::record::{Record, RecordId};
use super::sizer::{GroupShape, GroupSizer};
use super::value::Value;
use crate::error::{GroupingError, Result};

/// Ordered record collection padded to an exact group grid.
///
/// Value domains are computed once from the real (non-placeholder) records
/// and are kept unchanged by [`Roster::split_by`], so rules built against a
/// sub-roster validate against the whole class.
///
/// # Examples
///
/// ```
/// use u_cohort::roster::{GroupSizer, Record, Roster};
///
/// let records: Vec<Record> = (0..26)
///     .map(|i| Record::from_pairs([("id", i.to_string())]))
///     .collect();
/// let roster = Roster::new("id", records, &GroupSizer::parse_size("4+").unwrap()).unwrap();
/// assert_eq!(roster.len(), 30);
/// assert_eq!(roster.real_len(), 26);
/// ```
#[derive(Debug, Clone)]
pub struct Roster {
    identifier: String,
    records: Vec<Record>,
    keys: Vec<String>,
    shape: GroupShape,
    domains: BTreeMap<String, BTreeSet<Value>>,
}

impl Roster {
    /// Validates `records`, sizes the grid and appends placeholders.
    pub fn new(identifier: impl Into<String>, records: Vec<Record>, sizer: &GroupSizer) -> Result<Self> {
        let identifier = identifier.into();
        let keys = validate_records(&identifier, &records)?;
        let domains = keys
            .iter()
            .map(|k| (k.clone(), domain_of(&records, k)))
            .collect();
        Self::with_domains(identifier, records, keys, domains, sizer)
    }

    fn with_domains(
        identifier: String,
        mut records: Vec<Record>,
        keys: Vec<String>,
        domains: BTreeMap<String, BTreeSet<Value>>,
        sizer: &GroupSizer,
    ) -> Result<Self> {
        let real = records.len();
        let shape = sizer.shape(real)?;
        let phantoms = shape.placeholders(real);
        records.extend((0..phantoms).map(|_| Record::phantom(&keys, &identifier)));
        debug!(description = %sizer.describe(real), "sized roster");
        Ok(Self {
            identifier,
            records,
            keys,
            shape,
            domains,
        })
    }

    /// Splits the real records on `attribute`, one sub-roster per distinct
    /// value in order of first appearance (nulls form their own sub-roster).
    /// Each sub-roster is sized independently and keeps this roster's value
    /// domains.
    pub fn split_by(&self, attribute: &str, sizer: &GroupSizer) -> Result<Vec<Roster>> {
        let mut order: Vec<&Value> = Vec::new();
        let mut buckets: BTreeMap<&Value, Vec<Record>> = BTreeMap::new();
        for record in self.real_records() {
            let value = record.get(attribute);
            let bucket = buckets.entry(value).or_insert_with(|| {
                order.push(value);
                Vec::new()
            });
            let mut copy = record.clone();
            copy.set_group(None);
            bucket.push(copy);
        }
        order
            .into_iter()
            .map(|value| {
                let records = buckets.remove(value).unwrap_or_default();
                Self::with_domains(
                    self.identifier.clone(),
                    records,
                    self.keys.clone(),
                    self.domains.clone(),
                    sizer,
                )
            })
            .collect()
    }

    /// Name of the identifier attribute.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Grid this roster was padded to.
    pub fn shape(&self) -> GroupShape {
        self.shape
    }

    /// Slots per group.
    pub fn group_size(&self) -> usize {
        self.shape.group_size
    }

    /// Number of groups.
    pub fn n_groups(&self) -> usize {
        self.shape.n_groups
    }

    /// Record count including placeholders.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the roster holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record count excluding placeholders.
    pub fn real_len(&self) -> usize {
        self.records.iter().filter(|r| !r.is_phantom()).count()
    }

    /// Attribute names shared by every record.
    pub fn attributes(&self) -> &[String] {
        &self.keys
    }

    /// Whether records carry `attribute`.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.keys.iter().any(|k| k == attribute)
    }

    /// Distinct non-null values of `attribute` over the real records.
    pub fn value_domain(&self, attribute: &str) -> BTreeSet<Value> {
        self.domains.get(attribute).cloned().unwrap_or_default()
    }

    /// All records, placeholders included.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Real records only.
    pub fn real_records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| !r.is_phantom())
    }

    /// Ids of every record, placeholders included.
    pub fn ids(&self) -> impl Iterator<Item = RecordId> {
        (0..self.records.len()).map(RecordId)
    }

    /// Looks up a record.
    pub fn record(&self, id: RecordId) -> &Record {
        &self.records[id.index()]
    }

    pub(crate) fn record_mut(&mut self, id: RecordId) -> &mut Record {
        &mut self.records[id.index()]
    }

    /// Fails with [`GroupingError::UnevenGroups`] unless the records fill the
    /// grid exactly.
    pub fn check_shape(&self) -> Result<()> {
        if self.records.len() != self.shape.slots() {
            return Err(GroupingError::UnevenGroups {
                records: self.records.len(),
                group_size: self.shape.group_size,
                n_groups: self.shape.n_groups,
            });
        }
        Ok(())
    }

    /// Gives placeholders the smallest real value of each attribute so they
    /// weigh on group means like the weakest record.
    pub fn assign_phantom_strengths(&mut self, attributes: &[&str]) {
        for attribute in attributes {
            let floor = self
                .real_records()
                .filter_map(|r| r.get(attribute).as_number())
                .min_by(f64::total_cmp);
            let Some(floor) = floor else { continue };
            for record in self.records.iter_mut().filter(|r| r.is_phantom()) {
                record.set(*attribute, Value::Number(floor));
            }
        }
    }
}

fn validate_records(identifier: &str, records: &[Record]) -> Result<Vec<String>> {
    let first = records
        .first()
        .ok_or_else(|| GroupingError::InvalidRoster("roster has no records".into()))?;
    let keys: Vec<String> = first.keys().cloned().collect();
    if keys.is_empty() {
        return Err(GroupingError::InvalidRoster("records carry no attributes".into()));
    }
    if !first.has_attribute(identifier) {
        return Err(GroupingError::InvalidRoster(format!(
            "identifier attribute {identifier:?} not found, valid attributes are: {keys:?}"
        )));
    }
    let mut seen = HashSet::new();
    for (i, record) in records.iter().enumerate() {
        if !record.keys().eq(keys.iter()) {
            return Err(GroupingError::InvalidRoster(format!(
                "record {i} does not carry the same attributes as record 0"
            )));
        }
        let id = record.get(identifier);
        if id.is_null() {
            return Err(GroupingError::InvalidRoster(format!("record {i} has no identifier")));
        }
        if !seen.insert(id) {
            return Err(GroupingError::InvalidRoster(format!("duplicate identifier {id}")));
        }
    }
    Ok(keys)
}

fn domain_of(records: &[Record], attribute: &str) -> BTreeSet<Value> {
    records
        .iter()
        .filter(|r| !r.is_phantom())
        .map(|r| r.get(attribute))
        .filter(|v| !v.is_null())
        .cloned()
        .collect()
}
