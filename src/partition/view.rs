//! Multiset view over a set of records.

use crate::roster::{Record, RecordId, Roster};

/// A borrowed multiset of records that rules evaluate.
///
/// Built explicitly either from a group's current membership
/// ([`Partition::view`](super::Partition::view)), from a hypothetical
/// membership ([`MemberView::exchanged`]), or from any list of ids.
#[derive(Debug, Clone)]
pub struct MemberView<'a> {
    records: Vec<&'a Record>,
}

impl<'a> MemberView<'a> {
    /// Wraps already-borrowed records.
    pub fn new(records: Vec<&'a Record>) -> Self {
        Self { records }
    }

    /// View over the given ids of `roster`.
    pub fn of_ids(roster: &'a Roster, ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            records: ids.into_iter().map(|id| roster.record(id)).collect(),
        }
    }

    /// View over `members` with `out` replaced by `incoming`.
    pub fn exchanged(
        roster: &'a Roster,
        members: &[RecordId],
        out: RecordId,
        incoming: RecordId,
    ) -> Self {
        Self::of_ids(
            roster,
            members
                .iter()
                .map(|&m| if m == out { incoming } else { m }),
        )
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    /// Number of members satisfying `pred`.
    pub fn count_where(&self, pred: impl Fn(&Record) -> bool) -> usize {
        self.records.iter().filter(|r| pred(r)).count()
    }

    /// Mean of the numeric values of `attribute`; `None` when no member has
    /// one.
    pub fn mean(&self, attribute: &str) -> Option<f64> {
        mean(self.records.iter().filter_map(|r| r.get(attribute).as_number()))
    }
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Population standard deviation, `None` for an empty input.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values.iter().copied())?;
    let var = values.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{GroupSizer, Value};

    #[test]
    fn test_mean_skips_nulls() {
        let records = vec![
            Record::from_pairs([("id", "a"), ("GPA", "3")]),
            Record::from_pairs([("id", "b"), ("GPA", "")]),
            Record::from_pairs([("id", "c"), ("GPA", "4")]),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let view = MemberView::new(refs);
        assert_eq!(view.mean("GPA"), Some(3.5));
        assert_eq!(view.mean("id"), None);
        assert_eq!(view.count_where(|r| r.get("GPA").is_null()), 1);
    }

    #[test]
    fn test_exchanged_view() {
        let records = (0..4)
            .map(|i| Record::from_pairs([("id", i.to_string())]))
            .collect();
        let roster = Roster::new("id", records, &GroupSizer::parse_size("2").unwrap()).unwrap();
        let view = MemberView::exchanged(&roster, &[RecordId(0), RecordId(1)], RecordId(1), RecordId(3));
        let ids: Vec<&Value> = view.iter().map(|r| r.get("id")).collect();
        assert_eq!(ids, vec![&Value::Number(0.0), &Value::Number(3.0)]);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(2.0));
        assert_eq!(std_dev(&[]), None);
    }
}
