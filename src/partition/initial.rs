//! Stratified initial partition.
//!
//! # Algorithm
//!
//! 1. Give placeholders the weakest real value of each balanced attribute
//! 2. Rank every record by the tuple of balanced attributes
//! 3. Cut the ranking into `group_size` strata of `n_groups` records each
//! 4. Shuffle each stratum independently
//! 5. Group `i` takes the `i`-th record of every stratum
//!
//! Every group therefore receives exactly one record from each strength band.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::group::{Group, Partition};
use crate::error::Result;
use crate::roster::{RecordId, Roster, Value};

impl Partition {
    /// Builds the stratified initial partition.
    ///
    /// `balanced` lists the attributes of the balance rules in priority
    /// order. Group labels start at `label_offset + 1`.
    ///
    /// Fails with [`GroupingError::UnevenGroups`](crate::GroupingError::UnevenGroups)
    /// if the roster does not fill its grid exactly.
    pub fn stratified<R: Rng>(
        mut roster: Roster,
        balanced: &[&str],
        label_offset: usize,
        rng: &mut R,
    ) -> Result<Self> {
        roster.assign_phantom_strengths(balanced);
        roster.check_shape()?;

        let n_groups = roster.n_groups();
        let mut ranked: Vec<RecordId> = roster.ids().collect();
        ranked.sort_by_cached_key(|&id| {
            balanced
                .iter()
                .map(|a| roster.record(id).get(a).clone())
                .collect::<Vec<Value>>()
        });

        let mut strata: Vec<Vec<RecordId>> = ranked.chunks(n_groups).map(<[_]>::to_vec).collect();
        for stratum in &mut strata {
            stratum.shuffle(rng);
        }

        let groups = (0..n_groups)
            .map(|i| Group::new(label_offset + i + 1, strata.iter().map(|s| s[i]).collect()))
            .collect();

        debug!(
            groups = n_groups,
            strata = strata.len(),
            balanced = ?balanced,
            "built stratified partition"
        );
        Ok(Partition::from_groups(roster, groups))
    }
}
