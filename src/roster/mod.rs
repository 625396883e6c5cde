//! Records, sizing and the padded roster.
//!
//! A [`Roster`] is built once per run from the input collaborator's records
//! and a [`GroupSizer`]. It pads itself with placeholder records so that its
//! length is exactly `group_size * n_groups`.

mod course;
mod record;
mod sizer;
mod value;

pub use course::Roster;
pub use record::{Record, RecordId, PHANTOM};
pub use sizer::{GroupShape, GroupSizer, SizingConfig, UnevenPolicy};
pub use value::{MatchSet, Value};
