//! Groups, the partition arena and the stratified initial partition.
//!
//! Records live in the [`Roster`](crate::roster::Roster) owned by a
//! [`Partition`]; groups refer to records by [`RecordId`](crate::roster::RecordId)
//! and records refer back to their group by [`GroupId`]. Membership only
//! changes through [`Partition::swap`].

mod group;
mod initial;
mod view;

pub use group::{Group, GroupId, Partition};
pub use view::{mean, std_dev, MemberView};
