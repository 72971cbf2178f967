//! Region visibility control
//!
//! Features are grouped into regions; a region exposes a set of packages.
//! The [`RegionFilter`] hook hides package providers from requesters outside
//! their feature unless the package is exposed to one of the requester's
//! regions or to the reserved `global` region.

pub mod filter;
pub mod properties;
pub mod store;

pub use filter::{RegionFilter, UnclassifiedPolicy};
pub use store::MembershipIndex;
