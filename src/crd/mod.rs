//! # Custom Resource Definitions
//!
//! whereabouts IPAM resources read and repaired by the reconciler.
//!
//! ## Module Structure
//!
//! - `ip_pool.rs` - Per-range allocation state
//! - `overlapping_range.rs` - Cluster-wide single-address reservations

mod ip_pool;
mod overlapping_range;

pub use ip_pool::{IpAllocation, IpPool, IpPoolSpec};
pub use overlapping_range::{OverlappingRangeIpReservation, OverlappingRangeIpReservationSpec};
