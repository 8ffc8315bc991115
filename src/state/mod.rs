//! Cross-invocation state: recent posts and the thread cadence counter.
//!
//! Both live in small JSON files under the state directory, each guarded by
//! a co-located `.lock` file for the duration of a read-modify-write.

pub mod cadence;
pub mod recent;

pub use cadence::{CadenceAction, CadenceCounter, CadenceState};
pub use recent::{RecentPosts, RecencyTracker, RECENT_CAPACITY, RECENT_CHECK_WINDOW};
