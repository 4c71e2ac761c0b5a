//! Non-atomic intrusive reference counting.
//!
//! Where `Rc` keeps its counters in a separate header next to the value, an
//! intrusive pointer keeps the count inside the object itself. Any type that
//! embeds a `RefCount` and implements `Countable` can be shared through
//! `OwningPtr`, and a raw pointer to such an object can always be turned back
//! into an owning one, since the object knows its own count.
//!
//! ```
//! use intrusive_ptr::{countable, make_owning, RefCount};
//!
//! struct Object
//! {
//!     refs: RefCount,
//!     value: i32,
//! }
//! countable!(Object, refs);
//!
//! let p1 = make_owning(Object { refs: RefCount::new(), value: 40 });
//! let p2 = p1.clone();
//! let p3 = make_owning(Object { refs: RefCount::new(), value: 40 });
//!
//! assert!(p1 == p2);
//! assert!(p1 != p3);
//! assert_eq!(p2.use_count(), 2);
//! ```
//!
//! Counting is single threaded. There are no weak references, and cycles
//! leak.
//!
//! Features:
//! - `stats` (default): per-thread tallies of counter traffic, see
//!   `get_stats`.
//! - `global`: also keep a process-wide tally behind a lock, see
//!   `get_global_stats`.

pub(crate) mod counter;
pub(crate) mod pointers;
pub(crate) mod stats;

pub use counter::{add_reference, reference_count, release_reference, Countable, RefCount};
pub use pointers::{make_owning, try_make_owning, OwningPtr};
#[cfg(feature = "global")]
pub use stats::get_global_stats;
pub use stats::{get_stats, Stats};
