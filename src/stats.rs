//! Reference counting statistics, for diagnosing leaks and the like.
//!
//! With the `stats` feature every thread keeps its own tally. The `global`
//! feature additionally folds every event into a process-wide tally.

#[cfg(feature = "stats")]
use std::cell::Cell;

#[cfg(feature = "global")]
use lazy_static::lazy_static;
#[cfg(feature = "global")]
use parking_lot::Mutex;

/// Counter traffic observed by `add_reference` and `release_reference`.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stats
{
    /// Number of references taken.
    pub increments: usize,

    /// Number of references given back.
    pub decrements: usize,

    /// Number of objects destroyed on their last release.
    pub destructions: usize,
}

#[allow(dead_code)]
impl Stats
{
    /// References taken and not yet given back. Adopted and detached
    /// references are invisible to the tally, so this can go negative.
    pub fn outstanding(&self) -> isize { self.increments as isize - self.decrements as isize }

    /// Traffic between the `earlier` snapshot and this later one. Swapped
    /// snapshots give zeros rather than underflowing.
    pub fn since(&self, earlier: &Stats) -> Stats
    {
        Stats {
            increments: self.increments.saturating_sub(earlier.increments),
            decrements: self.decrements.saturating_sub(earlier.decrements),
            destructions: self.destructions.saturating_sub(earlier.destructions),
        }
    }
}

#[cfg(feature = "stats")]
thread_local! {
    static LOCAL_STATS: Cell<Stats> = Cell::new(Stats::default());
}

#[cfg(feature = "global")]
lazy_static! {
    static ref GLOBAL_STATS: Mutex<Stats> = Mutex::new(Stats::default());
}

#[cfg(feature = "stats")]
#[inline(always)]
fn update(f: fn(&mut Stats))
{
    LOCAL_STATS.with(|c| {
        let mut s = c.get();
        f(&mut s);
        c.set(s);
    });
    #[cfg(feature = "global")]
    f(&mut GLOBAL_STATS.lock());
}

#[cfg(not(feature = "stats"))]
#[inline(always)]
fn update(_: fn(&mut Stats)) {}

pub(crate) fn record_increment() { update(|s| s.increments += 1) }
pub(crate) fn record_decrement() { update(|s| s.decrements += 1) }
pub(crate) fn record_destruction() { update(|s| s.destructions += 1) }

/// Statistics of the current thread. All zero without the `stats` feature.
pub fn get_stats() -> Stats
{
    #[cfg(feature = "stats")]
    return LOCAL_STATS.with(Cell::get);
    #[cfg(not(feature = "stats"))]
    return Stats::default();
}

/// Statistics of the whole process.
#[cfg(feature = "global")]
pub fn get_global_stats() -> Stats { *GLOBAL_STATS.lock() }
