use std::{any::type_name, cell::Cell, fmt, ptr::NonNull};

use crate::stats;

/// Embedded reference counter.
///
/// Place one of these as a field of any type that should be owned through
/// `OwningPtr`, and expose it through `Countable`. The count starts at zero,
/// meaning no pointer owns the object yet.
///
/// The counter can be read by anyone. It is mutated by `add_reference` and
/// `release_reference`, by `OwningPtr::try_into_inner` when it gives the sole
/// count back before moving the value out, and by `OwningPtr::with_mut` and
/// `From<Box<T>>`, which put back the count the pointer already accounts for.
pub struct RefCount
{
    count: Cell<u32>,
}

impl RefCount
{
    pub const fn new() -> Self
    {
        Self {
            count: Cell::new(0),
        }
    }

    /// Current number of owning references.
    pub fn get(&self) -> u32 { self.count.get() }

    fn increment(&self)
    {
        let n = self.count.get();
        if n == u32::MAX {
            log::error!("reference count overflow, aborting");
            std::process::abort();
        }
        self.count.set(n + 1);
    }

    /// Overwrite the count with one already known to be correct for the
    /// allocation this counter lives in.
    pub(crate) fn restore(&self, n: u32) { self.count.set(n) }

    fn decrement(&self) -> u32
    {
        let n = self.count.get();
        debug_assert!(n != 0, "reference count underflow");
        let n = n.wrapping_sub(1);
        self.count.set(n);
        n
    }
}

impl Default for RefCount
{
    fn default() -> Self { Self::new() }
}

/// A copy of an object is a new object; nobody owns it yet.
impl Clone for RefCount
{
    fn clone(&self) -> Self { Self::new() }
}

impl fmt::Debug for RefCount
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_tuple("RefCount").field(&self.get()).finish()
    }
}

/// Capability of carrying an intrusive reference count.
///
/// The trait is object safe, so `dyn Trait` where `Trait: Countable` can be
/// owned by an `OwningPtr` and is destroyed through its concrete type.
///
/// # Safety
///
/// `ref_count` must return a counter that is stored inside `self` and is the
/// same counter on every call for the lifetime of the object.
pub unsafe trait Countable
{
    fn ref_count(&self) -> &RefCount;

    /// Current number of owning references to this object.
    fn reference_count(&self) -> u32 { self.ref_count().get() }
}

/// Implement `Countable` for a type with an embedded `RefCount` field.
///
/// Generic types name their parameters: `countable!(impl<T> Node<T>, refs)`.
///
/// ```
/// use intrusive_ptr::{countable, make_owning, RefCount};
///
/// struct Node
/// {
///     refs: RefCount,
///     value: i32,
/// }
/// countable!(Node, refs);
///
/// let p = make_owning(Node { refs: RefCount::new(), value: 7 });
/// assert_eq!(p.use_count(), 1);
/// assert_eq!(p.value, 7);
/// ```
#[macro_export]
macro_rules! countable {
    (impl<$($g:ident),+> $ty:ty, $field:ident) => {
        unsafe impl<$($g),+> $crate::Countable for $ty
        {
            fn ref_count(&self) -> &$crate::RefCount { &self.$field }
        }
    };
    ($ty:ty, $field:ident) => {
        unsafe impl $crate::Countable for $ty
        {
            fn ref_count(&self) -> &$crate::RefCount { &self.$field }
        }
    };
}

/// Take one more owning reference to `obj`.
///
/// # Safety
///
/// `obj` must point to a live, `Box`-allocated object. The caller becomes
/// responsible for exactly one matching `release_reference`.
pub unsafe fn add_reference<T: ?Sized + Countable>(obj: NonNull<T>)
{
    obj.as_ref().ref_count().increment();
    stats::record_increment();
}

/// Give back one owning reference to `obj`, destroying it when that was the
/// last one.
///
/// # Safety
///
/// `obj` must point to a live object allocated by `Box`, and the caller must
/// own one of its counted references. After this call `obj` must be
/// considered dangling.
pub unsafe fn release_reference<T: ?Sized + Countable>(obj: NonNull<T>)
{
    stats::record_decrement();
    if obj.as_ref().ref_count().decrement() == 0 {
        log::trace!("destroying {} at {:p}", type_name::<T>(), obj);
        stats::record_destruction();
        drop(Box::from_raw(obj.as_ptr()));
    }
}

/// Give back one owning reference to `obj` without destroying it.
///
/// Used when the value is about to be moved out of its allocation.
///
/// # Safety
///
/// As for `release_reference`, and the caller must hold the only reference.
pub(crate) unsafe fn relinquish_reference<T: ?Sized + Countable>(obj: NonNull<T>)
{
    stats::record_decrement();
    let remaining = obj.as_ref().ref_count().decrement();
    debug_assert_eq!(remaining, 0, "relinquishing a shared object");
}

/// Number of owning references to `obj`.
pub fn reference_count<T: ?Sized + Countable>(obj: &T) -> u32 { obj.ref_count().get() }
