use super::counter::{add_reference, relinquish_reference, release_reference, Countable};
use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem,
    ops::Deref,
    ptr::{self, NonNull},
};

/// Shared owning pointer to an object carrying its own reference count.
///
/// Every non-null `OwningPtr` accounts for exactly one count in the
/// pointee's `RefCount`. Cloning takes another count, dropping gives one
/// back, and the object is destroyed, through its concrete type, when the
/// last count is given back.
///
/// Counting is not atomic; `OwningPtr` is neither `Send` nor `Sync`. With
/// the `stats` feature every count change also bumps a thread-local tally,
/// and with `global` it takes a process-wide lock as well.
///
/// Equality and hashing are by object identity, not by value.
pub struct OwningPtr<T: ?Sized + Countable>
{
    ptr: Option<NonNull<T>>,
    _phantom: PhantomData<T>,
}

/// Allocate `value` and return its first owner.
pub fn make_owning<T: Countable>(value: T) -> OwningPtr<T> { OwningPtr::from(Box::new(value)) }

/// Like `make_owning`, but for constructors that can fail. The error is
/// returned untouched and nothing is allocated.
pub fn try_make_owning<T, E, F>(f: F) -> Result<OwningPtr<T>, E>
where
    T: Countable,
    F: FnOnce() -> Result<T, E>,
{
    Ok(make_owning(f()?))
}

#[allow(dead_code)]
impl<T: Countable> OwningPtr<T>
{
    /// Allocate a new object. A wrapper for `make_owning`.
    pub fn new(value: T) -> Self { make_owning(value) }

    /// Take the object back out of its allocation.
    ///
    /// Fails, handing the pointer back, if it is null or the object has
    /// other owners.
    pub fn try_into_inner(mut self) -> Result<T, Self>
    {
        if !self.is_unique() {
            return Err(self);
        }
        match self.detach() {
            Some(p) => unsafe {
                relinquish_reference(p);
                Ok(*Box::from_raw(p.as_ptr()))
            },
            None => Err(self),
        }
    }
}

#[allow(dead_code)]
impl<T: ?Sized + Countable> OwningPtr<T>
{
    /// Pointer that owns nothing.
    pub const fn null() -> Self
    {
        Self {
            ptr: None,
            _phantom: PhantomData,
        }
    }

    /// Take a new counted reference to the object behind `raw`.
    ///
    /// A null `raw` gives a null pointer.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to a live object allocated by `Box`.
    pub unsafe fn retain(raw: *mut T) -> Self
    {
        let ptr = NonNull::new(raw);
        if let Some(p) = ptr {
            add_reference(p);
        }
        Self {
            ptr,
            _phantom: PhantomData,
        }
    }

    /// Take over a reference that is already counted, without incrementing.
    ///
    /// This is the inverse of `detach` and `into_raw`.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to a live object allocated by `Box`, and
    /// the caller must own one counted reference to it, which is transferred
    /// to the returned pointer.
    pub unsafe fn adopt(raw: *mut T) -> Self
    {
        Self {
            ptr: NonNull::new(raw),
            _phantom: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool { self.ptr.is_none() }

    pub fn is_some(&self) -> bool { self.ptr.is_some() }

    /// Borrow the pointee, if any. Does not touch the count.
    pub fn get(&self) -> Option<&T> { self.ptr.map(|p| unsafe { &*p.as_ptr() }) }

    /// Raw address of the pointee, if any. Does not touch the count.
    pub fn as_ptr(&self) -> Option<NonNull<T>> { self.ptr }

    /// Mutable access, only while this is the sole owner.
    ///
    /// # Safety
    ///
    /// The pointee's `RefCount` must not be overwritten or moved out through
    /// the returned reference, so no assigning or swapping the whole value.
    /// Use `with_mut` for that.
    pub unsafe fn get_mut(&mut self) -> Option<&mut T>
    {
        if self.is_unique() {
            self.ptr.map(|p| &mut *p.as_ptr())
        } else {
            None
        }
    }

    /// Run `f` on the pointee, only while this is the sole owner.
    ///
    /// `f` may replace the whole value. The count this pointer accounts for
    /// is put back afterwards, also when `f` panics. A value moved out keeps
    /// whatever count it had, which `From<Box<T>>` and `make_owning` ignore.
    pub fn with_mut<R, F: FnOnce(&mut T) -> R>(&mut self, f: F) -> Option<R>
    {
        if !self.is_unique() {
            return None;
        }
        let p = self.ptr?;
        let _restore = RestoreCount(p);
        Some(f(unsafe { &mut *p.as_ptr() }))
    }

    /// Number of owners of the pointee; zero for a null pointer.
    pub fn use_count(&self) -> u32 { self.get().map_or(0, |it| it.reference_count()) }

    pub fn is_unique(&self) -> bool { self.use_count() == 1 }

    /// Whether both pointers name the same object. Two null pointers are
    /// equal.
    pub fn ptr_eq(&self, other: &Self) -> bool { self.addr() == other.addr() }

    /// Clear this pointer and hand out its counted reference.
    ///
    /// The count is left as it is; the caller takes over the duty of giving
    /// it back, typically through `adopt`.
    pub fn detach(&mut self) -> Option<NonNull<T>> { self.ptr.take() }

    /// Consuming version of `detach`.
    pub fn into_raw(mut self) -> Option<NonNull<T>> { self.detach() }

    /// Move the owned reference out, leaving this pointer null.
    pub fn take(&mut self) -> Self
    {
        Self {
            ptr: self.ptr.take(),
            _phantom: PhantomData,
        }
    }

    /// Give back the owned reference, if any, and become null.
    pub fn reset(&mut self) { drop(self.take()) }

    /// Point at `raw` instead, taking a new counted reference to it.
    ///
    /// The new reference is taken before the old one is given back, so
    /// resetting to the object already held never destroys it.
    ///
    /// # Safety
    ///
    /// As for `retain`.
    pub unsafe fn reset_retain(&mut self, raw: *mut T) { self.replace_slot(Self::retain(raw)) }

    /// Point at `raw` instead, adopting an already counted reference.
    ///
    /// # Safety
    ///
    /// As for `adopt`.
    pub unsafe fn reset_adopt(&mut self, raw: *mut T) { self.replace_slot(Self::adopt(raw)) }

    /// Move-assign: give back the current reference, then take over the one
    /// held by `source`, leaving `source` null. The count of the transferred
    /// object does not change.
    pub fn assign_from(&mut self, source: &mut Self)
    {
        let incoming = source.take();
        self.replace_slot(incoming);
    }

    /// Exchange the objects the two pointers refer to. No count changes.
    pub fn swap(&mut self, other: &mut Self) { mem::swap(&mut self.ptr, &mut other.ptr) }

    fn replace_slot(&mut self, incoming: Self) { drop(mem::replace(self, incoming)) }

    fn addr(&self) -> *const () { self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const ()) }
}

impl<T: ?Sized + Countable> From<Box<T>> for OwningPtr<T>
{
    /// A boxed object has no other owner, so any count it carries is stale.
    fn from(it: Box<T>) -> Self
    {
        it.ref_count().restore(0);
        unsafe { Self::retain(Box::into_raw(it)) }
    }
}

/// Puts back the count of a uniquely owned object.
struct RestoreCount<T: ?Sized + Countable>(NonNull<T>);

impl<T: ?Sized + Countable> Drop for RestoreCount<T>
{
    fn drop(&mut self) { unsafe { self.0.as_ref() }.ref_count().restore(1) }
}

impl<T: ?Sized + Countable> Default for OwningPtr<T>
{
    fn default() -> Self { Self::null() }
}

impl<T: ?Sized + Countable> Clone for OwningPtr<T>
{
    fn clone(&self) -> Self
    {
        let ptr = self.ptr;
        if let Some(p) = ptr {
            unsafe { add_reference(p) }
        }
        Self {
            ptr,
            _phantom: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self)
    {
        if !self.ptr_eq(source) {
            self.replace_slot(source.clone());
        }
    }
}

impl<T: ?Sized + Countable> Drop for OwningPtr<T>
{
    fn drop(&mut self)
    {
        if let Some(p) = self.ptr.take() {
            unsafe { release_reference(p) }
        }
    }
}

impl<T: ?Sized + Countable> Deref for OwningPtr<T>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.get() {
            Some(it) => it,
            None => panic!("dereferenced a null OwningPtr"),
        }
    }
}

impl<T: ?Sized + Countable> PartialEq for OwningPtr<T>
{
    fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}

impl<T: ?Sized + Countable> Eq for OwningPtr<T> {}

impl<T: ?Sized + Countable> Hash for OwningPtr<T>
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.addr().hash(state) }
}

impl<T: ?Sized + Countable + fmt::Debug> fmt::Debug for OwningPtr<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.get() {
            Some(it) => f.debug_tuple("OwningPtr").field(&it).finish(),
            None => f.write_str("OwningPtr(null)"),
        }
    }
}

impl<T: ?Sized + Countable> fmt::Pointer for OwningPtr<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Pointer::fmt(&self.addr(), f) }
}
