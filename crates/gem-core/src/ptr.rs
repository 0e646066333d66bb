use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::Deref;

use gem_types::GemResult;

use crate::generic::Generic;
use crate::interface::{Interface, RawInterface};

/// Owned, counted handle to an interface of a live object.
///
/// Holds exactly one reference: `Clone` acquires, `Drop` releases, moves
/// transfer the claim untouched. The empty handle is `Option<Ptr<I>>::None`.
pub struct Ptr<I: ?Sized + Interface> {
    raw: RawInterface<I>,
}

// SAFETY: the pointee is only reached through `&I`, and the count is
// atomic, so sharing is sound whenever `I` itself may be shared.
unsafe impl<I: ?Sized + Interface + Send + Sync> Send for Ptr<I> {}
unsafe impl<I: ?Sized + Interface + Send + Sync> Sync for Ptr<I> {}

impl<I: ?Sized + Interface> Ptr<I> {
    /// Take over the counted reference carried by `raw`.
    ///
    /// # Safety
    /// `raw` must point into a live object and carry one counted reference
    /// that nobody else will release.
    pub unsafe fn from_raw(raw: RawInterface<I>) -> Self {
        Self { raw }
    }

    /// Acquire a new reference for a borrowed pointer.
    ///
    /// # Safety
    /// `raw` must point into a live object for the duration of the call.
    pub unsafe fn from_borrowed(raw: RawInterface<I>) -> Self {
        raw.identity().as_ref().acquire();
        Self { raw }
    }

    /// Give up the handle without releasing; the caller now owns the
    /// reference.
    pub fn into_raw(self) -> RawInterface<I> {
        let this = ManuallyDrop::new(self);
        this.raw
    }

    /// Borrowed pointer for APIs that do not take ownership.
    pub fn as_raw(&self) -> RawInterface<I> {
        self.raw
    }

    /// The base capability that manages this handle's count.
    pub fn identity(&self) -> &dyn Generic {
        // SAFETY: the handle's reference keeps the object alive.
        unsafe { self.raw.identity().as_ref() }
    }

    /// Query the same object for contract `J`.
    pub fn query<J: ?Sized + Interface>(&self) -> GemResult<Ptr<J>> {
        self.identity().query::<J>()
    }

    /// Point this handle at `source`'s interface.
    ///
    /// The new reference is acquired before the old one is released, and
    /// reassigning the same pointer touches nothing, so the count of an
    /// object reachable through both never transiently hits zero.
    pub fn assign(&mut self, source: &Ptr<I>) {
        if self.ptr_eq(source) {
            return;
        }
        source.identity().acquire();
        let old = std::mem::replace(&mut self.raw, source.raw);
        // SAFETY: `old` carried this handle's reference.
        drop(unsafe { Ptr::from_raw(old) });
    }

    /// `true` if both handles point at the same interface view of the same
    /// object. Views alone are not enough: a component may hand out one
    /// shared view from several objects.
    pub fn ptr_eq(&self, other: &Ptr<I>) -> bool {
        self.raw.addr() == other.raw.addr()
            && self.raw.identity_addr() == other.raw.identity_addr()
    }

    /// Identity test: both handles belong to the same logical object iff
    /// their base capabilities are the same pointer.
    pub fn same_object<J: ?Sized + Interface>(&self, other: &Ptr<J>) -> GemResult<bool> {
        let mine = self.query::<dyn Generic>()?;
        let theirs = other.query::<dyn Generic>()?;
        Ok(mine.ptr_eq(&theirs))
    }

    /// Current count of the underlying object, for diagnostics.
    pub fn ref_count(&self) -> u32 {
        self.identity().ref_count()
    }
}

impl<I: ?Sized + Interface> Clone for Ptr<I> {
    fn clone(&self) -> Self {
        self.identity().acquire();
        Self { raw: self.raw }
    }
}

impl<I: ?Sized + Interface> Drop for Ptr<I> {
    fn drop(&mut self) {
        // SAFETY: the handle owns one reference and is never used again.
        unsafe {
            self.raw.identity().as_ref().release();
        }
    }
}

impl<I: ?Sized + Interface> Deref for Ptr<I> {
    type Target = I;

    fn deref(&self) -> &I {
        // SAFETY: the handle's reference keeps the view alive.
        unsafe { self.raw.view().as_ref() }
    }
}

impl<I: ?Sized + Interface> fmt::Debug for Ptr<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ptr<{}>({:p})", I::NAME, self.raw.addr())
    }
}
