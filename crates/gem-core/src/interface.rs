use std::any::Any;
use std::fmt;
use std::ptr::NonNull;

use gem_types::InterfaceId;

use crate::generic::Generic;

/// An interface contract, implemented for the contract's trait-object type.
///
/// ```rust
/// use gem_core::Interface;
/// use gem_types::InterfaceId;
///
/// pub trait Clock: Send + Sync {
///     fn now_ms(&self) -> u64;
/// }
///
/// impl Interface for dyn Clock {
///     const IID: InterfaceId = InterfaceId::new(0x4b1d_0c10_c000_0001);
///     const NAME: &'static str = "Clock";
/// }
/// ```
///
/// Contracts must be `Send + Sync` for their handles to cross threads.
pub trait Interface: 'static {
    const IID: InterfaceId;
    /// Human-readable name, for diagnostics only.
    const NAME: &'static str;
}

/// An uncounted capability pointer.
///
/// Pairs the interface view with the identity that owns its reference
/// count. For interfaces resolved through aggregation the identity is the
/// inner object's forwarding base capability, so count operations still land
/// on the outer object.
pub struct RawInterface<I: ?Sized> {
    view: NonNull<I>,
    identity: NonNull<dyn Generic>,
}

impl<I: ?Sized> RawInterface<I> {
    /// Pair a view with the base capability that counts it. Building one
    /// touches no count; only [`Ptr::from_raw`](crate::Ptr::from_raw) and
    /// [`Ptr::from_borrowed`](crate::Ptr::from_borrowed) give it meaning.
    pub fn new(view: NonNull<I>, identity: NonNull<dyn Generic>) -> Self {
        Self { view, identity }
    }

    /// Pointer to the interface view.
    pub fn view(self) -> NonNull<I> {
        self.view
    }

    /// Pointer to the base capability that manages this view's lifetime.
    pub fn identity(self) -> NonNull<dyn Generic> {
        self.identity
    }

    /// Data address of the view, ignoring vtable metadata.
    pub fn addr(self) -> *const () {
        self.view.as_ptr() as *const ()
    }

    /// Data address of the identity, ignoring vtable metadata.
    pub fn identity_addr(self) -> *const () {
        self.identity.as_ptr() as *const ()
    }
}

impl<I: ?Sized> Clone for RawInterface<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: ?Sized> Copy for RawInterface<I> {}

impl<I: ?Sized> fmt::Debug for RawInterface<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawInterface")
            .field("view", &self.addr())
            .field("identity", &self.identity_addr())
            .finish()
    }
}

/// Typed output location for a capability query.
///
/// Wraps a caller-owned `Option<NonNull<I>>`. Resolvers write into it with
/// [`fill`](Self::fill), which only succeeds when the offered view has the
/// exact contract type the caller asked for.
pub struct InterfaceSlot<'a> {
    iid: InterfaceId,
    name: &'static str,
    view: &'a mut dyn Any,
    reset: fn(&mut dyn Any),
    filled: bool,
    identity: Option<NonNull<dyn Generic>>,
}

impl<'a> InterfaceSlot<'a> {
    /// Create a slot for contract `I`. The target is cleared immediately.
    pub fn new<I: ?Sized + Interface>(target: &'a mut Option<NonNull<I>>) -> Self {
        *target = None;
        Self {
            iid: I::IID,
            name: I::NAME,
            view: target,
            reset: reset_view::<I>,
            filled: false,
            identity: None,
        }
    }

    /// Identity of the contract this slot accepts.
    pub fn iid(&self) -> InterfaceId {
        self.iid
    }

    /// Name of the contract this slot accepts.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// Write `view` into the slot. Returns `false` if `I` is not the
    /// contract type the slot was created for.
    pub fn fill<I: ?Sized + Interface>(&mut self, view: &I) -> bool {
        if I::IID != self.iid {
            return false;
        }
        match self.view.downcast_mut::<Option<NonNull<I>>>() {
            Some(target) => {
                *target = Some(NonNull::from(view));
                self.filled = true;
                true
            }
            None => {
                tracing::error!(
                    iid = %self.iid,
                    requested = self.name,
                    offered = I::NAME,
                    "two interface contracts share one identity"
                );
                false
            }
        }
    }

    /// Base capability that counts the view written by a successful query.
    ///
    /// Read it before dropping the slot, then pair it with the written view
    /// to take over the query's reference:
    ///
    /// ```rust
    /// use std::ptr::NonNull;
    ///
    /// use gem_core::{
    ///     Component, Interface, InterfaceId, InterfaceSlot, MapBuilder, Object, Ptr, RawInterface,
    ///     ResultCode,
    /// };
    ///
    /// pub trait Named: Send + Sync {
    ///     fn name(&self) -> &str;
    /// }
    ///
    /// impl Interface for dyn Named {
    ///     const IID: InterfaceId = InterfaceId::new(0x4b1d_0c10_c000_0002);
    ///     const NAME: &'static str = "Named";
    /// }
    ///
    /// struct Plate;
    ///
    /// impl Named for Plate {
    ///     fn name(&self) -> &str {
    ///         "plate"
    ///     }
    /// }
    ///
    /// impl Component for Plate {
    ///     fn interfaces(map: &mut MapBuilder<Self>) {
    ///         map.implement::<dyn Named>(|p| p);
    ///     }
    /// }
    ///
    /// let object = Object::create(Plate).unwrap();
    /// let mut target: Option<NonNull<dyn Named>> = None;
    /// let mut slot = InterfaceSlot::new(&mut target);
    /// let code = object.query_interface(<dyn Named>::IID, Some(&mut slot));
    /// assert_eq!(code, ResultCode::SUCCESS);
    /// let identity = slot.identity().unwrap();
    /// drop(slot);
    ///
    /// // SAFETY: the successful query handed over one counted reference.
    /// let named = unsafe { Ptr::from_raw(RawInterface::new(target.unwrap(), identity)) };
    /// assert_eq!(named.name(), "plate");
    /// assert_eq!(object.ref_count(), 2);
    /// ```
    pub fn identity(&self) -> Option<NonNull<dyn Generic>> {
        self.identity
    }

    pub(crate) fn set_identity(&mut self, identity: &(dyn Generic + 'static)) {
        self.identity = Some(NonNull::from(identity));
    }

    /// Write the null pointer back and forget any identity.
    pub(crate) fn clear(&mut self) {
        (self.reset)(&mut *self.view);
        self.filled = false;
        self.identity = None;
    }
}

impl fmt::Debug for InterfaceSlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceSlot")
            .field("iid", &self.iid)
            .field("name", &self.name)
            .field("filled", &self.filled)
            .finish()
    }
}

fn reset_view<I: ?Sized + Interface>(view: &mut dyn Any) {
    if let Some(target) = view.downcast_mut::<Option<NonNull<I>>>() {
        *target = None;
    }
}
