use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

use gem_types::{GemResult, InterfaceId, ResultCode};

use crate::generic::Generic;
use crate::interface::InterfaceSlot;
use crate::lifetime::discipline_violation;
use crate::map::InterfaceMap;
use crate::object::Component;

/// Non-owning back-reference to the object that controls an identity.
///
/// Handed to [`Component::initialize`]. Always names the outermost object,
/// even for inner objects that aggregate further inner objects. It holds no
/// count: it is only valid while that object is alive, which is guaranteed
/// for code running inside the object's own storage.
#[derive(Clone, Copy)]
pub struct OuterRef {
    outer: NonNull<dyn Generic>,
}

// SAFETY: the referent is `Generic`, which is `Send + Sync`.
unsafe impl Send for OuterRef {}
unsafe impl Sync for OuterRef {}

impl OuterRef {
    pub(crate) fn new(outer: &(dyn Generic + 'static)) -> Self {
        Self {
            outer: NonNull::from(outer),
        }
    }

    /// The controlling object's base capability.
    ///
    /// # Safety
    /// The controlling object must still be alive, i.e. the caller runs
    /// inside that object's storage or holds a counted reference to it.
    pub unsafe fn get(&self) -> &dyn Generic {
        self.outer.as_ref()
    }

    /// Data address of the controlling object.
    pub fn addr(&self) -> *const () {
        self.outer.as_ptr() as *const ()
    }
}

impl fmt::Debug for OuterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OuterRef({:p})", self.addr())
    }
}

/// The outer-facing side of an inner object, as seen by its outer's map.
pub(crate) trait InnerObject: Send + Sync {
    /// Resolve against the inner's own map. Never counts.
    fn resolve(&self, iid: InterfaceId, slot: &mut InterfaceSlot<'_>) -> ResultCode;

    /// Run the inner's teardown and stop forwarding. Idempotent.
    fn teardown(&self);
}

/// An inner object aggregated into an outer object.
///
/// Owns the component `C` but has no reference count and answers no
/// outer-facing queries of its own: `acquire`, `release` and
/// `query_interface` on its base capability are forwarded verbatim to the
/// outer object. The outer exposes `C`'s interfaces through
/// [`MapBuilder::delegate`](crate::MapBuilder::delegate) or
/// [`MapBuilder::aggregate`](crate::MapBuilder::aggregate) entries, which
/// count against the outer.
///
/// Create it inside the outer's [`Component::initialize`] and store it in
/// the outer component (typically in a `OnceLock`). An inner the outer's
/// map never names is still torn down when it is dropped along with the
/// outer's storage.
pub struct Aggregated<C: Component> {
    outer: OuterRef,
    detached: AtomicBool,
    map: InterfaceMap<C>,
    component: C,
}

impl<C: Component> Aggregated<C> {
    /// Build the inner object and run its initialize hook against `outer`.
    ///
    /// On failure the inner is torn down before the error is returned.
    ///
    /// # Safety
    /// The returned inner forwards to `outer` without holding a count, so it
    /// must not outlive the object `outer` names. Storing it in the component
    /// whose [`Component::initialize`] received `outer` satisfies this;
    /// moving it anywhere else (a static, a channel, another thread) does not.
    ///
    /// ```compile_fail
    /// use gem_core::{Aggregated, Component, MapBuilder, OuterRef};
    ///
    /// struct Inner;
    ///
    /// impl Component for Inner {
    ///     fn interfaces(_map: &mut MapBuilder<Self>) {}
    /// }
    ///
    /// fn build(outer: &OuterRef) {
    ///     let _ = Aggregated::new(outer, Inner);
    /// }
    /// ```
    pub unsafe fn new(outer: &OuterRef, component: C) -> GemResult<Self> {
        let map = InterfaceMap::declare()?;
        let inner = Self {
            outer: *outer,
            detached: AtomicBool::new(false),
            map,
            component,
        };
        if let Err(err) = inner.component.initialize(outer) {
            tracing::debug!(
                component = std::any::type_name::<C>(),
                error = %err,
                "inner initialize failed"
            );
            InnerObject::teardown(&inner);
            return Err(err);
        }
        Ok(inner)
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn outer(&self) -> &OuterRef {
        &self.outer
    }

    /// Returns `true` once the outer object has torn this inner down.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn live_outer(&self, operation: &'static str) -> Option<&dyn Generic> {
        if self.is_detached() {
            discipline_violation(operation, 0);
            return None;
        }
        // SAFETY: `new`'s contract keeps an inner from outliving its outer,
        // and destroying the outer detaches or drops every inner it stores.
        Some(unsafe { self.outer.get() })
    }
}

impl<C: Component> Deref for Aggregated<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.component
    }
}

impl<C: Component> Generic for Aggregated<C> {
    fn acquire(&self) -> u32 {
        self.live_outer("acquire on a detached inner object")
            .map_or(0, |outer| outer.acquire())
    }

    unsafe fn release(&self) -> u32 {
        match self.live_outer("release on a detached inner object") {
            // SAFETY: forwarded verbatim; the caller's contract carries over.
            Some(outer) => unsafe { outer.release() },
            None => 0,
        }
    }

    fn query_interface(
        &self,
        iid: InterfaceId,
        out: Option<&mut InterfaceSlot<'_>>,
    ) -> ResultCode {
        match self.live_outer("query on a detached inner object") {
            Some(outer) => outer.query_interface(iid, out),
            None => match out {
                Some(slot) => {
                    slot.clear();
                    ResultCode::UNAVAILABLE
                }
                None => ResultCode::BAD_POINTER,
            },
        }
    }

    fn ref_count(&self) -> u32 {
        if self.is_detached() {
            return 0;
        }
        // SAFETY: see `live_outer`.
        unsafe { self.outer.get() }.ref_count()
    }
}

impl<C: Component> InnerObject for Aggregated<C> {
    fn resolve(&self, iid: InterfaceId, slot: &mut InterfaceSlot<'_>) -> ResultCode {
        let code = self.map.resolve(&self.component, iid, slot);
        if code.is_success() && slot.identity().is_none() {
            // Count operations on the returned view route through this
            // inner's forwarding base capability.
            slot.set_identity(self);
        }
        code
    }

    fn teardown(&self) {
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        self.component.teardown();
        self.map.teardown_inners(&self.component);
        tracing::debug!(
            component = std::any::type_name::<C>(),
            "inner object detached"
        );
    }
}

impl<C: Component> Drop for Aggregated<C> {
    fn drop(&mut self) {
        // Inners the outer's map never names are not reached by
        // `teardown_inners`; they are torn down here instead.
        InnerObject::teardown(&*self);
    }
}

impl<C: Component + fmt::Debug> fmt::Debug for Aggregated<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregated")
            .field("outer", &self.outer)
            .field("detached", &self.is_detached())
            .field("map", &self.map)
            .field("component", &self.component)
            .finish()
    }
}
