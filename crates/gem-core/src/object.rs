use std::alloc::{self, Layout};
use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;

use gem_types::{GemError, GemResult, InterfaceId, ResultCode};

use crate::aggregate::OuterRef;
use crate::config;
use crate::generic::Generic;
use crate::interface::{InterfaceSlot, RawInterface};
use crate::lifetime::{discipline_violation, LifecyclePhase, PhaseCell, RefCount, Released};
use crate::map::{InterfaceInfo, InterfaceMap, MapBuilder};
use crate::ptr::Ptr;

/// A concrete object kind.
///
/// The component declares its capability map and may override the two
/// lifecycle hooks. Components are wrapped in an [`Object`] to become a
/// top-level counted object, or in an [`Aggregated`](crate::Aggregated) to
/// become an inner object of another component.
pub trait Component: Send + Sync + Sized + 'static {
    /// Declare the interfaces this component exposes.
    fn interfaces(map: &mut MapBuilder<Self>);

    /// Second construction phase.
    ///
    /// Runs once the object is fully callable. `outer` names the controlling
    /// object and is what inner objects must be built against. A failure
    /// tears the object down and is reported by the creating call.
    fn initialize(&self, outer: &OuterRef) -> GemResult<()> {
        let _ = outer;
        Ok(())
    }

    /// Runs once when the object's count reaches zero, before its inner
    /// objects are torn down and its storage is freed.
    fn teardown(&self) {}
}

/// A top-level counted object.
///
/// Owned exclusively by its reference count: the only way to obtain one is
/// [`Object::create`], and the only way to free one is releasing its last
/// reference.
pub struct Object<T: Component> {
    refs: RefCount,
    phase: PhaseCell,
    map: InterfaceMap<T>,
    component: T,
}

impl<T: Component> Object<T> {
    /// Create an object from an already constructed component.
    pub fn create(component: T) -> GemResult<Ptr<dyn Generic>> {
        Self::create_with(move || Ok(component))
    }

    /// Create an object, constructing the component with a fallible factory.
    ///
    /// Phase one builds the component and the capability map and allocates
    /// the object; allocation failure is reported as
    /// [`ResultCode::OUT_OF_MEMORY`]. Phase two runs
    /// [`Component::initialize`] while the creator holds the first
    /// reference. If it fails the object is torn down and freed before the
    /// error is returned; no partially initialized object escapes.
    pub fn create_with<F>(factory: F) -> GemResult<Ptr<dyn Generic>>
    where
        F: FnOnce() -> GemResult<T>,
    {
        let component = factory()?;
        let map = InterfaceMap::declare()?;
        let ptr = Self::allocate(Self {
            refs: RefCount::new(),
            phase: PhaseCell::new(),
            map,
            component,
        })?;

        // SAFETY: freshly allocated and initialized; nobody else can reach
        // it until the creator's reference is released or returned.
        let object = unsafe { ptr.as_ref() };
        object.refs.acquire();

        let outer = OuterRef::new(object);
        if let Err(err) = object.component.initialize(&outer) {
            tracing::debug!(
                component = type_name::<T>(),
                error = %err,
                "initialize failed; tearing down"
            );
            // SAFETY: drops the creator's reference; nothing else escaped.
            let remaining = unsafe { object.release() };
            if remaining != 0 {
                tracing::error!(
                    component = type_name::<T>(),
                    remaining,
                    "references leaked during a failed initialize"
                );
            }
            return Err(err);
        }

        object.phase.advance(LifecyclePhase::Initialized);
        object.phase.advance(LifecyclePhase::Live);
        tracing::debug!(component = type_name::<T>(), "object created");

        let base = NonNull::from(object as &dyn Generic);
        // SAFETY: transfers the creator's reference to the handle.
        Ok(unsafe { Ptr::from_raw(RawInterface::new(base, base)) })
    }

    /// Every interface an object of kind `T` exposes.
    pub fn interfaces() -> GemResult<Vec<InterfaceInfo>> {
        InterfaceMap::<T>::describe()
    }

    fn allocate(object: Self) -> GemResult<NonNull<Self>> {
        // Never zero-sized: the header alone occupies memory.
        let layout = Layout::new::<Self>();
        // SAFETY: the layout has non-zero size.
        let raw = unsafe { alloc::alloc(layout) } as *mut Self;
        let Some(ptr) = NonNull::new(raw) else {
            return Err(GemError::context(
                ResultCode::OUT_OF_MEMORY,
                format!("allocating {} bytes for {}", layout.size(), type_name::<T>()),
            ));
        };
        // SAFETY: `ptr` is valid for writes of `Self` and properly aligned.
        unsafe { ptr.as_ptr().write(object) };
        Ok(ptr)
    }

    /// Tear down and free the object.
    ///
    /// # Safety
    /// The caller observed the count reach zero and won the transition to
    /// `TearingDown`; no other reference exists.
    unsafe fn destroy(ptr: NonNull<Self>) {
        {
            let object = ptr.as_ref();
            object.component.teardown();
            object.map.teardown_inners(&object.component);
            object.phase.advance(LifecyclePhase::Destroyed);
        }
        tracing::debug!(component = type_name::<T>(), "object destroyed");
        // Allocated with the global allocator and `Layout::new::<Self>()`.
        drop(Box::from_raw(ptr.as_ptr()));
    }

    fn trace(&self, event: &'static str, count: u32) {
        if config::current().trace_lifetime {
            tracing::trace!(component = type_name::<T>(), count, "{event}");
        }
    }
}

impl<T: Component> Generic for Object<T> {
    fn acquire(&self) -> u32 {
        if self.phase.get().is_terminal() {
            discipline_violation("acquire during teardown", self.refs.get());
        }
        let count = self.refs.acquire();
        self.trace("acquire", count);
        count
    }

    unsafe fn release(&self) -> u32 {
        match self.refs.release() {
            Released::Remaining(count) => {
                self.trace("release", count);
                count
            }
            Released::Zero => {
                self.trace("release", 0);
                // Re-entrant releases from inside a teardown hook land here
                // too; only the first one destroys.
                if self.phase.begin_teardown() {
                    unsafe { Self::destroy(NonNull::from(self)) };
                }
                0
            }
            Released::Underflow => 0,
        }
    }

    fn query_interface(
        &self,
        iid: InterfaceId,
        out: Option<&mut InterfaceSlot<'_>>,
    ) -> ResultCode {
        let Some(slot) = out else {
            return ResultCode::BAD_POINTER;
        };
        slot.clear();
        if slot.iid() != iid {
            return ResultCode::INVALID_ARG;
        }

        let code = if iid.is_generic() {
            if slot.fill::<dyn Generic>(self) {
                ResultCode::SUCCESS
            } else {
                ResultCode::NO_INTERFACE
            }
        } else {
            self.map.resolve(&self.component, iid, slot)
        };

        if code.is_success() && slot.is_filled() {
            if slot.identity().is_none() {
                slot.set_identity(self);
            }
            self.acquire();
            ResultCode::SUCCESS
        } else {
            slot.clear();
            if code.is_success() {
                ResultCode::NO_INTERFACE
            } else {
                code
            }
        }
    }

    fn ref_count(&self) -> u32 {
        self.refs.get()
    }
}

impl<T: Component> fmt::Debug for Object<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("component", &type_name::<T>())
            .field("refs", &self.refs.get())
            .field("phase", &self.phase.get())
            .field("map", &self.map)
            .finish()
    }
}
