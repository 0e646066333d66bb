use std::ptr::NonNull;

use gem_types::{GemError, GemResult, InterfaceId, ResultCode};

use crate::interface::{Interface, InterfaceSlot, RawInterface};
use crate::ptr::Ptr;

/// The universal base capability.
///
/// Every live object answers queries for [`InterfaceId::GENERIC`], so a
/// pointer of unknown concrete type can still be interrogated. The three
/// operations are the whole identity and lifetime protocol; an inner object
/// of an aggregate forwards all of them to its outer object.
pub trait Generic: Send + Sync {
    /// Add a counted reference. Returns the new count.
    fn acquire(&self) -> u32;

    /// Drop a counted reference. Returns the remaining count; at zero the
    /// object has been torn down and freed.
    ///
    /// # Safety
    /// The caller must own one counted reference and must not touch any
    /// pointer derived from it afterwards.
    unsafe fn release(&self) -> u32;

    /// Resolve `iid` into `out`.
    ///
    /// Returns [`ResultCode::BAD_POINTER`] when `out` is `None`, before any
    /// lookup. On success the count has already been incremented once for
    /// the pointer written to `out`; on failure `out` is cleared and the
    /// count is unchanged.
    fn query_interface(&self, iid: InterfaceId, out: Option<&mut InterfaceSlot<'_>>)
        -> ResultCode;

    /// Current count, for diagnostics. Stale as soon as it is returned.
    fn ref_count(&self) -> u32;
}

impl Interface for dyn Generic {
    const IID: InterfaceId = InterfaceId::GENERIC;
    const NAME: &'static str = "Generic";
}

impl<'a> dyn Generic + 'a {
    /// Query for contract `J` and wrap the counted result in a handle.
    pub fn query<J: ?Sized + Interface>(&self) -> GemResult<Ptr<J>> {
        let mut target: Option<NonNull<J>> = None;
        let mut slot = InterfaceSlot::new(&mut target);
        let code = self.query_interface(J::IID, Some(&mut slot));
        let identity = slot.identity();
        drop(slot);
        code.check()?;

        match (target, identity) {
            // SAFETY: a successful query hands over exactly one counted
            // reference for the pointer it wrote.
            (Some(view), Some(identity)) => {
                Ok(unsafe { Ptr::from_raw(RawInterface::new(view, identity)) })
            }
            _ => {
                tracing::error!(
                    iid = %J::IID,
                    name = J::NAME,
                    "query reported success without a pointer"
                );
                Err(GemError::context(
                    ResultCode::FAIL,
                    format!("query for {} succeeded without a pointer", J::NAME),
                ))
            }
        }
    }
}
