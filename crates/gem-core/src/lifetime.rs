use std::sync::atomic::{self, AtomicU32, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::config;

/// Counts above this are treated as a leak and abort the process.
const MAX_REFS: u32 = i32::MAX as u32;

/// Lifecycle of a counted object.
///
/// `Constructed → Initialized → Live → TearingDown → Destroyed`. The phase
/// only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecyclePhase {
    /// Allocated; the initialize hook has not completed.
    Constructed = 0,
    /// The initialize hook succeeded.
    Initialized = 1,
    /// Handed to its first owner.
    Live = 2,
    /// The count reached zero; teardown hooks are running.
    TearingDown = 3,
    /// Teardown finished; storage is about to be freed.
    Destroyed = 4,
}

impl LifecyclePhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Constructed,
            1 => Self::Initialized,
            2 => Self::Live,
            3 => Self::TearingDown,
            _ => Self::Destroyed,
        }
    }

    /// Returns `true` once teardown has begun.
    pub fn is_terminal(self) -> bool {
        self >= Self::TearingDown
    }
}

/// Atomic holder of a [`LifecyclePhase`].
#[derive(Debug)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(LifecyclePhase::Constructed as u8))
    }

    pub(crate) fn get(&self) -> LifecyclePhase {
        LifecyclePhase::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move forward to `phase`. Never moves backwards.
    pub(crate) fn advance(&self, phase: LifecyclePhase) {
        self.0.fetch_max(phase as u8, Ordering::AcqRel);
    }

    /// Enter `TearingDown`. Returns `true` for exactly one caller.
    pub(crate) fn begin_teardown(&self) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                (raw < LifecyclePhase::TearingDown as u8)
                    .then_some(LifecyclePhase::TearingDown as u8)
            })
            .is_ok()
    }
}

/// Outcome of [`RefCount::release`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Released {
    /// Other references remain.
    Remaining(u32),
    /// This call dropped the last reference.
    Zero,
    /// The count was already zero. Nothing was changed.
    Underflow,
}

/// Lock-free reference count.
///
/// Increments are relaxed; decrements release, and the decrement that
/// reaches zero is followed by an acquire fence so that every prior use of
/// the object happens-before its teardown. The count never wraps below zero.
#[derive(Debug, Default)]
pub struct RefCount(AtomicU32);

impl RefCount {
    /// A count of zero: no owner has attached yet.
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    /// Increment and return the new count.
    pub fn acquire(&self) -> u32 {
        let prev = self.0.fetch_add(1, Ordering::Relaxed);
        if prev >= MAX_REFS {
            tracing::error!(count = prev, "reference count overflow");
            std::process::abort();
        }
        prev + 1
    }

    /// Decrement, reporting whether this call dropped the last reference.
    pub fn release(&self) -> Released {
        match self
            .0
            .fetch_update(Ordering::Release, Ordering::Relaxed, |n| n.checked_sub(1))
        {
            Ok(1) => {
                atomic::fence(Ordering::Acquire);
                Released::Zero
            }
            Ok(prev) => Released::Remaining(prev - 1),
            Err(_) => {
                discipline_violation("over-release", 0);
                Released::Underflow
            }
        }
    }
}

/// Report a caller-discipline violation.
///
/// Always logged. Panics in strict mode, and trips a debug assertion
/// otherwise.
pub(crate) fn discipline_violation(violation: &'static str, count: u32) {
    tracing::error!(violation, count, "reference counting discipline violated");
    if config::current().strict {
        panic!("reference counting discipline violated: {violation}");
    }
    debug_assert!(
        false,
        "reference counting discipline violated: {violation}"
    );
}
