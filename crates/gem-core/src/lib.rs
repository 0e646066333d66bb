//! Object runtime for the Gem component model.
//!
//! A Gem object is a reference-counted value that exposes any number of
//! interface contracts. Callers hold [`Ptr`] handles to one interface at a
//! time and discover the others through the capability query protocol on
//! the [`Generic`] base capability. Objects are built in two phases, torn
//! down when their last reference is released, and may reuse other
//! components by aggregating them as inner objects.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use gem_core::{Component, Interface, InterfaceId, MapBuilder, Object};
//!
//! pub trait Clock: Send + Sync {
//!     fn now_ms(&self) -> u64;
//! }
//!
//! impl Interface for dyn Clock {
//!     const IID: InterfaceId = InterfaceId::new(0x4b1d_0c10_c000_0001);
//!     const NAME: &'static str = "Clock";
//! }
//!
//! #[derive(Default)]
//! struct Fixed(AtomicU64);
//!
//! impl Clock for Fixed {
//!     fn now_ms(&self) -> u64 {
//!         self.0.load(Ordering::Relaxed)
//!     }
//! }
//!
//! impl Component for Fixed {
//!     fn interfaces(map: &mut MapBuilder<Self>) {
//!         map.implement::<dyn Clock>(|f| f);
//!     }
//! }
//!
//! let object = Object::create(Fixed::default()).unwrap();
//! let clock = object.query::<dyn Clock>().unwrap();
//! assert_eq!(clock.now_ms(), 0);
//! assert_eq!(object.ref_count(), 2);
//! ```
//!
//! # Key Types
//!
//! - [`Object`]: Top-level counted object wrapping a [`Component`]
//! - [`Ptr`]: Owned handle holding exactly one counted reference
//! - [`Aggregated`]: Inner object whose identity and count belong to its outer
//! - [`MapBuilder`]: Declares which interfaces a component exposes, and how

pub mod aggregate;
pub mod config;
pub mod generic;
pub mod interface;
pub mod lifetime;
pub mod map;
pub mod object;
pub mod ptr;

#[cfg(test)]
mod testing;

// Re-exports for convenience.
pub use aggregate::{Aggregated, OuterRef};
pub use config::InstrumentationConfig;
pub use gem_types::{GemError, GemResult, InterfaceId, ResultCode};
pub use generic::Generic;
pub use interface::{Interface, InterfaceSlot, RawInterface};
pub use lifetime::{LifecyclePhase, RefCount, Released};
pub use map::{InterfaceInfo, InterfaceMap, MapBuilder};
pub use object::{Component, Object};
pub use ptr::Ptr;
