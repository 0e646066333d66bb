//! Foundation types for the Gem component model.
//!
//! This crate provides the value types every other Gem crate keys on: the
//! identity of an interface contract and the closed set of operation
//! outcomes, plus the error type used by the typed Rust APIs.
//!
//! # Key Types
//!
//! - [`InterfaceId`]: Stable 64-bit identity of one interface contract
//! - [`ResultCode`]: Operation outcome, partitioned into success and failure
//! - [`GemError`]: Failure code carried through `?`-propagating APIs
//!
//! The [`translate`] module maps foreign status codes (errno, I/O error
//! kinds) into result codes at subsystem boundaries.

pub mod error;
pub mod identity;
pub mod result;
pub mod translate;

pub use error::{GemError, GemResult, TypeError};
pub use identity::InterfaceId;
pub use result::ResultCode;
