use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GemError, GemResult};

/// Outcome of a component-model operation.
///
/// Codes below [`ResultCode::FAILURE_BASE`] are success-class, everything at
/// or above it is a failure. The core codes are fixed; collaborators may add
/// their own with [`ResultCode::failure`] as long as they stay in the failure
/// partition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultCode(u32);

impl ResultCode {
    /// First code of the failure partition.
    pub const FAILURE_BASE: u32 = 0x8000_0000;

    pub const SUCCESS: Self = Self(0);
    /// Non-error sentinel, e.g. an iteration ran out of items.
    pub const END: Self = Self(1);

    pub const FAIL: Self = Self(Self::FAILURE_BASE);
    pub const INVALID_ARG: Self = Self(Self::FAILURE_BASE + 1);
    pub const NOT_FOUND: Self = Self(Self::FAILURE_BASE + 2);
    pub const OUT_OF_MEMORY: Self = Self(Self::FAILURE_BASE + 3);
    pub const NO_INTERFACE: Self = Self(Self::FAILURE_BASE + 4);
    pub const BAD_POINTER: Self = Self(Self::FAILURE_BASE + 5);
    pub const NOT_IMPLEMENTED: Self = Self(Self::FAILURE_BASE + 6);
    pub const UNAVAILABLE: Self = Self(Self::FAILURE_BASE + 7);
    pub const UNINITIALIZED: Self = Self(Self::FAILURE_BASE + 8);

    /// Offset from [`FAILURE_BASE`](Self::FAILURE_BASE) where extension codes start.
    pub const EXTENSION_BASE: u32 = 0x100;

    /// Build a code from its raw value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Define a collaborator-specific failure code.
    ///
    /// `offset` is relative to the extension range, so the result is always
    /// in the failure partition and never collides with a core code.
    pub const fn failure(offset: u16) -> Self {
        Self(Self::FAILURE_BASE + Self::EXTENSION_BASE + offset as u32)
    }

    /// The raw 32-bit value.
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 < Self::FAILURE_BASE
    }

    pub const fn is_failure(self) -> bool {
        !self.is_success()
    }

    /// Returns `true` for collaborator-defined failure codes.
    pub const fn is_extension(self) -> bool {
        self.0 >= Self::FAILURE_BASE + Self::EXTENSION_BASE
    }

    /// Diagnostic name of the code. Unrecognized codes map to `"(Unknown)"`.
    pub const fn as_str(self) -> &'static str {
        match self.0 {
            0 => "Success",
            1 => "End",
            0x8000_0000 => "Fail",
            0x8000_0001 => "InvalidArg",
            0x8000_0002 => "NotFound",
            0x8000_0003 => "OutOfMemory",
            0x8000_0004 => "NoInterface",
            0x8000_0005 => "BadPointer",
            0x8000_0006 => "NotImplemented",
            0x8000_0007 => "Unavailable",
            0x8000_0008 => "Uninitialized",
            _ => "(Unknown)",
        }
    }

    /// `Ok(self)` for success-class codes, `Err` for failures.
    pub fn check(self) -> GemResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GemError::Code(self))
        }
    }
}

impl Default for ResultCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultCode({}, {:#010x})", self.as_str(), self.0)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GemError> for ResultCode {
    fn from(err: GemError) -> Self {
        err.code()
    }
}

impl<T> From<&GemResult<T>> for ResultCode {
    fn from(result: &GemResult<T>) -> Self {
        match result {
            Ok(_) => Self::SUCCESS,
            Err(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CORE_FAILURES: [ResultCode; 9] = [
        ResultCode::FAIL,
        ResultCode::INVALID_ARG,
        ResultCode::NOT_FOUND,
        ResultCode::OUT_OF_MEMORY,
        ResultCode::NO_INTERFACE,
        ResultCode::BAD_POINTER,
        ResultCode::NOT_IMPLEMENTED,
        ResultCode::UNAVAILABLE,
        ResultCode::UNINITIALIZED,
    ];

    #[test]
    fn success_and_end_are_success_class() {
        assert!(ResultCode::SUCCESS.is_success());
        assert!(ResultCode::END.is_success());
        assert!(!ResultCode::END.is_failure());
    }

    #[test]
    fn core_failures_are_failures() {
        for code in CORE_FAILURES {
            assert!(code.is_failure(), "{code:?}");
            assert!(!code.is_extension());
        }
    }

    #[test]
    fn core_failures_are_consecutive() {
        for (i, code) in CORE_FAILURES.iter().enumerate() {
            assert_eq!(code.raw(), ResultCode::FAILURE_BASE + i as u32);
        }
    }

    #[test]
    fn names_are_distinct_and_known() {
        let mut names: Vec<&str> = CORE_FAILURES.iter().map(|c| c.as_str()).collect();
        names.push(ResultCode::SUCCESS.as_str());
        names.push(ResultCode::END.as_str());
        assert!(!names.contains(&"(Unknown)"));
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 11);
    }

    #[test]
    fn invalid_arg_is_spelled_correctly() {
        assert_eq!(ResultCode::INVALID_ARG.to_string(), "InvalidArg");
    }

    #[test]
    fn unknown_codes_fall_back() {
        assert_eq!(ResultCode::from_raw(2).as_str(), "(Unknown)");
        assert_eq!(ResultCode::failure(3).as_str(), "(Unknown)");
    }

    #[test]
    fn extension_codes_stay_in_failure_partition() {
        let plugin_load_failed = ResultCode::failure(1);
        assert!(plugin_load_failed.is_failure());
        assert!(plugin_load_failed.is_extension());
        assert!(!CORE_FAILURES.contains(&plugin_load_failed));
        assert!(ResultCode::failure(u16::MAX).is_failure());
    }

    #[test]
    fn check_splits_on_partition() {
        assert_eq!(ResultCode::END.check(), Ok(ResultCode::END));
        let err = ResultCode::NO_INTERFACE.check().unwrap_err();
        assert_eq!(err.code(), ResultCode::NO_INTERFACE);
    }

    #[test]
    fn debug_includes_raw_value() {
        let dbg = format!("{:?}", ResultCode::BAD_POINTER);
        assert_eq!(dbg, "ResultCode(BadPointer, 0x80000005)");
    }

    proptest! {
        #[test]
        fn exactly_one_predicate_holds(raw in any::<u32>()) {
            let code = ResultCode::from_raw(raw);
            prop_assert!(code.is_success() != code.is_failure());
            prop_assert_eq!(code.is_success(), raw < ResultCode::FAILURE_BASE);
        }

        #[test]
        fn as_str_is_total(raw in any::<u32>()) {
            prop_assert!(!ResultCode::from_raw(raw).as_str().is_empty());
        }
    }
}
