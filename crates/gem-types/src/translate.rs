//! Translation of foreign status codes into [`ResultCode`]s.
//!
//! Consulted only at boundaries where a component calls into a foreign
//! subsystem. Every function here is a pure lookup: the foreign "no error"
//! value maps to [`ResultCode::SUCCESS`], recognized values map to the closest
//! failure, anything else maps to [`ResultCode::FAIL`].

use std::io;

use crate::error::GemError;
use crate::result::ResultCode;

/// POSIX errno values recognized by [`from_errno`] (Linux numbering).
pub mod errno {
    pub const ENOENT: i32 = 2;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EFAULT: i32 = 14;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const ENOSYS: i32 = 38;
    pub const EOPNOTSUPP: i32 = 95;
}

/// Map a POSIX errno value.
pub fn from_errno(code: i32) -> ResultCode {
    match code {
        0 => ResultCode::SUCCESS,
        errno::ENOENT => ResultCode::NOT_FOUND,
        errno::ENOMEM => ResultCode::OUT_OF_MEMORY,
        errno::EINVAL => ResultCode::INVALID_ARG,
        errno::EFAULT => ResultCode::BAD_POINTER,
        errno::ENOSYS | errno::EOPNOTSUPP => ResultCode::NOT_IMPLEMENTED,
        errno::EAGAIN | errno::EBUSY => ResultCode::UNAVAILABLE,
        _ => ResultCode::FAIL,
    }
}

/// Map an I/O error kind. Every kind is a failure.
pub fn from_io_error_kind(kind: io::ErrorKind) -> ResultCode {
    match kind {
        io::ErrorKind::NotFound => ResultCode::NOT_FOUND,
        io::ErrorKind::OutOfMemory => ResultCode::OUT_OF_MEMORY,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => ResultCode::INVALID_ARG,
        io::ErrorKind::Unsupported => ResultCode::NOT_IMPLEMENTED,
        io::ErrorKind::WouldBlock
        | io::ErrorKind::TimedOut
        | io::ErrorKind::Interrupted
        | io::ErrorKind::ConnectionRefused => ResultCode::UNAVAILABLE,
        _ => ResultCode::FAIL,
    }
}

/// Map an I/O result, where `Ok` is the foreign "no error" value.
pub fn from_io_result<T>(result: &io::Result<T>) -> ResultCode {
    match result {
        Ok(_) => ResultCode::SUCCESS,
        Err(e) => from_io_error_kind(e.kind()),
    }
}

impl From<io::Error> for GemError {
    fn from(err: io::Error) -> Self {
        GemError::context(from_io_error_kind(err.kind()), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_errno_is_success() {
        assert_eq!(from_errno(0), ResultCode::SUCCESS);
    }

    #[test]
    fn recognized_errnos_map_to_closest_failure() {
        assert_eq!(from_errno(errno::ENOENT), ResultCode::NOT_FOUND);
        assert_eq!(from_errno(errno::ENOMEM), ResultCode::OUT_OF_MEMORY);
        assert_eq!(from_errno(errno::EINVAL), ResultCode::INVALID_ARG);
        assert_eq!(from_errno(errno::EFAULT), ResultCode::BAD_POINTER);
        assert_eq!(from_errno(errno::ENOSYS), ResultCode::NOT_IMPLEMENTED);
        assert_eq!(from_errno(errno::EOPNOTSUPP), ResultCode::NOT_IMPLEMENTED);
        assert_eq!(from_errno(errno::EAGAIN), ResultCode::UNAVAILABLE);
        assert_eq!(from_errno(errno::EBUSY), ResultCode::UNAVAILABLE);
    }

    #[test]
    fn unknown_errnos_default_to_fail() {
        assert_eq!(from_errno(-1), ResultCode::FAIL);
        assert_eq!(from_errno(9999), ResultCode::FAIL);
    }

    #[test]
    fn io_kinds_map_to_closest_failure() {
        assert_eq!(
            from_io_error_kind(io::ErrorKind::NotFound),
            ResultCode::NOT_FOUND
        );
        assert_eq!(
            from_io_error_kind(io::ErrorKind::InvalidData),
            ResultCode::INVALID_ARG
        );
        assert_eq!(
            from_io_error_kind(io::ErrorKind::WouldBlock),
            ResultCode::UNAVAILABLE
        );
        assert_eq!(
            from_io_error_kind(io::ErrorKind::PermissionDenied),
            ResultCode::FAIL
        );
    }

    #[test]
    fn io_result_success_maps_to_success() {
        let ok: io::Result<()> = Ok(());
        assert_eq!(from_io_result(&ok), ResultCode::SUCCESS);
        let err: io::Result<()> = Err(io::Error::from(io::ErrorKind::Unsupported));
        assert_eq!(from_io_result(&err), ResultCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn io_error_converts_with_context() {
        let err: GemError = io::Error::new(io::ErrorKind::NotFound, "no such plugin").into();
        assert_eq!(err.code(), ResultCode::NOT_FOUND);
        assert!(err.to_string().contains("no such plugin"));
    }
}
