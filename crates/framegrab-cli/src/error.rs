// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::fmt;
use std::io;
use std::process::ExitCode;

/// CLI-specific error type with exit code mapping
#[derive(Debug)]
pub enum CliError {
    /// Invalid command-line arguments or control values
    InvalidArgs(String),
    /// Device node missing or inaccessible
    DeviceNotFound(String),
    /// The device cannot do what was asked (protocol, format, standard)
    Unsupported(String),
    /// The device or one of its resources is busy
    Busy(String),
    /// Buffer setup or frame capture failed
    Capture(String),
    /// Any other failure
    General(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            CliError::Unsupported(msg) => write!(f, "Not supported: {}", msg),
            CliError::Busy(msg) => write!(f, "Device busy: {}", msg),
            CliError::Capture(msg) => write!(f, "Capture failed: {}", msg),
            CliError::General(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            CliError::General(_) => 1,
            CliError::InvalidArgs(_) => 2,
            CliError::DeviceNotFound(_) => 3,
            CliError::Unsupported(_) => 4,
            CliError::Busy(_) => 5,
            CliError::Capture(_) => 6,
        }
    }
}

/// Map framegrab::Error to CliError with appropriate exit codes
impl From<framegrab::Error> for CliError {
    fn from(err: framegrab::Error) -> Self {
        use framegrab::Error;

        let msg = err.to_string();
        match err {
            Error::NoDevice(io_err) => match io_err.raw_os_error() {
                Some(libc::EBUSY) => CliError::Busy(msg),
                _ => match io_err.kind() {
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                        CliError::DeviceNotFound(msg)
                    }
                    _ => CliError::General(msg),
                },
            },

            Error::UnsupportedDevice
            | Error::NoSupportedFormat
            | Error::UnsupportedStandard(_)
            | Error::Unsupported(_) => CliError::Unsupported(msg),

            Error::InvalidChannel(_) | Error::ControlOutOfRange(_) => CliError::InvalidArgs(msg),

            Error::ResourceInUse(_) | Error::StreamingStateViolation { .. } => CliError::Busy(msg),

            Error::InvalidBufferCount { .. }
            | Error::BufferAllocationFailed(_)
            | Error::StreamStartFailed(_)
            | Error::NoFrame(_) => CliError::Capture(msg),

            Error::ControlIoError(_) | Error::Io(_) => CliError::General(msg),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::General(format!("I/O error: {}", err))
    }
}

/// Helper function to convert result to exit code
pub fn result_to_exit_code<T>(result: Result<T, CliError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegrab::{Error, Resource};

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::General("test".into()).code(), 1);
        assert_eq!(CliError::InvalidArgs("test".into()).code(), 2);
        assert_eq!(CliError::DeviceNotFound("test".into()).code(), 3);
        assert_eq!(CliError::Unsupported("test".into()).code(), 4);
        assert_eq!(CliError::Busy("test".into()).code(), 5);
        assert_eq!(CliError::Capture("test".into()).code(), 6);
    }

    #[test]
    fn test_from_engine_error() {
        let err: CliError = Error::NoDevice(io::Error::from(io::ErrorKind::NotFound)).into();
        assert!(matches!(err, CliError::DeviceNotFound(_)));

        let err: CliError = Error::NoDevice(io::Error::from_raw_os_error(libc::EBUSY)).into();
        assert!(matches!(err, CliError::Busy(_)));

        let err: CliError = Error::NoSupportedFormat.into();
        assert!(matches!(err, CliError::Unsupported(_)));

        let err: CliError = Error::ResourceInUse(Resource::BufferPool).into();
        assert_eq!(err.to_string(), "Device busy: buffer pool still in use");

        let err: CliError = Error::ControlOutOfRange(3).into();
        assert!(matches!(err, CliError::InvalidArgs(_)));
    }

    #[test]
    fn test_error_display() {
        let err = CliError::DeviceNotFound("/dev/video0".to_string());
        assert_eq!(format!("{}", err), "Device not found: /dev/video0");
    }
}
