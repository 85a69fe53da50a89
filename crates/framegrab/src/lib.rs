// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! framegrab: video capture for Video4Linux devices
//!
//! A capture engine for kernel video-capture devices that speaks both
//! generations of the Video4Linux protocol (V4L1 and V4L2) behind a single
//! API. It detects the protocol a device uses, negotiates the pixel format
//! and resolution closest to what the application asked for, manages a pool
//! of memory-mapped kernel buffers, and exposes device parameters (standard
//! controls plus vendor-private ones found by probing) through one registry.
//!
//! # Quick Start
//!
//! ```no_run
//! use framegrab::capture::CaptureDevice;
//! use framegrab::format::{FormatRequest, Standard};
//! use framegrab::palette::Palette;
//!
//! let mut dev = CaptureDevice::open("/dev/video0")?;
//! dev.detect_version()?;
//! let fmt = dev.negotiate_format(
//!     &FormatRequest::new(640, 480).with_palettes(&[Palette::Yuyv, Palette::Mjpeg]),
//! )?;
//! println!("capturing {}", fmt);
//!
//! dev.allocate_buffers(4)?;
//! dev.start()?;
//! for _ in 0..10 {
//!     let frame = dev.dequeue()?;
//!     println!("frame {} ({} bytes)", frame.sequence(), frame.len());
//!     dev.enqueue(frame)?;
//! }
//! dev.stop()?;
//! dev.free_buffers()?;
//! dev.close()?;
//! # Ok::<(), framegrab::Error>(())
//! ```
//!
//! # Lifecycle
//!
//! A [`capture::CaptureDevice`] walks through a fixed sequence of states and
//! rejects operations that are invalid in the current one with
//! [`Error::StreamingStateViolation`]:
//!
//! | State | Reached by | Next |
//! |-------|------------|------|
//! | `Opened` | `open` | `detect_version` |
//! | `VersionDetected` | `detect_version` | `negotiate_format` |
//! | `FormatSet` | `negotiate_format`, `free_buffers` | `allocate_buffers` |
//! | `BuffersAllocated` | `allocate_buffers` | `start` |
//! | `Streaming` | `start` | `dequeue` / `enqueue`, `stop` |
//! | `Stopped` | `stop` | `start`, `free_buffers` |
//! | `Closed` | `close` | none |
//!
//! # Features
//!
//! - V4L2 and V4L1 devices through one [`adapter::ProtocolAdapter`] interface
//! - Closest-match format negotiation with standard (PAL/NTSC/SECAM) auto-detection
//! - Memory-mapped buffer pool with exclusively owned dequeued frames
//! - Standard, extended and vendor-private (pwc, gspca, qc) controls
//! - Tuner frequency and frame interval access
//! - A simulated device ([`sim`]) for exercising the engine without hardware

use std::{error, fmt, io};

use capture::State;
use format::Standard;

/// A resource that must be released before a device can be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// The control registry built by `build_controls`
    ControlRegistry,
    /// The buffer pool created by `allocate_buffers`
    BufferPool,
    /// Dequeued frame buffers that have not been handed back
    FrameBuffers,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Resource::ControlRegistry => write!(f, "control registry"),
            Resource::BufferPool => write!(f, "buffer pool"),
            Resource::FrameBuffers => write!(f, "dequeued frame buffers"),
        }
    }
}

/// Error type for capture engine operations
#[derive(Debug)]
pub enum Error {
    /// The device path is empty or the device file could not be opened
    NoDevice(io::Error),

    /// The device answers neither the V4L2 nor the V4L1 capability query
    UnsupportedDevice,

    /// None of the candidate pixel formats was accepted by the device
    NoSupportedFormat,

    /// The device granted fewer than two buffers
    InvalidBufferCount { requested: u32, granted: u32 },

    /// Reserving, querying or mapping the kernel buffers failed
    BufferAllocationFailed(io::Error),

    /// Queueing the buffers or starting the stream failed
    StreamStartFailed(io::Error),

    /// The device failed to deliver a frame
    NoFrame(io::Error),

    /// Reading or writing a control failed at the device level
    ControlIoError(io::Error),

    /// The control index is unknown or the value cannot be clamped into range
    /// (string controls, mismatched value types)
    ControlOutOfRange(usize),

    /// A resource is still held and must be released first
    ResourceInUse(Resource),

    /// The operation is not valid in the current device state
    StreamingStateViolation {
        operation: &'static str,
        state: State,
    },

    /// The requested input channel cannot be selected
    InvalidChannel(u32),

    /// Neither the requested standard nor any auto-detected one is accepted
    UnsupportedStandard(Standard),

    /// The operation is not available on this device or protocol generation
    Unsupported(&'static str),

    /// Other device I/O failure (tuner, frame interval, device queries)
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoDevice(err) => write!(f, "cannot open video device: {}", err),
            Error::UnsupportedDevice => {
                write!(f, "device supports neither the V4L2 nor the V4L1 protocol")
            }
            Error::NoSupportedFormat => write!(f, "no requested pixel format is supported"),
            Error::InvalidBufferCount { requested, granted } => write!(
                f,
                "device granted {} of {} requested buffers (at least 2 required)",
                granted, requested
            ),
            Error::BufferAllocationFailed(err) => {
                write!(f, "buffer allocation failed: {}", err)
            }
            Error::StreamStartFailed(err) => write!(f, "cannot start streaming: {}", err),
            Error::NoFrame(err) => write!(f, "no frame available: {}", err),
            Error::ControlIoError(err) => write!(f, "control I/O error: {}", err),
            Error::ControlOutOfRange(index) => {
                write!(f, "control {} value or index out of range", index)
            }
            Error::ResourceInUse(resource) => write!(f, "{} still in use", resource),
            Error::StreamingStateViolation { operation, state } => {
                write!(f, "{} is not allowed in state {}", operation, state)
            }
            Error::InvalidChannel(channel) => {
                write!(f, "input channel {} cannot be selected", channel)
            }
            Error::UnsupportedStandard(std) => {
                write!(f, "video standard {} cannot be selected", std)
            }
            Error::Unsupported(what) => write!(f, "{} not supported by this device", what),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::NoDevice(err)
            | Error::BufferAllocationFailed(err)
            | Error::StreamStartFailed(err)
            | Error::NoFrame(err)
            | Error::ControlIoError(err)
            | Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// The fourcc module provides portable handling of V4L2 fourcc codes.
pub mod fourcc;

/// The palette module provides the fixed pixel format enumeration.
pub mod palette;

/// The format module provides resolutions, standards and format descriptors.
pub mod format;

/// The buffers module provides the memory-mapped buffer pool.
pub mod buffers;

/// The adapter module provides the V4L1 and V4L2 protocol implementations.
pub mod adapter;

/// The negotiate module provides pixel format and resolution negotiation.
pub mod negotiate;

/// The controls module provides the control registry and vendor probes.
pub mod controls;

/// The capture module provides the capture device state machine.
pub mod capture;

/// The encoder module provides the frame conversion interface.
pub mod encoder;

/// The sim module provides a simulated capture device.
pub mod sim;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidBufferCount {
            requested: 4,
            granted: 1,
        };
        assert_eq!(
            err.to_string(),
            "device granted 1 of 4 requested buffers (at least 2 required)"
        );

        let err = Error::ResourceInUse(Resource::ControlRegistry);
        assert_eq!(err.to_string(), "control registry still in use");
    }

    #[test]
    fn test_error_source() {
        let err = Error::NoFrame(io::Error::from_raw_os_error(libc::EIO));
        assert!(err.source().is_some());
        assert!(Error::NoSupportedFormat.source().is_none());

        let err: Error = io::Error::from_raw_os_error(libc::ENOTTY).into();
        assert!(matches!(err, Error::Io(_)));
    }
}
