// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Protocol adapters
//!
//! Every device operation the engine performs goes through the
//! [`ProtocolAdapter`] trait. [`CaptureDevice::detect_version`] binds exactly
//! one implementation per device:
//!
//! | Adapter | Protocol | Detected by |
//! |---------|----------|-------------|
//! | [`v2::V2Adapter`] | Video4Linux2 | `VIDIOC_QUERYCAP` with capture and streaming |
//! | [`v1::V1Adapter`] | Video4Linux | `VIDIOCGCAP` with `VID_TYPE_CAPTURE` |
//! | [`SimulatedDevice`](crate::sim::SimulatedDevice) | none | constructed directly |
//!
//! Adapter methods return `io::Result`; the capture device maps failures onto
//! the engine [`Error`](crate::Error) taxonomy according to the operation.
//!
//! [`CaptureDevice::detect_version`]: crate::capture::CaptureDevice::detect_version

use std::{fmt, io, os::fd::RawFd};

use framegrab_sys::nix::errno::Errno;
use unix_ts::Timestamp;

use crate::{
    buffers::Mapping,
    controls::{ControlDescriptor, ControlKind, ControlValue},
    format::{FormatDescriptor, FrameInterval, Resolution, Standard, StandardSupport},
    palette::Palette,
};

pub mod v1;
pub mod v2;
pub mod vendor;

use vendor::{GspcaParam, GspcaParams, PanTiltRange, QcLut, QcSetting};

/// Protocol generation spoken by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
}

impl ProtocolVersion {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "V4L1",
            ProtocolVersion::V2 => "V4L2",
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Camera,
    Tuner,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Camera => write!(f, "camera"),
            InputKind::Tuner => write!(f, "tuner"),
        }
    }
}

/// A video input of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputInfo {
    pub index: u32,
    pub name: String,
    pub kind: InputKind,
    /// Tuner index, for tuner inputs
    pub tuner: Option<u32>,
    /// Standards the input accepts; `[Webcam]` for inputs without standards
    pub standards: Vec<Standard>,
}

/// Static device description gathered at detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub driver: String,
    pub bus_info: String,
    pub version: ProtocolVersion,
    /// Raw capability flags of the protocol generation
    pub capabilities: u32,
    pub inputs: Vec<InputInfo>,
    /// Palettes the device produces natively
    pub palettes: Vec<Palette>,
    pub min_resolution: Resolution,
    pub max_resolution: Resolution,
}

/// A control as the device reports it, before quirk fixing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawControl {
    pub id: u32,
    pub name: String,
    /// `None` for control-class markers and types the engine does not handle
    pub kind: Option<ControlKind>,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default: i32,
    pub flags: u32,
}

/// A buffer returned by the device.
#[derive(Debug, Clone, Copy)]
pub struct Dequeued {
    pub index: u32,
    pub bytes_used: u32,
    pub sequence: u32,
    pub timestamp: Timestamp,
}

/// Tuner reception quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunerSignal {
    /// Signal strength, 0..65535
    pub signal: i32,
    /// Automatic frequency control offset; V2 only
    pub afc: Option<i32>,
}

/// The operations one protocol generation provides to the engine.
pub trait ProtocolAdapter: Send {
    fn version(&self) -> ProtocolVersion;

    fn info(&self) -> &DeviceInfo;

    /// Device file descriptor, if the adapter is backed by one.
    fn fd(&self) -> Option<RawFd> {
        None
    }

    // Inputs and standards

    fn standard_support(&mut self) -> StandardSupport;

    /// Selects `standard` on `channel`, failing if the device rejects it.
    fn try_standard(&mut self, channel: u32, standard: Standard) -> io::Result<()>;

    fn select_input(&mut self, channel: u32) -> io::Result<InputInfo>;

    // Format

    /// Sets `palette` at `resolution` and returns what the device granted.
    /// Fails if the device substitutes another palette.
    fn apply_format(
        &mut self,
        palette: Palette,
        resolution: Resolution,
    ) -> io::Result<FormatDescriptor>;

    fn reset_crop(&mut self) -> io::Result<()>;

    fn supports_frame_interval(&mut self) -> bool;

    fn frame_interval(&mut self) -> io::Result<FrameInterval>;

    /// Requests `interval` and returns the interval the device applied.
    fn set_frame_interval(&mut self, interval: FrameInterval) -> io::Result<FrameInterval>;

    // Buffers

    /// Reserves up to `count` buffers and returns the number granted.
    fn request_buffers(&mut self, count: u32) -> io::Result<u32>;

    fn map_buffer(&mut self, index: u32) -> io::Result<Mapping>;

    /// Returns the buffer reservation to the device.
    fn release_buffers(&mut self) -> io::Result<()>;

    fn queue_buffer(&mut self, index: u32) -> io::Result<()>;

    /// Blocks until the device fills a buffer.
    fn dequeue_buffer(&mut self) -> io::Result<Dequeued>;

    fn stream_on(&mut self) -> io::Result<()>;

    /// Stops streaming and takes back every queued buffer.
    fn stream_off(&mut self) -> io::Result<()>;

    // Controls

    fn query_controls(&mut self) -> io::Result<Vec<RawControl>>;

    /// Name of menu item `index`; integer menus report the value.
    fn query_menu(&mut self, control: &RawControl, index: u32) -> io::Result<String>;

    fn get_control(&mut self, control: &ControlDescriptor) -> io::Result<ControlValue>;

    fn set_control(&mut self, control: &ControlDescriptor, value: &ControlValue)
        -> io::Result<()>;

    // Tuner

    fn tuner_frequency(&mut self, tuner: u32) -> io::Result<u32>;

    fn set_tuner_frequency(&mut self, tuner: u32, frequency: u32) -> io::Result<()>;

    fn tuner_signal(&mut self, tuner: u32) -> io::Result<TunerSignal>;

    // Vendor-private requests. The defaults issue the driver ioctls on the
    // adapter's file descriptor, or fail with ENOTTY without one.

    fn pwc_probe(&mut self) -> io::Result<String> {
        vendor::pwc_probe(self.vendor_fd()?)
    }

    fn pwc_reset_pan_tilt(&mut self) -> io::Result<()> {
        vendor::pwc_reset_pan_tilt(self.vendor_fd()?)
    }

    fn pwc_pan_tilt_range(&mut self) -> io::Result<PanTiltRange> {
        vendor::pwc_pan_tilt_range(self.vendor_fd()?)
    }

    /// Current absolute (pan, tilt) angles.
    fn pwc_angles(&mut self) -> io::Result<(i32, i32)> {
        vendor::pwc_angles(self.vendor_fd()?)
    }

    fn pwc_set_angles(&mut self, pan: i32, tilt: i32) -> io::Result<()> {
        vendor::pwc_set_angles(self.vendor_fd()?, pan, tilt)
    }

    fn gspca_params(&mut self) -> io::Result<GspcaParams> {
        vendor::gspca_params(self.vendor_fd()?)
    }

    /// Writes the field of `params` selected by `which`.
    fn gspca_set_param(&mut self, which: GspcaParam, params: &GspcaParams) -> io::Result<()> {
        vendor::gspca_set_param(self.vendor_fd()?, which, params)
    }

    fn qc_lut(&mut self) -> io::Result<QcLut> {
        vendor::qc_lut(self.vendor_fd()?)
    }

    fn qc_set_lut(&mut self, lut: &QcLut) -> io::Result<()> {
        vendor::qc_set_lut(self.vendor_fd()?, lut)
    }

    fn qc_get(&mut self, setting: QcSetting) -> io::Result<i32> {
        vendor::qc_get(self.vendor_fd()?, setting)
    }

    /// Writes a setting and returns the value the driver kept.
    fn qc_set(&mut self, setting: QcSetting, value: i32) -> io::Result<i32> {
        vendor::qc_set(self.vendor_fd()?, setting, value)
    }

    #[doc(hidden)]
    fn vendor_fd(&self) -> io::Result<RawFd> {
        self.fd().ok_or_else(not_supported)
    }
}

impl fmt::Debug for dyn ProtocolAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolAdapter")
            .field("version", &self.version())
            .field("name", &self.info().name)
            .finish()
    }
}

/// The error a driver returns for an ioctl it does not implement.
pub(crate) fn not_supported() -> io::Error {
    io::Error::from_raw_os_error(libc::ENOTTY)
}

/// Runs an ioctl wrapper, retrying while it is interrupted by a signal.
pub(crate) fn xioctl<T>(mut call: impl FnMut() -> Result<T, Errno>) -> io::Result<T> {
    loop {
        match call() {
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(io::Error::from(errno)),
            Ok(value) => return Ok(value),
        }
    }
}

/// Monotonic clock reading, for devices that do not timestamp frames.
pub(crate) fn monotonic_now() -> Timestamp {
    // SAFETY: timespec is plain integers; CLOCK_MONOTONIC is always available.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    Timestamp::new(ts.tv_sec as i64, ts.tv_nsec as u32)
}
