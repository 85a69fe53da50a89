// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! A configurable in-memory device.
//!
//! [`SimulatedDevice`] implements [`ProtocolAdapter`] without hardware so the
//! engine can be exercised end to end: format acceptance, buffer grants,
//! failure injection, echoing controls and vendor driver personalities.
//!
//! The device is a handle onto shared state. Clone it before handing it to a
//! [`CaptureDevice`](crate::capture::CaptureDevice) to keep inspecting it:
//!
//! ```
//! use framegrab::{capture::CaptureDevice, format::FormatRequest, palette::Palette,
//!                 format::Resolution, sim::SimulatedDevice};
//!
//! # fn main() -> Result<(), framegrab::Error> {
//! let sim = SimulatedDevice::new().with_format(Palette::Rgb24, Resolution::new(640, 480));
//! let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
//! dev.negotiate_format(&FormatRequest::new(640, 480).with_palettes(&[Palette::Rgb24]))?;
//! dev.allocate_buffers(4)?;
//! assert_eq!(sim.live_mappings(), 4);
//! dev.free_buffers()?;
//! assert_eq!(sim.live_mappings(), 0);
//! dev.close()?;
//! # Ok(())
//! # }
//! ```

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use crate::{
    adapter::{
        monotonic_now, not_supported,
        vendor::{GspcaParam, GspcaParams, PanTiltRange, QcLut, QcSetting},
        DeviceInfo, Dequeued, InputInfo, InputKind, ProtocolAdapter, ProtocolVersion, RawControl,
        TunerSignal,
    },
    buffers::{MappedRegion, Mapping},
    controls::{ControlDescriptor, ControlKind, ControlValue},
    format::{FormatDescriptor, FrameInterval, Resolution, Standard, StandardSupport},
    palette::Palette,
};

/// Buffers a simulated device grants unless told otherwise.
pub const DEFAULT_GRANTED_BUFFERS: u32 = 32;

/// Pan/tilt range reported by the pwc personality.
pub const PWC_RANGE: PanTiltRange = PanTiltRange {
    pan_min: -7000,
    pan_max: 7000,
    tilt_min: -3000,
    tilt_max: 2500,
};

/// How the simulated device answers the pwc private ioctls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PwcPersonality {
    /// Name returned by the probe ioctl
    pub name: String,
    /// Whether the pan/tilt motor ioctls succeed
    pub ptz: bool,
}

#[derive(Debug, Default)]
struct Failures {
    map_at: Option<u32>,
    queue_at: Option<usize>,
    stream_on: bool,
    dequeue: bool,
    release: bool,
    controls: Vec<u32>,
    qc_set: Vec<QcSetting>,
}

#[derive(Debug)]
struct State {
    version: ProtocolVersion,
    support: StandardSupport,
    standards: Vec<Standard>,
    standard_attempts: Vec<Standard>,
    standard: Option<Standard>,
    input: Option<u32>,
    formats: Vec<(Palette, Resolution)>,
    format: Option<FormatDescriptor>,
    crop_resets: usize,
    interval: Option<FrameInterval>,
    interval_locked: bool,

    granted: u32,
    reserved: u32,
    mappings: Vec<Weak<MappedRegion>>,
    queued: VecDeque<u32>,
    queue_calls: usize,
    streaming: bool,
    sequence: u32,

    controls: Vec<RawControl>,
    menus: HashMap<u32, Vec<Option<String>>>,
    values: HashMap<u32, ControlValue>,
    sent: HashMap<u32, ControlValue>,

    frequency: u32,
    signal: TunerSignal,

    pwc: Option<PwcPersonality>,
    angles: (i32, i32),
    gspca: Option<GspcaParams>,
    qc_lut: Option<QcLut>,
    qc_settings: HashMap<QcSetting, i32>,

    fail: Failures,
}

/// An in-memory [`ProtocolAdapter`].
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    info: DeviceInfo,
    state: Arc<Mutex<State>>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    /// A V2 webcam with one camera input that accepts any palette at any
    /// size up to 1920x1080 and grants up to 32 buffers.
    pub fn new() -> Self {
        let info = DeviceInfo {
            name: "Simulated Camera".to_string(),
            driver: "framegrab-sim".to_string(),
            bus_info: "sim:0".to_string(),
            version: ProtocolVersion::V2,
            capabilities: 0,
            inputs: vec![InputInfo {
                index: 0,
                name: "Camera".to_string(),
                kind: InputKind::Camera,
                tuner: None,
                standards: vec![Standard::Webcam],
            }],
            palettes: Palette::DEFAULT_ORDER.to_vec(),
            min_resolution: Resolution::new(32, 32),
            max_resolution: Resolution::new(1920, 1080),
        };
        let state = State {
            version: ProtocolVersion::V2,
            support: StandardSupport::WebcamOnly,
            standards: vec![Standard::Webcam],
            standard_attempts: Vec::new(),
            standard: None,
            input: None,
            formats: Vec::new(),
            format: None,
            crop_resets: 0,
            interval: None,
            interval_locked: false,
            granted: DEFAULT_GRANTED_BUFFERS,
            reserved: 0,
            mappings: Vec::new(),
            queued: VecDeque::new(),
            queue_calls: 0,
            streaming: false,
            sequence: 0,
            controls: Vec::new(),
            menus: HashMap::new(),
            values: HashMap::new(),
            sent: HashMap::new(),
            frequency: 0,
            signal: TunerSignal {
                signal: 0,
                afc: None,
            },
            pwc: None,
            angles: (0, 0),
            gspca: None,
            qc_lut: None,
            qc_settings: HashMap::new(),
            fail: Failures::default(),
        };
        SimulatedDevice {
            info,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Builders

    pub fn with_name(mut self, name: &str) -> Self {
        self.info.name = name.to_string();
        self
    }

    pub fn with_version(mut self, version: ProtocolVersion) -> Self {
        self.info.version = version;
        self.state().version = version;
        self
    }

    pub fn with_max_resolution(mut self, resolution: Resolution) -> Self {
        self.info.max_resolution = resolution;
        self
    }

    /// Restricts the device to the listed palette and size pairs. A palette
    /// with several sizes is granted the one closest in pixel count.
    pub fn with_format(mut self, palette: Palette, resolution: Resolution) -> Self {
        {
            let mut state = self.state();
            state.formats.push((palette, resolution));
        }
        if self.info.palettes == Palette::DEFAULT_ORDER {
            self.info.palettes.clear();
        }
        if !self.info.palettes.contains(&palette) {
            self.info.palettes.push(palette);
        }
        self
    }

    /// Sets what the device reports for standards and which ones it accepts.
    pub fn with_standards(self, support: StandardSupport, accepted: &[Standard]) -> Self {
        {
            let mut state = self.state();
            state.support = support;
            state.standards = accepted.to_vec();
        }
        self
    }

    /// Adds a television input with tuner 0 at `frequency`.
    pub fn with_tuner(mut self, frequency: u32, signal: TunerSignal) -> Self {
        let index = self.info.inputs.len() as u32;
        self.info.inputs.push(InputInfo {
            index,
            name: "Television".to_string(),
            kind: InputKind::Tuner,
            tuner: Some(0),
            standards: vec![Standard::Pal, Standard::Ntsc, Standard::Secam],
        });
        {
            let mut state = self.state();
            state.frequency = frequency;
            state.signal = signal;
        }
        self
    }

    pub fn with_frame_interval(self, interval: FrameInterval) -> Self {
        self.state().interval = Some(interval);
        self
    }

    /// Makes the device ignore frame interval changes.
    pub fn with_locked_frame_interval(self) -> Self {
        self.state().interval_locked = true;
        self
    }

    /// Grants at most `count` buffers.
    pub fn with_granted_buffers(self, count: u32) -> Self {
        self.state().granted = count;
        self
    }

    pub fn with_control(self, control: RawControl) -> Self {
        self.state().controls.push(control);
        self
    }

    /// Menu item names for control `id`; `None` leaves a hole.
    pub fn with_menu(self, id: u32, items: &[Option<&str>]) -> Self {
        self.state()
            .menus
            .insert(id, items.iter().map(|i| i.map(str::to_string)).collect());
        self
    }

    pub fn with_pwc(self, personality: PwcPersonality) -> Self {
        self.state().pwc = Some(personality);
        self
    }

    pub fn with_gspca(self, params: GspcaParams) -> Self {
        self.state().gspca = Some(params);
        self
    }

    /// Answers the QuickCam ioctls, starting from `lut`.
    pub fn with_qc(self, lut: QcLut) -> Self {
        self.state().qc_lut = Some(lut);
        self
    }

    /// Fails mapping of buffer `index`.
    pub fn fail_map_at(self, index: u32) -> Self {
        self.state().fail.map_at = Some(index);
        self
    }

    /// Fails the `nth` (1-based) queue request.
    pub fn fail_queue_at(self, nth: usize) -> Self {
        self.state().fail.queue_at = Some(nth);
        self
    }

    pub fn fail_stream_on(self) -> Self {
        self.state().fail.stream_on = true;
        self
    }

    pub fn fail_dequeue(self) -> Self {
        self.state().fail.dequeue = true;
        self
    }

    /// Fails the next return of the buffer reservation.
    pub fn fail_release(self) -> Self {
        self.state().fail.release = true;
        self
    }

    /// Fails every read and write of control `id`.
    pub fn fail_control(self, id: u32) -> Self {
        self.state().fail.controls.push(id);
        self
    }

    /// Fails the next write of quickcam `setting` after storing the value.
    pub fn fail_qc_set(self, setting: QcSetting) -> Self {
        self.state().fail.qc_set.push(setting);
        self
    }

    // Inspection

    /// Number of buffer mappings still alive.
    pub fn live_mappings(&self) -> usize {
        self.state()
            .mappings
            .iter()
            .filter(|m| m.strong_count() > 0)
            .count()
    }

    /// Number of buffers currently reserved from the device.
    pub fn reserved_buffers(&self) -> u32 {
        self.state().reserved
    }

    /// Number of buffers queued to the device.
    pub fn queued_buffers(&self) -> usize {
        self.state().queued.len()
    }

    pub fn is_streaming(&self) -> bool {
        self.state().streaming
    }

    /// The last value written to control `id`.
    pub fn last_control(&self, id: u32) -> Option<ControlValue> {
        self.state().sent.get(&id).cloned()
    }

    /// Standards tried, in order, since the device was created.
    pub fn standard_attempts(&self) -> Vec<Standard> {
        self.state().standard_attempts.clone()
    }

    pub fn standard(&self) -> Option<Standard> {
        self.state().standard
    }

    pub fn selected_input(&self) -> Option<u32> {
        self.state().input
    }

    pub fn crop_resets(&self) -> usize {
        self.state().crop_resets
    }

    pub fn frame_interval_state(&self) -> Option<FrameInterval> {
        self.state().interval
    }

    pub fn gspca_state(&self) -> Option<GspcaParams> {
        self.state().gspca
    }

    pub fn qc_lut_state(&self) -> Option<QcLut> {
        self.state().qc_lut.clone()
    }

    pub fn pwc_angles_state(&self) -> (i32, i32) {
        self.state().angles
    }
}

fn einval() -> io::Error {
    io::Error::from_raw_os_error(libc::EINVAL)
}

/// Frame size the simulated driver reports; compressed palettes get one
/// byte per pixel.
fn frame_size(palette: Palette, resolution: Resolution) -> u32 {
    palette
        .frame_size(resolution.width, resolution.height)
        .unwrap_or(resolution.width * resolution.height)
}

impl ProtocolAdapter for SimulatedDevice {
    fn version(&self) -> ProtocolVersion {
        self.info.version
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn standard_support(&mut self) -> StandardSupport {
        self.state().support
    }

    fn try_standard(&mut self, _channel: u32, standard: Standard) -> io::Result<()> {
        let mut state = self.state();
        state.standard_attempts.push(standard);
        if state.standards.contains(&standard) {
            state.standard = Some(standard);
            Ok(())
        } else {
            Err(einval())
        }
    }

    fn select_input(&mut self, channel: u32) -> io::Result<InputInfo> {
        let input = self
            .info
            .inputs
            .get(channel as usize)
            .cloned()
            .ok_or_else(einval)?;
        self.state().input = Some(channel);
        Ok(input)
    }

    fn apply_format(
        &mut self,
        palette: Palette,
        resolution: Resolution,
    ) -> io::Result<FormatDescriptor> {
        let max = self.info.max_resolution;
        let mut state = self.state();
        let granted = if state.formats.is_empty() {
            Resolution::new(
                resolution.width.clamp(1, max.width),
                resolution.height.clamp(1, max.height),
            )
        } else {
            let wanted = resolution.pixels() as i64;
            state
                .formats
                .iter()
                .filter(|(p, _)| *p == palette)
                .map(|(_, r)| *r)
                .min_by_key(|r| (r.pixels() as i64 - wanted).abs())
                .ok_or_else(einval)?
        };
        let format = FormatDescriptor::new(
            palette,
            granted.width,
            granted.height,
            0,
            frame_size(palette, granted),
        );
        state.format = Some(format);
        Ok(format)
    }

    fn reset_crop(&mut self) -> io::Result<()> {
        self.state().crop_resets += 1;
        Ok(())
    }

    fn supports_frame_interval(&mut self) -> bool {
        self.state().interval.is_some()
    }

    fn frame_interval(&mut self) -> io::Result<FrameInterval> {
        self.state()
            .interval
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "frame interval"))
    }

    fn set_frame_interval(&mut self, interval: FrameInterval) -> io::Result<FrameInterval> {
        let mut state = self.state();
        let current = state
            .interval
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "frame interval"))?;
        if state.interval_locked {
            return Ok(current);
        }
        state.interval = Some(interval);
        Ok(interval)
    }

    fn request_buffers(&mut self, count: u32) -> io::Result<u32> {
        let mut state = self.state();
        if state.streaming {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        let granted = count.min(state.granted);
        state.reserved = granted;
        state.mappings.clear();
        Ok(granted)
    }

    fn map_buffer(&mut self, index: u32) -> io::Result<Mapping> {
        let mut state = self.state();
        if index >= state.reserved {
            return Err(einval());
        }
        if state.fail.map_at == Some(index) {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }
        let len = state.format.map(|f| f.size as usize).unwrap_or(4096).max(1);
        let region = Arc::new(MappedRegion::heap(len));
        state.mappings.push(Arc::downgrade(&region));
        Mapping::slice(&region, 0, len)
    }

    fn release_buffers(&mut self) -> io::Result<()> {
        let mut state = self.state();
        if state.streaming {
            return Err(io::Error::from_raw_os_error(libc::EBUSY));
        }
        if std::mem::take(&mut state.fail.release) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        state.reserved = 0;
        state.queued.clear();
        Ok(())
    }

    fn queue_buffer(&mut self, index: u32) -> io::Result<()> {
        let mut state = self.state();
        state.queue_calls += 1;
        if state.fail.queue_at == Some(state.queue_calls) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        if index >= state.reserved || state.queued.contains(&index) {
            return Err(einval());
        }
        state.queued.push_back(index);
        Ok(())
    }

    fn dequeue_buffer(&mut self) -> io::Result<Dequeued> {
        let mut state = self.state();
        if state.fail.dequeue {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        if !state.streaming {
            return Err(einval());
        }
        let index = state.queued.pop_front().ok_or_else(einval)?;
        let sequence = state.sequence;
        state.sequence = state.sequence.wrapping_add(1);

        let mut bytes_used = 0;
        if let Some(region) = state.mappings.get(index as usize).and_then(Weak::upgrade) {
            bytes_used = state
                .format
                .map(|f| f.size as usize)
                .unwrap_or(region.len())
                .min(region.len());
            // SAFETY: the buffer is queued, so the engine holds no view of it.
            unsafe { std::ptr::write_bytes(region.as_ptr(), sequence as u8, bytes_used) };
        }

        Ok(Dequeued {
            index,
            bytes_used: bytes_used as u32,
            sequence,
            timestamp: monotonic_now(),
        })
    }

    fn stream_on(&mut self) -> io::Result<()> {
        let mut state = self.state();
        if state.fail.stream_on {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        state.streaming = true;
        Ok(())
    }

    fn stream_off(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.streaming = false;
        state.queued.clear();
        Ok(())
    }

    fn query_controls(&mut self) -> io::Result<Vec<RawControl>> {
        Ok(self.state().controls.clone())
    }

    fn query_menu(&mut self, control: &RawControl, index: u32) -> io::Result<String> {
        self.state()
            .menus
            .get(&control.id)
            .and_then(|items| items.get(index as usize).cloned().flatten())
            .ok_or_else(einval)
    }

    fn get_control(&mut self, control: &ControlDescriptor) -> io::Result<ControlValue> {
        let state = self.state();
        if state.fail.controls.contains(&control.id) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        if let Some(value) = state.values.get(&control.id) {
            return Ok(value.clone());
        }
        Ok(match control.kind {
            ControlKind::Integer64 => ControlValue::Integer64(control.default as i64),
            ControlKind::String => ControlValue::String(String::new()),
            _ => ControlValue::Integer(control.default),
        })
    }

    fn set_control(&mut self, control: &ControlDescriptor, value: &ControlValue) -> io::Result<()> {
        let mut state = self.state();
        if state.fail.controls.contains(&control.id) {
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        state.sent.insert(control.id, value.clone());
        if control.kind != ControlKind::Button {
            state.values.insert(control.id, value.clone());
        }
        Ok(())
    }

    fn tuner_frequency(&mut self, tuner: u32) -> io::Result<u32> {
        self.tuner(tuner)?;
        Ok(self.state().frequency)
    }

    fn set_tuner_frequency(&mut self, tuner: u32, frequency: u32) -> io::Result<()> {
        self.tuner(tuner)?;
        self.state().frequency = frequency;
        Ok(())
    }

    fn tuner_signal(&mut self, tuner: u32) -> io::Result<TunerSignal> {
        self.tuner(tuner)?;
        Ok(self.state().signal)
    }

    fn pwc_probe(&mut self) -> io::Result<String> {
        self.state()
            .pwc
            .as_ref()
            .map(|p| p.name.clone())
            .ok_or_else(not_supported)
    }

    fn pwc_reset_pan_tilt(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.pwc_ptz()?;
        state.angles = (0, 0);
        Ok(())
    }

    fn pwc_pan_tilt_range(&mut self) -> io::Result<PanTiltRange> {
        self.state().pwc_ptz()?;
        Ok(PWC_RANGE)
    }

    fn pwc_angles(&mut self) -> io::Result<(i32, i32)> {
        let state = self.state();
        state.pwc_ptz()?;
        Ok(state.angles)
    }

    fn pwc_set_angles(&mut self, pan: i32, tilt: i32) -> io::Result<()> {
        let mut state = self.state();
        state.pwc_ptz()?;
        if !(PWC_RANGE.pan_min..=PWC_RANGE.pan_max).contains(&pan)
            || !(PWC_RANGE.tilt_min..=PWC_RANGE.tilt_max).contains(&tilt)
        {
            return Err(io::Error::from_raw_os_error(libc::ERANGE));
        }
        state.angles = (pan, tilt);
        Ok(())
    }

    fn gspca_params(&mut self) -> io::Result<GspcaParams> {
        self.state().gspca.ok_or_else(not_supported)
    }

    fn gspca_set_param(&mut self, which: GspcaParam, params: &GspcaParams) -> io::Result<()> {
        let mut state = self.state();
        let current = state.gspca.as_mut().ok_or_else(not_supported)?;
        match which {
            GspcaParam::AutoBrightness => current.auto_brightness = params.auto_brightness,
            GspcaParam::Quality => current.quality = params.quality,
            GspcaParam::FrameInterval => current.frame_interval = params.frame_interval,
            // The driver silently maps unknown frequencies to 0
            GspcaParam::LightFrequency => {
                current.light_frequency = match params.light_frequency {
                    f @ (50 | 60) => f,
                    _ => 0,
                }
            }
        }
        Ok(())
    }

    fn qc_lut(&mut self) -> io::Result<QcLut> {
        self.state().qc_lut.clone().ok_or_else(not_supported)
    }

    fn qc_set_lut(&mut self, lut: &QcLut) -> io::Result<()> {
        let mut state = self.state();
        let current = state.qc_lut.as_mut().ok_or_else(not_supported)?;
        *current = lut.clone();
        Ok(())
    }

    fn qc_get(&mut self, setting: QcSetting) -> io::Result<i32> {
        let state = self.state();
        state.qc_lut.as_ref().ok_or_else(not_supported)?;
        Ok(state.qc_settings.get(&setting).copied().unwrap_or(0))
    }

    fn qc_set(&mut self, setting: QcSetting, value: i32) -> io::Result<i32> {
        let mut state = self.state();
        state.qc_lut.as_ref().ok_or_else(not_supported)?;
        state.qc_settings.insert(setting, value);
        if let Some(pos) = state.fail.qc_set.iter().position(|s| *s == setting) {
            state.fail.qc_set.remove(pos);
            return Err(io::Error::from_raw_os_error(libc::EIO));
        }
        Ok(value)
    }
}

impl SimulatedDevice {
    fn tuner(&self, tuner: u32) -> io::Result<()> {
        let present = self.info.inputs.iter().any(|i| i.tuner == Some(tuner));
        if present {
            Ok(())
        } else {
            Err(einval())
        }
    }
}

impl State {
    fn pwc_ptz(&self) -> io::Result<()> {
        match &self.pwc {
            Some(p) if p.ptz => Ok(()),
            _ => Err(not_supported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_grant_nearest() -> io::Result<()> {
        let mut sim = SimulatedDevice::new()
            .with_format(Palette::Yuyv, Resolution::new(320, 240))
            .with_format(Palette::Yuyv, Resolution::new(1280, 720));
        let f = sim.apply_format(Palette::Yuyv, Resolution::new(1000, 700))?;
        assert_eq!(f.resolution(), Resolution::new(1280, 720));
        assert!(sim.apply_format(Palette::Rgb24, Resolution::new(320, 240)).is_err());
        assert_eq!(sim.info().palettes, vec![Palette::Yuyv]);
        Ok(())
    }

    #[test]
    fn test_queue_dequeue_fills_frames() -> io::Result<()> {
        let mut sim = SimulatedDevice::new();
        sim.apply_format(Palette::Grey, Resolution::new(64, 64))?;
        assert_eq!(sim.request_buffers(3)?, 3);
        let maps: Vec<_> = (0..3).map(|i| sim.map_buffer(i)).collect::<io::Result<_>>()?;
        assert_eq!(sim.live_mappings(), 3);

        sim.queue_buffer(1)?;
        assert!(sim.queue_buffer(1).is_err());
        assert!(sim.dequeue_buffer().is_err());
        sim.stream_on()?;
        let d = sim.dequeue_buffer()?;
        assert_eq!((d.index, d.bytes_used, d.sequence), (1, 64 * 64, 0));

        drop(maps);
        assert_eq!(sim.live_mappings(), 0);
        Ok(())
    }

    #[test]
    fn test_clone_shares_state() -> io::Result<()> {
        let sim = SimulatedDevice::new();
        let mut other = sim.clone();
        other.request_buffers(5)?;
        assert_eq!(sim.reserved_buffers(), 5);
        Ok(())
    }
}
