// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::{
    fmt,
    fs::{File, OpenOptions},
    io,
    os::fd::AsRawFd,
    path::{Path, PathBuf},
};

use crate::{
    adapter::{
        v1::V1Adapter, v2::V2Adapter, DeviceInfo, InputInfo, ProtocolAdapter, ProtocolVersion,
        TunerSignal,
    },
    buffers::{BufferPool, FrameBuffer, SlotState},
    controls::{ControlDescriptor, ControlRegistry, ControlValue, ProbeKind},
    format::{FormatDescriptor, FormatRequest, FrameInterval, Standard},
    negotiate::{self, Negotiated},
    Error, Resource,
};

/// Lifecycle state of a [`CaptureDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Closed,
    Opened,
    VersionDetected,
    FormatSet,
    BuffersAllocated,
    Streaming,
    Stopped,
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Opened => "opened",
            State::VersionDetected => "version detected",
            State::FormatSet => "format set",
            State::BuffersAllocated => "buffers allocated",
            State::Streaming => "streaming",
            State::Stopped => "stopped",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A video capture device.
///
/// The device walks through the [`State`] machine
/// `Opened → VersionDetected → FormatSet → BuffersAllocated → Streaming →
/// Stopped`; every operation checks the current state and fails with
/// [`Error::StreamingStateViolation`] when called out of order.
pub struct CaptureDevice {
    path: PathBuf,
    state: State,
    negotiated: Option<Negotiated>,
    channel: u32,
    pool: Option<BufferPool>,
    controls: Option<ControlRegistry>,
    adapter: Option<Box<dyn ProtocolAdapter>>,
    // Closed last, after everything that refers to the descriptor
    file: Option<File>,
}

fn violation(operation: &'static str, state: State) -> Error {
    Error::StreamingStateViolation { operation, state }
}

fn bound<'a>(
    adapter: &'a mut Option<Box<dyn ProtocolAdapter>>,
    operation: &'static str,
    state: State,
) -> Result<&'a mut dyn ProtocolAdapter, Error> {
    match adapter {
        Some(adapter) => Ok(&mut **adapter),
        None => Err(violation(operation, state)),
    }
}

/// Maps an adapter failure, keeping "not available on this protocol" apart
/// from device errors.
fn unsupported_or_io(err: io::Error, what: &'static str) -> Error {
    if err.kind() == io::ErrorKind::Unsupported {
        Error::Unsupported(what)
    } else {
        Error::Io(err)
    }
}

impl CaptureDevice {
    /// Opens the device file read-write.
    pub fn open(path: impl AsRef<Path>) -> Result<CaptureDevice, Error> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::NoDevice(io::Error::new(
                io::ErrorKind::NotFound,
                "empty device path",
            )));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(Error::NoDevice)?;
        log::debug!("opened {}", path.display());

        Ok(CaptureDevice {
            path: path.to_path_buf(),
            state: State::Opened,
            negotiated: None,
            channel: 0,
            pool: None,
            controls: None,
            adapter: None,
            file: Some(file),
        })
    }

    /// Wraps an already bound adapter, such as a
    /// [`SimulatedDevice`](crate::sim::SimulatedDevice). The device starts in
    /// [`State::VersionDetected`].
    pub fn with_adapter(adapter: Box<dyn ProtocolAdapter>) -> CaptureDevice {
        CaptureDevice {
            path: PathBuf::from(&adapter.info().bus_info),
            state: State::VersionDetected,
            negotiated: None,
            channel: 0,
            pool: None,
            controls: None,
            adapter: Some(adapter),
            file: None,
        }
    }

    /// Queries the device as V2, then as V1, and binds the matching adapter.
    pub fn detect_version(&mut self) -> Result<ProtocolVersion, Error> {
        if self.state != State::Opened {
            return Err(violation("detect_version", self.state));
        }
        let fd = match &self.file {
            Some(file) => file.as_raw_fd(),
            None => return Err(violation("detect_version", self.state)),
        };

        let adapter: Box<dyn ProtocolAdapter> = match V2Adapter::probe(fd) {
            Ok(v2) => Box::new(v2),
            Err(err) => {
                log::debug!("{} is not a V4L2 capture device: {}", self.path.display(), err);
                match V1Adapter::probe(fd) {
                    Ok(v1) => Box::new(v1),
                    Err(err) => {
                        log::debug!("{} is not a V4L1 capture device: {}", self.path.display(), err);
                        return Err(Error::UnsupportedDevice);
                    }
                }
            }
        };

        let version = adapter.version();
        log::info!(
            "{}: {} device {}",
            self.path.display(),
            version,
            adapter.info().name
        );
        self.adapter = Some(adapter);
        self.state = State::VersionDetected;
        Ok(version)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Device description; available once the version is detected.
    pub fn info(&self) -> Option<&DeviceInfo> {
        self.adapter.as_ref().map(|a| a.info())
    }

    pub fn version(&self) -> Option<ProtocolVersion> {
        self.adapter.as_ref().map(|a| a.version())
    }

    /// Negotiates the capture format, see [`negotiate`](crate::negotiate).
    ///
    /// Allowed after version detection and again after
    /// [`free_buffers`](Self::free_buffers).
    pub fn negotiate_format(&mut self, request: &FormatRequest) -> Result<FormatDescriptor, Error> {
        if !matches!(self.state, State::VersionDetected | State::FormatSet) {
            return Err(violation("negotiate_format", self.state));
        }
        let adapter = bound(&mut self.adapter, "negotiate_format", self.state)?;
        let negotiated = negotiate::negotiate(adapter, request)?;
        let format = negotiated.format;
        self.channel = request.channel;
        self.negotiated = Some(negotiated);
        self.state = State::FormatSet;
        Ok(format)
    }

    /// The negotiated format.
    pub fn format(&self) -> Option<FormatDescriptor> {
        self.negotiated.as_ref().map(|n| n.format)
    }

    /// Input channel and standard currently selected.
    pub fn input_standard(&self) -> Option<(u32, Standard)> {
        self.negotiated.as_ref().map(|n| (self.channel, n.standard))
    }

    /// The explicitly selected input, for broadcast standards.
    pub fn input(&self) -> Option<&InputInfo> {
        self.negotiated.as_ref().and_then(|n| n.input.as_ref())
    }

    /// Selects another input and standard after negotiation.
    ///
    /// The standard is auto-detected as during negotiation when the device
    /// rejects it. Not allowed while streaming.
    pub fn set_input_standard(&mut self, channel: u32, standard: Standard) -> Result<Standard, Error> {
        if !matches!(
            self.state,
            State::FormatSet | State::BuffersAllocated | State::Stopped
        ) {
            return Err(violation("set_input_standard", self.state));
        }
        let state = self.state;
        let adapter = bound(&mut self.adapter, "set_input_standard", state)?;
        let standard = negotiate::select_standard(adapter, channel, standard)?;
        let input = negotiate::select_input(adapter, channel, standard)?;

        if let Some(negotiated) = self.negotiated.as_mut() {
            negotiated.standard = standard;
            negotiated.input = input;
        }
        self.channel = channel;
        Ok(standard)
    }

    /// Reserves and maps up to `count` buffers, returning the number granted.
    pub fn allocate_buffers(&mut self, count: u32) -> Result<usize, Error> {
        if self.state != State::FormatSet {
            return Err(violation("allocate_buffers", self.state));
        }
        let adapter = bound(&mut self.adapter, "allocate_buffers", self.state)?;
        let pool = BufferPool::allocate(adapter, count)?;
        let granted = pool.len();
        self.pool = Some(pool);
        self.state = State::BuffersAllocated;
        Ok(granted)
    }

    pub fn buffers(&self) -> Option<&BufferPool> {
        self.pool.as_ref()
    }

    /// Discovers the device's controls and runs the default probe plugins.
    /// Returns the number of controls.
    pub fn build_controls(&mut self) -> Result<usize, Error> {
        self.build_controls_with(&ProbeKind::DEFAULT)
    }

    /// As [`build_controls`](Self::build_controls) with an explicit plugin
    /// list.
    pub fn build_controls_with(&mut self, plugins: &[ProbeKind]) -> Result<usize, Error> {
        if self.controls.is_some() {
            return Err(Error::ResourceInUse(Resource::ControlRegistry));
        }
        let adapter = bound(&mut self.adapter, "build_controls", self.state)?;
        let registry = ControlRegistry::build_with(adapter, plugins)?;
        let count = registry.len();
        self.controls = Some(registry);
        Ok(count)
    }

    /// The controls found by [`build_controls`](Self::build_controls), empty
    /// before that.
    pub fn controls(&self) -> &[ControlDescriptor] {
        self.controls.as_ref().map(|c| c.list()).unwrap_or(&[])
    }

    pub fn registry(&self) -> Option<&ControlRegistry> {
        self.controls.as_ref()
    }

    pub fn get_control(&mut self, index: usize) -> Result<ControlValue, Error> {
        let state = self.state;
        let adapter = bound(&mut self.adapter, "get_control", state)?;
        // Without a registry there is no index to be out of range
        let registry = self
            .controls
            .as_mut()
            .ok_or_else(|| violation("get_control", state))?;
        registry.get(adapter, index)
    }

    /// Writes a control and returns the value sent after clamping.
    pub fn set_control(&mut self, index: usize, value: ControlValue) -> Result<ControlValue, Error> {
        let state = self.state;
        let adapter = bound(&mut self.adapter, "set_control", state)?;
        let registry = self
            .controls
            .as_mut()
            .ok_or_else(|| violation("set_control", state))?;
        registry.set(adapter, index, value)
    }

    /// Frees plugin state. Must happen before [`close`](Self::close).
    pub fn release_controls(&mut self) -> Result<(), Error> {
        if let Some(registry) = self.controls.take() {
            registry.release();
        }
        Ok(())
    }

    /// Queues every idle buffer and starts streaming.
    ///
    /// On failure the device takes back every buffer queued so far and stays
    /// in its previous state.
    pub fn start(&mut self) -> Result<(), Error> {
        if !matches!(self.state, State::BuffersAllocated | State::Stopped) {
            return Err(violation("start", self.state));
        }
        let adapter = bound(&mut self.adapter, "start", self.state)?;
        let pool = match self.pool.as_mut() {
            Some(pool) => pool,
            None => return Err(violation("start", self.state)),
        };

        let mut result = Ok(());
        for index in pool.indices(SlotState::Idle) {
            if let Err(err) = adapter.queue_buffer(index) {
                log::error!("cannot queue buffer {}: {}", index, err);
                result = Err(err);
                break;
            }
            pool.set_state(index, SlotState::Queued);
        }
        if result.is_ok() {
            result = adapter.stream_on();
        }

        if let Err(err) = result {
            if let Err(off) = adapter.stream_off() {
                log::warn!("cannot take back queued buffers: {}", off);
            }
            pool.reset(SlotState::Queued, SlotState::Idle);
            return Err(Error::StreamStartFailed(err));
        }

        log::debug!("streaming with {} buffers", pool.count(SlotState::Queued));
        self.state = State::Streaming;
        Ok(())
    }

    /// Blocks until the device fills a buffer and lends it to the caller.
    pub fn dequeue(&mut self) -> Result<FrameBuffer, Error> {
        if self.state != State::Streaming {
            return Err(violation("dequeue", self.state));
        }
        let adapter = bound(&mut self.adapter, "dequeue", self.state)?;
        let pool = match self.pool.as_mut() {
            Some(pool) => pool,
            None => return Err(violation("dequeue", self.state)),
        };

        let d = adapter.dequeue_buffer().map_err(Error::NoFrame)?;
        log::trace!("dequeued buffer {} seq {} ({} bytes)", d.index, d.sequence, d.bytes_used);
        pool.lend(d.index, d.bytes_used, d.sequence, d.timestamp)
            .map_err(Error::NoFrame)
    }

    /// Hands a dequeued buffer back to the device.
    ///
    /// While stopped the buffer is kept and queued again by the next
    /// [`start`](Self::start).
    pub fn enqueue(&mut self, frame: FrameBuffer) -> Result<(), Error> {
        let state = self.state;
        let pool = match self.pool.as_mut() {
            Some(pool) if pool.generation() == frame.generation() => pool,
            _ => return Err(violation("enqueue", state)),
        };
        if pool.state(frame.index()) != Some(SlotState::Dequeued) {
            return Err(violation("enqueue", state));
        }

        let index = frame.index();
        drop(frame);
        if state != State::Streaming {
            pool.set_state(index, SlotState::Idle);
            return Ok(());
        }

        let adapter = bound(&mut self.adapter, "enqueue", state)?;
        match adapter.queue_buffer(index) {
            Ok(()) => {
                pool.set_state(index, SlotState::Queued);
                Ok(())
            }
            Err(err) => {
                pool.set_state(index, SlotState::Idle);
                Err(Error::Io(err))
            }
        }
    }

    /// Stops streaming. Buffers stay mapped.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.state != State::Streaming {
            return Err(violation("stop", self.state));
        }
        let adapter = bound(&mut self.adapter, "stop", self.state)?;
        adapter.stream_off()?;
        if let Some(pool) = self.pool.as_mut() {
            pool.reset(SlotState::Queued, SlotState::Idle);
        }
        log::debug!("streaming stopped");
        self.state = State::Stopped;
        Ok(())
    }

    /// Unmaps every buffer and returns to [`State::FormatSet`].
    ///
    /// Fails with [`Resource::FrameBuffers`] while frames are still lent out.
    /// A device error while returning the reservation is reported after the
    /// buffers are unmapped, so the device is in `FormatSet` either way.
    pub fn free_buffers(&mut self) -> Result<(), Error> {
        if !matches!(self.state, State::BuffersAllocated | State::Stopped) {
            return Err(violation("free_buffers", self.state));
        }
        if self.pool.as_ref().is_some_and(|p| p.outstanding() > 0) {
            return Err(Error::ResourceInUse(Resource::FrameBuffers));
        }
        let adapter = bound(&mut self.adapter, "free_buffers", self.state)?;
        // The mappings are gone once the pool is consumed, even if the
        // device refuses to return the reservation
        self.state = State::FormatSet;
        match self.pool.take() {
            Some(pool) => pool.release(adapter),
            None => Ok(()),
        }
    }

    pub fn frame_interval(&mut self) -> Result<FrameInterval, Error> {
        let adapter = bound(&mut self.adapter, "frame_interval", self.state)?;
        adapter
            .frame_interval()
            .map_err(|err| unsupported_or_io(err, "frame interval"))
    }

    /// Sets the frame interval; the device must apply it exactly.
    pub fn set_frame_interval(&mut self, interval: FrameInterval) -> Result<(), Error> {
        if self.state == State::Streaming {
            return Err(violation("set_frame_interval", self.state));
        }
        let adapter = bound(&mut self.adapter, "set_frame_interval", self.state)?;
        let granted = adapter
            .set_frame_interval(interval)
            .map_err(|err| unsupported_or_io(err, "frame interval"))?;
        if granted != interval {
            log::info!("frame interval {} requested, device applied {}", interval, granted);
            return Err(Error::NoSupportedFormat);
        }
        if let Some(negotiated) = self.negotiated.as_mut() {
            negotiated.interval = Some(granted);
        }
        Ok(())
    }

    /// Tuner of the selected input.
    pub fn tuner(&self) -> Option<u32> {
        self.input().and_then(|i| i.tuner)
    }

    fn tuner_adapter(&mut self, operation: &'static str) -> Result<(u32, &mut dyn ProtocolAdapter), Error> {
        let tuner = self.tuner().ok_or(Error::Unsupported("tuner"))?;
        let adapter = bound(&mut self.adapter, operation, self.state)?;
        Ok((tuner, adapter))
    }

    pub fn tuner_frequency(&mut self) -> Result<u32, Error> {
        let (tuner, adapter) = self.tuner_adapter("tuner_frequency")?;
        Ok(adapter.tuner_frequency(tuner)?)
    }

    pub fn set_tuner_frequency(&mut self, frequency: u32) -> Result<(), Error> {
        let (tuner, adapter) = self.tuner_adapter("set_tuner_frequency")?;
        Ok(adapter.set_tuner_frequency(tuner, frequency)?)
    }

    pub fn tuner_signal(&mut self) -> Result<TunerSignal, Error> {
        let (tuner, adapter) = self.tuner_adapter("tuner_signal")?;
        Ok(adapter.tuner_signal(tuner)?)
    }

    /// Closes the device.
    ///
    /// Fails without changing anything while the control registry or the
    /// buffer pool is still held.
    pub fn close(&mut self) -> Result<(), Error> {
        if self.state == State::Closed {
            return Err(violation("close", self.state));
        }
        if self.controls.is_some() {
            return Err(Error::ResourceInUse(Resource::ControlRegistry));
        }
        if self.pool.is_some() {
            return Err(Error::ResourceInUse(Resource::BufferPool));
        }
        self.negotiated = None;
        self.adapter = None;
        self.file = None;
        log::debug!("closed {}", self.path.display());
        self.state = State::Closed;
        Ok(())
    }
}

impl Drop for CaptureDevice {
    fn drop(&mut self) {
        if self.state == State::Closed {
            return;
        }
        if let Some(adapter) = self.adapter.as_deref_mut() {
            if self.state == State::Streaming {
                if let Err(err) = adapter.stream_off() {
                    log::error!("{}: cannot stop streaming: {}", self.path.display(), err);
                }
            }
            if let Some(pool) = self.pool.take() {
                if let Err(err) = pool.release(adapter) {
                    log::error!("{}: cannot release buffers: {}", self.path.display(), err);
                }
            }
        }
        if let Some(registry) = self.controls.take() {
            registry.release();
        }
    }
}

impl fmt::Debug for CaptureDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureDevice")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("format", &self.format())
            .field("buffers", &self.pool.as_ref().map(|p| p.len()))
            .field("controls", &self.controls().len())
            .finish()
    }
}
