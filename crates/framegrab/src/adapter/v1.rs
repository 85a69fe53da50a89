// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video4Linux (version 1) adapter.
//!
//! V1 has no buffer queue: the driver exposes one memory region holding
//! every frame, capture of a frame is requested with `VIDIOCMCAPTURE`, and
//! `VIDIOCSYNC` blocks until that frame is filled. The adapter maps this
//! onto queue/dequeue by remembering the order frames were requested in.

use std::{collections::VecDeque, io, os::fd::RawFd, sync::Arc};

use framegrab_sys::{cstr_field, v4l1, v4l2};
use libc::{c_int, c_ulong};

use super::{
    monotonic_now, xioctl, DeviceInfo, Dequeued, InputInfo, InputKind, ProtocolAdapter,
    ProtocolVersion, RawControl, TunerSignal,
};
use crate::{
    buffers::{MappedRegion, Mapping},
    controls::{ControlDescriptor, ControlKind, ControlValue},
    format::{FormatDescriptor, FrameInterval, Resolution, Standard, StandardSupport},
    palette::Palette,
};

/// Picture controls every V1 device has, reported under their V2 ids.
const PICTURE_CONTROLS: [(u32, &str); 4] = [
    (v4l2::V4L2_CID_BRIGHTNESS, "Brightness"),
    (v4l2::V4L2_CID_HUE, "Hue"),
    (v4l2::V4L2_CID_SATURATION, "Color"),
    (v4l2::V4L2_CID_CONTRAST, "Contrast"),
];

/// Adapter for devices speaking Video4Linux 1.
#[derive(Debug)]
pub struct V1Adapter {
    fd: RawFd,
    info: DeviceInfo,
    /// Format applied by the last successful `apply_format`
    format: Option<FormatDescriptor>,
    /// The V1 palette code the driver accepted for `format`
    v1_palette: u16,
    region: Option<Arc<MappedRegion>>,
    offsets: Vec<usize>,
    frame_len: usize,
    pending: VecDeque<u32>,
    sequence: u32,
}

impl V1Adapter {
    /// Queries the V1 capabilities and gathers the device description.
    pub fn probe(fd: RawFd) -> io::Result<V1Adapter> {
        let mut vc = v4l1::video_capability::default();
        // SAFETY: vc is a valid video_capability.
        xioctl(|| unsafe { v4l1::vidiocgcap(fd, &mut vc) })?;

        if vc.type_ & v4l1::VID_TYPE_CAPTURE == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "V4L1 device without capture capability",
            ));
        }

        let inputs = (0..vc.channels.max(0) as u32)
            .filter_map(|index| query_channel(fd, index).ok().map(|(input, _)| input))
            .collect();

        let info = DeviceInfo {
            name: cstr_field(&vc.name),
            driver: String::new(),
            bus_info: String::new(),
            version: ProtocolVersion::V1,
            capabilities: vc.type_ as u32,
            inputs,
            palettes: probe_palettes(fd),
            min_resolution: Resolution::new(vc.minwidth as u32, vc.minheight as u32),
            max_resolution: Resolution::new(vc.maxwidth as u32, vc.maxheight as u32),
        };
        log::debug!(
            "V4L1 device {}, {} channels, palettes {:?}",
            info.name,
            vc.channels,
            info.palettes
        );

        Ok(V1Adapter {
            fd,
            info,
            format: None,
            v1_palette: 0,
            region: None,
            offsets: Vec::new(),
            frame_len: 0,
            pending: VecDeque::new(),
            sequence: 0,
        })
    }

    fn picture(&self) -> io::Result<v4l1::video_picture> {
        let mut pict = v4l1::video_picture::default();
        // SAFETY: pict is a valid video_picture.
        xioctl(|| unsafe { v4l1::vidiocgpict(self.fd, &mut pict) })?;
        Ok(pict)
    }

    fn set_picture(&self, pict: &v4l1::video_picture) -> io::Result<()> {
        // SAFETY: pict outlives the call.
        xioctl(|| unsafe { v4l1::vidiocspict(self.fd, pict) })?;
        Ok(())
    }

    fn sync(&self, frame: u32) -> io::Result<()> {
        let frame = frame as c_int;
        // SAFETY: frame outlives the call.
        xioctl(|| unsafe { v4l1::vidiocsync(self.fd, &frame) })?;
        Ok(())
    }

    fn format(&self) -> io::Result<FormatDescriptor> {
        self.format.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no format has been applied")
        })
    }
}

/// Returns the channel description and its raw channel structure.
fn query_channel(fd: RawFd, index: u32) -> io::Result<(InputInfo, v4l1::video_channel)> {
    let mut chan = v4l1::video_channel {
        channel: index as c_int,
        ..Default::default()
    };
    // SAFETY: chan is a valid video_channel.
    xioctl(|| unsafe { v4l1::vidiocgchan(fd, &mut chan) })?;

    // V1 supports a single tuner per input
    let tuner = chan.flags & v4l1::VIDEO_VC_TUNER != 0 && chan.tuners == 1;
    let standards = if chan.type_ == v4l1::VIDEO_TYPE_TV {
        vec![Standard::Pal, Standard::Ntsc, Standard::Secam]
    } else {
        vec![Standard::Webcam]
    };
    let input = InputInfo {
        index,
        name: cstr_field(&chan.name),
        kind: if tuner {
            InputKind::Tuner
        } else {
            InputKind::Camera
        },
        tuner: tuner.then_some(0),
        standards,
    };
    Ok((input, chan))
}

/// Finds the palettes the driver accepts by trying each one, then restores
/// the original picture settings.
fn probe_palettes(fd: RawFd) -> Vec<Palette> {
    let mut original = v4l1::video_picture::default();
    // SAFETY: original is a valid video_picture.
    if xioctl(|| unsafe { v4l1::vidiocgpict(fd, &mut original) }).is_err() {
        return Vec::new();
    }

    let mut palettes = Vec::new();
    for palette in Palette::ALL {
        let codes = [palette.v1_palette(), palette.v1_alias()];
        for code in codes.into_iter().flatten() {
            let pict = v4l1::video_picture {
                palette: code,
                depth: palette.depth().unwrap_or(0) as u16,
                ..original
            };
            // SAFETY: pict outlives the call.
            if xioctl(|| unsafe { v4l1::vidiocspict(fd, &pict) }).is_ok() {
                palettes.push(palette);
                break;
            }
        }
    }

    // SAFETY: original outlives the call.
    if let Err(err) = xioctl(|| unsafe { v4l1::vidiocspict(fd, &original) }) {
        log::warn!("cannot restore picture settings: {}", err);
    }
    palettes
}

impl ProtocolAdapter for V1Adapter {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn fd(&self) -> Option<RawFd> {
        Some(self.fd)
    }

    /// V1 selects channel and norm together, so every device goes through
    /// standard selection; `Webcam` maps to the automatic norm.
    fn standard_support(&mut self) -> StandardSupport {
        StandardSupport::Broadcast
    }

    fn try_standard(&mut self, channel: u32, standard: Standard) -> io::Result<()> {
        let (_, mut chan) = query_channel(self.fd, channel)?;
        chan.norm = standard.v1_mode();
        // SAFETY: chan outlives the call.
        xioctl(|| unsafe { v4l1::vidiocschan(self.fd, &chan) })?;

        let (_, granted) = query_channel(self.fd, channel)?;
        if standard != Standard::Webcam && granted.norm != chan.norm {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("channel {} kept norm {}", channel, granted.norm),
            ));
        }
        Ok(())
    }

    fn select_input(&mut self, channel: u32) -> io::Result<InputInfo> {
        query_channel(self.fd, channel).map(|(input, _)| input)
    }

    fn apply_format(
        &mut self,
        palette: Palette,
        resolution: Resolution,
    ) -> io::Result<FormatDescriptor> {
        let (Some(primary), Some(depth)) = (palette.v1_palette(), palette.depth()) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("palette {} has no V4L1 equivalent", palette),
            ));
        };

        let min = self.info.min_resolution;
        let max = self.info.max_resolution;
        let width = resolution.width.clamp(min.width, max.width.max(min.width));
        let height = resolution.height.clamp(min.height, max.height.max(min.height));

        // Drivers report some layouts under the alias code, so try it first
        let mut pict = self.picture()?;
        pict.depth = depth as u16;
        let mut accepted = None;
        for code in [palette.v1_alias(), Some(primary)].into_iter().flatten() {
            pict.palette = code;
            match self.set_picture(&pict) {
                Ok(()) => {
                    accepted = Some(code);
                    break;
                }
                Err(err) => log::debug!("V4L1 palette {} rejected: {}", code, err),
            }
        }
        let code = accepted.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("palette {} rejected", palette),
            )
        })?;

        let win = v4l1::video_window {
            width,
            height,
            ..Default::default()
        };
        // SAFETY: win outlives the call.
        xioctl(|| unsafe { v4l1::vidiocswin(self.fd, &win) })?;
        let mut granted = v4l1::video_window::default();
        // SAFETY: granted is a valid video_window.
        xioctl(|| unsafe { v4l1::vidiocgwin(self.fd, &mut granted) })?;

        let format = FormatDescriptor::new(palette, granted.width, granted.height, 0, 0);
        self.format = Some(format);
        self.v1_palette = code;
        Ok(format)
    }

    fn reset_crop(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "cropping"))
    }

    fn supports_frame_interval(&mut self) -> bool {
        false
    }

    fn frame_interval(&mut self) -> io::Result<FrameInterval> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "frame interval"))
    }

    fn set_frame_interval(&mut self, _interval: FrameInterval) -> io::Result<FrameInterval> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "frame interval"))
    }

    fn request_buffers(&mut self, count: u32) -> io::Result<u32> {
        let mut mbuf = v4l1::video_mbuf::default();
        // SAFETY: mbuf is a valid video_mbuf.
        xioctl(|| unsafe { v4l1::vidiocgmbuf(self.fd, &mut mbuf) })?;

        let frames = (mbuf.frames.max(0) as usize).min(v4l1::VIDEO_MAX_FRAME);
        let granted = (count as usize).min(frames);
        let size = mbuf.size.max(0) as usize;
        self.offsets = mbuf.offsets[..frames]
            .iter()
            .map(|&o| o.max(0) as usize)
            .collect();
        self.frame_len = match self.offsets.as_slice() {
            [first, second, ..] => second.saturating_sub(*first),
            [first] => size.saturating_sub(*first),
            [] => 0,
        };
        if granted > 0 {
            self.region = Some(Arc::new(MappedRegion::map(self.fd, size, 0)?));
        }
        Ok(granted as u32)
    }

    fn map_buffer(&mut self, index: u32) -> io::Result<Mapping> {
        let region = self
            .region
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no buffers requested"))?;
        let offset = *self
            .offsets
            .get(index as usize)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        let len = self.frame_len.min(region.len().saturating_sub(offset));
        Mapping::slice(region, offset, len)
    }

    fn release_buffers(&mut self) -> io::Result<()> {
        self.region = None;
        self.offsets.clear();
        self.pending.clear();
        Ok(())
    }

    fn queue_buffer(&mut self, index: u32) -> io::Result<()> {
        let format = self.format()?;
        let mm = v4l1::video_mmap {
            frame: index,
            width: format.width as c_int,
            height: format.height as c_int,
            format: self.v1_palette as u32,
        };
        // SAFETY: mm outlives the call.
        xioctl(|| unsafe { v4l1::vidiocmcapture(self.fd, &mm) })?;
        self.pending.push_back(index);
        Ok(())
    }

    fn dequeue_buffer(&mut self) -> io::Result<Dequeued> {
        let index = *self
            .pending
            .front()
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;
        self.sync(index)?;
        self.pending.pop_front();

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Dequeued {
            index,
            bytes_used: self.format()?.size,
            sequence,
            timestamp: monotonic_now(),
        })
    }

    fn stream_on(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn stream_off(&mut self) -> io::Result<()> {
        // Outstanding captures must complete before the frames can be reused
        while let Some(index) = self.pending.pop_front() {
            if let Err(err) = self.sync(index) {
                log::debug!("sync of frame {} during stop: {}", index, err);
            }
        }
        Ok(())
    }

    fn query_controls(&mut self) -> io::Result<Vec<RawControl>> {
        Ok(PICTURE_CONTROLS
            .iter()
            .map(|&(id, name)| RawControl {
                id,
                name: name.to_string(),
                kind: Some(ControlKind::Integer),
                minimum: 0,
                maximum: 65535,
                step: 1,
                default: 32768,
                flags: 0,
            })
            .collect())
    }

    fn query_menu(&mut self, _control: &RawControl, _index: u32) -> io::Result<String> {
        Err(io::Error::from_raw_os_error(libc::EINVAL))
    }

    fn get_control(&mut self, control: &ControlDescriptor) -> io::Result<ControlValue> {
        let pict = self.picture()?;
        let value = match control.id {
            v4l2::V4L2_CID_BRIGHTNESS => pict.brightness,
            v4l2::V4L2_CID_HUE => pict.hue,
            v4l2::V4L2_CID_SATURATION => pict.colour,
            v4l2::V4L2_CID_CONTRAST => pict.contrast,
            _ => return Err(io::Error::from_raw_os_error(libc::EINVAL)),
        };
        Ok(ControlValue::Integer(value as i32))
    }

    fn set_control(&mut self, control: &ControlDescriptor, value: &ControlValue) -> io::Result<()> {
        let ControlValue::Integer(value) = value else {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        };
        let value = (*value).clamp(0, u16::MAX as i32) as u16;
        let mut pict = self.picture()?;
        match control.id {
            v4l2::V4L2_CID_BRIGHTNESS => pict.brightness = value,
            v4l2::V4L2_CID_HUE => pict.hue = value,
            v4l2::V4L2_CID_SATURATION => pict.colour = value,
            v4l2::V4L2_CID_CONTRAST => pict.contrast = value,
            _ => return Err(io::Error::from_raw_os_error(libc::EINVAL)),
        }
        self.set_picture(&pict)
    }

    fn tuner_frequency(&mut self, _tuner: u32) -> io::Result<u32> {
        let mut freq: c_ulong = 0;
        // SAFETY: freq is a valid c_ulong.
        xioctl(|| unsafe { v4l1::vidiocgfreq(self.fd, &mut freq) })?;
        Ok(freq as u32)
    }

    fn set_tuner_frequency(&mut self, _tuner: u32, frequency: u32) -> io::Result<()> {
        let freq = frequency as c_ulong;
        // SAFETY: freq outlives the call.
        xioctl(|| unsafe { v4l1::vidiocsfreq(self.fd, &freq) })?;
        Ok(())
    }

    fn tuner_signal(&mut self, tuner: u32) -> io::Result<TunerSignal> {
        let mut t = v4l1::video_tuner {
            tuner: tuner as c_int,
            ..Default::default()
        };
        // SAFETY: t is a valid video_tuner.
        xioctl(|| unsafe { v4l1::vidiocgtuner(self.fd, &mut t) })?;
        Ok(TunerSignal {
            signal: t.signal as i32,
            afc: None,
        })
    }
}
