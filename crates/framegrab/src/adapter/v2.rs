// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video4Linux2 adapter.

use std::{collections::HashSet, io, os::fd::RawFd};

use framegrab_sys::{cstr_field, set_cstr_field, v4l2};
use libc::c_int;
use unix_ts::Timestamp;

use super::{
    xioctl, DeviceInfo, Dequeued, InputInfo, InputKind, ProtocolAdapter, ProtocolVersion,
    RawControl, TunerSignal,
};
use crate::{
    buffers::{MappedRegion, Mapping},
    controls::{ControlDescriptor, ControlKind, ControlValue},
    fourcc::FourCC,
    format::{FormatDescriptor, FrameInterval, Resolution, Standard, StandardSupport},
    palette::Palette,
};

/// Largest frame size requested when the caller asks for "maximum"; the
/// driver clamps it to what the sensor supports.
pub const MAX_RESOLUTION: Resolution = Resolution {
    width: 4096,
    height: 4096,
};

const BUF_TYPE: u32 = v4l2::V4L2_BUF_TYPE_VIDEO_CAPTURE;

/// Adapter for devices speaking Video4Linux2.
#[derive(Debug)]
pub struct V2Adapter {
    fd: RawFd,
    info: DeviceInfo,
}

impl V2Adapter {
    /// Queries the device capabilities and gathers its description.
    ///
    /// Fails if the capability query is rejected or the device cannot
    /// stream video capture.
    pub fn probe(fd: RawFd) -> io::Result<V2Adapter> {
        let mut cap = v4l2::v4l2_capability::default();
        // SAFETY: cap is a valid v4l2_capability.
        xioctl(|| unsafe { v4l2::vidioc_querycap(fd, &mut cap) })?;

        let caps = if cap.capabilities & v4l2::V4L2_CAP_DEVICE_CAPS != 0 {
            cap.device_caps
        } else {
            cap.capabilities
        };
        if caps & v4l2::V4L2_CAP_VIDEO_CAPTURE == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "V4L2 device without video capture capability",
            ));
        }
        if caps & v4l2::V4L2_CAP_STREAMING == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "V4L2 capture device without streaming capability",
            ));
        }

        let info = DeviceInfo {
            name: cstr_field(&cap.card),
            driver: cstr_field(&cap.driver),
            bus_info: cstr_field(&cap.bus_info),
            version: ProtocolVersion::V2,
            capabilities: caps,
            inputs: enumerate_inputs(fd),
            palettes: enumerate_palettes(fd),
            min_resolution: Resolution::new(1, 1),
            max_resolution: MAX_RESOLUTION,
        };
        log::debug!(
            "V4L2 device {} (driver {}), {} inputs, palettes {:?}",
            info.name,
            info.driver,
            info.inputs.len(),
            info.palettes
        );

        Ok(V2Adapter { fd, info })
    }

    fn query_control(&self, id: u32) -> io::Result<v4l2::v4l2_queryctrl> {
        let mut q = v4l2::v4l2_queryctrl {
            id,
            ..Default::default()
        };
        // SAFETY: q is a valid v4l2_queryctrl.
        xioctl(|| unsafe { v4l2::vidioc_queryctrl(self.fd, &mut q) })?;
        Ok(q)
    }

    fn stream_parm(&self) -> io::Result<v4l2::v4l2_streamparm> {
        let mut parm = v4l2::v4l2_streamparm {
            type_: BUF_TYPE,
            ..Default::default()
        };
        // SAFETY: parm is a valid v4l2_streamparm.
        xioctl(|| unsafe { v4l2::vidioc_g_parm(self.fd, &mut parm) })?;
        Ok(parm)
    }

    fn get_simple(&self, id: u32) -> io::Result<i32> {
        let mut c = v4l2::v4l2_control { id, value: 0 };
        // SAFETY: c is a valid v4l2_control.
        xioctl(|| unsafe { v4l2::vidioc_g_ctrl(self.fd, &mut c) })?;
        Ok(c.value)
    }

    fn set_simple(&self, id: u32, value: i32) -> io::Result<()> {
        let mut c = v4l2::v4l2_control { id, value };
        // SAFETY: c is a valid v4l2_control.
        xioctl(|| unsafe { v4l2::vidioc_s_ctrl(self.fd, &mut c) })?;
        Ok(())
    }

    fn get_extended(&self, control: &ControlDescriptor) -> io::Result<ControlValue> {
        let mut text = Vec::new();
        let mut ctrl = v4l2::v4l2_ext_control {
            id: control.id,
            ..Default::default()
        };
        if control.kind == ControlKind::String {
            text = vec![0u8; control.maximum.max(0) as usize + 1];
            ctrl.size = text.len() as u32;
            ctrl.u = v4l2::v4l2_ext_control_value {
                string: text.as_mut_ptr() as *mut libc::c_char,
            };
        }
        self.ext_ctrls(&mut ctrl, false)?;

        let u = ctrl.u;
        // SAFETY: the driver filled the union member matching the control type.
        Ok(match control.kind {
            ControlKind::String => ControlValue::String(cstr_field(&text)),
            ControlKind::Integer64 => ControlValue::Integer64(unsafe { u.value64 }),
            _ => ControlValue::Integer(unsafe { u.value }),
        })
    }

    fn set_extended(&self, control: &ControlDescriptor, value: &ControlValue) -> io::Result<()> {
        let mut text;
        let mut ctrl = v4l2::v4l2_ext_control {
            id: control.id,
            ..Default::default()
        };
        ctrl.u = match value {
            ControlValue::Integer(v) => v4l2::v4l2_ext_control_value { value: *v },
            ControlValue::Integer64(v) => v4l2::v4l2_ext_control_value { value64: *v },
            ControlValue::String(s) => {
                text = vec![0u8; s.len() + 1];
                set_cstr_field(&mut text, s);
                ctrl.size = text.len() as u32;
                v4l2::v4l2_ext_control_value {
                    string: text.as_mut_ptr() as *mut libc::c_char,
                }
            }
        };
        self.ext_ctrls(&mut ctrl, true)
    }

    fn ext_ctrls(&self, ctrl: &mut v4l2::v4l2_ext_control, write: bool) -> io::Result<()> {
        let mut ctrls = v4l2::v4l2_ext_controls {
            ctrl_class: v4l2::v4l2_ctrl_id2class(ctrl.id),
            count: 1,
            controls: ctrl as *mut _,
            ..Default::default()
        };
        // SAFETY: ctrls points at exactly one control whose string buffer, if
        // any, outlives the call.
        xioctl(|| unsafe {
            if write {
                v4l2::vidioc_s_ext_ctrls(self.fd, &mut ctrls)
            } else {
                v4l2::vidioc_g_ext_ctrls(self.fd, &mut ctrls)
            }
        })?;
        Ok(())
    }
}

fn enumerate_inputs(fd: RawFd) -> Vec<InputInfo> {
    let mut inputs = Vec::new();
    for index in 0.. {
        match query_input(fd, index) {
            Ok(input) => inputs.push(input),
            Err(_) => break,
        }
    }
    inputs
}

fn query_input(fd: RawFd, index: u32) -> io::Result<InputInfo> {
    let mut vi = v4l2::v4l2_input {
        index,
        ..Default::default()
    };
    // SAFETY: vi is a valid v4l2_input.
    xioctl(|| unsafe { v4l2::vidioc_enuminput(fd, &mut vi) })?;

    let mut standards: Vec<Standard> = [Standard::Pal, Standard::Ntsc, Standard::Secam]
        .into_iter()
        .filter(|s| vi.std & s.v4l2_id() != 0)
        .collect();
    if standards.is_empty() {
        standards.push(Standard::Webcam);
    }

    let tuner = vi.type_ == v4l2::V4L2_INPUT_TYPE_TUNER;
    Ok(InputInfo {
        index,
        name: cstr_field(&vi.name),
        kind: if tuner {
            InputKind::Tuner
        } else {
            InputKind::Camera
        },
        tuner: tuner.then_some(vi.tuner),
        standards,
    })
}

fn enumerate_palettes(fd: RawFd) -> Vec<Palette> {
    let mut palettes = Vec::new();
    for index in 0.. {
        let mut desc = v4l2::v4l2_fmtdesc {
            index,
            type_: BUF_TYPE,
            ..Default::default()
        };
        // SAFETY: desc is a valid v4l2_fmtdesc.
        if xioctl(|| unsafe { v4l2::vidioc_enum_fmt(fd, &mut desc) }).is_err() {
            break;
        }
        let fourcc = FourCC::from(desc.pixelformat);
        match Palette::from_fourcc(fourcc) {
            Some(palette) => palettes.push(palette),
            None => log::debug!("ignoring unknown pixel format {}", fourcc),
        }
    }
    palettes
}

fn control_kind(type_: u32) -> Option<ControlKind> {
    match type_ {
        v4l2::V4L2_CTRL_TYPE_INTEGER => Some(ControlKind::Integer),
        v4l2::V4L2_CTRL_TYPE_BOOLEAN => Some(ControlKind::Boolean),
        v4l2::V4L2_CTRL_TYPE_MENU => Some(ControlKind::Menu),
        v4l2::V4L2_CTRL_TYPE_BUTTON => Some(ControlKind::Button),
        v4l2::V4L2_CTRL_TYPE_INTEGER64 => Some(ControlKind::Integer64),
        v4l2::V4L2_CTRL_TYPE_STRING => Some(ControlKind::String),
        v4l2::V4L2_CTRL_TYPE_BITMASK => Some(ControlKind::Bitmask),
        v4l2::V4L2_CTRL_TYPE_INTEGER_MENU => Some(ControlKind::IntegerMenu),
        _ => None,
    }
}

fn raw_control(q: &v4l2::v4l2_queryctrl) -> RawControl {
    RawControl {
        id: q.id,
        name: cstr_field(&q.name),
        kind: control_kind(q.type_),
        minimum: q.minimum,
        maximum: q.maximum,
        step: q.step,
        default: q.default_value,
        flags: q.flags,
    }
}

/// Controls in the user class without 64-bit or string payloads work with
/// the simple control ioctls.
fn uses_simple_ioctls(control: &ControlDescriptor) -> bool {
    v4l2::v4l2_ctrl_id2class(control.id) == v4l2::V4L2_CTRL_CLASS_USER
        && !matches!(control.kind, ControlKind::Integer64 | ControlKind::String)
}

fn is_enotty(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ENOTTY)
}

impl ProtocolAdapter for V2Adapter {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn fd(&self) -> Option<RawFd> {
        Some(self.fd)
    }

    fn standard_support(&mut self) -> StandardSupport {
        let mut s = v4l2::v4l2_standard::default();
        // SAFETY: s is a valid v4l2_standard.
        match xioctl(|| unsafe { v4l2::vidioc_enumstd(self.fd, &mut s) }) {
            Err(_) => StandardSupport::None,
            Ok(_) if s.id == v4l2::V4L2_STD_UNKNOWN => StandardSupport::WebcamOnly,
            Ok(_) => StandardSupport::Broadcast,
        }
    }

    fn try_standard(&mut self, _channel: u32, standard: Standard) -> io::Result<()> {
        let id = standard.v4l2_id();
        // SAFETY: id outlives the call.
        xioctl(|| unsafe { v4l2::vidioc_s_std(self.fd, &id) })?;
        Ok(())
    }

    fn select_input(&mut self, channel: u32) -> io::Result<InputInfo> {
        let mut index = channel as c_int;
        // SAFETY: index is a valid c_int.
        xioctl(|| unsafe { v4l2::vidioc_s_input(self.fd, &mut index) })?;
        query_input(self.fd, channel)
    }

    fn apply_format(
        &mut self,
        palette: Palette,
        resolution: Resolution,
    ) -> io::Result<FormatDescriptor> {
        let requested = palette.fourcc().to_u32();
        let mut fmt = v4l2::v4l2_format {
            type_: BUF_TYPE,
            ..Default::default()
        };
        fmt.fmt.pix = v4l2::v4l2_pix_format {
            width: resolution.width,
            height: resolution.height,
            pixelformat: requested,
            field: v4l2::V4L2_FIELD_ANY,
            ..Default::default()
        };

        // SAFETY: fmt is a valid v4l2_format.
        xioctl(|| unsafe { v4l2::vidioc_s_fmt(self.fd, &mut fmt) })?;

        // SAFETY: the capture buffer type selects the pix member.
        let pix = unsafe { fmt.fmt.pix };
        if pix.pixelformat != requested {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "driver substituted {} for {}",
                    FourCC::from(pix.pixelformat),
                    palette.fourcc()
                ),
            ));
        }

        Ok(FormatDescriptor::new(
            palette,
            pix.width,
            pix.height,
            pix.bytesperline,
            pix.sizeimage,
        ))
    }

    fn reset_crop(&mut self) -> io::Result<()> {
        let mut cc = v4l2::v4l2_cropcap {
            type_: BUF_TYPE,
            ..Default::default()
        };
        // SAFETY: cc is a valid v4l2_cropcap.
        xioctl(|| unsafe { v4l2::vidioc_cropcap(self.fd, &mut cc) })?;
        let crop = v4l2::v4l2_crop {
            type_: BUF_TYPE,
            c: cc.defrect,
        };
        // SAFETY: crop outlives the call.
        xioctl(|| unsafe { v4l2::vidioc_s_crop(self.fd, &crop) })?;
        Ok(())
    }

    fn supports_frame_interval(&mut self) -> bool {
        self.stream_parm()
            // SAFETY: the capture buffer type selects the capture member.
            .map(|parm| unsafe { parm.parm.capture.capability } & v4l2::V4L2_CAP_TIMEPERFRAME != 0)
            .unwrap_or(false)
    }

    fn frame_interval(&mut self) -> io::Result<FrameInterval> {
        let parm = self.stream_parm()?;
        // SAFETY: the capture buffer type selects the capture member.
        let capture = unsafe { parm.parm.capture };
        if capture.capability & v4l2::V4L2_CAP_TIMEPERFRAME == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "frame interval",
            ));
        }
        Ok(FrameInterval::new(
            capture.timeperframe.numerator,
            capture.timeperframe.denominator,
        ))
    }

    fn set_frame_interval(&mut self, interval: FrameInterval) -> io::Result<FrameInterval> {
        let mut parm = self.stream_parm()?;
        // SAFETY: the capture buffer type selects the capture member.
        if unsafe { parm.parm.capture.capability } & v4l2::V4L2_CAP_TIMEPERFRAME == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "frame interval",
            ));
        }
        // SAFETY: as above.
        unsafe {
            parm.parm.capture.timeperframe = v4l2::v4l2_fract {
                numerator: interval.numerator,
                denominator: interval.denominator,
            };
        }
        // SAFETY: parm is a valid v4l2_streamparm.
        xioctl(|| unsafe { v4l2::vidioc_s_parm(self.fd, &mut parm) })?;
        // SAFETY: as above.
        let granted = unsafe { parm.parm.capture.timeperframe };
        Ok(FrameInterval::new(granted.numerator, granted.denominator))
    }

    fn request_buffers(&mut self, count: u32) -> io::Result<u32> {
        let mut req = v4l2::v4l2_requestbuffers {
            count,
            type_: BUF_TYPE,
            memory: v4l2::V4L2_MEMORY_MMAP,
            ..Default::default()
        };
        // SAFETY: req is a valid v4l2_requestbuffers.
        xioctl(|| unsafe { v4l2::vidioc_reqbufs(self.fd, &mut req) })?;
        Ok(req.count)
    }

    fn map_buffer(&mut self, index: u32) -> io::Result<Mapping> {
        let mut buf = v4l2::v4l2_buffer {
            index,
            type_: BUF_TYPE,
            memory: v4l2::V4L2_MEMORY_MMAP,
            ..Default::default()
        };
        // SAFETY: buf is a valid v4l2_buffer.
        xioctl(|| unsafe { v4l2::vidioc_querybuf(self.fd, &mut buf) })?;
        // SAFETY: MMAP buffers report their offset in the offset member.
        let offset = unsafe { buf.m.offset };
        let region = MappedRegion::map(self.fd, buf.length as usize, offset as i64)?;
        Ok(Mapping::whole(region))
    }

    fn release_buffers(&mut self) -> io::Result<()> {
        match self.request_buffers(0) {
            Ok(_) => Ok(()),
            // Drivers predating buffer orphaning reject a zero count; their
            // buffers are freed with the last mapping instead.
            Err(err) if err.raw_os_error() == Some(libc::EINVAL) => {
                log::debug!("driver rejected REQBUFS(0): {}", err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn queue_buffer(&mut self, index: u32) -> io::Result<()> {
        let mut buf = v4l2::v4l2_buffer {
            index,
            type_: BUF_TYPE,
            memory: v4l2::V4L2_MEMORY_MMAP,
            ..Default::default()
        };
        // SAFETY: buf is a valid v4l2_buffer.
        xioctl(|| unsafe { v4l2::vidioc_qbuf(self.fd, &mut buf) })?;
        Ok(())
    }

    fn dequeue_buffer(&mut self) -> io::Result<Dequeued> {
        let mut buf = v4l2::v4l2_buffer {
            type_: BUF_TYPE,
            memory: v4l2::V4L2_MEMORY_MMAP,
            ..Default::default()
        };
        // SAFETY: buf is a valid v4l2_buffer.
        xioctl(|| unsafe { v4l2::vidioc_dqbuf(self.fd, &mut buf) })?;
        Ok(Dequeued {
            index: buf.index,
            bytes_used: buf.bytesused,
            sequence: buf.sequence,
            timestamp: Timestamp::new(
                buf.timestamp.tv_sec as i64,
                (buf.timestamp.tv_usec as u32).saturating_mul(1000),
            ),
        })
    }

    fn stream_on(&mut self) -> io::Result<()> {
        let type_ = BUF_TYPE as c_int;
        // SAFETY: type_ outlives the call.
        xioctl(|| unsafe { v4l2::vidioc_streamon(self.fd, &type_) })?;
        Ok(())
    }

    fn stream_off(&mut self) -> io::Result<()> {
        let type_ = BUF_TYPE as c_int;
        // SAFETY: type_ outlives the call.
        xioctl(|| unsafe { v4l2::vidioc_streamoff(self.fd, &type_) })?;
        Ok(())
    }

    fn query_controls(&mut self) -> io::Result<Vec<RawControl>> {
        let mut seen = HashSet::new();
        let mut controls = Vec::new();

        for id in v4l2::V4L2_CID_BASE..v4l2::V4L2_CID_LASTP1 {
            if let Ok(q) = self.query_control(id) {
                if seen.insert(q.id) {
                    controls.push(raw_control(&q));
                }
            }
        }

        let mut id = v4l2::V4L2_CID_PRIVATE_BASE;
        while let Ok(q) = self.query_control(id) {
            if seen.insert(q.id) {
                controls.push(raw_control(&q));
            }
            id += 1;
        }

        let mut last = 0;
        while let Ok(q) = self.query_control(last | v4l2::V4L2_CTRL_FLAG_NEXT_CTRL) {
            if q.id <= last {
                log::warn!("driver returned non-increasing control id {:#x}", q.id);
                break;
            }
            last = q.id;
            if seen.insert(q.id) {
                controls.push(raw_control(&q));
            }
        }

        log::debug!("{} controls reported by driver", controls.len());
        Ok(controls)
    }

    fn query_menu(&mut self, control: &RawControl, index: u32) -> io::Result<String> {
        let mut m = v4l2::v4l2_querymenu {
            id: control.id,
            index,
            ..Default::default()
        };
        // SAFETY: m is a valid v4l2_querymenu.
        xioctl(|| unsafe { v4l2::vidioc_querymenu(self.fd, &mut m) })?;
        if control.kind == Some(ControlKind::IntegerMenu) {
            let mut value = [0u8; 8];
            value.copy_from_slice(&m.name[..8]);
            Ok(i64::from_le_bytes(value).to_string())
        } else {
            Ok(cstr_field(&m.name))
        }
    }

    fn get_control(&mut self, control: &ControlDescriptor) -> io::Result<ControlValue> {
        if uses_simple_ioctls(control) {
            return self.get_simple(control.id).map(ControlValue::Integer);
        }
        match self.get_extended(control) {
            Err(err) if is_enotty(&err) && control.kind.is_32bit() => {
                self.get_simple(control.id).map(ControlValue::Integer)
            }
            other => other,
        }
    }

    fn set_control(&mut self, control: &ControlDescriptor, value: &ControlValue) -> io::Result<()> {
        if uses_simple_ioctls(control) {
            if let ControlValue::Integer(v) = value {
                return self.set_simple(control.id, *v);
            }
        }
        match self.set_extended(control, value) {
            Err(err) if is_enotty(&err) => match value {
                ControlValue::Integer(v) => self.set_simple(control.id, *v),
                _ => Err(err),
            },
            other => other,
        }
    }

    fn tuner_frequency(&mut self, tuner: u32) -> io::Result<u32> {
        let mut f = v4l2::v4l2_frequency {
            tuner,
            ..Default::default()
        };
        // SAFETY: f is a valid v4l2_frequency.
        xioctl(|| unsafe { v4l2::vidioc_g_frequency(self.fd, &mut f) })?;
        Ok(f.frequency)
    }

    fn set_tuner_frequency(&mut self, tuner: u32, frequency: u32) -> io::Result<()> {
        let mut f = v4l2::v4l2_frequency {
            tuner,
            ..Default::default()
        };
        // Read first so the tuner type is filled in
        // SAFETY: f is a valid v4l2_frequency.
        xioctl(|| unsafe { v4l2::vidioc_g_frequency(self.fd, &mut f) })?;
        f.frequency = frequency;
        // SAFETY: f outlives the call.
        xioctl(|| unsafe { v4l2::vidioc_s_frequency(self.fd, &f) })?;
        Ok(())
    }

    fn tuner_signal(&mut self, tuner: u32) -> io::Result<TunerSignal> {
        let mut t = v4l2::v4l2_tuner {
            index: tuner,
            ..Default::default()
        };
        // SAFETY: t is a valid v4l2_tuner.
        xioctl(|| unsafe { v4l2::vidioc_g_tuner(self.fd, &mut t) })?;
        Ok(TunerSignal {
            signal: t.signal,
            afc: Some(t.afc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsRawFd;

    #[test]
    fn test_probe_rejects_non_device() {
        let file = std::fs::File::open("/dev/null").expect("open /dev/null");
        let err = V2Adapter::probe(file.as_raw_fd()).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));
    }

    #[test]
    fn test_control_kinds() {
        assert_eq!(
            control_kind(v4l2::V4L2_CTRL_TYPE_MENU),
            Some(ControlKind::Menu)
        );
        assert_eq!(control_kind(v4l2::V4L2_CTRL_TYPE_CTRL_CLASS), None);
        assert_eq!(control_kind(0x100), None);
    }

    #[test]
    fn test_simple_ioctl_selection() {
        let mut ctrl = ControlDescriptor::test_integer(v4l2::V4L2_CID_BRIGHTNESS, 0, 255);
        assert!(uses_simple_ioctls(&ctrl));
        ctrl.id = v4l2::V4L2_CID_EXPOSURE_AUTO;
        assert!(!uses_simple_ioctls(&ctrl));
        ctrl.id = v4l2::V4L2_CID_CONTRAST;
        ctrl.kind = ControlKind::Integer64;
        assert!(!uses_simple_ioctls(&ctrl));
    }
}
