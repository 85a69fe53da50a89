// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video4Linux2 structures, constants and ioctl requests.
//!
//! Layouts follow `linux/videodev2.h` for the single-planar capture path.

use libc::{c_char, c_int, c_ulong, c_void, timeval};
use std::mem;

pub type v4l2_std_id = u64;

pub const VIDEO_MAX_FRAME: u32 = 32;

// Capabilities
pub const V4L2_CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
pub const V4L2_CAP_TUNER: u32 = 0x0001_0000;
pub const V4L2_CAP_READWRITE: u32 = 0x0100_0000;
pub const V4L2_CAP_STREAMING: u32 = 0x0400_0000;
pub const V4L2_CAP_DEVICE_CAPS: u32 = 0x8000_0000;

pub const V4L2_CAP_TIMEPERFRAME: u32 = 0x1000;

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const V4L2_MEMORY_MMAP: u32 = 1;
pub const V4L2_FIELD_ANY: u32 = 0;

// Standards
pub const V4L2_STD_UNKNOWN: v4l2_std_id = 0;
pub const V4L2_STD_PAL: v4l2_std_id = 0x0000_00ff;
pub const V4L2_STD_NTSC: v4l2_std_id = 0x0000_b000;
pub const V4L2_STD_SECAM: v4l2_std_id = 0x00ff_0000;

// Inputs and tuners
pub const V4L2_INPUT_TYPE_TUNER: u32 = 1;
pub const V4L2_INPUT_TYPE_CAMERA: u32 = 2;
pub const V4L2_TUNER_RADIO: u32 = 1;
pub const V4L2_TUNER_ANALOG_TV: u32 = 2;

// Control classes and ids
pub const V4L2_CTRL_CLASS_USER: u32 = 0x0098_0000;
pub const V4L2_CTRL_CLASS_CAMERA: u32 = 0x009a_0000;
pub const V4L2_CID_BASE: u32 = V4L2_CTRL_CLASS_USER | 0x900;
pub const V4L2_CID_LASTP1: u32 = V4L2_CID_BASE + 44;
pub const V4L2_CID_PRIVATE_BASE: u32 = 0x0800_0000;
pub const V4L2_CID_CAMERA_CLASS_BASE: u32 = V4L2_CTRL_CLASS_CAMERA | 0x900;

pub const V4L2_CID_BRIGHTNESS: u32 = V4L2_CID_BASE;
pub const V4L2_CID_CONTRAST: u32 = V4L2_CID_BASE + 1;
pub const V4L2_CID_SATURATION: u32 = V4L2_CID_BASE + 2;
pub const V4L2_CID_HUE: u32 = V4L2_CID_BASE + 3;
pub const V4L2_CID_POWER_LINE_FREQUENCY: u32 = V4L2_CID_BASE + 24;
pub const V4L2_CID_EXPOSURE_AUTO: u32 = V4L2_CID_CAMERA_CLASS_BASE + 1;

pub const V4L2_CTRL_FLAG_DISABLED: u32 = 0x0001;
pub const V4L2_CTRL_FLAG_GRABBED: u32 = 0x0002;
pub const V4L2_CTRL_FLAG_READ_ONLY: u32 = 0x0004;
pub const V4L2_CTRL_FLAG_INACTIVE: u32 = 0x0010;
pub const V4L2_CTRL_FLAG_WRITE_ONLY: u32 = 0x0040;
pub const V4L2_CTRL_FLAG_NEXT_CTRL: u32 = 0x8000_0000;

pub const V4L2_CTRL_TYPE_INTEGER: u32 = 1;
pub const V4L2_CTRL_TYPE_BOOLEAN: u32 = 2;
pub const V4L2_CTRL_TYPE_MENU: u32 = 3;
pub const V4L2_CTRL_TYPE_BUTTON: u32 = 4;
pub const V4L2_CTRL_TYPE_INTEGER64: u32 = 5;
pub const V4L2_CTRL_TYPE_CTRL_CLASS: u32 = 6;
pub const V4L2_CTRL_TYPE_STRING: u32 = 7;
pub const V4L2_CTRL_TYPE_BITMASK: u32 = 8;
pub const V4L2_CTRL_TYPE_INTEGER_MENU: u32 = 9;

/// Extracts the control class from a control id.
pub const fn v4l2_ctrl_id2class(id: u32) -> u32 {
    id & 0x0fff_0000
}

/// Builds a V4L2 FourCC code from four ASCII bytes.
pub const fn v4l2_fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_capability {
    pub driver: [u8; 16],
    pub card: [u8; 32],
    pub bus_info: [u8; 32],
    pub version: u32,
    pub capabilities: u32,
    pub device_caps: u32,
    pub reserved: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_fmtdesc {
    pub index: u32,
    pub type_: u32,
    pub flags: u32,
    pub description: [u8; 32],
    pub pixelformat: u32,
    pub mbus_code: u32,
    pub reserved: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_pix_format {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub bytesperline: u32,
    pub sizeimage: u32,
    pub colorspace: u32,
    pub priv_: u32,
    pub flags: u32,
    pub ycbcr_enc: u32,
    pub quantization: u32,
    pub xfer_func: u32,
}

/// Format union. The kernel union contains pointer-bearing members, so it is
/// pointer aligned.
#[repr(C)]
#[derive(Clone, Copy)]
pub union v4l2_format_fmt {
    pub pix: v4l2_pix_format,
    pub raw_data: [u8; 200],
    _align: [usize; 200 / mem::size_of::<usize>()],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_format {
    pub type_: u32,
    pub fmt: v4l2_format_fmt,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_requestbuffers {
    pub count: u32,
    pub type_: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_timecode {
    pub type_: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union v4l2_buffer_m {
    pub offset: u32,
    pub userptr: c_ulong,
    pub planes: *mut c_void,
    pub fd: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_buffer {
    pub index: u32,
    pub type_: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: timeval,
    pub timecode: v4l2_timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: v4l2_buffer_m,
    pub length: u32,
    pub reserved2: u32,
    pub request_fd: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct v4l2_fract {
    pub numerator: u32,
    pub denominator: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_captureparm {
    pub capability: u32,
    pub capturemode: u32,
    pub timeperframe: v4l2_fract,
    pub extendedmode: u32,
    pub readbuffers: u32,
    pub reserved: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union v4l2_streamparm_parm {
    pub capture: v4l2_captureparm,
    pub raw_data: [u8; 200],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_streamparm {
    pub type_: u32,
    pub parm: v4l2_streamparm_parm,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_standard {
    pub index: u32,
    pub id: v4l2_std_id,
    pub name: [u8; 24],
    pub frameperiod: v4l2_fract,
    pub framelines: u32,
    pub reserved: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_input {
    pub index: u32,
    pub name: [u8; 32],
    pub type_: u32,
    pub audioset: u32,
    pub tuner: u32,
    pub std: v4l2_std_id,
    pub status: u32,
    pub capabilities: u32,
    pub reserved: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_control {
    pub id: u32,
    pub value: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_queryctrl {
    pub id: u32,
    pub type_: u32,
    pub name: [u8; 32],
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default_value: i32,
    pub flags: u32,
    pub reserved: [u32; 2],
}

/// Menu entry. For integer menus the first eight bytes of `name` hold the
/// little-endian 64-bit value instead of a string.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_querymenu {
    pub id: u32,
    pub index: u32,
    pub name: [u8; 32],
    pub reserved: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_tuner {
    pub index: u32,
    pub name: [u8; 32],
    pub type_: u32,
    pub capability: u32,
    pub rangelow: u32,
    pub rangehigh: u32,
    pub rxsubchans: u32,
    pub audmode: u32,
    pub signal: i32,
    pub afc: i32,
    pub reserved: [u32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_frequency {
    pub tuner: u32,
    pub type_: u32,
    pub frequency: u32,
    pub reserved: [u32; 8],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct v4l2_rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_cropcap {
    pub type_: u32,
    pub bounds: v4l2_rect,
    pub defrect: v4l2_rect,
    pub pixelaspect: v4l2_fract,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct v4l2_crop {
    pub type_: u32,
    pub c: v4l2_rect,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union v4l2_ext_control_value {
    pub value: i32,
    pub value64: i64,
    pub string: *mut c_char,
    pub ptr: *mut c_void,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct v4l2_ext_control {
    pub id: u32,
    pub size: u32,
    pub reserved2: [u32; 1],
    pub u: v4l2_ext_control_value,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct v4l2_ext_controls {
    pub ctrl_class: u32,
    pub count: u32,
    pub error_idx: u32,
    pub request_fd: i32,
    pub reserved: [u32; 1],
    pub controls: *mut v4l2_ext_control,
}

crate::impl_zeroed!(
    v4l2_capability,
    v4l2_fmtdesc,
    v4l2_pix_format,
    v4l2_format,
    v4l2_requestbuffers,
    v4l2_buffer,
    v4l2_captureparm,
    v4l2_streamparm,
    v4l2_standard,
    v4l2_input,
    v4l2_control,
    v4l2_queryctrl,
    v4l2_querymenu,
    v4l2_tuner,
    v4l2_frequency,
    v4l2_cropcap,
    v4l2_crop,
    v4l2_ext_control,
    v4l2_ext_controls,
);

const V: u8 = b'V';

nix::ioctl_read!(vidioc_querycap, V, 0, v4l2_capability);
nix::ioctl_readwrite!(vidioc_enum_fmt, V, 2, v4l2_fmtdesc);
nix::ioctl_readwrite!(vidioc_g_fmt, V, 4, v4l2_format);
nix::ioctl_readwrite!(vidioc_s_fmt, V, 5, v4l2_format);
nix::ioctl_readwrite!(vidioc_reqbufs, V, 8, v4l2_requestbuffers);
nix::ioctl_readwrite!(vidioc_querybuf, V, 9, v4l2_buffer);
nix::ioctl_readwrite!(vidioc_qbuf, V, 15, v4l2_buffer);
nix::ioctl_readwrite!(vidioc_dqbuf, V, 17, v4l2_buffer);
nix::ioctl_write_ptr!(vidioc_streamon, V, 18, c_int);
nix::ioctl_write_ptr!(vidioc_streamoff, V, 19, c_int);
nix::ioctl_readwrite!(vidioc_g_parm, V, 21, v4l2_streamparm);
nix::ioctl_readwrite!(vidioc_s_parm, V, 22, v4l2_streamparm);
nix::ioctl_read!(vidioc_g_std, V, 23, v4l2_std_id);
nix::ioctl_write_ptr!(vidioc_s_std, V, 24, v4l2_std_id);
nix::ioctl_readwrite!(vidioc_enumstd, V, 25, v4l2_standard);
nix::ioctl_readwrite!(vidioc_enuminput, V, 26, v4l2_input);
nix::ioctl_readwrite!(vidioc_g_ctrl, V, 27, v4l2_control);
nix::ioctl_readwrite!(vidioc_s_ctrl, V, 28, v4l2_control);
nix::ioctl_readwrite!(vidioc_g_tuner, V, 29, v4l2_tuner);
nix::ioctl_readwrite!(vidioc_queryctrl, V, 36, v4l2_queryctrl);
nix::ioctl_readwrite!(vidioc_querymenu, V, 37, v4l2_querymenu);
nix::ioctl_read!(vidioc_g_input, V, 38, c_int);
nix::ioctl_readwrite!(vidioc_s_input, V, 39, c_int);
nix::ioctl_readwrite!(vidioc_g_frequency, V, 56, v4l2_frequency);
nix::ioctl_write_ptr!(vidioc_s_frequency, V, 57, v4l2_frequency);
nix::ioctl_readwrite!(vidioc_cropcap, V, 58, v4l2_cropcap);
nix::ioctl_write_ptr!(vidioc_s_crop, V, 60, v4l2_crop);
nix::ioctl_readwrite!(vidioc_g_ext_ctrls, V, 71, v4l2_ext_controls);
nix::ioctl_readwrite!(vidioc_s_ext_ctrls, V, 72, v4l2_ext_controls);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc() {
        assert_eq!(v4l2_fourcc(b'Y', b'U', b'Y', b'V'), 0x5659_5559);
        assert_eq!(v4l2_fourcc(b'M', b'J', b'P', b'G'), 0x4750_4a4d);
    }

    #[test]
    fn test_control_class() {
        assert_eq!(v4l2_ctrl_id2class(V4L2_CID_BRIGHTNESS), V4L2_CTRL_CLASS_USER);
        assert_eq!(
            v4l2_ctrl_id2class(V4L2_CID_EXPOSURE_AUTO),
            V4L2_CTRL_CLASS_CAMERA
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_struct_sizes() {
        assert_eq!(mem::size_of::<v4l2_capability>(), 104);
        assert_eq!(mem::size_of::<v4l2_format>(), 208);
        assert_eq!(mem::size_of::<v4l2_requestbuffers>(), 20);
        assert_eq!(mem::size_of::<v4l2_buffer>(), 88);
        assert_eq!(mem::size_of::<v4l2_streamparm>(), 204);
        assert_eq!(mem::size_of::<v4l2_standard>(), 72);
        assert_eq!(mem::size_of::<v4l2_input>(), 80);
        assert_eq!(mem::size_of::<v4l2_queryctrl>(), 68);
        assert_eq!(mem::size_of::<v4l2_querymenu>(), 44);
        assert_eq!(mem::size_of::<v4l2_tuner>(), 84);
        assert_eq!(mem::size_of::<v4l2_frequency>(), 44);
        assert_eq!(mem::size_of::<v4l2_cropcap>(), 44);
        assert_eq!(mem::size_of::<v4l2_ext_control>(), 20);
        assert_eq!(mem::size_of::<v4l2_ext_controls>(), 32);
    }
}
