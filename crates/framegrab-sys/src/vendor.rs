// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Private ioctls of vendor drivers that expose parameters outside the
//! standard control interface.
//!
//! | Driver | Header | Parameters |
//! |--------|--------|------------|
//! | pwc | `pwc-ioctl.h` | pan/tilt motor |
//! | gspca (spca5xx) | `gspca.h` | auto brightness, quality, frame interval, light frequency |
//! | qc-usb | `quickcam.h` | settle, compression, interpolation, adaptive, equalize |
//!
//! Several of these drivers reuse the same request numbers, which is why the
//! engine identifies them by behavioural probing rather than by request code.

use libc::c_int;

pub const BASE_VIDIOCPRIVATE: u8 = 192;

// Philips webcams (pwc)

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct pwc_probe {
    pub name: [u8; 32],
    pub type_: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct pwc_mpt_range {
    pub pan_min: c_int,
    pub pan_max: c_int,
    pub pan_res: c_int,
    pub tilt_min: c_int,
    pub tilt_max: c_int,
    pub tilt_res: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct pwc_mpt_angles {
    pub absolute: c_int,
    pub pan: c_int,
    pub tilt: c_int,
}

/// Reset pan (bit 0) and/or tilt (bit 1).
pub const PWC_MPT_RESET_BOTH: c_int = 3;

nix::ioctl_read!(vidiocpwcprobe, b'v', 199, pwc_probe);
nix::ioctl_write_ptr!(vidiocpwcmptreset, b'v', 211, c_int);
nix::ioctl_read!(vidiocpwcmptgrange, b'v', 211, pwc_mpt_range);
nix::ioctl_write_ptr!(vidiocpwcmptsangle, b'v', 212, pwc_mpt_angles);
nix::ioctl_read!(vidiocpwcmptgangle, b'v', 212, pwc_mpt_angles);

// gspca / spca5xx

pub const CHGABRIGHT: c_int = 1;
pub const CHGQUALITY: c_int = 2;
pub const CHGLIGHTFREQ: c_int = 3;
pub const CHGTINTER: c_int = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_param {
    pub chg_para: c_int,
    pub autobright: u8,
    pub quality: u8,
    pub time_interval: u16,
    pub light_freq: u8,
}

nix::ioctl_read!(spcagvidioparam, b'v', BASE_VIDIOCPRIVATE + 1, video_param);
nix::ioctl_write_ptr!(spcasvidioparam, b'v', BASE_VIDIOCPRIVATE + 2, video_param);

// Logitech QuickCam (qc-usb)

pub const QC_LUT_SIZE: usize = 3 * 256;
pub const QC_USERLUT_DEFAULT: u32 = 1;
pub const QC_USERLUT_VALUES: u32 = 2;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct qc_userlut {
    pub flags: u32,
    pub lut: [u8; QC_LUT_SIZE],
}

nix::ioctl_read!(vidiocqcgsettle, b'v', BASE_VIDIOCPRIVATE + 2, c_int);
nix::ioctl_readwrite!(vidiocqcssettle, b'v', BASE_VIDIOCPRIVATE + 2, c_int);
nix::ioctl_read!(vidiocqcgcompress, b'v', BASE_VIDIOCPRIVATE + 4, c_int);
nix::ioctl_readwrite!(vidiocqcscompress, b'v', BASE_VIDIOCPRIVATE + 4, c_int);
nix::ioctl_read!(vidiocqcgquality, b'v', BASE_VIDIOCPRIVATE + 6, c_int);
nix::ioctl_readwrite!(vidiocqcsquality, b'v', BASE_VIDIOCPRIVATE + 6, c_int);
nix::ioctl_read!(vidiocqcgadaptive, b'v', BASE_VIDIOCPRIVATE + 7, c_int);
nix::ioctl_readwrite!(vidiocqcsadaptive, b'v', BASE_VIDIOCPRIVATE + 7, c_int);
nix::ioctl_read!(vidiocqcgequalize, b'v', BASE_VIDIOCPRIVATE + 8, c_int);
nix::ioctl_readwrite!(vidiocqcsequalize, b'v', BASE_VIDIOCPRIVATE + 8, c_int);
nix::ioctl_read!(vidiocqcguserlut, b'v', BASE_VIDIOCPRIVATE + 9, qc_userlut);
nix::ioctl_write_ptr!(vidiocqcsuserlut, b'v', BASE_VIDIOCPRIVATE + 9, qc_userlut);

crate::impl_zeroed!(pwc_probe, pwc_mpt_range, pwc_mpt_angles, video_param, qc_userlut);
