// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video4Linux (version 1) structures, constants and ioctl requests.
//!
//! The V4L1 API was removed from mainline kernels in 2.6.38, but some
//! out-of-tree and embedded drivers still only speak it.

use libc::{c_int, c_ulong, c_void};

pub const VID_TYPE_CAPTURE: c_int = 1;
pub const VID_TYPE_TUNER: c_int = 2;

pub const VIDEO_VC_TUNER: u32 = 1;
pub const VIDEO_TYPE_TV: u16 = 1;
pub const VIDEO_TYPE_CAMERA: u16 = 2;

pub const VIDEO_MODE_PAL: u16 = 0;
pub const VIDEO_MODE_NTSC: u16 = 1;
pub const VIDEO_MODE_SECAM: u16 = 2;
pub const VIDEO_MODE_AUTO: u16 = 3;

pub const VIDEO_PALETTE_GREY: u16 = 1;
pub const VIDEO_PALETTE_HI240: u16 = 2;
pub const VIDEO_PALETTE_RGB565: u16 = 3;
pub const VIDEO_PALETTE_RGB24: u16 = 4;
pub const VIDEO_PALETTE_RGB32: u16 = 5;
pub const VIDEO_PALETTE_RGB555: u16 = 6;
pub const VIDEO_PALETTE_YUV422: u16 = 7;
pub const VIDEO_PALETTE_YUYV: u16 = 8;
pub const VIDEO_PALETTE_UYVY: u16 = 9;
pub const VIDEO_PALETTE_YUV420: u16 = 10;
pub const VIDEO_PALETTE_YUV411: u16 = 11;
pub const VIDEO_PALETTE_RAW: u16 = 12;
pub const VIDEO_PALETTE_YUV422P: u16 = 13;
pub const VIDEO_PALETTE_YUV411P: u16 = 14;
pub const VIDEO_PALETTE_YUV420P: u16 = 15;
pub const VIDEO_PALETTE_YUV410P: u16 = 16;

pub const VIDEO_MAX_FRAME: usize = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_capability {
    pub name: [u8; 32],
    pub type_: c_int,
    pub channels: c_int,
    pub audios: c_int,
    pub maxwidth: c_int,
    pub maxheight: c_int,
    pub minwidth: c_int,
    pub minheight: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_channel {
    pub channel: c_int,
    pub name: [u8; 32],
    pub tuners: c_int,
    pub flags: u32,
    pub type_: u16,
    pub norm: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_tuner {
    pub tuner: c_int,
    pub name: [u8; 32],
    pub rangelow: c_ulong,
    pub rangehigh: c_ulong,
    pub flags: u32,
    pub mode: u16,
    pub signal: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_picture {
    pub brightness: u16,
    pub hue: u16,
    pub colour: u16,
    pub contrast: u16,
    pub whiteness: u16,
    pub depth: u16,
    pub palette: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub chromakey: u32,
    pub flags: u32,
    pub clips: *mut c_void,
    pub clipcount: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_mmap {
    pub frame: u32,
    pub height: c_int,
    pub width: c_int,
    pub format: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct video_mbuf {
    pub size: c_int,
    pub frames: c_int,
    pub offsets: [c_int; VIDEO_MAX_FRAME],
}

crate::impl_zeroed!(
    video_capability,
    video_channel,
    video_tuner,
    video_picture,
    video_window,
    video_mmap,
    video_mbuf,
);

const V: u8 = b'v';

nix::ioctl_read!(vidiocgcap, V, 1, video_capability);
nix::ioctl_readwrite!(vidiocgchan, V, 2, video_channel);
nix::ioctl_write_ptr!(vidiocschan, V, 3, video_channel);
nix::ioctl_readwrite!(vidiocgtuner, V, 4, video_tuner);
nix::ioctl_read!(vidiocgpict, V, 6, video_picture);
nix::ioctl_write_ptr!(vidiocspict, V, 7, video_picture);
nix::ioctl_read!(vidiocgwin, V, 9, video_window);
nix::ioctl_write_ptr!(vidiocswin, V, 10, video_window);
nix::ioctl_read!(vidiocgfreq, V, 14, c_ulong);
nix::ioctl_write_ptr!(vidiocsfreq, V, 15, c_ulong);
nix::ioctl_write_ptr!(vidiocsync, V, 18, c_int);
nix::ioctl_write_ptr!(vidiocmcapture, V, 19, video_mmap);
nix::ioctl_read!(vidiocgmbuf, V, 20, video_mbuf);

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_struct_sizes() {
        assert_eq!(mem::size_of::<video_capability>(), 60);
        assert_eq!(mem::size_of::<video_channel>(), 48);
        assert_eq!(mem::size_of::<video_picture>(), 14);
        assert_eq!(mem::size_of::<video_window>(), 40);
        assert_eq!(mem::size_of::<video_mmap>(), 16);
        assert_eq!(mem::size_of::<video_mbuf>(), 136);
    }
}
