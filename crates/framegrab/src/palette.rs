// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Pixel formats understood by the engine.
//!
//! A [`Palette`] names a pixel layout independently of the protocol
//! generation. V2 devices identify it by [`FourCC`], V1 devices by a small
//! integer palette code; some layouts have a second V1 code (an alias) which
//! older drivers report instead of the primary one.
//!
//! | Palette | FourCC | V1 | Depth |
//! |---------|--------|----|-------|
//! | `Yuyv` | `YUYV` | YUYV / YUV422 | 16 |
//! | `Yuv420` | `YU12` | YUV420 / YUV420P | 12 |
//! | `Rgb24` | `RGB3` | RGB24 | 24 |
//! | `Grey` | `GREY` | GREY | 8 |
//! | `Mjpeg` | `MJPG` | | compressed |

use std::fmt;
use std::str::FromStr;

use framegrab_sys::v4l1;

use crate::fourcc::FourCC;

/// Pixel format enumeration shared by both protocol generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Palette {
    Rgb332,
    Rgb444,
    Rgb555,
    Rgb565,
    Bgr24,
    Rgb24,
    Bgr32,
    Rgb32,
    Grey,
    Y16,
    Yuyv,
    Yyuv,
    Yvyu,
    Uyvy,
    Vyuy,
    Yuv420,
    Yvu420,
    Yuv422p,
    Yuv411p,
    Nv12,
    Nv21,
    Nv16,
    Nv61,
    Sbggr8,
    Mjpeg,
    Jpeg,
}

impl Palette {
    /// Every palette, in declaration order.
    pub const ALL: [Palette; 26] = [
        Palette::Rgb332,
        Palette::Rgb444,
        Palette::Rgb555,
        Palette::Rgb565,
        Palette::Bgr24,
        Palette::Rgb24,
        Palette::Bgr32,
        Palette::Rgb32,
        Palette::Grey,
        Palette::Y16,
        Palette::Yuyv,
        Palette::Yyuv,
        Palette::Yvyu,
        Palette::Uyvy,
        Palette::Vyuy,
        Palette::Yuv420,
        Palette::Yvu420,
        Palette::Yuv422p,
        Palette::Yuv411p,
        Palette::Nv12,
        Palette::Nv21,
        Palette::Nv16,
        Palette::Nv61,
        Palette::Sbggr8,
        Palette::Mjpeg,
        Palette::Jpeg,
    ];

    /// Candidate order used when a format request names no palettes.
    pub const DEFAULT_ORDER: [Palette; 10] = [
        Palette::Yuyv,
        Palette::Yuv420,
        Palette::Rgb24,
        Palette::Bgr24,
        Palette::Mjpeg,
        Palette::Jpeg,
        Palette::Uyvy,
        Palette::Grey,
        Palette::Rgb32,
        Palette::Bgr32,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Palette::Rgb332 => "RGB332",
            Palette::Rgb444 => "RGB444",
            Palette::Rgb555 => "RGB555",
            Palette::Rgb565 => "RGB565",
            Palette::Bgr24 => "BGR24",
            Palette::Rgb24 => "RGB24",
            Palette::Bgr32 => "BGR32",
            Palette::Rgb32 => "RGB32",
            Palette::Grey => "GREY",
            Palette::Y16 => "Y16",
            Palette::Yuyv => "YUYV",
            Palette::Yyuv => "YYUV",
            Palette::Yvyu => "YVYU",
            Palette::Uyvy => "UYVY",
            Palette::Vyuy => "VYUY",
            Palette::Yuv420 => "YUV420",
            Palette::Yvu420 => "YVU420",
            Palette::Yuv422p => "YUV422P",
            Palette::Yuv411p => "YUV411P",
            Palette::Nv12 => "NV12",
            Palette::Nv21 => "NV21",
            Palette::Nv16 => "NV16",
            Palette::Nv61 => "NV61",
            Palette::Sbggr8 => "SBGGR8",
            Palette::Mjpeg => "MJPEG",
            Palette::Jpeg => "JPEG",
        }
    }

    /// V4L2 pixel format code.
    pub fn fourcc(&self) -> FourCC {
        FourCC::new(match self {
            Palette::Rgb332 => b"RGB1",
            Palette::Rgb444 => b"R444",
            Palette::Rgb555 => b"RGBO",
            Palette::Rgb565 => b"RGBP",
            Palette::Bgr24 => b"BGR3",
            Palette::Rgb24 => b"RGB3",
            Palette::Bgr32 => b"BGR4",
            Palette::Rgb32 => b"RGB4",
            Palette::Grey => b"GREY",
            Palette::Y16 => b"Y16 ",
            Palette::Yuyv => b"YUYV",
            Palette::Yyuv => b"YYUV",
            Palette::Yvyu => b"YVYU",
            Palette::Uyvy => b"UYVY",
            Palette::Vyuy => b"VYUY",
            Palette::Yuv420 => b"YU12",
            Palette::Yvu420 => b"YV12",
            Palette::Yuv422p => b"422P",
            Palette::Yuv411p => b"411P",
            Palette::Nv12 => b"NV12",
            Palette::Nv21 => b"NV21",
            Palette::Nv16 => b"NV16",
            Palette::Nv61 => b"NV61",
            Palette::Sbggr8 => b"BA81",
            Palette::Mjpeg => b"MJPG",
            Palette::Jpeg => b"JPEG",
        })
    }

    /// Primary V1 palette code, if the layout exists in V1.
    pub fn v1_palette(&self) -> Option<u16> {
        match self {
            Palette::Grey => Some(v4l1::VIDEO_PALETTE_GREY),
            Palette::Rgb565 => Some(v4l1::VIDEO_PALETTE_RGB565),
            Palette::Rgb555 => Some(v4l1::VIDEO_PALETTE_RGB555),
            Palette::Rgb24 => Some(v4l1::VIDEO_PALETTE_RGB24),
            Palette::Rgb32 => Some(v4l1::VIDEO_PALETTE_RGB32),
            Palette::Yuyv => Some(v4l1::VIDEO_PALETTE_YUYV),
            Palette::Uyvy => Some(v4l1::VIDEO_PALETTE_UYVY),
            Palette::Yuv420 => Some(v4l1::VIDEO_PALETTE_YUV420),
            Palette::Yuv422p => Some(v4l1::VIDEO_PALETTE_YUV422P),
            Palette::Yuv411p => Some(v4l1::VIDEO_PALETTE_YUV411P),
            _ => None,
        }
    }

    /// Alternate V1 code some drivers use for the same layout.
    pub fn v1_alias(&self) -> Option<u16> {
        match self {
            Palette::Yuv420 => Some(v4l1::VIDEO_PALETTE_YUV420P),
            Palette::Yuyv => Some(v4l1::VIDEO_PALETTE_YUV422),
            Palette::Yuv411p => Some(v4l1::VIDEO_PALETTE_YUV411),
            _ => None,
        }
    }

    /// Bits per pixel, `None` for compressed formats.
    pub fn depth(&self) -> Option<u32> {
        match self {
            Palette::Rgb332 | Palette::Grey | Palette::Sbggr8 => Some(8),
            Palette::Yuv420
            | Palette::Yvu420
            | Palette::Yuv411p
            | Palette::Nv12
            | Palette::Nv21 => Some(12),
            Palette::Rgb444
            | Palette::Rgb555
            | Palette::Rgb565
            | Palette::Y16
            | Palette::Yuyv
            | Palette::Yyuv
            | Palette::Yvyu
            | Palette::Uyvy
            | Palette::Vyuy
            | Palette::Yuv422p
            | Palette::Nv16
            | Palette::Nv61 => Some(16),
            Palette::Bgr24 | Palette::Rgb24 => Some(24),
            Palette::Bgr32 | Palette::Rgb32 => Some(32),
            Palette::Mjpeg | Palette::Jpeg => None,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.depth().is_none()
    }

    /// Size in bytes of one uncompressed frame, `width * height * depth / 8`.
    pub fn frame_size(&self, width: u32, height: u32) -> Option<u32> {
        self.depth()
            .map(|depth| (width as u64 * height as u64 * depth as u64 / 8) as u32)
    }

    /// Bytes per line of the first plane, `None` for compressed formats.
    pub fn bytes_per_line(&self, width: u32) -> Option<u32> {
        let bpp = match self {
            Palette::Yuv420
            | Palette::Yvu420
            | Palette::Yuv422p
            | Palette::Yuv411p
            | Palette::Nv12
            | Palette::Nv21
            | Palette::Nv16
            | Palette::Nv61 => 8,
            _ => self.depth()?,
        };
        Some((width as u64 * bpp as u64 / 8) as u32)
    }

    pub fn from_fourcc(fourcc: FourCC) -> Option<Palette> {
        Palette::ALL.into_iter().find(|p| p.fourcc() == fourcc)
    }

    /// Maps a V1 palette code, primary or alias, back to a palette.
    pub fn from_v1(code: u16) -> Option<Palette> {
        Palette::ALL
            .into_iter()
            .find(|p| p.v1_palette() == Some(code) || p.v1_alias() == Some(code))
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Palette {
    type Err = String;

    /// Accepts a palette name or a V2 fourcc, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Palette::ALL
            .into_iter()
            .find(|p| p.name() == upper || p.fourcc().to_string() == upper)
            .ok_or_else(|| format!("unknown palette '{}'", s))
    }
}
