// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Capture format types: resolutions, video standards, the negotiated format
//! descriptor, frame intervals and format requests.

use std::fmt;
use std::str::FromStr;

use framegrab_sys::{v4l1, v4l2};

use crate::palette::Palette;

/// Video resolution
///
/// ```
/// use framegrab::format::Resolution;
///
/// let res = Resolution::new(640, 480);
/// assert_eq!(res.to_string(), "640x480");
/// assert_eq!(res.pixels(), 307200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Analog video standard of an input.
///
/// `Webcam` stands for "no standard": digital sources such as USB cameras
/// that have no broadcast timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Standard {
    #[default]
    Webcam,
    Pal,
    Secam,
    Ntsc,
}

impl Standard {
    /// Order in which standards are tried when the requested one is rejected.
    pub const AUTODETECT_ORDER: [Standard; 4] =
        [Standard::Webcam, Standard::Pal, Standard::Ntsc, Standard::Secam];

    pub fn name(&self) -> &'static str {
        match self {
            Standard::Webcam => "webcam",
            Standard::Pal => "PAL",
            Standard::Secam => "SECAM",
            Standard::Ntsc => "NTSC",
        }
    }

    /// V4L2 standard id set; `Webcam` maps to `V4L2_STD_UNKNOWN`.
    pub fn v4l2_id(&self) -> v4l2::v4l2_std_id {
        match self {
            Standard::Webcam => v4l2::V4L2_STD_UNKNOWN,
            Standard::Pal => v4l2::V4L2_STD_PAL,
            Standard::Secam => v4l2::V4L2_STD_SECAM,
            Standard::Ntsc => v4l2::V4L2_STD_NTSC,
        }
    }

    /// Classifies a V4L2 standard id set, `None` for sets outside the
    /// PAL, SECAM and NTSC families.
    pub fn from_v4l2_id(id: v4l2::v4l2_std_id) -> Option<Standard> {
        if id == v4l2::V4L2_STD_UNKNOWN {
            Some(Standard::Webcam)
        } else if id & v4l2::V4L2_STD_PAL == id {
            Some(Standard::Pal)
        } else if id & v4l2::V4L2_STD_NTSC == id {
            Some(Standard::Ntsc)
        } else if id & v4l2::V4L2_STD_SECAM == id {
            Some(Standard::Secam)
        } else {
            None
        }
    }

    /// V1 channel norm; `Webcam` lets the driver pick.
    pub fn v1_mode(&self) -> u16 {
        match self {
            Standard::Webcam => v4l1::VIDEO_MODE_AUTO,
            Standard::Pal => v4l1::VIDEO_MODE_PAL,
            Standard::Secam => v4l1::VIDEO_MODE_SECAM,
            Standard::Ntsc => v4l1::VIDEO_MODE_NTSC,
        }
    }

    pub fn from_v1_mode(mode: u16) -> Standard {
        match mode {
            v4l1::VIDEO_MODE_PAL => Standard::Pal,
            v4l1::VIDEO_MODE_SECAM => Standard::Secam,
            v4l1::VIDEO_MODE_NTSC => Standard::Ntsc,
            _ => Standard::Webcam,
        }
    }

    /// Nominal frame interval of the standard.
    pub fn default_interval(&self) -> FrameInterval {
        match self {
            Standard::Pal | Standard::Secam => FrameInterval::new(1, 25),
            Standard::Ntsc => FrameInterval::new(1001, 30000),
            Standard::Webcam => FrameInterval::new(1, 30),
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Standard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webcam" | "none" => Ok(Standard::Webcam),
            "pal" => Ok(Standard::Pal),
            "secam" => Ok(Standard::Secam),
            "ntsc" => Ok(Standard::Ntsc),
            _ => Err(format!(
                "unknown standard '{}' (expected webcam, pal, secam or ntsc)",
                s
            )),
        }
    }
}

/// Whether and how a device uses video standards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardSupport {
    /// The driver enumerates no standards
    None,
    /// The driver's only standard is "unknown", as webcams report
    WebcamOnly,
    /// The driver enumerates broadcast standards
    Broadcast,
}

/// The negotiated capture format.
///
/// Granted values come from the device and are authoritative; they may
/// differ from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub palette: Palette,
    pub width: u32,
    pub height: u32,
    pub bytes_per_line: u32,
    /// Size in bytes of one complete frame
    pub size: u32,
}

impl FormatDescriptor {
    /// Builds a descriptor from granted values, deriving line and frame size
    /// from the palette where the driver reported none.
    pub fn new(
        palette: Palette,
        width: u32,
        height: u32,
        bytes_per_line: u32,
        size: u32,
    ) -> FormatDescriptor {
        let bytes_per_line = if bytes_per_line == 0 {
            palette.bytes_per_line(width).unwrap_or(0)
        } else {
            bytes_per_line
        };
        let size = if size == 0 {
            palette.frame_size(width, height).unwrap_or(0)
        } else {
            size
        };
        FormatDescriptor {
            palette,
            width,
            height,
            bytes_per_line,
            size,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} ({} bytes)",
            self.palette, self.width, self.height, self.size
        )
    }
}

/// Time between two frames, in seconds, as a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameInterval {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameInterval {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Frames per second, rounded down; 0 for a degenerate interval.
    pub fn fps(&self) -> u32 {
        if self.numerator == 0 {
            0
        } else {
            self.denominator / self.numerator
        }
    }
}

impl fmt::Display for FrameInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Parameters for [`CaptureDevice::negotiate_format`](crate::capture::CaptureDevice::negotiate_format).
///
/// A width or height of 0 asks for the largest size the device supports. An
/// empty palette list means [`Palette::DEFAULT_ORDER`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormatRequest {
    pub width: u32,
    pub height: u32,
    pub channel: u32,
    pub standard: Standard,
    pub palettes: Vec<Palette>,
}

impl FormatRequest {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_standard(mut self, standard: Standard) -> Self {
        self.standard = standard;
        self
    }

    pub fn with_palettes(mut self, palettes: &[Palette]) -> Self {
        self.palettes = palettes.to_vec();
        self
    }

    /// The candidate palettes in the order they will be tried.
    pub fn candidates(&self) -> &[Palette] {
        if self.palettes.is_empty() {
            &Palette::DEFAULT_ORDER
        } else {
            &self.palettes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_derives_sizes() {
        let fmt = FormatDescriptor::new(Palette::Rgb24, 640, 480, 0, 0);
        assert_eq!(fmt.bytes_per_line, 1920);
        assert_eq!(fmt.size, 640 * 480 * 3);

        let fmt = FormatDescriptor::new(Palette::Mjpeg, 640, 480, 0, 115200);
        assert_eq!(fmt.size, 115200);
        assert_eq!(fmt.bytes_per_line, 0);
    }

    #[test]
    fn test_standard_ids() {
        for std in [Standard::Pal, Standard::Secam, Standard::Ntsc] {
            assert_eq!(Standard::from_v4l2_id(std.v4l2_id()), Some(std));
            assert_eq!(Standard::from_v1_mode(std.v1_mode()), std);
        }
        assert_eq!(Standard::from_v4l2_id(0), Some(Standard::Webcam));
        // PAL-B alone still classifies as PAL
        assert_eq!(Standard::from_v4l2_id(0x1), Some(Standard::Pal));
        assert_eq!(
            Standard::from_v4l2_id(v4l2::V4L2_STD_PAL | v4l2::V4L2_STD_NTSC),
            None
        );
    }

    #[test]
    fn test_default_interval() {
        assert_eq!(Standard::Pal.default_interval().fps(), 25);
        assert_eq!(Standard::Ntsc.default_interval().fps(), 29);
        assert_eq!(Standard::Webcam.default_interval(), FrameInterval::new(1, 30));
    }

    #[test]
    fn test_request_candidates() {
        let req = FormatRequest::new(0, 0);
        assert_eq!(req.candidates(), &Palette::DEFAULT_ORDER);
        let req = req.with_palettes(&[Palette::Grey]);
        assert_eq!(req.candidates(), &[Palette::Grey]);
        assert_eq!("Pal".parse::<Standard>(), Ok(Standard::Pal));
    }
}
