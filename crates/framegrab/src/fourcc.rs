// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies
#![forbid(unsafe_code)]

use core::{fmt, result::Result};

/// A V4L2 pixel format code.
///
/// V4L2 composes the 32-bit code as `a | b << 8 | c << 16 | d << 24`, so the
/// numeric value of a code is the same on every host and the first character
/// always lives in the least significant byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const fn new(code: &[u8; 4]) -> FourCC {
        FourCC(*code)
    }

    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    pub const fn from_u32(val: u32) -> FourCC {
        FourCC(val.to_le_bytes())
    }
}

impl From<&[u8; 4]> for FourCC {
    fn from(buf: &[u8; 4]) -> FourCC {
        FourCC(*buf)
    }
}

impl From<u32> for FourCC {
    fn from(val: u32) -> FourCC {
        FourCC::from_u32(val)
    }
}

impl From<FourCC> for u32 {
    fn from(val: FourCC) -> Self {
        val.to_u32()
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match core::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s.trim_end()),
            Err(_) => {
                // Returning fmt::Error would make format!() panic
                for b in self.0 {
                    write!(f, "{}", core::ascii::escape_default(b))?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_tuple("FourCC")
            .field(&format_args!("{}", self))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegrab_sys::v4l2::v4l2_fourcc;

    #[test]
    fn test_matches_kernel_encoding() {
        let yuyv = FourCC::new(b"YUYV");
        assert_eq!(yuyv.to_u32(), v4l2_fourcc(b'Y', b'U', b'Y', b'V'));
        assert_eq!(FourCC::from(0x4750_4a4d), FourCC::new(b"MJPG"));
    }

    #[test]
    fn test_display() {
        assert_eq!(FourCC::new(b"GREY").to_string(), "GREY");
        assert_eq!(FourCC::new(b"Y16 ").to_string(), "Y16");
        assert_eq!(FourCC([0xff, b'A', b'B', b'C']).to_string(), "\\xffABC");
        assert_eq!(
            format!("{:?}", FourCC::new(b"NV12")),
            "FourCC(NV12)"
        );
    }
}
