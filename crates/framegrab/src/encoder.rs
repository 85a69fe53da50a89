// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use std::io;

use crate::{format::FormatDescriptor, palette::Palette, Error};

/// Converts captured frames into an output palette.
///
/// The encoder owns its output buffer; the slice returned by
/// [`convert`](Encoder::convert) is valid until the next call.
pub trait Encoder: Send {
    fn output_palette(&self) -> Palette;

    fn convert(&mut self, palette: Palette, data: &[u8]) -> Result<&[u8], Error>;
}

fn short_frame(len: usize, expected: u32) -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("frame of {} bytes, expected {}", len, expected),
    ))
}

fn wrong_palette(palette: Palette, expected: Palette) -> Error {
    log::debug!("encoder for {} got a {} frame", expected, palette);
    Error::NoSupportedFormat
}

/// Copies frames unchanged.
#[derive(Debug)]
pub struct Passthrough {
    format: FormatDescriptor,
    scratch: Vec<u8>,
}

impl Passthrough {
    pub fn new(format: FormatDescriptor) -> Self {
        Passthrough {
            format,
            scratch: Vec::with_capacity(format.size as usize),
        }
    }
}

impl Encoder for Passthrough {
    fn output_palette(&self) -> Palette {
        self.format.palette
    }

    fn convert(&mut self, palette: Palette, data: &[u8]) -> Result<&[u8], Error> {
        if palette != self.format.palette {
            return Err(wrong_palette(palette, self.format.palette));
        }
        // Compressed frames vary in size
        if !palette.is_compressed() && data.len() < self.format.size as usize {
            return Err(short_frame(data.len(), self.format.size));
        }
        self.scratch.clear();
        self.scratch.extend_from_slice(data);
        Ok(&self.scratch)
    }
}

/// Extracts the luma plane of YUV and grey frames into [`Palette::Grey`].
#[derive(Debug)]
pub struct Luma {
    format: FormatDescriptor,
    scratch: Vec<u8>,
}

impl Luma {
    /// Palettes the encoder can read.
    pub const INPUTS: [Palette; 8] = [
        Palette::Grey,
        Palette::Yuyv,
        Palette::Yvyu,
        Palette::Uyvy,
        Palette::Vyuy,
        Palette::Yuv420,
        Palette::Nv12,
        Palette::Nv21,
    ];

    pub fn new(format: FormatDescriptor) -> Result<Self, Error> {
        if !Self::INPUTS.contains(&format.palette) || format.width == 0 || format.height == 0 {
            return Err(Error::NoSupportedFormat);
        }
        // The luma plane must fit the 32-bit sizes the driver reports
        let pixels = u32::try_from(format.width as u64 * format.height as u64)
            .map_err(|_| Error::NoSupportedFormat)?;
        Ok(Luma {
            format,
            scratch: vec![0; pixels as usize],
        })
    }
}

impl Encoder for Luma {
    fn output_palette(&self) -> Palette {
        Palette::Grey
    }

    fn convert(&mut self, palette: Palette, data: &[u8]) -> Result<&[u8], Error> {
        if palette != self.format.palette {
            return Err(wrong_palette(palette, self.format.palette));
        }
        let stride = self.format.bytes_per_line as usize;
        let width = self.format.width as usize;
        let height = self.format.height as usize;

        // Packed 4:2:2 carries luma in every other byte, at offset 0 or 1
        let (step, offset) = match palette {
            Palette::Yuyv | Palette::Yvyu => (2, 0),
            Palette::Uyvy | Palette::Vyuy => (2, 1),
            _ => (1, 0),
        };
        let stride = if stride == 0 { width * step } else { stride };
        if data.len() < stride * height.saturating_sub(1) + width * step {
            return Err(short_frame(data.len(), (stride * height) as u32));
        }

        for (y, row) in self.scratch.chunks_exact_mut(width).enumerate() {
            let line = &data[y * stride..];
            for (x, out) in row.iter_mut().enumerate() {
                *out = line[x * step + offset];
            }
        }
        Ok(&self.scratch)
    }
}
