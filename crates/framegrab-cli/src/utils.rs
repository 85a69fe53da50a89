// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use framegrab::{
    capture::CaptureDevice,
    controls::ProbeKind,
    format::{FrameInterval, Standard},
    palette::Palette,
};
use signal_hook::consts::SIGINT;
use signal_hook::flag;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Parse resolution string in format "WxH" or "W*H"; "max" is 0x0, the
/// largest size the device supports.
///
/// # Examples
/// ```ignore
/// assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
/// assert_eq!(parse_resolution("max").unwrap(), (0, 0));
/// ```
pub fn parse_resolution(s: &str) -> Result<(u32, u32), CliError> {
    if s.eq_ignore_ascii_case("max") {
        return Ok((0, 0));
    }

    let (width_str, height_str) = s
        .split_once('x')
        .or_else(|| s.split_once('*'))
        .ok_or_else(|| {
            CliError::InvalidArgs(format!(
                "Invalid resolution format (expected WxH, W*H or max): {}",
                s
            ))
        })?;

    let width = width_str
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid width in resolution: {}", s)))?;
    let height = height_str
        .parse::<u32>()
        .map_err(|_| CliError::InvalidArgs(format!("Invalid height in resolution: {}", s)))?;

    Ok((width, height))
}

/// Parse a comma-separated list of palette names or fourccs.
pub fn parse_palettes(s: &str) -> Result<Vec<Palette>, CliError> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.parse::<Palette>().map_err(CliError::InvalidArgs))
        .collect()
}

pub fn parse_standard(s: &str) -> Result<Standard, CliError> {
    s.parse().map_err(CliError::InvalidArgs)
}

/// Parse a comma-separated list of probe plugin names.
pub fn parse_plugins(s: &str) -> Result<Vec<ProbeKind>, CliError> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().parse::<ProbeKind>().map_err(CliError::InvalidArgs))
        .collect()
}

/// Parse a frame rate as frames per second ("30") or a frame interval
/// ("1001/30000").
pub fn parse_frame_interval(s: &str) -> Result<FrameInterval, CliError> {
    let invalid = || CliError::InvalidArgs(format!("Invalid frame rate: {}", s));

    let interval = match s.split_once('/') {
        Some((num, den)) => FrameInterval::new(
            num.trim().parse().map_err(|_| invalid())?,
            den.trim().parse().map_err(|_| invalid())?,
        ),
        None => FrameInterval::new(1, s.trim().parse().map_err(|_| invalid())?),
    };
    if interval.numerator == 0 || interval.denominator == 0 {
        return Err(invalid());
    }
    Ok(interval)
}

/// Open a device and bind its protocol adapter.
pub fn open_device(path: &str) -> Result<CaptureDevice, CliError> {
    log::debug!("Opening {}", path);
    let mut dev = CaptureDevice::open(path)?;
    let version = dev.detect_version()?;
    log::debug!("{} speaks {}", path, version);
    Ok(dev)
}

/// Install signal handler for graceful shutdown on Ctrl+C
///
/// Returns an Arc<AtomicBool> that will be set to true when SIGINT is received.
/// Check this flag periodically in your main loop to exit gracefully.
pub fn install_signal_handler() -> Result<Arc<AtomicBool>, CliError> {
    let term = Arc::new(AtomicBool::new(false));

    flag::register(SIGINT, Arc::clone(&term))
        .map_err(|e| CliError::General(format!("Failed to register signal handler: {}", e)))?;

    log::debug!("Installed SIGINT handler");
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution_valid() {
        assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_resolution("640x480").unwrap(), (640, 480));
        assert_eq!(parse_resolution("1920*1080").unwrap(), (1920, 1080));
        assert_eq!(parse_resolution("0x480").unwrap(), (0, 480));
        assert_eq!(parse_resolution("MAX").unwrap(), (0, 0));
    }

    #[test]
    fn test_parse_resolution_invalid() {
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("1920x").is_err());
        assert!(parse_resolution("x1080").is_err());
        assert!(parse_resolution("1920x1080x60").is_err());
        assert!(parse_resolution("widthxheight").is_err());
        assert!(parse_resolution("-1920x1080").is_err());
    }

    #[test]
    fn test_parse_palettes() {
        assert_eq!(
            parse_palettes("yuyv,MJPG,rgb24").unwrap(),
            vec![Palette::Yuyv, Palette::Mjpeg, Palette::Rgb24]
        );
        assert!(parse_palettes("").unwrap().is_empty());
        assert!(matches!(
            parse_palettes("yuyv,bogus"),
            Err(CliError::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_parse_plugins() {
        assert_eq!(
            parse_plugins("pwc, frame-rate").unwrap(),
            vec![ProbeKind::Pwc, ProbeKind::FrameRate]
        );
        assert!(parse_plugins("uvc").is_err());
    }

    #[test]
    fn test_parse_frame_interval() {
        assert_eq!(parse_frame_interval("30").unwrap(), FrameInterval::new(1, 30));
        assert_eq!(
            parse_frame_interval("1001/30000").unwrap(),
            FrameInterval::new(1001, 30000)
        );
        assert!(parse_frame_interval("0").is_err());
        assert!(parse_frame_interval("1/").is_err());
        assert!(parse_frame_interval("fast").is_err());
    }

    #[test]
    fn test_parse_standard() {
        assert_eq!(parse_standard("PAL").unwrap(), Standard::Pal);
        assert!(parse_standard("hdmi").is_err());
    }
}
