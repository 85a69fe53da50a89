// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Format negotiation
//!
//! Negotiation runs these steps against the bound adapter:
//!
//! 1. select the video standard, auto-detecting it when the requested one
//!    cannot be set;
//! 2. select the input, for broadcast standards only;
//! 3. try every candidate palette at the requested resolution and keep the
//!    one whose granted pixel count is closest to the request;
//! 4. reset cropping and apply the standard's default frame interval, both
//!    best effort.

use crate::{
    adapter::{InputInfo, ProtocolAdapter},
    format::{FormatDescriptor, FormatRequest, FrameInterval, Resolution, Standard, StandardSupport},
    Error,
};

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub format: FormatDescriptor,
    pub standard: Standard,
    /// The selected input, when one was selected explicitly
    pub input: Option<InputInfo>,
    /// Frame interval in effect, when the device reports one
    pub interval: Option<FrameInterval>,
}

/// Negotiates `request` with the device.
pub fn negotiate(
    adapter: &mut dyn ProtocolAdapter,
    request: &FormatRequest,
) -> Result<Negotiated, Error> {
    let standard = select_standard(adapter, request.channel, request.standard)?;
    let input = select_input(adapter, request.channel, standard)?;
    let format = select_format(adapter, request)?;

    if standard != Standard::Webcam {
        if let Err(err) = adapter.reset_crop() {
            log::debug!("cannot reset cropping: {}", err);
        }
    }

    let interval = apply_default_interval(adapter, standard);
    log::info!("negotiated {} ({})", format, standard);

    Ok(Negotiated {
        format,
        standard,
        input,
        interval,
    })
}

/// Selects `requested`, or the first standard of
/// [`Standard::AUTODETECT_ORDER`] the device accepts.
pub(crate) fn select_standard(
    adapter: &mut dyn ProtocolAdapter,
    channel: u32,
    requested: Standard,
) -> Result<Standard, Error> {
    match adapter.standard_support() {
        StandardSupport::None => {
            if requested != Standard::Webcam {
                log::info!("device uses no standards, using {}", Standard::Webcam);
            }
            Ok(Standard::Webcam)
        }
        StandardSupport::WebcamOnly if requested == Standard::Webcam => Ok(Standard::Webcam),
        StandardSupport::Broadcast if requested == Standard::Webcam => {
            log::info!("{} is not valid for this input", requested);
            autodetect(adapter, channel).ok_or(Error::UnsupportedStandard(requested))
        }
        _ => {
            log::debug!("trying standard {}", requested);
            match adapter.try_standard(channel, requested) {
                Ok(()) => Ok(requested),
                Err(err) => {
                    log::info!("standard {} cannot be selected: {}", requested, err);
                    autodetect(adapter, channel).ok_or(Error::UnsupportedStandard(requested))
                }
            }
        }
    }
}

fn autodetect(adapter: &mut dyn ProtocolAdapter, channel: u32) -> Option<Standard> {
    log::debug!("auto-detecting standard");
    let found = Standard::AUTODETECT_ORDER
        .into_iter()
        .find(|&standard| adapter.try_standard(channel, standard).is_ok());
    match found {
        Some(standard) => log::info!("adjusted standard to {}", standard),
        None => log::info!("could not auto-detect a standard on input {}", channel),
    }
    found
}

/// Webcam drivers reject input selection, so it is only done for broadcast
/// standards.
pub(crate) fn select_input(
    adapter: &mut dyn ProtocolAdapter,
    channel: u32,
    standard: Standard,
) -> Result<Option<InputInfo>, Error> {
    if standard == Standard::Webcam {
        return Ok(None);
    }
    match adapter.select_input(channel) {
        Ok(input) => {
            log::debug!("selected input {} ({}, {})", input.index, input.name, input.kind);
            Ok(Some(input))
        }
        Err(err) => {
            log::info!("input {} cannot be selected: {}", channel, err);
            Err(Error::InvalidChannel(channel))
        }
    }
}

fn select_format(
    adapter: &mut dyn ProtocolAdapter,
    request: &FormatRequest,
) -> Result<FormatDescriptor, Error> {
    let max = adapter.info().max_resolution;
    let resolution = Resolution::new(
        if request.width == 0 { max.width } else { request.width },
        if request.height == 0 { max.height } else { request.height },
    );
    let wanted = resolution.pixels();

    let mut best: Option<(u64, FormatDescriptor)> = None;
    for &palette in request.candidates() {
        match adapter.apply_format(palette, resolution) {
            Ok(granted) => {
                let distance = granted.resolution().pixels().abs_diff(wanted);
                log::debug!("{} accepted as {} (distance {})", palette, granted, distance);
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, granted));
                }
            }
            Err(err) => log::debug!("{} at {} rejected: {}", palette, resolution, err),
        }
    }

    let (_, format) = best.ok_or(Error::NoSupportedFormat)?;

    // Later candidates may have replaced the device format; set the winner again
    let applied = adapter
        .apply_format(format.palette, resolution)
        .map_err(|_| Error::NoSupportedFormat)?;
    Ok(applied)
}

fn apply_default_interval(
    adapter: &mut dyn ProtocolAdapter,
    standard: Standard,
) -> Option<FrameInterval> {
    if !adapter.supports_frame_interval() {
        return None;
    }
    let interval = standard.default_interval();
    match adapter.set_frame_interval(interval) {
        Ok(granted) => Some(granted),
        Err(err) => {
            log::debug!("cannot set frame interval {}: {}", interval, err);
            adapter.frame_interval().ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{palette::Palette, sim::SimulatedDevice};

    #[test]
    fn test_closest_pixel_count_wins() -> Result<(), Error> {
        let mut sim = SimulatedDevice::new()
            .with_format(Palette::Yuyv, Resolution::new(320, 240))
            .with_format(Palette::Mjpeg, Resolution::new(1280, 720))
            .with_format(Palette::Rgb24, Resolution::new(640, 480));
        let request = FormatRequest::new(800, 600).with_palettes(&[
            Palette::Yuyv,
            Palette::Mjpeg,
            Palette::Rgb24,
        ]);
        let n = negotiate(&mut sim, &request)?;
        assert_eq!(n.format.palette, Palette::Rgb24);
        assert_eq!(n.format.resolution(), Resolution::new(640, 480));
        Ok(())
    }

    #[test]
    fn test_ties_keep_earliest() -> Result<(), Error> {
        let mut sim = SimulatedDevice::new()
            .with_format(Palette::Uyvy, Resolution::new(640, 480))
            .with_format(Palette::Yuyv, Resolution::new(640, 480));
        let request = FormatRequest::new(640, 480).with_palettes(&[Palette::Yuyv, Palette::Uyvy]);
        assert_eq!(negotiate(&mut sim, &request)?.format.palette, Palette::Yuyv);
        Ok(())
    }

    #[test]
    fn test_no_candidate_accepted() {
        let mut sim = SimulatedDevice::new().with_format(Palette::Grey, Resolution::new(64, 64));
        let request = FormatRequest::new(64, 64).with_palettes(&[Palette::Rgb24]);
        assert!(matches!(
            negotiate(&mut sim, &request),
            Err(Error::NoSupportedFormat)
        ));
    }

    #[test]
    fn test_zero_size_means_maximum() -> Result<(), Error> {
        let mut sim = SimulatedDevice::new().with_max_resolution(Resolution::new(800, 600));
        let n = negotiate(&mut sim, &FormatRequest::new(0, 0).with_palettes(&[Palette::Grey]))?;
        assert_eq!(n.format.resolution(), Resolution::new(800, 600));
        Ok(())
    }

    #[test]
    fn test_broadcast_webcam_request_autodetects() -> Result<(), Error> {
        let mut sim = SimulatedDevice::new()
            .with_standards(StandardSupport::Broadcast, &[Standard::Ntsc, Standard::Secam])
            .with_tuner(0, crate::adapter::TunerSignal { signal: 0, afc: None });
        let sim_view = sim.clone();
        let n = negotiate(&mut sim, &FormatRequest::new(320, 240).with_channel(1))?;
        assert_eq!(n.standard, Standard::Ntsc);
        assert_eq!(
            sim_view.standard_attempts(),
            vec![Standard::Webcam, Standard::Pal, Standard::Ntsc]
        );
        assert_eq!(n.input.map(|i| i.index), Some(1));
        assert_eq!(sim_view.crop_resets(), 1);
        Ok(())
    }

    #[test]
    fn test_requested_standard_then_fallback() -> Result<(), Error> {
        let mut sim =
            SimulatedDevice::new().with_standards(StandardSupport::Broadcast, &[Standard::Pal]);
        let view = sim.clone();
        let request = FormatRequest::new(320, 240).with_standard(Standard::Secam);
        assert_eq!(negotiate(&mut sim, &request)?.standard, Standard::Pal);
        assert_eq!(
            view.standard_attempts(),
            vec![Standard::Secam, Standard::Webcam, Standard::Pal]
        );
        Ok(())
    }

    #[test]
    fn test_no_standard_found() {
        let mut sim = SimulatedDevice::new().with_standards(StandardSupport::Broadcast, &[]);
        let request = FormatRequest::new(320, 240).with_standard(Standard::Pal);
        assert!(matches!(
            negotiate(&mut sim, &request),
            Err(Error::UnsupportedStandard(Standard::Pal))
        ));
    }

    #[test]
    fn test_no_standards_forces_webcam() -> Result<(), Error> {
        let mut sim = SimulatedDevice::new().with_standards(StandardSupport::None, &[]);
        let view = sim.clone();
        let request = FormatRequest::new(320, 240).with_standard(Standard::Ntsc);
        let n = negotiate(&mut sim, &request)?;
        assert_eq!(n.standard, Standard::Webcam);
        assert!(view.standard_attempts().is_empty());
        assert!(n.input.is_none());
        assert_eq!(view.crop_resets(), 0);
        Ok(())
    }

    #[test]
    fn test_invalid_channel() {
        let mut sim =
            SimulatedDevice::new().with_standards(StandardSupport::Broadcast, &[Standard::Pal]);
        let request = FormatRequest::new(320, 240)
            .with_standard(Standard::Pal)
            .with_channel(7);
        assert!(matches!(
            negotiate(&mut sim, &request),
            Err(Error::InvalidChannel(7))
        ));
    }

    #[test]
    fn test_default_interval_applied() -> Result<(), Error> {
        let mut sim = SimulatedDevice::new().with_frame_interval(FrameInterval::new(1, 15));
        let n = negotiate(&mut sim, &FormatRequest::new(320, 240))?;
        assert_eq!(n.interval, Some(FrameInterval::new(1, 30)));
        Ok(())
    }
}
