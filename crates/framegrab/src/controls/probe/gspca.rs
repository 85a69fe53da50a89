// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! spca5xx / gspca private parameter block.
//!
//! The driver is recognised by how it treats the light frequency: 60, 50 and
//! 0 read back unchanged while an invalid 90 reads back as 0. Detection
//! restores the original light frequency before returning.

use std::io;

use super::{integer, unknown_control, Probe, ProbeKind};
use crate::{
    adapter::{
        vendor::{GspcaParam, GspcaParams},
        ProtocolAdapter,
    },
    controls::{ControlDescriptor, ControlKind, ControlValue},
};

const PARAMS: [(GspcaParam, &str, i32); 4] = [
    (GspcaParam::AutoBrightness, "Auto-Brightness", 1),
    (GspcaParam::Quality, "Quality", 6),
    (GspcaParam::FrameInterval, "Frame Interval", 1000),
    (GspcaParam::LightFrequency, "Light Frequency", 60),
];

#[derive(Debug)]
pub(super) struct GspcaProbe;

pub(super) fn detect(adapter: &mut dyn ProtocolAdapter) -> Option<GspcaProbe> {
    let original = adapter.gspca_params().ok()?;

    let found = light_frequency_check(adapter).unwrap_or_else(|err| {
        log::trace!("gspca light frequency check: {}", err);
        false
    });

    if let Err(err) = adapter.gspca_set_param(GspcaParam::LightFrequency, &original) {
        log::warn!("cannot restore gspca light frequency: {}", err);
    }

    found.then_some(GspcaProbe)
}

fn light_frequency_check(adapter: &mut dyn ProtocolAdapter) -> io::Result<bool> {
    for (write, expect) in [(60, 60), (50, 50), (0, 0), (90, 0)] {
        let params = GspcaParams {
            light_frequency: write,
            ..Default::default()
        };
        adapter.gspca_set_param(GspcaParam::LightFrequency, &params)?;
        let read = adapter.gspca_params()?.light_frequency;
        if read != expect {
            log::debug!("gspca light frequency {} read back as {}", write, read);
            return Ok(false);
        }
    }
    Ok(true)
}

/// Brings a value into the form the driver accepts for `which`.
fn coerce(which: GspcaParam, value: i32) -> GspcaParams {
    let mut params = GspcaParams::default();
    match which {
        GspcaParam::AutoBrightness => params.auto_brightness = (value != 0) as u8,
        GspcaParam::Quality => {
            params.quality = if (0..=16).contains(&value) { value as u8 } else { 16 }
        }
        GspcaParam::FrameInterval => {
            params.frame_interval = if (0..=1000).contains(&value) { value as u16 } else { 0 }
        }
        GspcaParam::LightFrequency => {
            params.light_frequency = match value {
                60 => 60,
                50 => 50,
                _ => 0,
            }
        }
    }
    params
}

impl Probe for GspcaProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Gspca
    }

    fn list(&mut self, _adapter: &mut dyn ProtocolAdapter) -> Vec<ControlDescriptor> {
        PARAMS
            .iter()
            .enumerate()
            .map(|(local, (_, name, max))| {
                ControlDescriptor::probed(
                    ProbeKind::Gspca,
                    local,
                    name,
                    ControlKind::Integer,
                    0,
                    *max,
                    0,
                )
            })
            .collect()
    }

    fn get(&mut self, adapter: &mut dyn ProtocolAdapter, local: usize) -> io::Result<ControlValue> {
        let (which, _, _) = PARAMS
            .get(local)
            .ok_or_else(|| unknown_control(ProbeKind::Gspca, local))?;
        let params = adapter.gspca_params()?;
        let value = match which {
            GspcaParam::AutoBrightness => params.auto_brightness as i32,
            GspcaParam::Quality => params.quality as i32,
            GspcaParam::FrameInterval => params.frame_interval as i32,
            GspcaParam::LightFrequency => params.light_frequency as i32,
        };
        Ok(ControlValue::Integer(value))
    }

    fn set(
        &mut self,
        adapter: &mut dyn ProtocolAdapter,
        local: usize,
        value: &ControlValue,
    ) -> io::Result<()> {
        let (which, _, _) = PARAMS
            .get(local)
            .ok_or_else(|| unknown_control(ProbeKind::Gspca, local))?;
        adapter.gspca_set_param(*which, &coerce(*which, integer(value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedDevice;

    #[test]
    fn test_detect_restores_light_frequency() {
        let mut sim = SimulatedDevice::new().with_gspca(GspcaParams {
            light_frequency: 50,
            quality: 3,
            ..Default::default()
        });
        let mut probe = detect(&mut sim).expect("gspca detected");
        assert_eq!(sim.gspca_state().map(|p| p.light_frequency), Some(50));
        assert_eq!(probe.list(&mut sim).len(), 4);
    }

    #[test]
    fn test_not_detected_without_driver() {
        let mut sim = SimulatedDevice::new();
        assert!(detect(&mut sim).is_none());
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(GspcaParam::AutoBrightness, 7).auto_brightness, 1);
        assert_eq!(coerce(GspcaParam::Quality, -1).quality, 16);
        assert_eq!(coerce(GspcaParam::Quality, 4).quality, 4);
        assert_eq!(coerce(GspcaParam::FrameInterval, 1001).frame_interval, 0);
        assert_eq!(coerce(GspcaParam::LightFrequency, 55).light_frequency, 0);
        assert_eq!(coerce(GspcaParam::LightFrequency, 50).light_frequency, 50);
    }
}
