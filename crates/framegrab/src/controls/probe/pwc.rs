// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Philips webcam (pwc) pan/tilt motors.
//!
//! Detection resets both motors to their home position.

use std::io;

use super::{integer, unknown_control, Probe, ProbeKind};
use crate::{
    adapter::ProtocolAdapter,
    controls::{ControlDescriptor, ControlKind, ControlValue},
};

const RESET: usize = 0;
const PAN: usize = 1;
const TILT: usize = 2;

#[derive(Debug)]
pub(super) struct PwcProbe {
    ptz: bool,
}

pub(super) fn detect(adapter: &mut dyn ProtocolAdapter) -> Option<PwcProbe> {
    let name = match adapter.pwc_probe() {
        Ok(name) => name,
        Err(err) => {
            log::trace!("pwc probe ioctl: {}", err);
            return None;
        }
    };
    if name != adapter.info().name {
        log::debug!(
            "pwc probe answered {:?} for card {:?}",
            name,
            adapter.info().name
        );
        return None;
    }

    let ptz = adapter.pwc_reset_pan_tilt().is_ok();
    log::debug!("pwc driver found, pan/tilt {}", if ptz { "present" } else { "absent" });
    Some(PwcProbe { ptz })
}

impl Probe for PwcProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Pwc
    }

    fn list(&mut self, adapter: &mut dyn ProtocolAdapter) -> Vec<ControlDescriptor> {
        if !self.ptz {
            return Vec::new();
        }

        let mut controls = vec![ControlDescriptor::probed(
            ProbeKind::Pwc,
            RESET,
            "Pan/Tilt reset",
            ControlKind::Button,
            0,
            0,
            0,
        )];
        match adapter.pwc_pan_tilt_range() {
            Ok(range) => {
                controls.push(ControlDescriptor::probed(
                    ProbeKind::Pwc,
                    PAN,
                    "Pan",
                    ControlKind::Integer,
                    range.pan_min,
                    range.pan_max,
                    0,
                ));
                controls.push(ControlDescriptor::probed(
                    ProbeKind::Pwc,
                    TILT,
                    "Tilt",
                    ControlKind::Integer,
                    range.tilt_min,
                    range.tilt_max,
                    0,
                ));
            }
            Err(err) => log::warn!("pwc pan/tilt range: {}", err),
        }
        controls
    }

    fn get(&mut self, adapter: &mut dyn ProtocolAdapter, local: usize) -> io::Result<ControlValue> {
        match local {
            RESET => Ok(ControlValue::Integer(0)),
            PAN => Ok(ControlValue::Integer(adapter.pwc_angles()?.0)),
            TILT => Ok(ControlValue::Integer(adapter.pwc_angles()?.1)),
            _ => Err(unknown_control(ProbeKind::Pwc, local)),
        }
    }

    fn set(
        &mut self,
        adapter: &mut dyn ProtocolAdapter,
        local: usize,
        value: &ControlValue,
    ) -> io::Result<()> {
        let value = integer(value)?;
        match local {
            RESET => adapter.pwc_reset_pan_tilt(),
            PAN | TILT => {
                let (pan, tilt) = adapter.pwc_angles()?;
                if local == PAN {
                    adapter.pwc_set_angles(value, tilt)
                } else {
                    adapter.pwc_set_angles(pan, value)
                }
            }
            _ => Err(unknown_control(ProbeKind::Pwc, local)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{PwcPersonality, SimulatedDevice};

    #[test]
    fn test_detect_requires_matching_name() {
        let mut sim = SimulatedDevice::new().with_pwc(PwcPersonality {
            name: "Philips 740 webcam".into(),
            ptz: true,
        });
        assert!(detect(&mut sim).is_none());
    }

    #[test]
    fn test_ptz_controls() -> io::Result<()> {
        let mut sim = SimulatedDevice::new().with_name("Philips 740 webcam").with_pwc(
            PwcPersonality {
                name: "Philips 740 webcam".into(),
                ptz: true,
            },
        );
        let mut probe = detect(&mut sim).expect("pwc detected");
        let controls = probe.list(&mut sim);
        let names: Vec<_> = controls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Pan/Tilt reset", "Pan", "Tilt"]);
        assert_eq!(controls[0].kind, ControlKind::Button);

        probe.set(&mut sim, TILT, &ControlValue::Integer(300))?;
        assert_eq!(probe.get(&mut sim, TILT)?, ControlValue::Integer(300));
        assert_eq!(probe.get(&mut sim, PAN)?, ControlValue::Integer(0));
        Ok(())
    }

    #[test]
    fn test_without_ptz() {
        let mut sim = SimulatedDevice::new().with_name("Philips 680").with_pwc(PwcPersonality {
            name: "Philips 680".into(),
            ptz: false,
        });
        let mut probe = detect(&mut sim).expect("pwc detected");
        assert!(probe.list(&mut sim).is_empty());
    }
}
