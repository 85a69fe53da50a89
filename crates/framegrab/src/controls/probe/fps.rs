// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Frame rate as an integer control, for V2 devices with adjustable frame
//! intervals. Opt-in via [`ControlRegistry::build_with`].
//!
//! [`ControlRegistry::build_with`]: crate::controls::ControlRegistry::build_with

use std::io;

use super::{integer, unknown_control, Probe, ProbeKind};
use crate::{
    adapter::{ProtocolAdapter, ProtocolVersion},
    controls::{ControlDescriptor, ControlKind, ControlValue},
    format::FrameInterval,
};

const MAX_FPS: i32 = 255;

#[derive(Debug)]
pub(super) struct FrameRateProbe;

pub(super) fn detect(adapter: &mut dyn ProtocolAdapter) -> Option<FrameRateProbe> {
    if adapter.version() != ProtocolVersion::V2 || !adapter.supports_frame_interval() {
        return None;
    }
    Some(FrameRateProbe)
}

impl Probe for FrameRateProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::FrameRate
    }

    fn list(&mut self, adapter: &mut dyn ProtocolAdapter) -> Vec<ControlDescriptor> {
        let current = match adapter.frame_interval() {
            Ok(interval) => interval.fps() as i32,
            Err(err) => {
                log::warn!("cannot read frame interval: {}", err);
                0
            }
        };
        vec![ControlDescriptor::probed(
            ProbeKind::FrameRate,
            0,
            "Frame rate",
            ControlKind::Integer,
            1,
            MAX_FPS,
            current.clamp(1, MAX_FPS),
        )]
    }

    fn get(&mut self, adapter: &mut dyn ProtocolAdapter, local: usize) -> io::Result<ControlValue> {
        if local != 0 {
            return Err(unknown_control(ProbeKind::FrameRate, local));
        }
        // A zero numerator reads as 0 fps
        let interval = adapter.frame_interval()?;
        Ok(ControlValue::Integer(interval.fps() as i32))
    }

    fn set(
        &mut self,
        adapter: &mut dyn ProtocolAdapter,
        local: usize,
        value: &ControlValue,
    ) -> io::Result<()> {
        if local != 0 {
            return Err(unknown_control(ProbeKind::FrameRate, local));
        }
        let fps = integer(value)?.max(1) as u32;
        let granted = adapter.set_frame_interval(FrameInterval::new(1, fps))?;
        log::debug!("frame rate {} granted as {}", fps, granted);
        Ok(())
    }
}
