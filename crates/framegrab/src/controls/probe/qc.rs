// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Logitech QuickCam private settings.
//!
//! The driver is recognised by a user lookup table round trip. The default
//! table is written back on every path once it has been read.

use std::io;

use super::{integer, unknown_control, Probe, ProbeKind};
use crate::{
    adapter::{
        vendor::{QcLut, QcSetting},
        ProtocolAdapter,
    },
    controls::{ControlDescriptor, ControlKind, ControlValue},
};

const SETTINGS: [(QcSetting, &str, i32); 5] = [
    (QcSetting::Settle, "Brightness Settle", 1),
    (QcSetting::Compression, "Compression", 1),
    (QcSetting::Interpolation, "Interpolation", 5),
    (QcSetting::AutoBrightness, "Auto Brightness", 1),
    (QcSetting::Equalize, "Equalize image", 1),
];

#[derive(Debug)]
pub(super) struct QcProbe;

pub(super) fn detect(adapter: &mut dyn ProtocolAdapter) -> Option<QcProbe> {
    let default = adapter.qc_lut().ok()?;

    let test = QcLut::from_fn(|i| (i % 3) as u8);
    let found = match adapter
        .qc_set_lut(&test)
        .and_then(|_| adapter.qc_lut())
    {
        Ok(read) => read == test,
        Err(err) => {
            log::trace!("qc lookup table round trip: {}", err);
            false
        }
    };

    if let Err(err) = adapter.qc_set_lut(&default) {
        log::warn!("cannot restore quickcam lookup table: {}", err);
    }

    found.then_some(QcProbe)
}

impl Probe for QcProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Qc
    }

    fn list(&mut self, _adapter: &mut dyn ProtocolAdapter) -> Vec<ControlDescriptor> {
        SETTINGS
            .iter()
            .enumerate()
            .map(|(local, (_, name, max))| {
                ControlDescriptor::probed(ProbeKind::Qc, local, name, ControlKind::Integer, 0, *max, 0)
            })
            .collect()
    }

    fn get(&mut self, adapter: &mut dyn ProtocolAdapter, local: usize) -> io::Result<ControlValue> {
        let (setting, _, _) = SETTINGS
            .get(local)
            .ok_or_else(|| unknown_control(ProbeKind::Qc, local))?;
        adapter.qc_get(*setting).map(ControlValue::Integer)
    }

    fn set(
        &mut self,
        adapter: &mut dyn ProtocolAdapter,
        local: usize,
        value: &ControlValue,
    ) -> io::Result<()> {
        let (setting, _, _) = SETTINGS
            .get(local)
            .ok_or_else(|| unknown_control(ProbeKind::Qc, local))?;
        let previous = adapter.qc_get(*setting).ok();
        match adapter.qc_set(*setting, integer(value)?) {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(previous) = previous {
                    if let Err(restore) = adapter.qc_set(*setting, previous) {
                        log::warn!("cannot restore qc setting {:?}: {}", setting, restore);
                    }
                }
                Err(err)
            }
        }
    }
}
