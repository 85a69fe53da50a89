// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Vendor probe plugins.
//!
//! Some drivers expose settings only through private ioctls. Each plugin
//! recognises one driver family, reports its extra settings as controls and
//! dispatches reads and writes of them. Detection failing is not an error:
//! the plugin simply contributes no controls.
//!
//! | Plugin | Driver | Controls |
//! |--------|--------|----------|
//! | [`ProbeKind::Pwc`] | Philips webcams | pan/tilt reset, pan, tilt |
//! | [`ProbeKind::Gspca`] | spca5xx / gspca | auto-brightness, quality, frame interval, light frequency |
//! | [`ProbeKind::Qc`] | Logitech QuickCam | settle, compression, interpolation, auto-brightness, equalize |
//! | [`ProbeKind::FrameRate`] | any V2 device with `TIMEPERFRAME` | frame rate |

use std::{fmt, io, str::FromStr};

use super::{ControlDescriptor, ControlValue};
use crate::adapter::ProtocolAdapter;

mod fps;
mod gspca;
mod pwc;
mod qc;

/// A detected plugin and its private state.
pub trait Probe: Send {
    fn kind(&self) -> ProbeKind;

    /// The plugin's controls; position in the list is the local index.
    fn list(&mut self, adapter: &mut dyn ProtocolAdapter) -> Vec<ControlDescriptor>;

    fn get(&mut self, adapter: &mut dyn ProtocolAdapter, local: usize) -> io::Result<ControlValue>;

    fn set(
        &mut self,
        adapter: &mut dyn ProtocolAdapter,
        local: usize,
        value: &ControlValue,
    ) -> io::Result<()>;
}

/// The closed set of probe plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Pwc,
    Gspca,
    Qc,
    FrameRate,
}

impl ProbeKind {
    /// Plugins run by [`ControlRegistry::build`](super::ControlRegistry::build).
    pub const DEFAULT: [ProbeKind; 3] = [ProbeKind::Pwc, ProbeKind::Gspca, ProbeKind::Qc];

    pub const ALL: [ProbeKind; 4] = [
        ProbeKind::Pwc,
        ProbeKind::Gspca,
        ProbeKind::Qc,
        ProbeKind::FrameRate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProbeKind::Pwc => "pwc",
            ProbeKind::Gspca => "gspca",
            ProbeKind::Qc => "qc",
            ProbeKind::FrameRate => "frame-rate",
        }
    }

    /// Runs the plugin's detection against the device.
    pub fn detect(&self, adapter: &mut dyn ProtocolAdapter) -> Option<Box<dyn Probe>> {
        match self {
            ProbeKind::Pwc => pwc::detect(adapter).map(|p| Box::new(p) as Box<dyn Probe>),
            ProbeKind::Gspca => gspca::detect(adapter).map(|p| Box::new(p) as Box<dyn Probe>),
            ProbeKind::Qc => qc::detect(adapter).map(|p| Box::new(p) as Box<dyn Probe>),
            ProbeKind::FrameRate => fps::detect(adapter).map(|p| Box::new(p) as Box<dyn Probe>),
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProbeKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown probe plugin: {}", s))
    }
}

/// Extracts the integer every plugin control takes.
fn integer(value: &ControlValue) -> io::Result<i32> {
    match value {
        ControlValue::Integer(v) => Ok(*v),
        _ => Err(io::Error::from_raw_os_error(libc::EINVAL)),
    }
}

fn unknown_control(kind: ProbeKind, local: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} has no control {}", kind, local),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for kind in ProbeKind::ALL {
            assert_eq!(kind.name().parse::<ProbeKind>().unwrap(), kind);
        }
        assert!("uvc".parse::<ProbeKind>().is_err());
        assert!(!ProbeKind::DEFAULT.contains(&ProbeKind::FrameRate));
    }
}
