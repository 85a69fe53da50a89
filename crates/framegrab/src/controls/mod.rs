// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Device controls
//!
//! The [`ControlRegistry`] presents the controls a device reports through its
//! protocol (standard controls) and the controls contributed by vendor probe
//! plugins (probed controls) as one indexed list. A control's position in
//! [`ControlRegistry::list`] is its stable index for the life of the registry.
//!
//! Standard controls come first, in ascending id order, followed by the
//! controls of every detected plugin in [`ProbeKind::DEFAULT`] order.
//!
//! ```no_run
//! # use framegrab::{capture::CaptureDevice, controls::ControlValue, Error};
//! # fn main() -> Result<(), Error> {
//! let mut dev = CaptureDevice::open("/dev/video0")?;
//! dev.detect_version()?;
//! dev.build_controls()?;
//! let index = dev.controls().iter().position(|c| c.name == "Brightness");
//! if let Some(index) = index {
//!     let sent = dev.set_control(index, ControlValue::Integer(1_000_000))?;
//!     println!("brightness clamped to {}", sent);
//! }
//! dev.release_controls()?;
//! dev.close()?;
//! # Ok(())
//! # }
//! ```

use std::{collections::HashSet, fmt, io};

use framegrab_sys::v4l2;

use crate::{
    adapter::{ProtocolAdapter, RawControl},
    Error,
};

pub mod probe;

pub use probe::{Probe, ProbeKind};

/// The value type of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Integer,
    Boolean,
    Menu,
    Button,
    Integer64,
    String,
    Bitmask,
    IntegerMenu,
}

impl ControlKind {
    pub fn name(&self) -> &'static str {
        match self {
            ControlKind::Integer => "integer",
            ControlKind::Boolean => "boolean",
            ControlKind::Menu => "menu",
            ControlKind::Button => "button",
            ControlKind::Integer64 => "integer64",
            ControlKind::String => "string",
            ControlKind::Bitmask => "bitmask",
            ControlKind::IntegerMenu => "integer-menu",
        }
    }

    /// True for kinds whose value fits the 32-bit control ioctls.
    pub fn is_32bit(&self) -> bool {
        !matches!(self, ControlKind::Integer64 | ControlKind::String)
    }

    pub fn is_menu(&self) -> bool {
        matches!(self, ControlKind::Menu | ControlKind::IntegerMenu)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A control value, typed by [`ControlKind`].
///
/// Every 32-bit kind (including booleans, menus and buttons) uses
/// [`ControlValue::Integer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Integer(i32),
    Integer64(i64),
    String(String),
}

impl ControlValue {
    /// The numeric value, or `None` for strings.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ControlValue::Integer(v) => Some(*v as i64),
            ControlValue::Integer64(v) => Some(*v),
            ControlValue::String(_) => None,
        }
    }

    fn matches(&self, kind: ControlKind) -> bool {
        match self {
            ControlValue::Integer(_) => kind.is_32bit(),
            ControlValue::Integer64(_) => kind == ControlKind::Integer64,
            ControlValue::String(_) => kind == ControlKind::String,
        }
    }
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Integer(v) => write!(f, "{}", v),
            ControlValue::Integer64(v) => write!(f, "{}", v),
            ControlValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Where reads and writes of a control are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSource {
    /// Dispatched to the device by control id
    Standard,
    /// Dispatched to a probe plugin with its plugin-local index
    Probed { plugin: ProbeKind, local: usize },
}

/// One selectable item of a menu control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    /// The control value selecting this item
    pub value: i32,
    pub name: String,
}

/// Description of one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlDescriptor {
    pub id: u32,
    pub name: String,
    pub kind: ControlKind,
    pub minimum: i32,
    pub maximum: i32,
    pub step: i32,
    pub default: i32,
    pub flags: u32,
    /// Items of menu controls, empty otherwise
    pub menu: Vec<MenuEntry>,
    pub source: ControlSource,
}

impl ControlDescriptor {
    /// Builds a descriptor for a plugin control.
    pub(crate) fn probed(
        plugin: ProbeKind,
        local: usize,
        name: &str,
        kind: ControlKind,
        minimum: i32,
        maximum: i32,
        default: i32,
    ) -> ControlDescriptor {
        ControlDescriptor {
            id: local as u32,
            name: name.to_string(),
            kind,
            minimum,
            maximum,
            step: if kind == ControlKind::Button { 0 } else { 1 },
            default,
            flags: 0,
            menu: Vec::new(),
            source: ControlSource::Probed { plugin, local },
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.flags & v4l2::V4L2_CTRL_FLAG_READ_ONLY != 0
    }

    pub fn is_write_only(&self) -> bool {
        self.flags & v4l2::V4L2_CTRL_FLAG_WRITE_ONLY != 0
    }

    /// Brings `value` into range; `None` when it cannot be.
    fn clamp(&self, value: ControlValue) -> Option<ControlValue> {
        if !value.matches(self.kind) {
            return None;
        }
        match value {
            // Masks span the full u32 range, so a maximum of 0xffffffff reads as -1
            ControlValue::Integer(v) if self.kind == ControlKind::Bitmask => Some(
                ControlValue::Integer((v as u32).min(self.maximum as u32) as i32),
            ),
            ControlValue::Integer(v) => Some(ControlValue::Integer(
                v.clamp(self.minimum, self.maximum.max(self.minimum)),
            )),
            // A 0..0 range means the driver did not report one
            ControlValue::Integer64(v) if self.minimum == 0 && self.maximum == 0 => {
                Some(ControlValue::Integer64(v))
            }
            ControlValue::Integer64(v) => Some(ControlValue::Integer64(
                v.clamp(self.minimum as i64, self.maximum.max(self.minimum) as i64),
            )),
            ControlValue::String(s) => {
                let len = s.len() as i64;
                (len >= self.minimum as i64 && len <= self.maximum as i64)
                    .then_some(ControlValue::String(s))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn test_integer(id: u32, minimum: i32, maximum: i32) -> ControlDescriptor {
        ControlDescriptor {
            id,
            name: format!("control {:#x}", id),
            kind: ControlKind::Integer,
            minimum,
            maximum,
            step: 1,
            default: minimum,
            flags: 0,
            menu: Vec::new(),
            source: ControlSource::Standard,
        }
    }
}

impl fmt::Display for ControlDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {}..{} step {} default {}",
            self.name, self.kind, self.minimum, self.maximum, self.step, self.default
        )
    }
}

/// The controls of one device.
///
/// Built once by [`ControlRegistry::build`]; the set does not change
/// afterwards. Plugin state lives until [`ControlRegistry::release`].
pub struct ControlRegistry {
    controls: Vec<ControlDescriptor>,
    probes: Vec<Box<dyn Probe>>,
}

impl ControlRegistry {
    /// Discovers the standard controls and runs the default probe plugins.
    pub fn build(adapter: &mut dyn ProtocolAdapter) -> Result<ControlRegistry, Error> {
        Self::build_with(adapter, &ProbeKind::DEFAULT)
    }

    /// Discovers the standard controls and runs the given probe plugins in
    /// order.
    pub fn build_with(
        adapter: &mut dyn ProtocolAdapter,
        plugins: &[ProbeKind],
    ) -> Result<ControlRegistry, Error> {
        let raw = adapter.query_controls().map_err(Error::ControlIoError)?;

        let mut seen = HashSet::new();
        let mut standard: Vec<RawControl> = raw
            .into_iter()
            .filter(|c| c.kind.is_some() && c.flags & v4l2::V4L2_CTRL_FLAG_DISABLED == 0)
            .filter(|c| seen.insert(c.id))
            .collect();
        standard.sort_by_key(|c| c.id);

        let mut controls = Vec::with_capacity(standard.len());
        for raw in &standard {
            if let Some(control) = standard_control(adapter, raw) {
                log::trace!("control {:#010x}: {}", control.id, control);
                controls.push(control);
            }
        }
        log::debug!("{} standard controls", controls.len());

        let mut probes = Vec::new();
        for kind in plugins {
            match kind.detect(adapter) {
                Some(mut probe) => {
                    let found = probe.list(adapter);
                    log::debug!("{} probe detected, {} controls", kind, found.len());
                    controls.extend(found);
                    probes.push(probe);
                }
                None => log::debug!("{} probe not detected", kind),
            }
        }

        Ok(ControlRegistry { controls, probes })
    }

    pub fn list(&self) -> &[ControlDescriptor] {
        &self.controls
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Index of the first control called `name`, ignoring case.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.controls
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Probe plugins that were detected, in detection order.
    pub fn plugins(&self) -> impl Iterator<Item = ProbeKind> + '_ {
        self.probes.iter().map(|p| p.kind())
    }

    /// Reads control `index`.
    pub fn get(
        &mut self,
        adapter: &mut dyn ProtocolAdapter,
        index: usize,
    ) -> Result<ControlValue, Error> {
        let control = self
            .controls
            .get(index)
            .ok_or(Error::ControlOutOfRange(index))?;
        match control.source {
            ControlSource::Standard => adapter.get_control(control),
            ControlSource::Probed { plugin, local } => {
                let probe = Self::probe(&mut self.probes, plugin)?;
                probe.get(adapter, local)
            }
        }
        .map_err(Error::ControlIoError)
    }

    /// Writes control `index` and returns the value that was sent.
    ///
    /// Numeric values are clamped into the control's range first. Strings
    /// whose length is outside the range, and values of the wrong kind, are
    /// [`Error::ControlOutOfRange`]. After a successful write the value is
    /// read back; a mismatch is logged, not returned.
    pub fn set(
        &mut self,
        adapter: &mut dyn ProtocolAdapter,
        index: usize,
        value: ControlValue,
    ) -> Result<ControlValue, Error> {
        let control = self
            .controls
            .get(index)
            .ok_or(Error::ControlOutOfRange(index))?;
        let sent = control
            .clamp(value)
            .ok_or(Error::ControlOutOfRange(index))?;

        match control.source {
            ControlSource::Standard => adapter.set_control(control, &sent),
            ControlSource::Probed { plugin, local } => {
                let probe = Self::probe(&mut self.probes, plugin)?;
                probe.set(adapter, local, &sent)
            }
        }
        .map_err(Error::ControlIoError)?;

        if control.kind != ControlKind::Button && !control.is_write_only() {
            let name = control.name.clone();
            match self.get(adapter, index) {
                Ok(read) if read != sent => {
                    log::warn!("control {} set to {} but reads {}", name, sent, read)
                }
                Ok(_) => {}
                Err(err) => log::warn!("cannot read back control {}: {}", name, err),
            }
        }
        Ok(sent)
    }

    /// Frees every plugin's state.
    pub fn release(self) {
        log::debug!("releasing {} controls", self.controls.len());
        drop(self.probes);
    }

    fn probe(probes: &mut [Box<dyn Probe>], kind: ProbeKind) -> Result<&mut Box<dyn Probe>, Error> {
        probes
            .iter_mut()
            .find(|p| p.kind() == kind)
            .ok_or_else(|| Error::ControlIoError(io::Error::from_raw_os_error(libc::ENODEV)))
    }
}

impl fmt::Debug for ControlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlRegistry")
            .field("controls", &self.controls.len())
            .field("plugins", &self.plugins().collect::<Vec<_>>())
            .finish()
    }
}

/// Normalises a reported control and resolves its menu.
fn standard_control(adapter: &mut dyn ProtocolAdapter, raw: &RawControl) -> Option<ControlDescriptor> {
    let kind = raw.kind?;
    let mut control = ControlDescriptor {
        id: raw.id,
        name: raw.name.clone(),
        kind,
        minimum: raw.minimum,
        maximum: raw.maximum,
        step: raw.step,
        default: raw.default,
        flags: raw.flags,
        menu: Vec::new(),
        source: ControlSource::Standard,
    };

    match kind {
        ControlKind::Integer => {
            if control.step == 0 {
                control.step = 1;
            }
            if control.minimum > control.maximum {
                std::mem::swap(&mut control.minimum, &mut control.maximum);
            }
        }
        ControlKind::Menu | ControlKind::IntegerMenu => {
            if control.step == 0 {
                control.step = 1;
            }
        }
        ControlKind::Boolean => {
            control.minimum = 0;
            control.maximum = 1;
            control.step = 1;
        }
        ControlKind::Button => {
            control.minimum = 0;
            control.maximum = 0;
            control.step = 0;
        }
        ControlKind::Integer64 => {
            control.minimum = 0;
            control.maximum = 0;
            control.step = 1;
        }
        ControlKind::Bitmask => control.minimum = 0,
        ControlKind::String => {}
    }

    if kind.is_menu() {
        control.menu = menu_entries(adapter, raw, &control);
    }
    Some(control)
}

fn menu_entries(
    adapter: &mut dyn ProtocolAdapter,
    raw: &RawControl,
    control: &ControlDescriptor,
) -> Vec<MenuEntry> {
    let builtin: &[&str] = match control.id {
        v4l2::V4L2_CID_POWER_LINE_FREQUENCY => &["Disabled", "50 Hz", "60 Hz"],
        v4l2::V4L2_CID_EXPOSURE_AUTO => {
            &["Auto", "Manual", "Shutter priority", "Aperture priority"]
        }
        _ => &[],
    };
    if !builtin.is_empty() {
        return builtin
            .iter()
            .enumerate()
            .map(|(i, name)| MenuEntry {
                value: i as i32,
                name: name.to_string(),
            })
            .collect();
    }

    let step = control.step.max(1) as usize;
    let mut entries = Vec::new();
    for value in (control.minimum..=control.maximum).step_by(step) {
        // Drivers may leave holes in a menu
        if let Ok(name) = adapter.query_menu(raw, value as u32) {
            entries.push(MenuEntry { value, name });
        }
    }
    if entries.is_empty() {
        entries = (control.minimum..=control.maximum)
            .step_by(step)
            .map(|value| MenuEntry {
                value,
                name: value.to_string(),
            })
            .collect();
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedDevice;

    fn raw(id: u32, kind: ControlKind, minimum: i32, maximum: i32, step: i32) -> RawControl {
        RawControl {
            id,
            name: format!("ctrl{}", id),
            kind: Some(kind),
            minimum,
            maximum,
            step,
            default: 0,
            flags: 0,
        }
    }

    #[test]
    fn test_quirks_by_kind() {
        let mut sim = SimulatedDevice::new();
        let integer = standard_control(&mut sim, &raw(1, ControlKind::Integer, 10, -10, 0)).unwrap();
        assert_eq!((integer.minimum, integer.maximum, integer.step), (-10, 10, 1));

        let boolean = standard_control(&mut sim, &raw(2, ControlKind::Boolean, 5, 9, 3)).unwrap();
        assert_eq!((boolean.minimum, boolean.maximum, boolean.step), (0, 1, 1));

        let button = standard_control(&mut sim, &raw(3, ControlKind::Button, 1, 2, 3)).unwrap();
        assert_eq!((button.minimum, button.maximum, button.step), (0, 0, 0));

        let wide = standard_control(&mut sim, &raw(4, ControlKind::Integer64, -5, 5, 0)).unwrap();
        assert_eq!((wide.minimum, wide.maximum, wide.step), (0, 0, 1));

        let mask = standard_control(&mut sim, &raw(5, ControlKind::Bitmask, -1, 0xff, 0)).unwrap();
        assert_eq!(mask.minimum, 0);
    }

    #[test]
    fn test_builtin_menus() {
        let mut sim = SimulatedDevice::new();
        let plf = standard_control(
            &mut sim,
            &raw(v4l2::V4L2_CID_POWER_LINE_FREQUENCY, ControlKind::Menu, 0, 2, 1),
        )
        .unwrap();
        let names: Vec<_> = plf.menu.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Disabled", "50 Hz", "60 Hz"]);

        let exposure = standard_control(
            &mut sim,
            &raw(v4l2::V4L2_CID_EXPOSURE_AUTO, ControlKind::Menu, 0, 3, 1),
        )
        .unwrap();
        assert_eq!(exposure.menu[2].name, "Shutter priority");
    }

    #[test]
    fn test_menu_falls_back_to_numbers() {
        let mut sim = SimulatedDevice::new();
        let menu = standard_control(&mut sim, &raw(0x00980999, ControlKind::Menu, 1, 3, 0)).unwrap();
        let names: Vec<_> = menu.menu.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["1", "2", "3"]);
        assert_eq!(menu.step, 1);

        let stepped = standard_control(&mut sim, &raw(0x0098099a, ControlKind::Menu, 0, 4, 2)).unwrap();
        let values: Vec<_> = stepped.menu.iter().map(|e| e.value).collect();
        assert_eq!(values, [0, 2, 4]);
    }

    #[test]
    fn test_clamp() {
        let c = ControlDescriptor::test_integer(1, -5, 5);
        assert_eq!(c.clamp(ControlValue::Integer(9)), Some(ControlValue::Integer(5)));
        assert_eq!(c.clamp(ControlValue::Integer(-9)), Some(ControlValue::Integer(-5)));
        assert_eq!(c.clamp(ControlValue::Integer64(1)), None);

        let mut s = ControlDescriptor::test_integer(2, 0, 4);
        s.kind = ControlKind::String;
        assert!(s.clamp(ControlValue::String("abcd".into())).is_some());
        assert!(s.clamp(ControlValue::String("abcde".into())).is_none());

        let mut mask = ControlDescriptor::test_integer(4, 0, 0xffff_ffffu32 as i32);
        mask.kind = ControlKind::Bitmask;
        assert_eq!(mask.clamp(ControlValue::Integer(0x81)), Some(ControlValue::Integer(0x81)));
        assert_eq!(
            mask.clamp(ControlValue::Integer(0x8000_0001u32 as i32)),
            Some(ControlValue::Integer(0x8000_0001u32 as i32))
        );
        let mut narrow = ControlDescriptor::test_integer(5, 0, 0xff);
        narrow.kind = ControlKind::Bitmask;
        assert_eq!(narrow.clamp(ControlValue::Integer(-1)), Some(ControlValue::Integer(0xff)));

        let mut w = ControlDescriptor::test_integer(3, 0, 0);
        w.kind = ControlKind::Integer64;
        assert_eq!(
            w.clamp(ControlValue::Integer64(i64::MAX)),
            Some(ControlValue::Integer64(i64::MAX))
        );
    }
}
