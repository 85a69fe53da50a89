// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Control listing and access.
//!
//! Controls are addressed by registry index or by name (case-insensitive).
//! Menu controls also accept an item name as the value.

use crate::error::CliError;
use crate::utils;
use clap::{Args as ClapArgs, Subcommand};
use framegrab::{
    capture::CaptureDevice,
    controls::{ControlDescriptor, ControlKind, ControlSource, ControlValue, ProbeKind},
};
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Capture device path
    #[arg(short, long, default_value = "/dev/video0")]
    device: String,

    /// Probe plugins to run, comma-separated (pwc, gspca, qc, frame-rate)
    #[arg(long, default_value = "pwc,gspca,qc")]
    plugins: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// List every control with its range and current value
    List,

    /// Read one control
    Get {
        /// Control index or name
        control: String,
    },

    /// Write one control; the value is clamped into range
    Set {
        /// Control index or name
        control: String,

        /// New value (number, string, or menu item name)
        value: String,
    },
}

#[derive(Debug, Serialize)]
struct ControlEntry {
    index: usize,
    name: String,
    kind: &'static str,
    source: String,
    minimum: i32,
    maximum: i32,
    step: i32,
    default: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    menu: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing controls command: {:?}", args);

    let plugins = utils::parse_plugins(&args.plugins)?;
    let mut dev = utils::open_device(&args.device)?;
    let count = dev.build_controls_with(&plugins)?;
    log::debug!("{} controls", count);

    let result = run(&mut dev, &args.action, json);
    dev.release_controls()?;
    dev.close()?;
    result
}

fn run(dev: &mut CaptureDevice, action: &Action, json: bool) -> Result<(), CliError> {
    match action {
        Action::List => {
            let entries = list(dev);
            if json {
                print_json(&entries)?;
            } else {
                for entry in &entries {
                    print_entry(entry);
                }
            }
        }
        Action::Get { control } => {
            let index = resolve(dev, control)?;
            let entry = entry(dev, index);
            if json {
                print_json(&entry)?;
            } else {
                println!("{}", entry.value.as_deref().unwrap_or("-"));
            }
        }
        Action::Set { control, value } => {
            let index = resolve(dev, control)?;
            let value = parse_value(&dev.controls()[index], value)?;
            let sent = dev.set_control(index, value)?;
            log::info!("{} set to {}", dev.controls()[index].name, sent);
            if json {
                print_json(&entry(dev, index))?;
            }
        }
    }
    Ok(())
}

fn list(dev: &mut CaptureDevice) -> Vec<ControlEntry> {
    (0..dev.controls().len()).map(|i| entry(dev, i)).collect()
}

/// Describes control `index` and reads its current value.
fn entry(dev: &mut CaptureDevice, index: usize) -> ControlEntry {
    let control = dev.controls()[index].clone();
    let value = if control.is_write_only() || control.kind == ControlKind::Button {
        None
    } else {
        match dev.get_control(index) {
            Ok(value) => Some(display_value(&control, &value)),
            Err(err) => {
                log::warn!("Cannot read {}: {}", control.name, err);
                None
            }
        }
    };

    ControlEntry {
        index,
        source: match control.source {
            ControlSource::Standard => format!("{:#010x}", control.id),
            ControlSource::Probed { plugin, .. } => plugin.to_string(),
        },
        kind: control.kind.name(),
        minimum: control.minimum,
        maximum: control.maximum,
        step: control.step,
        default: control.default,
        menu: control
            .menu
            .iter()
            .map(|m| format!("{}: {}", m.value, m.name))
            .collect(),
        name: control.name,
        value,
    }
}

/// Finds a control by index or by name.
fn resolve(dev: &CaptureDevice, key: &str) -> Result<usize, CliError> {
    let controls = dev.controls();
    if let Ok(index) = key.parse::<usize>() {
        if index < controls.len() {
            return Ok(index);
        }
    }
    controls
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| CliError::InvalidArgs(format!("no control called '{}'", key)))
}

/// Parses `s` as a value for `control`.
fn parse_value(control: &ControlDescriptor, s: &str) -> Result<ControlValue, CliError> {
    let invalid = || {
        CliError::InvalidArgs(format!(
            "'{}' is not a valid {} value for {}",
            s,
            control.kind.name(),
            control.name
        ))
    };

    match control.kind {
        ControlKind::String => Ok(ControlValue::String(s.to_string())),
        ControlKind::Integer64 => s.parse().map(ControlValue::Integer64).map_err(|_| invalid()),
        ControlKind::Boolean => match s.to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" => Ok(ControlValue::Integer(1)),
            "off" | "false" | "no" => Ok(ControlValue::Integer(0)),
            _ => s.parse().map(ControlValue::Integer).map_err(|_| invalid()),
        },
        ControlKind::Menu | ControlKind::IntegerMenu => match s.parse() {
            Ok(v) => Ok(ControlValue::Integer(v)),
            Err(_) => control
                .menu
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(s))
                .map(|m| ControlValue::Integer(m.value))
                .ok_or_else(invalid),
        },
        ControlKind::Bitmask => parse_bitmask(s).map(ControlValue::Integer).ok_or_else(invalid),
        ControlKind::Integer | ControlKind::Button => {
            s.parse().map(ControlValue::Integer).map_err(|_| invalid())
        }
    }
}

fn parse_bitmask(s: &str) -> Option<i32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok().map(|v| v as i32),
        None => s.parse().ok(),
    }
}

fn display_value(control: &ControlDescriptor, value: &ControlValue) -> String {
    match value {
        ControlValue::Integer(v) if control.kind.is_menu() => control
            .menu
            .iter()
            .find(|m| m.value == *v)
            .map(|m| format!("{} ({})", v, m.name))
            .unwrap_or_else(|| v.to_string()),
        ControlValue::Integer(v) if control.kind == ControlKind::Bitmask => format!("{:#x}", v),
        ControlValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_entry(entry: &ControlEntry) {
    let range = match entry.kind {
        "button" => String::new(),
        _ => format!(
            " {}..{} step {} default {}",
            entry.minimum, entry.maximum, entry.step, entry.default
        ),
    };
    println!(
        "{:3} {:<28} {:<10} [{}]{}{}",
        entry.index,
        entry.name,
        entry.kind,
        entry.source,
        range,
        entry
            .value
            .as_ref()
            .map(|v| format!(" = {}", v))
            .unwrap_or_default()
    );
    for item in &entry.menu {
        println!("      {}", item);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
    println!("{}", json_str);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegrab::{
        adapter::{vendor::GspcaParams, RawControl},
        sim::SimulatedDevice,
    };

    const BASE: u32 = 0x0098_0900;

    fn raw(id: u32, name: &str, kind: ControlKind, minimum: i32, maximum: i32) -> RawControl {
        RawControl {
            id,
            name: name.to_string(),
            kind: Some(kind),
            minimum,
            maximum,
            step: 1,
            default: minimum,
            flags: 0,
        }
    }

    fn device() -> (SimulatedDevice, CaptureDevice) {
        let sim = SimulatedDevice::new()
            .with_control(raw(BASE, "Brightness", ControlKind::Integer, 0, 255))
            .with_control(raw(BASE + 12, "White Balance Auto", ControlKind::Boolean, 0, 1))
            .with_control(raw(BASE + 24, "Power Line Frequency", ControlKind::Menu, 0, 2))
            .with_gspca(GspcaParams::default());
        let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
        dev.build_controls_with(&[ProbeKind::Gspca]).unwrap();
        (sim, dev)
    }

    #[test]
    fn test_resolve_by_index_and_name() {
        let (_, dev) = device();
        assert_eq!(resolve(&dev, "0").unwrap(), 0);
        assert_eq!(resolve(&dev, "power line frequency").unwrap(), 2);
        assert_eq!(resolve(&dev, "Quality").unwrap(), 4);
        assert!(matches!(
            resolve(&dev, "zoom"),
            Err(CliError::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_parse_values() {
        let (_, dev) = device();
        let controls = dev.controls();
        assert_eq!(
            parse_value(&controls[0], "128").unwrap(),
            ControlValue::Integer(128)
        );
        assert_eq!(
            parse_value(&controls[1], "on").unwrap(),
            ControlValue::Integer(1)
        );
        assert_eq!(
            parse_value(&controls[2], "50 hz").unwrap(),
            ControlValue::Integer(1)
        );
        assert!(parse_value(&controls[0], "bright").is_err());
        assert_eq!(parse_bitmask("0x81"), Some(0x81));
        assert_eq!(parse_bitmask("12"), Some(12));
    }

    #[test]
    fn test_set_and_list() {
        let (sim, mut dev) = device();
        run(
            &mut dev,
            &Action::Set {
                control: "Brightness".to_string(),
                value: "300".to_string(),
            },
            false,
        )
        .unwrap();
        assert_eq!(sim.last_control(BASE), Some(ControlValue::Integer(255)));

        let entries = list(&mut dev);
        assert_eq!(entries.len(), 7);
        assert_eq!(entries[0].value.as_deref(), Some("255"));
        assert_eq!(entries[2].value.as_deref(), Some("0 (Disabled)"));
        assert_eq!(entries[3].source, "gspca");
    }
}
