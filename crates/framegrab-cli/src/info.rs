// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use crate::utils;
use clap::Args as ClapArgs;
use framegrab::{adapter::DeviceInfo, Error};
use serde::Serialize;

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Capture device path
    #[arg(short, long, default_value = "/dev/video0")]
    device: String,
}

#[derive(Debug, Serialize)]
struct Info {
    device: String,
    name: String,
    driver: String,
    bus: String,
    version: String,
    capabilities: String,
    inputs: Vec<Input>,
    palettes: Vec<String>,
    min_resolution: String,
    max_resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame_interval: Option<String>,
}

#[derive(Debug, Serialize)]
struct Input {
    index: u32,
    name: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tuner: Option<u32>,
    standards: Vec<String>,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing info command: {:?}", args);

    let mut dev = utils::open_device(&args.device)?;
    let frame_interval = match dev.frame_interval() {
        Ok(interval) => Some(interval.to_string()),
        Err(Error::Unsupported(_)) => None,
        Err(err) => {
            log::warn!("Cannot read frame interval: {}", err);
            None
        }
    };
    let info = dev
        .info()
        .map(|info| describe(&args.device, info, frame_interval))
        .ok_or_else(|| CliError::General("no device information".to_string()))?;

    if json {
        let json_str = serde_json::to_string_pretty(&info)
            .map_err(|e| CliError::General(format!("Failed to serialize JSON: {}", e)))?;
        println!("{}", json_str);
    } else {
        print_text_info(&info);
    }

    dev.close()?;
    Ok(())
}

fn describe(device: &str, info: &DeviceInfo, frame_interval: Option<String>) -> Info {
    Info {
        device: device.to_string(),
        name: info.name.clone(),
        driver: info.driver.clone(),
        bus: info.bus_info.clone(),
        version: info.version.to_string(),
        capabilities: format!("{:#010x}", info.capabilities),
        inputs: info
            .inputs
            .iter()
            .map(|input| Input {
                index: input.index,
                name: input.name.clone(),
                kind: input.kind.to_string(),
                tuner: input.tuner,
                standards: input.standards.iter().map(|s| s.to_string()).collect(),
            })
            .collect(),
        palettes: info.palettes.iter().map(|p| p.to_string()).collect(),
        min_resolution: info.min_resolution.to_string(),
        max_resolution: info.max_resolution.to_string(),
        frame_interval,
    }
}

fn print_text_info(info: &Info) {
    println!("{}: {}", info.device, info.name);
    println!("  Driver:       {}", info.driver);
    println!("  Bus:          {}", info.bus);
    println!("  Protocol:     {}", info.version);
    println!("  Capabilities: {}", info.capabilities);
    println!(
        "  Resolution:   {} to {}",
        info.min_resolution, info.max_resolution
    );
    if let Some(interval) = &info.frame_interval {
        println!("  Interval:     {}", interval);
    }
    println!("  Palettes:     {}", info.palettes.join(", "));

    println!("\nInputs ({}):", info.inputs.len());
    for input in &info.inputs {
        let tuner = input
            .tuner
            .map(|t| format!(", tuner {}", t))
            .unwrap_or_default();
        println!(
            "  {}: {} ({}{}) - {}",
            input.index,
            input.name,
            input.kind,
            tuner,
            input.standards.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegrab::{
        adapter::TunerSignal,
        capture::CaptureDevice,
        format::{Standard, StandardSupport},
        sim::SimulatedDevice,
    };

    #[test]
    fn test_describe_simulated_device() {
        let sim = SimulatedDevice::new()
            .with_standards(StandardSupport::Broadcast, &[Standard::Pal])
            .with_tuner(0, TunerSignal { signal: 0, afc: None });
        let dev = CaptureDevice::with_adapter(Box::new(sim));
        let info = describe("sim", dev.info().unwrap(), None);

        assert_eq!(info.name, "Simulated Camera");
        assert_eq!(info.version, "V4L2");
        assert_eq!(info.inputs.len(), 2);
        assert_eq!(info.inputs[1].kind, "tuner");
        assert_eq!(info.inputs[1].tuner, Some(0));
        assert_eq!(info.max_resolution, "1920x1080");

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("frame_interval").is_none());
        assert_eq!(json["inputs"][0]["standards"][0], "webcam");
    }
}
