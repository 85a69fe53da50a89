// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Video4Linux device enumeration with grouping by bus.

use crate::error::CliError;
use crate::utils;
use clap::Args as ClapArgs;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Directory to scan for videoN nodes
    #[arg(long, default_value = "/dev")]
    dir: PathBuf,

    /// Show all device nodes (disable grouping by hardware, include nodes
    /// that are not capture devices)
    #[arg(long)]
    all: bool,

    /// Show the palettes each device produces
    #[arg(long)]
    formats: bool,
}

#[derive(Debug, Serialize)]
struct DevicesOutput {
    devices: Vec<DeviceGroup>,
    summary: Summary,
}

#[derive(Debug, Serialize)]
struct DeviceGroup {
    name: String,
    driver: String,
    bus: String,
    version: String,
    nodes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    palettes: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct Unusable {
    path: String,
    reason: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_nodes: usize,
    capture_nodes: usize,
    hardware_units: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unusable: Vec<Unusable>,
}

/// One probed node.
struct Node {
    path: String,
    name: String,
    driver: String,
    bus: String,
    version: String,
    palettes: Vec<String>,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Executing devices command: {:?}", args);

    let paths = video_nodes(&args.dir)?;
    let mut nodes = Vec::new();
    let mut unusable = Vec::new();

    for path in &paths {
        let path_str = path.display().to_string();
        match probe(&path_str) {
            Ok(node) => nodes.push(node),
            Err(err) => {
                log::debug!("{}: {}", path_str, err);
                unusable.push(Unusable {
                    path: path_str,
                    reason: err.to_string(),
                });
            }
        }
    }

    let groups = if args.all {
        ungrouped(&nodes, args.formats)
    } else {
        group_by_bus(&nodes, args.formats)
    };

    let output = DevicesOutput {
        summary: Summary {
            total_nodes: paths.len(),
            capture_nodes: nodes.len(),
            hardware_units: group_by_bus(&nodes, false).len(),
            unusable: if args.all { unusable } else { Vec::new() },
        },
        devices: groups,
    };

    if json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::General(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json_str);
    } else {
        print_text_output(&output);
    }

    Ok(())
}

/// The videoN nodes of `dir`, in numeric order.
fn video_nodes(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CliError::DeviceNotFound(format!("{}: {}", dir.display(), e)))?;

    let mut nodes: Vec<(u32, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let index = video_index(&entry.file_name().to_string_lossy())?;
            Some((index, entry.path()))
        })
        .collect();
    nodes.sort_unstable_by_key(|(index, _)| *index);
    Ok(nodes.into_iter().map(|(_, path)| path).collect())
}

/// `Some(n)` for a file called `videoN`.
fn video_index(name: &str) -> Option<u32> {
    name.strip_prefix("video")?.parse().ok()
}

fn probe(path: &str) -> Result<Node, CliError> {
    let dev = utils::open_device(path)?;
    let info = dev
        .info()
        .ok_or_else(|| CliError::General(format!("{}: no device information", path)))?;

    Ok(Node {
        path: path.to_string(),
        name: info.name.clone(),
        driver: info.driver.clone(),
        bus: info.bus_info.clone(),
        version: info.version.to_string(),
        palettes: info.palettes.iter().map(|p| p.name().to_string()).collect(),
    })
}

/// Group nodes by bus to deduplicate the same hardware
fn group_by_bus(nodes: &[Node], formats: bool) -> Vec<DeviceGroup> {
    let mut groups: BTreeMap<&str, Vec<&Node>> = BTreeMap::new();
    for node in nodes {
        groups.entry(node.bus.as_str()).or_default().push(node);
    }

    let mut result: Vec<DeviceGroup> = groups
        .into_values()
        .filter_map(|members| {
            let first = members.first()?;
            let mut group = to_group(first, formats);
            group.nodes = members.iter().map(|n| n.path.clone()).collect();
            Some(group)
        })
        .collect();

    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

fn ungrouped(nodes: &[Node], formats: bool) -> Vec<DeviceGroup> {
    nodes.iter().map(|n| to_group(n, formats)).collect()
}

fn to_group(node: &Node, formats: bool) -> DeviceGroup {
    DeviceGroup {
        name: node.name.clone(),
        driver: node.driver.clone(),
        bus: node.bus.clone(),
        version: node.version.clone(),
        nodes: vec![node.path.clone()],
        palettes: formats.then(|| node.palettes.clone()),
    }
}

fn print_text_output(output: &DevicesOutput) {
    println!(
        "Video4Linux Devices ({} nodes, {} capture, {} hardware units)\n",
        output.summary.total_nodes, output.summary.capture_nodes, output.summary.hardware_units
    );

    for group in &output.devices {
        let paths: Vec<&str> = group.nodes.iter().map(String::as_str).collect();
        if paths.len() == 1 {
            println!("  {}: {}", paths[0], group.name);
        } else {
            println!(
                "  {}: {} ({} nodes)",
                summarize_paths(&paths),
                group.name,
                paths.len()
            );
        }
        println!("    Driver:   {} ({})", group.driver, group.version);
        println!("    Bus:      {}", group.bus);
        if let Some(palettes) = &group.palettes {
            println!("    Palettes: {}", palettes.join(", "));
        }
    }

    if !output.summary.unusable.is_empty() {
        println!("\nNot usable for capture:");
        for node in &output.summary.unusable {
            println!("  {}: {}", node.path, node.reason);
        }
    }
}

/// Summarize device paths like "/dev/video0-4" or "/dev/video{11,12,14}"
fn summarize_paths(paths: &[&str]) -> String {
    match paths {
        [] => return String::new(),
        [only] => return only.to_string(),
        _ => {}
    }

    let mut nums: Vec<u32> = paths
        .iter()
        .filter_map(|p| p.strip_prefix("/dev/video").and_then(|s| s.parse().ok()))
        .collect();
    nums.sort_unstable();

    let (first, last) = match (nums.first(), nums.last()) {
        (Some(&first), Some(&last)) if nums.len() == paths.len() => (first, last),
        _ => return paths.join(", "),
    };

    let is_consecutive = nums.windows(2).all(|w| w[1] == w[0] + 1);
    if is_consecutive && nums.len() > 2 {
        format!("/dev/video{}-{}", first, last)
    } else if nums.len() <= 4 {
        format!(
            "/dev/video{{{}}}",
            nums.iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    } else {
        format!("/dev/video{{{},..}} ({} devices)", first, nums.len())
    }
}
