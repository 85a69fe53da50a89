// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use crate::error::CliError;
use crate::metrics::MetricsCollector;
use crate::utils;
use clap::Args as ClapArgs;
use framegrab::{
    capture::CaptureDevice,
    encoder::{Encoder, Luma, Passthrough},
    format::FormatRequest,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(ClapArgs, Debug)]
pub struct Args {
    /// Capture device
    #[arg(short, long, default_value = "/dev/video0")]
    device: String,

    /// Resolution in WxH format, or "max"
    #[arg(short, long, default_value = "640x480")]
    resolution: String,

    /// Candidate palettes in order of preference, comma-separated names or
    /// fourccs (default: the built-in order)
    #[arg(short, long, default_value = "")]
    palettes: String,

    /// Input channel
    #[arg(short, long, default_value = "0")]
    channel: u32,

    /// Video standard (webcam, pal, secam, ntsc)
    #[arg(short, long, default_value = "webcam")]
    standard: String,

    /// Frame rate as fps or a num/den frame interval
    #[arg(short = 'F', long)]
    fps: Option<String>,

    /// Number of buffers to request
    #[arg(short, long, default_value = "4")]
    buffers: u32,

    /// Number of frames to capture (0=unlimited)
    #[arg(short = 'n', long, default_value = "0")]
    frames: u64,

    /// Write frames to this file instead of discarding them
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Convert frames to 8-bit greyscale before writing
    #[arg(long)]
    luma: bool,
}

pub fn execute(args: Args, json: bool) -> Result<(), CliError> {
    log::debug!("Capture parameters: {:?}", args);

    let (width, height) = utils::parse_resolution(&args.resolution)?;
    let palettes = utils::parse_palettes(&args.palettes)?;
    let standard = utils::parse_standard(&args.standard)?;
    let interval = args
        .fps
        .as_deref()
        .map(utils::parse_frame_interval)
        .transpose()?;

    // Install signal handler for graceful shutdown
    let term = utils::install_signal_handler()?;

    let mut dev = utils::open_device(&args.device)?;
    let request = FormatRequest::new(width, height)
        .with_channel(args.channel)
        .with_standard(standard)
        .with_palettes(&palettes);
    let format = dev.negotiate_format(&request)?;
    log::info!("Capturing {} from {}", format, args.device);

    if let Some(interval) = interval {
        dev.set_frame_interval(interval)?;
        log::info!("Frame interval set to {}", interval);
    }

    let mut encoder: Box<dyn Encoder> = if args.luma {
        Box::new(Luma::new(format)?)
    } else {
        Box::new(Passthrough::new(format))
    };

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => {
            log::info!("Writing {} frames to {}", encoder.output_palette(), path.display());
            Box::new(BufWriter::new(File::create(path).map_err(|e| {
                CliError::General(format!("Cannot create {}: {}", path.display(), e))
            })?))
        }
        None => Box::new(io::sink()),
    };

    let granted = dev.allocate_buffers(args.buffers)?;
    log::debug!("Using {} buffers", granted);
    dev.start()?;

    let max_frames = if args.frames == 0 {
        u64::MAX
    } else {
        args.frames
    };
    log::info!(
        "Capturing {} frames (Ctrl+C to stop)...",
        if max_frames == u64::MAX {
            "unlimited".to_string()
        } else {
            max_frames.to_string()
        }
    );

    let mut metrics = MetricsCollector::new();
    let result = capture_loop(
        &mut dev,
        encoder.as_mut(),
        sink.as_mut(),
        max_frames,
        &term,
        &mut metrics,
    );

    if term.load(Ordering::Relaxed) {
        log::info!("Received Ctrl+C, stopping...");
    }

    dev.stop()?;
    dev.free_buffers()?;
    dev.close()?;
    let captured = result?;
    sink.flush()?;
    log::info!("Captured {} frames total", captured);

    if json {
        metrics
            .print_json()
            .map_err(|e| CliError::General(format!("Failed to output JSON metrics: {}", e)))?;
    } else {
        metrics.print_text();
    }

    Ok(())
}

/// Dequeues, converts and writes frames until `max_frames` or `term`.
/// Every dequeued frame is handed back, including on errors.
fn capture_loop(
    dev: &mut CaptureDevice,
    encoder: &mut dyn Encoder,
    sink: &mut dyn Write,
    max_frames: u64,
    term: &AtomicBool,
    metrics: &mut MetricsCollector,
) -> Result<u64, CliError> {
    let palette = dev
        .format()
        .map(|f| f.palette)
        .ok_or_else(|| CliError::General("no negotiated format".to_string()))?;

    let mut frame_count = 0u64;
    while frame_count < max_frames && !term.load(Ordering::Relaxed) {
        let frame = dev.dequeue()?;
        let sequence = frame.sequence();

        let written = match encoder.convert(palette, frame.data()) {
            Ok(data) => sink.write_all(data).map(|_| data.len()).map_err(CliError::from),
            Err(err) => Err(CliError::from(err)),
        };
        dev.enqueue(frame)?;
        let written = written?;

        metrics.record_frame(sequence, written);
        frame_count += 1;

        if frame_count % 30 == 0 {
            log::debug!("Captured {} frames", frame_count);
        }
    }
    Ok(frame_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use framegrab::{format::Resolution, palette::Palette, sim::SimulatedDevice};

    fn streaming(sim: &SimulatedDevice, palette: Palette) -> CaptureDevice {
        let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
        dev.negotiate_format(&FormatRequest::new(8, 4).with_palettes(&[palette]))
            .unwrap();
        dev.allocate_buffers(3).unwrap();
        dev.start().unwrap();
        dev
    }

    #[test]
    fn test_capture_loop_writes_frames() {
        let sim = SimulatedDevice::new().with_format(Palette::Yuyv, Resolution::new(8, 4));
        let mut dev = streaming(&sim, Palette::Yuyv);
        let format = dev.format().unwrap();
        let mut encoder = Passthrough::new(format);
        let mut sink = Vec::new();
        let mut metrics = MetricsCollector::new();

        let count = capture_loop(
            &mut dev,
            &mut encoder,
            &mut sink,
            5,
            &AtomicBool::new(false),
            &mut metrics,
        )
        .unwrap();

        assert_eq!(count, 5);
        assert_eq!(sink.len(), 5 * 8 * 4 * 2);
        // The simulated device fills each frame with its sequence number
        assert!(sink[..64].iter().all(|&b| b == 0));
        assert!(sink[4 * 64..].iter().all(|&b| b == 4));
        assert_eq!(sim.queued_buffers(), 3);

        let stats = metrics.finalize();
        assert_eq!(stats.frames_captured, 5);
        assert_eq!(stats.bytes_captured, 320);
        assert_eq!(stats.dropped_frames, 0);
    }

    #[test]
    fn test_capture_loop_luma() {
        let sim = SimulatedDevice::new().with_format(Palette::Yuyv, Resolution::new(8, 4));
        let mut dev = streaming(&sim, Palette::Yuyv);
        let mut encoder = Luma::new(dev.format().unwrap()).unwrap();
        let mut sink = Vec::new();

        capture_loop(
            &mut dev,
            &mut encoder,
            &mut sink,
            2,
            &AtomicBool::new(false),
            &mut MetricsCollector::new(),
        )
        .unwrap();
        assert_eq!(sink.len(), 2 * 8 * 4);
    }

    #[test]
    fn test_capture_loop_stops_on_signal() {
        let sim = SimulatedDevice::new();
        let mut dev = streaming(&sim, Palette::Grey);
        let mut encoder = Passthrough::new(dev.format().unwrap());
        let count = capture_loop(
            &mut dev,
            &mut encoder,
            &mut io::sink(),
            u64::MAX,
            &AtomicBool::new(true),
            &mut MetricsCollector::new(),
        )
        .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_conversion_error_returns_frame() {
        let sim = SimulatedDevice::new().with_format(Palette::Yuyv, Resolution::new(8, 4));
        let mut dev = streaming(&sim, Palette::Yuyv);
        // An encoder expecting another palette rejects every frame
        let other = framegrab::format::FormatDescriptor::new(Palette::Grey, 8, 4, 0, 0);
        let mut encoder = Passthrough::new(other);

        let result = capture_loop(
            &mut dev,
            &mut encoder,
            &mut io::sink(),
            3,
            &AtomicBool::new(false),
            &mut MetricsCollector::new(),
        );
        assert!(matches!(result, Err(CliError::Unsupported(_))));
        assert_eq!(dev.buffers().map(|p| p.outstanding()), Some(0));
        assert_eq!(sim.queued_buffers(), 3);
    }
}
