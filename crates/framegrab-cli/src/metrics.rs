// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

use serde::Serialize;
use std::time::Instant;

/// Capture statistics collected during a run
#[derive(Debug, Clone, Serialize)]
pub struct CaptureMetrics {
    /// Total number of frames captured
    pub frames_captured: u64,
    /// Total bytes after conversion
    pub bytes_captured: u64,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Average throughput in frames per second
    pub throughput_fps: f64,
    /// Average bandwidth in megabits per second
    pub bandwidth_mbps: f64,
    /// Minimum time between frames in microseconds
    pub interval_min_us: u64,
    /// Maximum time between frames in microseconds
    pub interval_max_us: u64,
    /// Average time between frames in microseconds
    pub interval_avg_us: u64,
    /// 50th percentile (median) time between frames in microseconds
    pub interval_p50_us: u64,
    /// 95th percentile time between frames in microseconds
    pub interval_p95_us: u64,
    /// Frames the device skipped, from gaps in the sequence numbers
    pub dropped_frames: u64,
}

/// Metrics collector for tracking capture performance
pub struct MetricsCollector {
    start_time: Instant,
    last_frame: Option<Instant>,
    frames: u64,
    intervals_us: Vec<u64>,
    bytes: u64,
    prev_sequence: Option<u32>,
    dropped_frames: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            last_frame: None,
            frames: 0,
            intervals_us: Vec::new(),
            bytes: 0,
            prev_sequence: None,
            dropped_frames: 0,
        }
    }

    /// Record a captured frame of `bytes` with the device's `sequence`.
    pub fn record_frame(&mut self, sequence: u32, bytes: usize) {
        let now = Instant::now();
        if let Some(last) = self.last_frame {
            self.intervals_us
                .push(now.duration_since(last).as_micros() as u64);
        }
        self.last_frame = Some(now);
        self.frames += 1;
        self.bytes += bytes as u64;
        self.track_sequence(sequence);
    }

    /// Track frame sequence numbers to detect drops
    /// Returns the number of dropped frames detected (0 or N)
    pub fn track_sequence(&mut self, sequence: u32) -> u64 {
        let drops = match self.prev_sequence {
            Some(prev) => {
                let gap = sequence.wrapping_sub(prev);
                if gap == 0 || gap > u32::MAX / 2 {
                    // Restarted or went backwards; not a drop
                    log::warn!("Frame sequence did not advance: {} -> {}", prev, sequence);
                    0
                } else {
                    (gap - 1) as u64
                }
            }
            None => 0,
        };

        self.dropped_frames += drops;
        self.prev_sequence = Some(sequence);
        drops
    }

    /// Finalize and calculate all metrics
    pub fn finalize(&mut self) -> CaptureMetrics {
        let duration = self.start_time.elapsed();
        let duration_ms = duration.as_millis() as u64;
        let duration_secs = duration.as_secs_f64();

        let throughput_fps = if duration_secs > 0.0 {
            self.frames as f64 / duration_secs
        } else {
            0.0
        };

        let bandwidth_mbps = if duration_secs > 0.0 {
            (self.bytes as f64 * 8.0) / (duration_secs * 1_000_000.0)
        } else {
            0.0
        };

        self.intervals_us.sort_unstable();
        let (min_us, max_us, avg_us) = match (self.intervals_us.first(), self.intervals_us.last()) {
            (Some(&min), Some(&max)) => {
                let sum: u64 = self.intervals_us.iter().sum();
                (min, max, sum / self.intervals_us.len() as u64)
            }
            _ => (0, 0, 0),
        };

        CaptureMetrics {
            frames_captured: self.frames,
            bytes_captured: self.bytes,
            duration_ms,
            throughput_fps,
            bandwidth_mbps,
            interval_min_us: min_us,
            interval_max_us: max_us,
            interval_avg_us: avg_us,
            interval_p50_us: self.percentile(50.0),
            interval_p95_us: self.percentile(95.0),
            dropped_frames: self.dropped_frames,
        }
    }

    /// Percentile of the sorted interval data
    fn percentile(&self, p: f64) -> u64 {
        if self.intervals_us.is_empty() {
            return 0;
        }

        let len = self.intervals_us.len();
        let idx = ((p / 100.0) * (len - 1) as f64).round() as usize;
        self.intervals_us[idx.min(len - 1)]
    }

    /// Print metrics in human-readable format
    pub fn print_text(&mut self) {
        let metrics = self.finalize();
        println!("\n=== Capture Statistics ===");
        println!("Frames captured:   {}", metrics.frames_captured);
        println!(
            "Bytes captured:    {} ({:.2} MB)",
            metrics.bytes_captured,
            metrics.bytes_captured as f64 / 1_048_576.0
        );
        println!(
            "Duration:          {:.2} s",
            metrics.duration_ms as f64 / 1000.0
        );
        println!("Throughput:        {:.2} fps", metrics.throughput_fps);
        println!("Bandwidth:         {:.2} Mbps", metrics.bandwidth_mbps);

        if metrics.frames_captured > 1 {
            println!("\nFrame Interval (µs):");
            println!("  Min:    {}", metrics.interval_min_us);
            println!("  Max:    {}", metrics.interval_max_us);
            println!("  Avg:    {}", metrics.interval_avg_us);
            println!("  P50:    {}", metrics.interval_p50_us);
            println!("  P95:    {}", metrics.interval_p95_us);
        }

        if metrics.dropped_frames > 0 {
            println!(
                "\nDropped frames:    {} ({:.2}%)",
                metrics.dropped_frames,
                (metrics.dropped_frames as f64
                    / (metrics.frames_captured + metrics.dropped_frames) as f64)
                    * 100.0
            );
        }
    }

    /// Print metrics in JSON format
    pub fn print_json(&mut self) -> Result<(), serde_json::Error> {
        let metrics = self.finalize();
        let json = serde_json::to_string_pretty(&metrics)?;
        println!("{}", json);
        Ok(())
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
