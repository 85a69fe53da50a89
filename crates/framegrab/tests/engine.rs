// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies
//
// Capture engine tests against the simulated device.
//
// These run without hardware: every scenario binds a SimulatedDevice through
// CaptureDevice::with_adapter and keeps a clone of it to inspect what the
// engine asked the "driver" to do.
//
// RUN:
//   cargo test -p framegrab --test engine

use framegrab::{
    adapter::{
        vendor::{GspcaParams, QcLut},
        RawControl, TunerSignal,
    },
    capture::{CaptureDevice, State},
    controls::{ControlKind, ControlSource, ControlValue, ProbeKind},
    format::{FormatRequest, FrameInterval, Resolution, Standard, StandardSupport},
    palette::Palette,
    sim::{PwcPersonality, SimulatedDevice},
    Error, Resource,
};
use framegrab_sys::v4l2;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn control(id: u32, name: &str, kind: ControlKind, minimum: i32, maximum: i32) -> RawControl {
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

/// A negotiated device with `count` buffers allocated.
fn allocated(sim: &SimulatedDevice, count: u32) -> Result<CaptureDevice, Error> {
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
    dev.negotiate_format(&FormatRequest::new(320, 240).with_palettes(&[Palette::Yuyv]))?;
    dev.allocate_buffers(count)?;
    Ok(dev)
}

// =============================================================================
// Negotiation
// =============================================================================

#[test]
fn test_fallback_to_second_palette() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new().with_format(Palette::Rgb24, Resolution::new(640, 480));
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));

    let format = dev.negotiate_format(
        &FormatRequest::new(640, 480).with_palettes(&[Palette::Yuv420, Palette::Rgb24]),
    )?;
    assert_eq!(format.palette, Palette::Rgb24);
    assert_eq!(format.resolution(), Resolution::new(640, 480));
    assert_eq!(format.size, 640 * 480 * 3);
    assert_eq!(dev.state(), State::FormatSet);
    assert_eq!(dev.input_standard(), Some((0, Standard::Webcam)));
    Ok(())
}

#[test]
fn test_negotiation_picks_closest_pixel_count() -> Result<(), Error> {
    init_logging();
    let candidates = [Palette::Yuyv, Palette::Uyvy, Palette::Rgb24, Palette::Grey];
    let sizes = [
        Resolution::new(160, 120),
        Resolution::new(320, 240),
        Resolution::new(640, 480),
        Resolution::new(1280, 720),
        Resolution::new(1920, 1080),
    ];
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..64 {
        let mut sim = SimulatedDevice::new();
        let mut offered = Vec::new();
        // A device without any format accepts everything; always offer MJPEG
        sim = sim.with_format(Palette::Mjpeg, Resolution::new(640, 480));
        for &palette in &candidates {
            if rng.random_bool(0.7) {
                let size = sizes[rng.random_range(0..sizes.len())];
                sim = sim.with_format(palette, size);
                offered.push((palette, size));
            }
        }
        let wanted = Resolution::new(rng.random_range(1..=1920), rng.random_range(1..=1080));
        let request = FormatRequest::new(wanted.width, wanted.height).with_palettes(&candidates);

        let mut dev = CaptureDevice::with_adapter(Box::new(sim));
        let result = dev.negotiate_format(&request);

        // Earliest candidate among those with the smallest distance
        let expected = candidates
            .iter()
            .filter_map(|p| offered.iter().find(|(o, _)| o == p))
            .min_by_key(|(_, size)| size.pixels().abs_diff(wanted.pixels()));

        match (result, expected) {
            (Ok(format), Some(&(palette, size))) => {
                assert_eq!(format.palette, palette, "request {}", wanted);
                assert_eq!(format.resolution(), size);
            }
            (Err(Error::NoSupportedFormat), None) => {}
            (result, expected) => panic!("{:?} but expected {:?}", result, expected),
        }
    }
    Ok(())
}

#[test]
fn test_broadcast_input_and_tuner() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new()
        .with_standards(StandardSupport::Broadcast, &[Standard::Pal, Standard::Ntsc])
        .with_tuner(
            2_000,
            TunerSignal {
                signal: 0xffff,
                afc: Some(0),
            },
        );
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));

    // No tuner on the camera input
    assert!(matches!(dev.tuner_frequency(), Err(Error::Unsupported("tuner"))));

    dev.negotiate_format(
        &FormatRequest::new(320, 240)
            .with_channel(1)
            .with_standard(Standard::Ntsc),
    )?;
    assert_eq!(dev.input_standard(), Some((1, Standard::Ntsc)));
    assert_eq!(sim.selected_input(), Some(1));
    assert_eq!(dev.tuner(), Some(0));

    assert_eq!(dev.tuner_frequency()?, 2_000);
    dev.set_tuner_frequency(4_500)?;
    assert_eq!(dev.tuner_frequency()?, 4_500);
    assert_eq!(dev.tuner_signal()?.signal, 0xffff);

    // Back to the camera input, the device only takes broadcast standards
    assert_eq!(dev.set_input_standard(0, Standard::Webcam)?, Standard::Pal);
    assert_eq!(sim.selected_input(), Some(0));
    assert_eq!(dev.tuner(), None);
    Ok(())
}

// =============================================================================
// Buffers and streaming
// =============================================================================

#[test]
fn test_pool_size_follows_grant() -> Result<(), Error> {
    init_logging();
    for granted in 2..=6 {
        let sim = SimulatedDevice::new().with_granted_buffers(granted);
        let mut dev = allocated(&sim, 8)?;
        let pool = dev.buffers().map(|p| p.len());
        assert_eq!(pool, Some(granted as usize));
        assert_eq!(sim.live_mappings(), granted as usize);
        dev.free_buffers()?;
        assert_eq!(sim.live_mappings(), 0);
        assert_eq!(sim.reserved_buffers(), 0);
    }

    let sim = SimulatedDevice::new().with_granted_buffers(1);
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
    dev.negotiate_format(&FormatRequest::new(320, 240))?;
    assert!(matches!(
        dev.allocate_buffers(4),
        Err(Error::InvalidBufferCount {
            requested: 4,
            granted: 1
        })
    ));
    assert_eq!(dev.state(), State::FormatSet);
    assert_eq!(sim.live_mappings(), 0);
    Ok(())
}

#[test]
fn test_map_failure_releases_everything() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new().fail_map_at(2);
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
    dev.negotiate_format(&FormatRequest::new(320, 240))?;
    assert!(matches!(
        dev.allocate_buffers(4),
        Err(Error::BufferAllocationFailed(_))
    ));
    assert_eq!(sim.live_mappings(), 0);
    assert_eq!(sim.reserved_buffers(), 0);
    assert_eq!(dev.state(), State::FormatSet);
    Ok(())
}

#[test]
fn test_queue_failure_during_start() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new().fail_queue_at(3);
    let mut dev = allocated(&sim, 5)?;

    assert!(matches!(dev.start(), Err(Error::StreamStartFailed(_))));
    assert_eq!(dev.state(), State::BuffersAllocated);
    assert_eq!(sim.queued_buffers(), 0);
    assert!(!sim.is_streaming());

    // The injected failure is one-shot, a second start succeeds
    dev.start()?;
    assert_eq!(sim.queued_buffers(), 5);
    dev.stop()?;
    dev.free_buffers()?;
    Ok(())
}

#[test]
fn test_release_failure_still_frees_buffers() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new();
    let mut dev = allocated(&sim, 3)?;
    dev.start()?;
    dev.stop()?;

    let sim = sim.fail_release();
    assert!(matches!(dev.free_buffers(), Err(Error::Io(_))));
    assert_eq!(dev.state(), State::FormatSet);
    assert!(dev.buffers().is_none());
    assert_eq!(sim.live_mappings(), 0);

    // The device can be set up again without reopening
    dev.allocate_buffers(3)?;
    dev.start()?;
    dev.stop()?;
    dev.free_buffers()?;
    dev.close()?;
    Ok(())
}

#[test]
fn test_capture_loop() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new();
    let mut dev = allocated(&sim, 4)?;
    let size = dev.format().map(|f| f.size as usize);
    dev.start()?;

    for expected in 0..12u32 {
        let frame = dev.dequeue()?;
        assert_eq!(frame.sequence(), expected);
        assert_eq!(Some(frame.len()), size);
        assert!(frame.data().iter().all(|&b| b == expected as u8));
        assert_eq!(sim.queued_buffers(), 3);
        dev.enqueue(frame)?;
    }

    // A frame held across stop is queued again by the next start
    let held = dev.dequeue()?;
    dev.stop()?;
    assert!(matches!(
        dev.free_buffers(),
        Err(Error::ResourceInUse(Resource::FrameBuffers))
    ));
    dev.enqueue(held)?;
    dev.start()?;
    assert_eq!(sim.queued_buffers(), 4);
    dev.stop()?;

    dev.free_buffers()?;
    dev.close()?;
    assert_eq!(dev.state(), State::Closed);
    Ok(())
}

#[test]
fn test_frames_from_previous_pool_are_rejected() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new();
    let mut a = allocated(&sim, 2)?;
    let mut b = allocated(&SimulatedDevice::new(), 2)?;
    a.start()?;
    b.start()?;

    let frame = a.dequeue()?;
    assert!(matches!(
        b.enqueue(frame),
        Err(Error::StreamingStateViolation {
            operation: "enqueue",
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_dequeue_failure() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new().fail_dequeue();
    let mut dev = allocated(&sim, 2)?;
    dev.start()?;
    assert!(matches!(dev.dequeue(), Err(Error::NoFrame(_))));
    assert_eq!(dev.state(), State::Streaming);
    Ok(())
}

#[test]
fn test_drop_while_streaming_releases_device() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new();
    {
        let mut dev = allocated(&sim, 3)?;
        dev.build_controls()?;
        dev.start()?;
        let _frame = dev.dequeue()?;
        assert!(sim.is_streaming());
    }
    assert!(!sim.is_streaming());
    assert_eq!(sim.live_mappings(), 0);
    assert_eq!(sim.reserved_buffers(), 0);
    Ok(())
}

// =============================================================================
// Frame interval
// =============================================================================

#[test]
fn test_frame_interval() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new().with_frame_interval(FrameInterval::new(1, 15));
    let mut dev = allocated(&sim, 2)?;
    assert_eq!(dev.frame_interval()?, FrameInterval::new(1, 30));

    dev.set_frame_interval(FrameInterval::new(1, 10))?;
    assert_eq!(sim.frame_interval_state(), Some(FrameInterval::new(1, 10)));

    dev.start()?;
    assert!(matches!(
        dev.set_frame_interval(FrameInterval::new(1, 5)),
        Err(Error::StreamingStateViolation { .. })
    ));
    dev.stop()?;

    let locked = SimulatedDevice::new()
        .with_frame_interval(FrameInterval::new(1, 25))
        .with_locked_frame_interval();
    let mut dev = CaptureDevice::with_adapter(Box::new(locked));
    assert!(matches!(
        dev.set_frame_interval(FrameInterval::new(1, 60)),
        Err(Error::NoSupportedFormat)
    ));

    let mut dev = CaptureDevice::with_adapter(Box::new(SimulatedDevice::new()));
    assert!(matches!(
        dev.frame_interval(),
        Err(Error::Unsupported("frame interval"))
    ));
    Ok(())
}

// =============================================================================
// Controls
// =============================================================================

#[test]
fn test_standard_controls_in_id_order() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new()
        .with_control(control(v4l2::V4L2_CID_HUE, "Hue", ControlKind::Integer, -180, 180))
        .with_control(control(
            v4l2::V4L2_CID_BRIGHTNESS,
            "Brightness",
            ControlKind::Integer,
            0,
            255,
        ))
        .with_control(control(
            v4l2::V4L2_CID_SATURATION,
            "Saturation",
            ControlKind::Integer,
            0,
            100,
        ))
        .with_control(control(
            v4l2::V4L2_CID_CONTRAST,
            "Contrast",
            ControlKind::Integer,
            0,
            127,
        ));
    let mut dev = CaptureDevice::with_adapter(Box::new(sim));

    // The default plugins run and find nothing on a plain device
    assert_eq!(dev.build_controls()?, 4);
    let ids: Vec<u32> = dev.controls().iter().map(|c| c.id).collect();
    assert_eq!(
        ids,
        [
            v4l2::V4L2_CID_BRIGHTNESS,
            v4l2::V4L2_CID_CONTRAST,
            v4l2::V4L2_CID_SATURATION,
            v4l2::V4L2_CID_HUE
        ]
    );
    assert!(dev
        .controls()
        .iter()
        .all(|c| c.source == ControlSource::Standard));
    assert_eq!(dev.registry().map(|r| r.plugins().count()), Some(0));
    Ok(())
}

#[test]
fn test_set_control_clamps() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new().with_control(control(
        v4l2::V4L2_CID_BRIGHTNESS,
        "Brightness",
        ControlKind::Integer,
        -20,
        80,
    ));
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
    dev.build_controls_with(&[])?;

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..32 {
        let value = rng.random_range(-1000..1000);
        let sent = dev.set_control(0, ControlValue::Integer(value))?;
        let expected = ControlValue::Integer(value.clamp(-20, 80));
        assert_eq!(sent, expected);
        assert_eq!(sim.last_control(v4l2::V4L2_CID_BRIGHTNESS), Some(expected.clone()));
        assert_eq!(dev.get_control(0)?, expected);
    }

    assert!(matches!(
        dev.set_control(0, ControlValue::String("bright".into())),
        Err(Error::ControlOutOfRange(0))
    ));
    assert!(matches!(
        dev.get_control(9),
        Err(Error::ControlOutOfRange(9))
    ));
    Ok(())
}

#[test]
fn test_controls_before_build() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new().with_control(control(
        v4l2::V4L2_CID_BRIGHTNESS,
        "Brightness",
        ControlKind::Integer,
        0,
        255,
    ));
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));

    assert!(matches!(
        dev.get_control(0),
        Err(Error::StreamingStateViolation {
            operation: "get_control",
            ..
        })
    ));
    assert!(matches!(
        dev.set_control(0, ControlValue::Integer(1)),
        Err(Error::StreamingStateViolation {
            operation: "set_control",
            ..
        })
    ));
    assert_eq!(sim.last_control(v4l2::V4L2_CID_BRIGHTNESS), None);

    // Once built, a bad index is a range error instead
    dev.build_controls_with(&[])?;
    assert!(matches!(
        dev.get_control(1),
        Err(Error::ControlOutOfRange(1))
    ));
    Ok(())
}

#[test]
fn test_full_width_bitmask() -> Result<(), Error> {
    init_logging();
    let id = v4l2::V4L2_CID_BASE + 40;
    let sim = SimulatedDevice::new().with_control(control(
        id,
        "Mask",
        ControlKind::Bitmask,
        0,
        0xffff_ffffu32 as i32,
    ));
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
    dev.build_controls_with(&[])?;

    for mask in [0x81u32, 0x8000_0000, 0xffff_ffff] {
        let value = ControlValue::Integer(mask as i32);
        assert_eq!(dev.set_control(0, value.clone())?, value);
        assert_eq!(sim.last_control(id), Some(value.clone()));
        assert_eq!(dev.get_control(0)?, value);
    }
    Ok(())
}

#[test]
fn test_control_round_trip_per_kind() -> Result<(), Error> {
    init_logging();
    let base = v4l2::V4L2_CID_BASE;
    let sim = SimulatedDevice::new()
        .with_control(control(base, "Integer", ControlKind::Integer, 0, 10))
        .with_control(control(base + 1, "Boolean", ControlKind::Boolean, 0, 1))
        .with_control(control(base + 2, "Menu", ControlKind::Menu, 0, 2))
        .with_control(control(base + 3, "Button", ControlKind::Button, 0, 0))
        .with_control(control(base + 4, "Integer64", ControlKind::Integer64, 0, 0))
        .with_control(control(base + 5, "String", ControlKind::String, 0, 16))
        .with_control(control(base + 6, "Bitmask", ControlKind::Bitmask, 0, 0xff))
        .with_menu(base + 2, &[Some("Off"), None, Some("On")]);
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
    dev.build_controls_with(&[])?;

    let menu = &dev.controls()[2].menu;
    assert_eq!(menu.len(), 2);
    assert_eq!((menu[1].value, menu[1].name.as_str()), (2, "On"));

    let cases = [
        (0, ControlValue::Integer(7)),
        (1, ControlValue::Integer(1)),
        (2, ControlValue::Integer(2)),
        (4, ControlValue::Integer64(1 << 40)),
        (5, ControlValue::String("framegrab".into())),
        (6, ControlValue::Integer(0x81)),
    ];
    for (index, value) in cases {
        assert_eq!(dev.set_control(index, value.clone())?, value);
        assert_eq!(dev.get_control(index)?, value, "{}", dev.controls()[index].name);
    }

    // Buttons are written but hold no value
    dev.set_control(3, ControlValue::Integer(1))?;
    assert_eq!(sim.last_control(base + 3), Some(ControlValue::Integer(0)));
    Ok(())
}

#[test]
fn test_control_io_error() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new()
        .with_control(control(
            v4l2::V4L2_CID_CONTRAST,
            "Contrast",
            ControlKind::Integer,
            0,
            10,
        ))
        .fail_control(v4l2::V4L2_CID_CONTRAST);
    let mut dev = CaptureDevice::with_adapter(Box::new(sim));
    dev.build_controls_with(&[])?;
    assert!(matches!(dev.get_control(0), Err(Error::ControlIoError(_))));
    assert!(matches!(
        dev.set_control(0, ControlValue::Integer(3)),
        Err(Error::ControlIoError(_))
    ));
    Ok(())
}

#[test]
fn test_probe_plugins_through_registry() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new()
        .with_name("Philips 740 webcam")
        .with_pwc(PwcPersonality {
            name: "Philips 740 webcam".to_string(),
            ptz: true,
        })
        .with_gspca(GspcaParams {
            auto_brightness: 1,
            quality: 3,
            frame_interval: 0,
            light_frequency: 50,
        })
        .with_qc(QcLut::from_fn(|i| i as u8))
        .with_frame_interval(FrameInterval::new(1, 25));
    let mut dev = CaptureDevice::with_adapter(Box::new(sim.clone()));
    dev.build_controls_with(&ProbeKind::ALL)?;

    let plugins: Vec<ProbeKind> = dev.registry().map(|r| r.plugins().collect()).unwrap_or_default();
    assert_eq!(plugins, ProbeKind::ALL);
    // Detection leaves the driver as it found it
    assert_eq!(sim.gspca_state().map(|p| p.light_frequency), Some(50));
    assert_eq!(sim.qc_lut_state(), Some(QcLut::from_fn(|i| i as u8)));

    let find = |name: &str| {
        dev.registry()
            .and_then(|r| r.find(name))
            .ok_or(Error::ControlOutOfRange(usize::MAX))
    };
    let pan = find("pan")?;
    let quality = find("Quality")?;
    let rate = find("Frame rate")?;

    // Pan is clamped into the motor range
    dev.set_control(pan, ControlValue::Integer(9_000))?;
    assert_eq!(sim.pwc_angles_state().0, 7_000);

    dev.set_control(quality, ControlValue::Integer(5))?;
    assert_eq!(sim.gspca_state().map(|p| p.quality), Some(5));

    assert_eq!(dev.get_control(rate)?, ControlValue::Integer(25));
    dev.set_control(rate, ControlValue::Integer(10))?;
    assert_eq!(sim.frame_interval_state(), Some(FrameInterval::new(1, 10)));

    // Default plugins leave the frame rate out
    dev.release_controls()?;
    dev.build_controls()?;
    assert!(dev.registry().and_then(|r| r.find("Frame rate")).is_none());
    Ok(())
}

#[test]
fn test_registry_is_built_once() -> Result<(), Error> {
    init_logging();
    let mut dev = CaptureDevice::with_adapter(Box::new(SimulatedDevice::new()));
    dev.build_controls()?;
    assert!(matches!(
        dev.build_controls(),
        Err(Error::ResourceInUse(Resource::ControlRegistry))
    ));
    Ok(())
}

// =============================================================================
// Close
// =============================================================================

#[test]
fn test_close_requires_released_resources() -> Result<(), Error> {
    init_logging();
    let sim = SimulatedDevice::new();
    let mut dev = allocated(&sim, 2)?;
    dev.build_controls()?;

    assert!(matches!(
        dev.close(),
        Err(Error::ResourceInUse(Resource::ControlRegistry))
    ));
    dev.release_controls()?;
    assert!(matches!(
        dev.close(),
        Err(Error::ResourceInUse(Resource::BufferPool))
    ));
    assert_eq!(dev.state(), State::BuffersAllocated);

    dev.free_buffers()?;
    dev.close()?;
    assert!(matches!(
        dev.close(),
        Err(Error::StreamingStateViolation { .. })
    ));
    Ok(())
}
