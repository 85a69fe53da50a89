// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Vendor-private ioctls issued on a device file descriptor.
//!
//! These back the default vendor methods of
//! [`ProtocolAdapter`](super::ProtocolAdapter); the probe plugins in
//! [`controls::probe`](crate::controls::probe) decide whether a device
//! actually understands them.

use std::{io, os::fd::RawFd};

use framegrab_sys::{cstr_field, vendor as sys};
use libc::c_int;

use super::xioctl;

/// Motor range of a pan/tilt webcam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanTiltRange {
    pub pan_min: i32,
    pub pan_max: i32,
    pub tilt_min: i32,
    pub tilt_max: i32,
}

/// The parameter block of spca5xx/gspca drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GspcaParams {
    pub auto_brightness: u8,
    pub quality: u8,
    pub frame_interval: u16,
    pub light_frequency: u8,
}

/// Selects which field of [`GspcaParams`] a write changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GspcaParam {
    AutoBrightness,
    Quality,
    FrameInterval,
    LightFrequency,
}

impl GspcaParam {
    fn code(&self) -> c_int {
        match self {
            GspcaParam::AutoBrightness => sys::CHGABRIGHT,
            GspcaParam::Quality => sys::CHGQUALITY,
            GspcaParam::FrameInterval => sys::CHGTINTER,
            GspcaParam::LightFrequency => sys::CHGLIGHTFREQ,
        }
    }
}

/// Private settings of the Logitech QuickCam driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QcSetting {
    Settle,
    Compression,
    Interpolation,
    AutoBrightness,
    Equalize,
}

impl QcSetting {
    pub const ALL: [QcSetting; 5] = [
        QcSetting::Settle,
        QcSetting::Compression,
        QcSetting::Interpolation,
        QcSetting::AutoBrightness,
        QcSetting::Equalize,
    ];
}

/// A QuickCam user lookup table, three 256-entry channels.
#[derive(Clone, PartialEq, Eq)]
pub struct QcLut(pub Box<[u8; sys::QC_LUT_SIZE]>);

impl QcLut {
    pub const SIZE: usize = sys::QC_LUT_SIZE;

    pub fn from_fn(f: impl Fn(usize) -> u8) -> QcLut {
        let mut table = Box::new([0u8; sys::QC_LUT_SIZE]);
        for (i, v) in table.iter_mut().enumerate() {
            *v = f(i);
        }
        QcLut(table)
    }
}

impl std::fmt::Debug for QcLut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QcLut({:?}..)", &self.0[..6])
    }
}

pub(crate) fn pwc_probe(fd: RawFd) -> io::Result<String> {
    let mut probe = sys::pwc_probe::default();
    // SAFETY: probe is a valid pwc_probe for the duration of the call.
    xioctl(|| unsafe { sys::vidiocpwcprobe(fd, &mut probe) })?;
    Ok(cstr_field(&probe.name))
}

pub(crate) fn pwc_reset_pan_tilt(fd: RawFd) -> io::Result<()> {
    let which: c_int = sys::PWC_MPT_RESET_BOTH;
    // SAFETY: which outlives the call.
    xioctl(|| unsafe { sys::vidiocpwcmptreset(fd, &which) })?;
    Ok(())
}

pub(crate) fn pwc_pan_tilt_range(fd: RawFd) -> io::Result<PanTiltRange> {
    let mut range = sys::pwc_mpt_range::default();
    // SAFETY: range is a valid pwc_mpt_range.
    xioctl(|| unsafe { sys::vidiocpwcmptgrange(fd, &mut range) })?;
    Ok(PanTiltRange {
        pan_min: range.pan_min,
        pan_max: range.pan_max,
        tilt_min: range.tilt_min,
        tilt_max: range.tilt_max,
    })
}

pub(crate) fn pwc_angles(fd: RawFd) -> io::Result<(i32, i32)> {
    let mut angles = sys::pwc_mpt_angles::default();
    // SAFETY: angles is a valid pwc_mpt_angles.
    xioctl(|| unsafe { sys::vidiocpwcmptgangle(fd, &mut angles) })?;
    Ok((angles.pan, angles.tilt))
}

pub(crate) fn pwc_set_angles(fd: RawFd, pan: i32, tilt: i32) -> io::Result<()> {
    let angles = sys::pwc_mpt_angles {
        absolute: 1,
        pan,
        tilt,
    };
    // SAFETY: angles outlives the call.
    xioctl(|| unsafe { sys::vidiocpwcmptsangle(fd, &angles) })?;
    Ok(())
}

pub(crate) fn gspca_params(fd: RawFd) -> io::Result<GspcaParams> {
    let mut p = sys::video_param::default();
    // SAFETY: p is a valid video_param.
    xioctl(|| unsafe { sys::spcagvidioparam(fd, &mut p) })?;
    Ok(GspcaParams {
        auto_brightness: p.autobright,
        quality: p.quality,
        frame_interval: p.time_interval,
        light_frequency: p.light_freq,
    })
}

pub(crate) fn gspca_set_param(fd: RawFd, which: GspcaParam, params: &GspcaParams) -> io::Result<()> {
    let p = sys::video_param {
        chg_para: which.code(),
        autobright: params.auto_brightness,
        quality: params.quality,
        time_interval: params.frame_interval,
        light_freq: params.light_frequency,
    };
    // SAFETY: p outlives the call.
    xioctl(|| unsafe { sys::spcasvidioparam(fd, &p) })?;
    Ok(())
}

fn userlut_request() -> Box<sys::qc_userlut> {
    let mut ulut = Box::<sys::qc_userlut>::default();
    ulut.flags = sys::QC_USERLUT_VALUES | sys::QC_USERLUT_DEFAULT;
    ulut
}

pub(crate) fn qc_lut(fd: RawFd) -> io::Result<QcLut> {
    let mut ulut = userlut_request();
    // SAFETY: ulut points to a valid qc_userlut.
    xioctl(|| unsafe { sys::vidiocqcguserlut(fd, &mut *ulut) })?;
    Ok(QcLut(Box::new(ulut.lut)))
}

pub(crate) fn qc_set_lut(fd: RawFd, lut: &QcLut) -> io::Result<()> {
    let mut ulut = userlut_request();
    ulut.lut = *lut.0;
    // SAFETY: ulut outlives the call.
    xioctl(|| unsafe { sys::vidiocqcsuserlut(fd, &*ulut) })?;
    Ok(())
}

pub(crate) fn qc_get(fd: RawFd, setting: QcSetting) -> io::Result<i32> {
    let mut value: c_int = 0;
    // SAFETY: value is a valid c_int for every request.
    xioctl(|| unsafe {
        match setting {
            QcSetting::Settle => sys::vidiocqcgsettle(fd, &mut value),
            QcSetting::Compression => sys::vidiocqcgcompress(fd, &mut value),
            QcSetting::Interpolation => sys::vidiocqcgquality(fd, &mut value),
            QcSetting::AutoBrightness => sys::vidiocqcgadaptive(fd, &mut value),
            QcSetting::Equalize => sys::vidiocqcgequalize(fd, &mut value),
        }
    })?;
    Ok(value)
}

pub(crate) fn qc_set(fd: RawFd, setting: QcSetting, value: i32) -> io::Result<i32> {
    let mut value: c_int = value;
    // SAFETY: value is a valid c_int for every request.
    xioctl(|| unsafe {
        match setting {
            QcSetting::Settle => sys::vidiocqcssettle(fd, &mut value),
            QcSetting::Compression => sys::vidiocqcscompress(fd, &mut value),
            QcSetting::Interpolation => sys::vidiocqcsquality(fd, &mut value),
            QcSetting::AutoBrightness => sys::vidiocqcsadaptive(fd, &mut value),
            QcSetting::Equalize => sys::vidiocqcsequalize(fd, &mut value),
        }
    })?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_ioctls_fail_on_non_device() {
        let file = std::fs::File::open("/dev/null").expect("open /dev/null");
        let fd = std::os::fd::AsRawFd::as_raw_fd(&file);
        assert!(pwc_probe(fd).is_err());
        assert!(gspca_params(fd).is_err());
        assert!(qc_lut(fd).is_err());
        assert!(qc_get(fd, QcSetting::Equalize).is_err());
    }

    #[test]
    fn test_lut_from_fn() {
        let lut = QcLut::from_fn(|i| (i % 3) as u8);
        assert_eq!(lut.0[0], 0);
        assert_eq!(lut.0[4], 1);
        assert_eq!(lut.0[QcLut::SIZE - 1], ((QcLut::SIZE - 1) % 3) as u8);
    }
}
