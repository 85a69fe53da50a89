// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies

//! Raw Video4Linux kernel ABI used by the framegrab capture engine.
//!
//! The [`v4l2`] and [`v4l1`] modules mirror the kernel headers for the two
//! protocol generations, and [`vendor`] holds the private ioctls of the
//! handful of webcam drivers whose parameters are not reachable through the
//! standard control interface. All ioctl wrappers are generated with the
//! `nix` ioctl macros and are `unsafe` to call: the caller guarantees the
//! file descriptor is open and the argument points at a valid structure.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]

pub mod v4l1;
pub mod v4l2;
pub mod vendor;

// Re-export for callers converting `nix::Result` into `std::io::Error`
pub use nix;

/// Implements `Default` as all-zero bytes for plain kernel structures.
///
/// Every structure in this crate is plain old data for which the all-zero bit
/// pattern is valid (null pointers included), matching the `CLEAR()` idiom of
/// the C API.
#[macro_export]
macro_rules! impl_zeroed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Default for $ty {
                fn default() -> Self {
                    // SAFETY: the type is a repr(C) kernel structure made of
                    // integers, arrays, raw pointers and unions of those.
                    unsafe { ::std::mem::zeroed() }
                }
            }
        )*
    };
}

/// Converts a NUL-padded kernel string field into an owned `String`.
pub fn cstr_field(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).trim().to_string()
}

/// Copies `value` into a fixed-size kernel string field, truncating and
/// NUL-terminating it.
pub fn set_cstr_field(field: &mut [u8], value: &str) {
    field.fill(0);
    let n = value.len().min(field.len().saturating_sub(1));
    field[..n].copy_from_slice(&value.as_bytes()[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cstr_field() {
        let mut buf = [0u8; 8];
        set_cstr_field(&mut buf, "uvcvideo");
        assert_eq!(cstr_field(&buf), "uvcvide");
        assert_eq!(buf[7], 0);

        set_cstr_field(&mut buf, "pwc");
        assert_eq!(cstr_field(&buf), "pwc");
        assert_eq!(cstr_field(b"no-nul"), "no-nul");
    }
}
