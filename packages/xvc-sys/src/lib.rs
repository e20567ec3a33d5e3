//! Raw xvc codec bindings.
//!
//! This crate provides low-level bindings to the xvc reference codec C API,
//! covering both the encoder (`xvcenc.h`) and the decoder (`xvcdec.h`).
//! Both libraries expose a single entry point returning a static table of
//! function pointers; every other call goes through that table.
//!
//! For a safe API with validated parameters, pooled buffers and idempotent
//! handle release, use the `xvc` crate instead.
//!
//! ## Modules
//!
//! - [`xvcenc`] - encoder API table, parameters and NAL unit output
//! - [`xvcdec`] - decoder API table, parameters and decoded pictures

#![allow(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    clippy::all,
    dead_code
)]

pub mod xvcdec;
pub mod xvcenc;

pub use xvcdec::*;
pub use xvcenc::*;
