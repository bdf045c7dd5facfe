//! PTZ Common Library
//!
//! This crate provides the pieces shared between the session daemon and the
//! command-line client:
//!
//! - [`consts`] - Speed limits, default paths and polling intervals
//! - [`config`] - Daemon configuration loading
//! - [`types`] - Motor status and axis-inversion types
//! - [`protocol`] - Fixed-layout request/response wire codec
//! - [`stopflag`] - Cross-process stop signal (named POSIX shm object)
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use ptz_common::prelude::*;
//!
//! let req = Request::move_relative(120, -40, Some(500));
//! let frame = req.encode();
//! assert_eq!(Request::decode(&frame).unwrap(), req);
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod protocol;
pub mod stopflag;
pub mod types;
