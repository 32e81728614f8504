//! # scanlink-server
//!
//! HTTP server library for scanlink.
//!
//! This library provides the API handlers, logging setup and state
//! management for the `scanlink-server` binary.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod radio;
pub mod state;
