//! # openline
//!
//! HTTP server, CLI and configuration for the OpenLine frame bus.
//! The acceptance logic lives in `openline-core`; this crate wires it to
//! axum, clap and TOML.

pub mod api;
pub mod cli;
pub mod config;
