#![no_std]

//! # farm-monitor-rs
//! ## Soil and climate telemetry for a Raspberry Pi Pico, in Rust
//!
//! Features:
//! - DHT22 temperature and humidity sampling
//! - Soil moisture percentage from a calibrated analog probe
//! - Automatic fallback to simulated climate values when the DHT22 keeps failing
//! - Fixed-format text lines over UART for the host bridge
//! - Host-side parser for the same line format

pub mod config;
pub mod dht22;
pub mod health;
pub mod report;
pub mod sensors;
pub mod station;
pub mod timer;
