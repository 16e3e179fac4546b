//! Calibration and coordinate mapping for a small capacitive touch panel.
//!
//! Raw 12-bit samples come from a CST816-style controller over I2C, get
//! calibrated into a [`profile::CalibrationProfile`] by one of the
//! [`calibration`] strategies and are mapped to screen pixels by
//! [`mapper::CoordinateMapper`]. [`engine::TouchEngine`] ties it together for a
//! host loop.

pub mod adaptive;
pub mod calibration;
pub mod config;
pub mod dump;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod orientation;
pub mod packet;
pub mod panel;
pub mod profile;
pub mod sample;
pub mod store;
pub mod swipe;
pub mod transport;
