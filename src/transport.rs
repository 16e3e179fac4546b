//! Linux i2c-dev access to the touch controller (`/dev/i2c-N`).

use std::io;

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;

use crate::packet::TOUCH_REGISTER;

/// An opened bus on which the controller answered.
pub struct TouchBus {
    pub bus: u32,
    pub i2c: I2cdev,
}

pub fn open_bus(bus: u32) -> io::Result<I2cdev> {
    let path = format!("/dev/i2c-{}", bus);
    let dev = I2cdev::new(&path).map_err(|e| io::Error::other(format!("{}: {}", path, e)))?;
    log::debug!("Opened {}", path);
    Ok(dev)
}

/// Try each candidate bus in order and return the first one where the chip
/// answers a one-byte read.
pub fn probe_buses(candidates: &[u32], address: u8) -> io::Result<TouchBus> {
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no candidate I2C buses");

    for &bus in candidates {
        let mut i2c = match open_bus(bus) {
            Ok(d) => d,
            Err(e) => {
                log::debug!("i2c-{}: open failed: {}", bus, e);
                last_err = e;
                continue;
            }
        };
        let mut reply = [0u8; 1];
        match i2c.write_read(address, &[TOUCH_REGISTER], &mut reply) {
            Ok(()) => {
                log::info!("Touch controller found on i2c-{} at 0x{:02X}", bus, address);
                return Ok(TouchBus { bus, i2c });
            }
            Err(e) => {
                log::debug!("i2c-{}: no answer at 0x{:02X}: {:?}", bus, address, e);
                last_err = io::Error::other(format!("{:?}", e));
            }
        }
    }

    Err(io::Error::new(
        last_err.kind(),
        format!(
            "touch controller 0x{:02X} not found on buses {:?}: {}",
            address, candidates, last_err
        ),
    ))
}
