//! Raw touch samples and the sources that produce them.

use std::collections::VecDeque;

use crate::packet::{self, PACKET_SIZE, TOUCH_REGISTER};
use embedded_hal::i2c::I2c;

/// One unprocessed reading from the touch controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub rx: u16,
    pub ry: u16,
    pub touching: bool,
}

impl RawSample {
    pub fn touching(rx: u16, ry: u16) -> Self {
        Self {
            rx: rx.min(packet::RAW_MAX),
            ry: ry.min(packet::RAW_MAX),
            touching: true,
        }
    }
}

/// Anything that can be polled once per frame for a raw sample.
///
/// Transport failures and "no finger" both come back as `None`: callers treat
/// either as idle.
pub trait RawSampleSource {
    fn poll(&mut self) -> Option<RawSample>;
}

/// Polls a CST816-style controller at `address` on an I2C bus.
pub struct Cst816Source<I> {
    i2c: I,
    address: u8,
    errors: u64,
}

impl<I> Cst816Source<I>
where
    I: I2c,
{
    pub fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            errors: 0,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Transport errors seen so far (each one was reported as "no sample").
    pub fn error_count(&self) -> u64 {
        self.errors
    }
}

impl<I> RawSampleSource for Cst816Source<I>
where
    I: I2c,
{
    fn poll(&mut self) -> Option<RawSample> {
        let mut buf = [0u8; PACKET_SIZE];
        if let Err(e) = self
            .i2c
            .write_read(self.address, &[TOUCH_REGISTER], &mut buf)
        {
            self.errors += 1;
            if self.errors == 1 || self.errors % 500 == 0 {
                log::debug!("[touch] register read failed ({} total): {:?}", self.errors, e);
            }
            return None;
        }
        let sample = packet::decode(&buf);
        log::trace!("[touch] block={:02x?} sample={:?}", buf, sample);
        sample
    }
}

/// Replays a fixed sequence of polls, then reports no touch forever.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    polls: VecDeque<Option<RawSample>>,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = Option<RawSample>>>(polls: I) -> Self {
        Self {
            polls: polls.into_iter().collect(),
        }
    }

    pub fn push(&mut self, poll: Option<RawSample>) {
        self.polls.push_back(poll);
    }

    pub fn remaining(&self) -> usize {
        self.polls.len()
    }
}

impl RawSampleSource for ScriptedSource {
    fn poll(&mut self) -> Option<RawSample> {
        self.polls.pop_front().flatten()
    }
}
