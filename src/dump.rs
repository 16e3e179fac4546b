//! Dump raw samples for debugging.
//! Run: touchcal dump  to stream touches with the point each one maps to.

use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::mapper;
use crate::profile::CalibrationProfile;
use crate::sample::{RawSample, RawSampleSource};

/// One output line: counter, raw channels, mapped pixel.
fn format_sample(n: u64, s: RawSample, profile: &CalibrationProfile, screen: (u32, u32)) -> String {
    let p = mapper::map(s, profile, screen);
    format!("{:6}  rx={:4} ry={:4}  ->  ({:3}, {:3})", n, s.rx, s.ry, p.x, p.y)
}

/// Poll `source` every `frame` and print each touching sample to `out`.
/// Stops after `count` samples, or never.
pub fn run_dump(
    source: &mut dyn RawSampleSource,
    profile: &CalibrationProfile,
    screen: (u32, u32),
    frame: Duration,
    count: Option<u64>,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut n = 0u64;
    let mut touching = false;
    loop {
        match source.poll().filter(|s| s.touching) {
            Some(s) => {
                if !touching {
                    writeln!(out, "-- down")?;
                    touching = true;
                }
                n += 1;
                writeln!(out, "{}", format_sample(n, s, profile, screen))?;
                if count.is_some_and(|c| n >= c) {
                    return Ok(());
                }
            }
            None => {
                if touching {
                    writeln!(out, "-- up")?;
                    touching = false;
                }
            }
        }
        if !frame.is_zero() {
            thread::sleep(frame);
        }
    }
}
