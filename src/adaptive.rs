//! Widen the stored raw range when touches land near its edges.
//!
//! Corner calibration tends to under-sample the physical extremes because
//! users touch slightly inside the targets. Bounds only ever grow.

use crate::packet::RAW_MAX;
use crate::profile::CalibrationProfile;
use crate::sample::RawSample;

pub const DEFAULT_EDGE_MARGIN: u16 = 12;
pub const DEFAULT_EDGE_PAD: u16 = 24;

#[derive(Debug, Clone)]
pub struct AdaptiveRangeExpander {
    margin: u16,
    pad: u16,
    dirty: bool,
    expansions: u64,
}

impl Default for AdaptiveRangeExpander {
    fn default() -> Self {
        Self::new(DEFAULT_EDGE_MARGIN, DEFAULT_EDGE_PAD)
    }
}

impl AdaptiveRangeExpander {
    /// `pad` should exceed `margin` so one widening does not immediately
    /// re-trigger on the same value.
    pub fn new(margin: u16, pad: u16) -> Self {
        Self {
            margin,
            pad: pad.max(margin.saturating_add(1)),
            dirty: false,
            expansions: 0,
        }
    }

    /// Inspect one sample and widen bounds it comes close to.
    /// Returns true if the profile changed.
    pub fn observe(&mut self, raw: RawSample, profile: &mut CalibrationProfile) -> bool {
        if !raw.touching || profile.affine.is_some() {
            return false;
        }
        let x = widen(raw.rx, &mut profile.raw_x_min, &mut profile.raw_x_max, self.margin, self.pad);
        let y = widen(raw.ry, &mut profile.raw_y_min, &mut profile.raw_y_max, self.margin, self.pad);
        let changed = x || y;
        if changed {
            self.dirty = true;
            self.expansions += 1;
            log::debug!(
                "Raw range widened to x=[{}, {}] y=[{}, {}] (sample {}, {})",
                profile.raw_x_min,
                profile.raw_x_max,
                profile.raw_y_min,
                profile.raw_y_max,
                raw.rx,
                raw.ry
            );
        }
        changed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Take the dirty flag, leaving it clear.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn expansions(&self) -> u64 {
        self.expansions
    }
}

fn widen(v: u16, min: &mut u16, max: &mut u16, margin: u16, pad: u16) -> bool {
    let mut changed = false;
    if v <= min.saturating_add(margin) {
        let lower = v.min(*min).saturating_sub(pad);
        if lower < *min {
            *min = lower;
            changed = true;
        }
    }
    if v.saturating_add(margin) >= *max {
        let upper = v.max(*max).saturating_add(pad).min(RAW_MAX);
        if upper > *max {
            *max = upper;
            changed = true;
        }
    }
    changed
}
