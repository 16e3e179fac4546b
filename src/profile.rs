//! Persisted calibration profile.

use serde::{Deserialize, Serialize};

use crate::orientation::Orientation;
use crate::packet::RAW_MAX;

/// Smallest raw span (max - min) treated as a usable axis range.
pub const MIN_RAW_SPAN: u16 = 32;

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.35;

/// Everything needed to turn a raw sample into a screen point.
///
/// If `affine` is present it is authoritative and the discrete
/// swap/invert/range fields are ignored by the mapper. Raw ranges are per raw
/// channel: `raw_x_*` bounds `rx` whether or not the axes are swapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationProfile {
    pub swap_xy: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    pub raw_x_min: u16,
    pub raw_x_max: u16,
    pub raw_y_min: u16,
    pub raw_y_max: u16,
    /// a, b, c, d, e, f for x = a·rx + b·ry + c, y = d·rx + e·ry + f
    pub affine: Option<[f64; 6]>,
    pub smoothing_alpha: f64,
    /// Cleared by a recalibration request; set by a successful calibrator.
    pub calibrated: bool,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            swap_xy: true,
            invert_x: true,
            invert_y: false,
            raw_x_min: 0,
            raw_x_max: RAW_MAX,
            raw_y_min: 0,
            raw_y_max: RAW_MAX,
            affine: None,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            calibrated: false,
        }
    }
}

impl CalibrationProfile {
    pub fn orientation(&self) -> Orientation {
        Orientation::new(self.swap_xy, self.invert_x, self.invert_y)
    }

    pub fn set_orientation(&mut self, o: Orientation) {
        self.swap_xy = o.swap_xy;
        self.invert_x = o.invert_x;
        self.invert_y = o.invert_y;
    }

    pub fn x_range(&self) -> (u16, u16) {
        (self.raw_x_min, self.raw_x_max)
    }

    pub fn y_range(&self) -> (u16, u16) {
        (self.raw_y_min, self.raw_y_max)
    }

    /// True when the discrete ranges are wide enough to map with.
    pub fn has_usable_range(&self) -> bool {
        span_ok(self.raw_x_min, self.raw_x_max) && span_ok(self.raw_y_min, self.raw_y_max)
    }

    pub fn has_usable_affine(&self) -> bool {
        self.affine
            .map(|c| c.iter().all(|v| v.is_finite()))
            .unwrap_or(false)
    }

    /// Whether the engine should run a calibrator before trusting this profile.
    pub fn needs_calibration(&self) -> bool {
        if !self.calibrated {
            return true;
        }
        if self.affine.is_some() {
            !self.has_usable_affine()
        } else {
            !self.has_usable_range()
        }
    }
}

/// Session-only settings layered over the stored profile. They change how
/// touches are mapped but are never written back to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileOverrides {
    /// Replaces the stored orientation and disables any stored affine.
    pub orientation: Option<Orientation>,
    pub smoothing_alpha: Option<f64>,
}

impl ProfileOverrides {
    pub fn is_empty(&self) -> bool {
        self.orientation.is_none() && self.smoothing_alpha.is_none()
    }

    /// Copy of `profile` with the overrides applied.
    pub fn apply(&self, profile: &CalibrationProfile) -> CalibrationProfile {
        let mut out = profile.clone();
        if let Some(o) = self.orientation {
            out.set_orientation(o);
            out.affine = None;
        }
        if let Some(alpha) = self.smoothing_alpha {
            out.smoothing_alpha = alpha;
        }
        out
    }
}

fn span_ok(min: u16, max: u16) -> bool {
    max > min && max - min >= MIN_RAW_SPAN
}
