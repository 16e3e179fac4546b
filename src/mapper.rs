//! Raw sample → screen pixel mapping.
//!
//! The pure [`map`] never panics and always lands inside the screen, no matter
//! what the profile contains. [`CoordinateMapper`] adds per-touch exponential
//! smoothing on top, in screen space after clamping.

use crate::profile::{CalibrationProfile, MIN_RAW_SPAN};
use crate::sample::RawSample;

/// A pixel position, always inside `[0, W-1] × [0, H-1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Round and clamp a continuous position onto the screen. NaN lands on 0.
    pub fn clamped(x: f64, y: f64, screen: (u32, u32)) -> Self {
        Self {
            x: clamp_axis(x, screen.0),
            y: clamp_axis(y, screen.1),
        }
    }

    pub fn distance(&self, x: f64, y: f64) -> f64 {
        (self.x as f64 - x).hypot(self.y as f64 - y)
    }
}

fn last_pixel(dim: u32) -> f64 {
    dim.max(1) as f64 - 1.0
}

fn clamp_axis(v: f64, dim: u32) -> i32 {
    let v = if v.is_finite() { v } else { 0.0 };
    v.round().clamp(0.0, last_pixel(dim)) as i32
}

/// Raw range as floats, with a minimal synthetic span centred on the midpoint
/// when the stored range is too narrow or inverted.
pub fn effective_range(min: u16, max: u16) -> (f64, f64) {
    if max > min && max - min >= MIN_RAW_SPAN {
        return (min as f64, max as f64);
    }
    let mid = (min as f64 + max as f64) / 2.0;
    let half = MIN_RAW_SPAN as f64 / 2.0;
    (mid - half, mid + half)
}

/// Normalize `v` into `[lo, hi]`, optionally mirror, and scale to `[0, dim-1]`.
pub fn project(v: f64, lo: f64, hi: f64, invert: bool, dim: u32) -> f64 {
    let span = hi - lo;
    let mut n = if span.abs() > f64::EPSILON {
        ((v - lo) / span).clamp(0.0, 1.0)
    } else {
        0.5
    };
    if !n.is_finite() {
        n = 0.5;
    }
    if invert {
        n = 1.0 - n;
    }
    n * last_pixel(dim)
}

/// Continuous screen position before rounding and clamping.
pub fn map_continuous(raw: RawSample, profile: &CalibrationProfile, screen: (u32, u32)) -> (f64, f64) {
    let rx = raw.rx as f64;
    let ry = raw.ry as f64;

    if let Some([a, b, c, d, e, f]) = profile.affine {
        return (a * rx + b * ry + c, d * rx + e * ry + f);
    }

    let o = profile.orientation();
    let ((vx, (x_lo, x_hi)), (vy, (y_lo, y_hi))) = o.route(
        (rx, effective_range(profile.raw_x_min, profile.raw_x_max)),
        (ry, effective_range(profile.raw_y_min, profile.raw_y_max)),
    );
    (
        project(vx, x_lo, x_hi, o.invert_x, screen.0),
        project(vy, y_lo, y_hi, o.invert_y, screen.1),
    )
}

/// Map one raw sample to a clamped screen point.
pub fn map(raw: RawSample, profile: &CalibrationProfile, screen: (u32, u32)) -> ScreenPoint {
    let (x, y) = map_continuous(raw, profile, screen);
    ScreenPoint::clamped(x, y, screen)
}

/// Mapper with exponential smoothing across one continuous touch.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    screen: (u32, u32),
    smoothed: Option<(f64, f64)>,
}

impl CoordinateMapper {
    pub fn new(screen: (u32, u32)) -> Self {
        Self {
            screen,
            smoothed: None,
        }
    }

    pub fn screen(&self) -> (u32, u32) {
        self.screen
    }

    /// Map and smooth. A sample that starts a new touch resets the average.
    pub fn map(&mut self, raw: RawSample, profile: &CalibrationProfile) -> ScreenPoint {
        if !raw.touching {
            self.release();
        }
        let point = map(raw, profile, self.screen);
        let alpha = effective_alpha(profile.smoothing_alpha);
        let (px, py) = (point.x as f64, point.y as f64);

        let next = match self.smoothed {
            Some((sx, sy)) if raw.touching => (sx * (1.0 - alpha) + px * alpha, sy * (1.0 - alpha) + py * alpha),
            _ => (px, py),
        };
        self.smoothed = if raw.touching { Some(next) } else { None };
        ScreenPoint::clamped(next.0, next.1, self.screen)
    }

    /// End the current touch; the next sample starts fresh.
    pub fn release(&mut self) {
        self.smoothed = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.smoothed.is_some()
    }
}

/// Out-of-range or non-finite alpha disables smoothing.
fn effective_alpha(alpha: f64) -> f64 {
    if alpha.is_finite() && alpha > 0.0 && alpha <= 1.0 {
        alpha
    } else {
        1.0
    }
}
