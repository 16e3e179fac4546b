//! Interactive calibration strategies.
//!
//! Each strategy is a resumable state machine: the host calls
//! [`Calibrator::advance`] once per poll with the elapsed time and whatever the
//! raw source returned, and gets back [`Progress`]. Nothing here sleeps or
//! blocks.

mod affine;
mod collect;
mod corner;
mod gesture;
pub mod linalg;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub use affine::{fit_affine, AffineCalibrator, AffineFit};
pub use collect::{corner_targets, Collect, CornerCollector, CornerStep};
pub use corner::{score_orientations, CornerCalibrator, OrientationScore};
pub use gesture::{
    score_gesture, GestureCapture, GestureOrientationWizard, SwipeKind, WorkingRange,
};

use crate::error::CalibrationError;
use crate::mapper::ScreenPoint;
use crate::profile::CalibrationProfile;
use crate::sample::RawSample;

/// Outcome of one `advance` call.
#[derive(Debug)]
pub enum Progress {
    Pending,
    Done(CalibrationProfile),
    Failed(CalibrationError),
}

/// A calibration strategy. Once `Done` or `Failed` is returned the
/// calibrator is finished and should be dropped.
pub trait Calibrator {
    fn name(&self) -> &'static str;

    fn advance(
        &mut self,
        dt: Duration,
        sample: Option<RawSample>,
        surface: &mut dyn MarkerSurface,
    ) -> Progress;
}

/// The drawing collaborator calibrators talk to.
pub trait MarkerSurface {
    fn draw_marker(&mut self, x: i32, y: i32);
    fn flush(&mut self);

    /// Short one-line status, e.g. "failed". Optional.
    fn show_status(&mut self, _text: &str) {}
}

/// Surface that only logs what would be drawn.
#[derive(Debug, Default)]
pub struct LogSurface {
    pending: Vec<ScreenPoint>,
}

impl MarkerSurface for LogSurface {
    fn draw_marker(&mut self, x: i32, y: i32) {
        self.pending.push(ScreenPoint::new(x, y));
    }

    fn flush(&mut self) {
        log::info!("[calibration] markers: {:?}", self.pending);
        self.pending.clear();
    }

    fn show_status(&mut self, text: &str) {
        log::info!("[calibration] {}", text);
    }
}

/// Which strategy the engine runs when a profile needs calibrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalibratorKind {
    #[default]
    Corner,
    Affine,
    Gesture,
}

impl CalibratorKind {
    pub fn build(
        self,
        settings: &CalibrationSettings,
        base: &CalibrationProfile,
    ) -> Box<dyn Calibrator> {
        match self {
            CalibratorKind::Corner => Box::new(CornerCalibrator::new(settings.clone(), base.clone())),
            CalibratorKind::Affine => Box::new(AffineCalibrator::new(settings.clone(), base.clone())),
            CalibratorKind::Gesture => {
                Box::new(GestureOrientationWizard::new(settings.clone(), base.clone()))
            }
        }
    }
}

impl fmt::Display for CalibratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibratorKind::Corner => write!(f, "corner"),
            CalibratorKind::Affine => write!(f, "affine"),
            CalibratorKind::Gesture => write!(f, "gesture"),
        }
    }
}

impl FromStr for CalibratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "corner" | "corners" => Ok(CalibratorKind::Corner),
            "affine" => Ok(CalibratorKind::Affine),
            "gesture" | "swipe" => Ok(CalibratorKind::Gesture),
            _ => Err(format!(
                "Invalid calibrator '{}'. Valid values: corner, affine, gesture",
                s
            )),
        }
    }
}

/// Tuning shared by all strategies.
#[derive(Debug, Clone)]
pub struct CalibrationSettings {
    pub screen: (u32, u32),
    /// Inset of the corner targets from the screen edges, in pixels.
    pub target_margin: u32,
    pub step_timeout: Duration,
    pub samples_per_corner: usize,
    pub min_corner_samples: usize,
    /// Reject a fit whose summed error exceeds this fraction of the diagonal.
    pub reject_fraction: f64,
    /// Padding added around observed raw extremes when committing a range.
    pub raw_pad: u16,
    pub swipe_window: Duration,
    pub swipe_min_samples: usize,
    /// Fraction of a swipe's samples aggregated for its start and end points.
    pub swipe_trim_fraction: f64,
    /// Minimum raw travel along either axis for a swipe to count.
    pub swipe_min_travel: u16,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            screen: (240, 280),
            target_margin: 20,
            step_timeout: Duration::from_secs(10),
            samples_per_corner: 8,
            min_corner_samples: 3,
            reject_fraction: 0.9,
            raw_pad: 40,
            swipe_window: Duration::from_millis(1200),
            swipe_min_samples: 6,
            swipe_trim_fraction: 0.2,
            swipe_min_travel: 200,
        }
    }
}

impl CalibrationSettings {
    pub fn diagonal(&self) -> f64 {
        (self.screen.0 as f64).hypot(self.screen.1 as f64)
    }

    pub fn reject_limit(&self) -> f64 {
        self.reject_fraction * self.diagonal()
    }
}

/// Median of a set of raw values. Even counts average the middle pair.
pub(crate) fn median(values: &mut [u16]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] as f64 + values[mid] as f64) / 2.0)
    } else {
        Some(values[mid] as f64)
    }
}

/// Per-axis median of a run of samples.
pub(crate) fn median_point(samples: &[RawSample]) -> Option<(f64, f64)> {
    let mut xs: Vec<u16> = samples.iter().map(|s| s.rx).collect();
    let mut ys: Vec<u16> = samples.iter().map(|s| s.ry).collect();
    Some((median(&mut xs)?, median(&mut ys)?))
}

/// `[min - pad, max + pad]` of `values`, kept inside the 12-bit range.
pub(crate) fn padded_bounds(values: impl IntoIterator<Item = u16>, pad: u16) -> Option<(u16, u16)> {
    let mut iter = values.into_iter();
    let first = iter.next()?;
    let (lo, hi) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Some((
        lo.saturating_sub(pad),
        hi.saturating_add(pad).min(crate::packet::RAW_MAX),
    ))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_handles_odd_and_even() {
        assert_eq!(median(&mut [5, 1, 3]), Some(3.0));
        assert_eq!(median(&mut [4, 1, 3, 2]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn median_ignores_single_outlier() {
        let samples = [
            RawSample::touching(1000, 2000),
            RawSample::touching(1002, 2001),
            RawSample::touching(4095, 0),
            RawSample::touching(1001, 1999),
            RawSample::touching(999, 2002),
        ];
        assert_eq!(median_point(&samples), Some((1001.0, 2000.0)));
    }

    #[test]
    fn padded_bounds_saturate() {
        assert_eq!(padded_bounds([30, 4080, 100], 40), Some((0, 4095)));
        assert_eq!(padded_bounds([1000, 2000], 40), Some((960, 2040)));
        assert_eq!(padded_bounds(std::iter::empty(), 40), None);
    }

    #[test]
    fn kind_parses() {
        assert_eq!("Gesture".parse::<CalibratorKind>().unwrap(), CalibratorKind::Gesture);
        assert_eq!("affine".parse::<CalibratorKind>().unwrap(), CalibratorKind::Affine);
        assert!("magic".parse::<CalibratorKind>().is_err());
        assert_eq!(CalibratorKind::default().to_string(), "corner");
    }

    #[test]
    fn reject_limit_scales_with_diagonal() {
        let s = CalibrationSettings {
            screen: (300, 400),
            reject_fraction: 0.5,
            ..Default::default()
        };
        assert!((s.reject_limit() - 250.0).abs() < 1e-9);
    }
}
