//! Corner-target calibration: discrete swap/invert search over four touches.

use std::time::Duration;

use super::collect::{Collect, CornerCollector};
use super::{padded_bounds, CalibrationSettings, Calibrator, MarkerSurface, Progress};
use crate::error::CalibrationError;
use crate::mapper::{project, ScreenPoint};
use crate::orientation::Orientation;
use crate::profile::CalibrationProfile;
use crate::sample::RawSample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationScore {
    pub orientation: Orientation,
    /// Sum of Euclidean distances (pixels) from projected corners to targets.
    pub error: f64,
}

/// Raw bounds along one screen axis, extrapolated from the inset targets out
/// to the screen edges so that a correct orientation projects exactly.
fn extrapolated_range(values: [f64; 4], targets: [f64; 4], dim: u32, invert: bool) -> (f64, f64) {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let t_lo = targets.iter().copied().fold(f64::INFINITY, f64::min);
    let t_hi = targets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let last = dim.max(1) as f64 - 1.0;

    let t_span = t_hi - t_lo;
    if t_span <= f64::EPSILON {
        return (lo, hi);
    }
    let per_px = (hi - lo) / t_span;
    let (below, above) = if invert {
        (last - t_hi, t_lo)
    } else {
        (t_lo, last - t_hi)
    };
    (lo - below * per_px, hi + above * per_px)
}

/// Score all eight orientations, best (lowest error) first.
pub fn score_orientations(
    raw: &[(f64, f64); 4],
    targets: &[ScreenPoint; 4],
    screen: (u32, u32),
) -> Vec<OrientationScore> {
    let tx = targets.map(|t| t.x as f64);
    let ty = targets.map(|t| t.y as f64);

    let mut scores: Vec<OrientationScore> = Orientation::ALL
        .iter()
        .map(|&o| {
            let routed = raw.map(|(rx, ry)| o.route(rx, ry));
            let vx = routed.map(|p| p.0);
            let vy = routed.map(|p| p.1);
            let (x_lo, x_hi) = extrapolated_range(vx, tx, screen.0, o.invert_x);
            let (y_lo, y_hi) = extrapolated_range(vy, ty, screen.1, o.invert_y);

            let error = routed
                .iter()
                .zip(targets)
                .map(|(&(x, y), t)| {
                    let px = project(x, x_lo, x_hi, o.invert_x, screen.0);
                    let py = project(y, y_lo, y_hi, o.invert_y, screen.1);
                    t.distance(px, py)
                })
                .sum();
            OrientationScore {
                orientation: o,
                error,
            }
        })
        .collect();

    scores.sort_by(|a, b| a.error.total_cmp(&b.error));
    scores
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Collecting,
    Finished,
}

/// Four-target calibration choosing the best of the eight discrete orientations.
pub struct CornerCalibrator {
    settings: CalibrationSettings,
    base: CalibrationProfile,
    collector: CornerCollector,
    phase: Phase,
}

impl CornerCalibrator {
    pub fn new(settings: CalibrationSettings, base: CalibrationProfile) -> Self {
        let collector = CornerCollector::new(&settings);
        Self {
            settings,
            base,
            collector,
            phase: Phase::Collecting,
        }
    }

    /// Turn four raw corner medians into a profile, or reject them.
    pub fn solve(&self, raw: &[(f64, f64); 4]) -> Result<CalibrationProfile, CalibrationError> {
        let scores = score_orientations(raw, self.collector.targets(), self.settings.screen);
        let best = scores[0];
        for s in &scores {
            log::debug!("[calibration] {:<22} error {:.1}", s.orientation.to_string(), s.error);
        }

        let limit = self.settings.reject_limit();
        if !best.error.is_finite() || best.error > limit {
            log::warn!(
                "[calibration] best orientation {} has error {:.1} > {:.1}, rejecting",
                best.orientation,
                best.error,
                limit
            );
            return Err(CalibrationError::Rejected {
                error: best.error,
                limit,
            });
        }

        let pad = self.settings.raw_pad;
        let to_raw = |v: f64| v.round().clamp(0.0, u16::MAX as f64) as u16;
        let (x_min, x_max) = padded_bounds(raw.iter().map(|p| to_raw(p.0)), pad)
            .unwrap_or((self.base.raw_x_min, self.base.raw_x_max));
        let (y_min, y_max) = padded_bounds(raw.iter().map(|p| to_raw(p.1)), pad)
            .unwrap_or((self.base.raw_y_min, self.base.raw_y_max));

        let mut profile = self.base.clone();
        profile.set_orientation(best.orientation);
        profile.raw_x_min = x_min;
        profile.raw_x_max = x_max;
        profile.raw_y_min = y_min;
        profile.raw_y_max = y_max;
        profile.affine = None;
        profile.calibrated = true;

        log::info!(
            "[calibration] corner fit: {} error {:.1}px, x=[{}, {}] y=[{}, {}]",
            best.orientation,
            best.error,
            x_min,
            x_max,
            y_min,
            y_max
        );
        Ok(profile)
    }
}

impl Calibrator for CornerCalibrator {
    fn name(&self) -> &'static str {
        "corner"
    }

    fn advance(
        &mut self,
        dt: Duration,
        sample: Option<RawSample>,
        surface: &mut dyn MarkerSurface,
    ) -> Progress {
        if self.phase == Phase::Finished {
            return Progress::Pending;
        }
        match self.collector.advance(dt, sample, surface) {
            Collect::Pending => Progress::Pending,
            Collect::Failed(e) => {
                self.phase = Phase::Finished;
                Progress::Failed(e)
            }
            Collect::Complete(raw) => {
                self.phase = Phase::Finished;
                match self.solve(&raw) {
                    Ok(profile) => Progress::Done(profile),
                    Err(e) => Progress::Failed(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::collect::corner_targets;
    use super::super::test_support::{press, synth_raw, RecordingSurface};
    use super::*;
    use crate::mapper;

    const SCREEN: (u32, u32) = (240, 280);

    fn raw_corners(o: Orientation, targets: &[ScreenPoint; 4]) -> [(f64, f64); 4] {
        targets.map(|t| {
            let s = synth_raw(o, t.x as f64, t.y as f64, SCREEN);
            (s.rx as f64, s.ry as f64)
        })
    }

    #[test]
    fn recovers_every_orientation() {
        let targets = corner_targets(SCREEN, 20);
        for o in Orientation::ALL {
            let raw = raw_corners(o, &targets);
            let scores = score_orientations(&raw, &targets, SCREEN);
            assert_eq!(scores[0].orientation, o, "scores: {:?}", scores);
            assert!(scores[0].error < 0.5, "error {} for {}", scores[0].error, o);
            assert!(scores[1].error > 100.0);
        }
    }

    #[test]
    fn calibrator_commits_padded_range() {
        let settings = CalibrationSettings {
            screen: SCREEN,
            samples_per_corner: 4,
            raw_pad: 40,
            ..Default::default()
        };
        let o = Orientation::new(true, true, false);
        let targets = corner_targets(SCREEN, settings.target_margin);
        let mut cal = CornerCalibrator::new(settings, CalibrationProfile::default());
        let mut surface = RecordingSurface::default();

        let mut outcome = Progress::Pending;
        for t in targets {
            outcome = press(&mut cal, &mut surface, synth_raw(o, t.x as f64, t.y as f64, SCREEN), 4);
        }

        let profile = match outcome {
            Progress::Done(p) => p,
            other => panic!("expected Done, got {:?}", other),
        };
        assert_eq!(profile.orientation(), o);
        assert!(profile.calibrated);
        assert!(profile.affine.is_none());

        let raw = raw_corners(o, &targets);
        let min_rx = raw.iter().map(|p| p.0).fold(f64::INFINITY, f64::min) as u16;
        assert_eq!(profile.raw_x_min, min_rx - 40);

        // touching a target now lands close to it
        let s = synth_raw(o, 219.0, 20.0, SCREEN);
        let p = mapper::map(s, &profile, SCREEN);
        assert!((p.x - 219).abs() <= 25 && (p.y - 20).abs() <= 25, "{:?}", p);
    }

    #[test]
    fn rejects_when_error_exceeds_limit() {
        let settings = CalibrationSettings {
            screen: SCREEN,
            reject_fraction: 0.9,
            ..Default::default()
        };
        let cal = CornerCalibrator::new(settings, CalibrationProfile::default());
        // all four touches at one spot: every orientation lands far from the corners
        let raw = [(2000.0, 2000.0); 4];
        match cal.solve(&raw) {
            Err(CalibrationError::Rejected { error, limit }) => assert!(error > limit),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn timeout_leaves_no_profile() {
        let settings = CalibrationSettings {
            screen: SCREEN,
            step_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let mut cal = CornerCalibrator::new(settings, CalibrationProfile::default());
        let mut surface = RecordingSurface::default();
        let mut failed = false;
        for _ in 0..5 {
            if let Progress::Failed(e) = cal.advance(Duration::from_millis(20), None, &mut surface) {
                assert_eq!(e.short_label(), "timeout");
                failed = true;
                break;
            }
        }
        assert!(failed);
    }
}
