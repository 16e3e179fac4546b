//! Orientation wizard driven by two swipes: one rightward, one downward.
//!
//! Each swipe is reduced to robust start/end raw points. All eight
//! swap/invert combinations are then scored by how the swipes would appear
//! on screen: the primary axis must move the right way, leakage onto the
//! other axis costs, and a larger primary displacement is rewarded.

use std::time::Duration;

use super::{median_point, CalibrationSettings, Calibrator, MarkerSurface, Progress};
use crate::error::CalibrationError;
use crate::mapper::project;
use crate::orientation::Orientation;
use crate::packet::RAW_MAX;
use crate::profile::CalibrationProfile;
use crate::sample::RawSample;

/// Added when a swipe's primary axis moves the wrong way (or not at all).
const WRONG_SIGN_PENALTY: f64 = 10_000.0;
/// Cost per pixel of movement on the secondary axis.
const LEAK_WEIGHT: f64 = 1.0;
/// Credit per pixel of movement along the primary axis.
const REWARD_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeKind {
    Right,
    Down,
}

impl SwipeKind {
    fn label(self) -> &'static str {
        match self {
            SwipeKind::Right => "swipe right",
            SwipeKind::Down => "swipe down",
        }
    }
}

/// Fewest samples in each of the start/end median windows.
pub const MIN_END_WINDOW: usize = 3;

/// One captured swipe, reduced to aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureCapture {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub x_range: (u16, u16),
    pub y_range: (u16, u16),
    pub sample_count: usize,
}

impl GestureCapture {
    /// `trim_fraction` of the samples at each end feed the start/end medians.
    /// Each window holds an odd count of at least [`MIN_END_WINDOW`] samples
    /// (or every sample, for very short swipes) so one stray reading can
    /// never decide a median.
    pub fn from_samples(samples: &[RawSample], trim_fraction: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len();
        let frac = if trim_fraction.is_finite() {
            trim_fraction.clamp(0.0, 0.5)
        } else {
            0.2
        };
        let mut k = ((n as f64 * frac).ceil() as usize).max(MIN_END_WINDOW);
        if k % 2 == 0 {
            k += 1;
        }
        let k = k.min(n);

        let start = median_point(&samples[..k])?;
        let end = median_point(&samples[n - k..])?;
        let x_range = bounds(samples.iter().map(|s| s.rx))?;
        let y_range = bounds(samples.iter().map(|s| s.ry))?;
        Some(Self {
            start,
            end,
            x_range,
            y_range,
            sample_count: n,
        })
    }

    /// Largest raw displacement along either channel.
    pub fn travel(&self) -> f64 {
        (self.end.0 - self.start.0)
            .abs()
            .max((self.end.1 - self.start.1).abs())
    }
}

fn bounds(values: impl Iterator<Item = u16>) -> Option<(u16, u16)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Raw window used to score (and then commit) the orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingRange {
    pub x: (u16, u16),
    pub y: (u16, u16),
}

impl WorkingRange {
    /// Union of both swipes' observed ranges, padded and kept in 12 bits.
    pub fn from_captures(a: &GestureCapture, b: &GestureCapture, pad: u16) -> Self {
        let widen = |(lo1, hi1): (u16, u16), (lo2, hi2): (u16, u16)| {
            (
                lo1.min(lo2).saturating_sub(pad),
                hi1.max(hi2).saturating_add(pad).min(RAW_MAX),
            )
        };
        Self {
            x: widen(a.x_range, b.x_range),
            y: widen(a.y_range, b.y_range),
        }
    }

    fn project(&self, o: Orientation, raw: (f64, f64), screen: (u32, u32)) -> (f64, f64) {
        let (rx, ry) = raw;
        let x_range = (self.x.0 as f64, self.x.1 as f64);
        let y_range = (self.y.0 as f64, self.y.1 as f64);
        let ((vx, (x_lo, x_hi)), (vy, (y_lo, y_hi))) = o.route((rx, x_range), (ry, y_range));
        (
            project(vx, x_lo, x_hi, o.invert_x, screen.0),
            project(vy, y_lo, y_hi, o.invert_y, screen.1),
        )
    }

    fn displacement(
        &self,
        o: Orientation,
        capture: &GestureCapture,
        screen: (u32, u32),
    ) -> (f64, f64) {
        let (x0, y0) = self.project(o, capture.start, screen);
        let (x1, y1) = self.project(o, capture.end, screen);
        (x1 - x0, y1 - y0)
    }
}

/// Penalty of one orientation for the two swipes; lower is better.
pub fn score_gesture(
    o: Orientation,
    right: &GestureCapture,
    down: &GestureCapture,
    range: &WorkingRange,
    screen: (u32, u32),
) -> f64 {
    let (rdx, rdy) = range.displacement(o, right, screen);
    let (ddx, ddy) = range.displacement(o, down, screen);

    let mut penalty = 0.0;
    if rdx <= 0.0 {
        penalty += WRONG_SIGN_PENALTY;
    }
    if ddy <= 0.0 {
        penalty += WRONG_SIGN_PENALTY;
    }
    penalty += LEAK_WEIGHT * (rdy.abs() + ddx.abs());
    penalty -= REWARD_WEIGHT * (rdx.max(0.0) + ddy.max(0.0));
    penalty
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwipeStep {
    AwaitTouch,
    Capturing,
    AwaitRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Swipe(SwipeKind),
    Finished,
}

/// Two-swipe orientation wizard.
pub struct GestureOrientationWizard {
    settings: CalibrationSettings,
    base: CalibrationProfile,
    phase: Phase,
    step: SwipeStep,
    elapsed: Duration,
    capture_elapsed: Duration,
    drawn: bool,
    samples: Vec<RawSample>,
    right: Option<GestureCapture>,
}

impl GestureOrientationWizard {
    pub fn new(settings: CalibrationSettings, base: CalibrationProfile) -> Self {
        Self {
            settings,
            base,
            phase: Phase::Swipe(SwipeKind::Right),
            step: SwipeStep::AwaitTouch,
            elapsed: Duration::ZERO,
            capture_elapsed: Duration::ZERO,
            drawn: false,
            samples: Vec::new(),
            right: None,
        }
    }

    /// Guide markers for a swipe: start then end.
    fn guide(&self, kind: SwipeKind) -> [(i32, i32); 2] {
        let (w, h) = self.settings.screen;
        let w = w.max(1) as i32 - 1;
        let h = h.max(1) as i32 - 1;
        let m = (self.settings.target_margin as i32).min(w / 2).min(h / 2);
        match kind {
            SwipeKind::Right => [(m, h / 2), (w - m, h / 2)],
            SwipeKind::Down => [(w / 2, m), (w / 2, h - m)],
        }
    }

    /// Pick the best orientation for two captured swipes.
    pub fn solve(
        &self,
        right: &GestureCapture,
        down: &GestureCapture,
    ) -> Result<CalibrationProfile, CalibrationError> {
        let range = WorkingRange::from_captures(right, down, self.settings.raw_pad);
        let screen = self.settings.screen;

        let mut best: Option<(Orientation, f64)> = None;
        for o in Orientation::ALL {
            let score = score_gesture(o, right, down, &range, screen);
            log::debug!("[calibration] {:<22} penalty {:.1}", o.to_string(), score);
            if best.map_or(true, |(_, s)| score < s) {
                best = Some((o, score));
            }
        }
        let Some((orientation, score)) = best else {
            return Err(CalibrationError::Rejected {
                error: f64::INFINITY,
                limit: WRONG_SIGN_PENALTY,
            });
        };

        if !score.is_finite() || score >= WRONG_SIGN_PENALTY / 2.0 {
            log::warn!(
                "[calibration] no orientation moves both swipes the right way (best {} = {:.1})",
                orientation,
                score
            );
            return Err(CalibrationError::Rejected {
                error: score,
                limit: WRONG_SIGN_PENALTY / 2.0,
            });
        }

        let mut profile = self.base.clone();
        profile.set_orientation(orientation);
        profile.raw_x_min = range.x.0;
        profile.raw_x_max = range.x.1;
        profile.raw_y_min = range.y.0;
        profile.raw_y_max = range.y.1;
        profile.affine = None;
        profile.calibrated = true;

        log::info!(
            "[calibration] gesture fit: {} penalty {:.1}, x=[{}, {}] y=[{}, {}]",
            orientation,
            score,
            range.x.0,
            range.x.1,
            range.y.0,
            range.y.1
        );
        Ok(profile)
    }

    fn finish_swipe(&mut self, kind: SwipeKind, still_touching: bool) -> Progress {
        let need = self.settings.swipe_min_samples.max(2);
        let got = self.samples.len();
        let samples = std::mem::take(&mut self.samples);
        if got < need {
            log::warn!("[calibration] {}: only {} samples (need {})", kind.label(), got, need);
            return self.fail(CalibrationError::InsufficientSamples {
                step: kind.label(),
                got,
                need,
            });
        }
        let Some(capture) = GestureCapture::from_samples(&samples, self.settings.swipe_trim_fraction)
        else {
            return self.fail(CalibrationError::InsufficientSamples {
                step: kind.label(),
                got,
                need,
            });
        };
        let travel = capture.travel();
        if travel < self.settings.swipe_min_travel as f64 {
            log::warn!(
                "[calibration] {}: travel {:.0} below minimum {}",
                kind.label(),
                travel,
                self.settings.swipe_min_travel
            );
            return self.fail(CalibrationError::Rejected {
                error: travel,
                limit: self.settings.swipe_min_travel as f64,
            });
        }
        log::info!(
            "[calibration] {}: {} samples, start ({:.0}, {:.0}) end ({:.0}, {:.0})",
            kind.label(),
            capture.sample_count,
            capture.start.0,
            capture.start.1,
            capture.end.0,
            capture.end.1
        );

        match kind {
            SwipeKind::Right => {
                self.right = Some(capture);
                self.phase = Phase::Swipe(SwipeKind::Down);
                self.step = if still_touching {
                    SwipeStep::AwaitRelease
                } else {
                    SwipeStep::AwaitTouch
                };
                self.elapsed = Duration::ZERO;
                self.drawn = false;
                Progress::Pending
            }
            SwipeKind::Down => {
                self.phase = Phase::Finished;
                let Some(right) = self.right.take() else {
                    return Progress::Failed(CalibrationError::InsufficientSamples {
                        step: SwipeKind::Right.label(),
                        got: 0,
                        need,
                    });
                };
                match self.solve(&right, &capture) {
                    Ok(profile) => Progress::Done(profile),
                    Err(e) => Progress::Failed(e),
                }
            }
        }
    }

    fn fail(&mut self, e: CalibrationError) -> Progress {
        self.phase = Phase::Finished;
        Progress::Failed(e)
    }
}

impl Calibrator for GestureOrientationWizard {
    fn name(&self) -> &'static str {
        "gesture"
    }

    fn advance(
        &mut self,
        dt: Duration,
        sample: Option<RawSample>,
        surface: &mut dyn MarkerSurface,
    ) -> Progress {
        let Phase::Swipe(kind) = self.phase else {
            return Progress::Pending;
        };

        if !self.drawn && self.step != SwipeStep::AwaitRelease {
            for (x, y) in self.guide(kind) {
                surface.draw_marker(x, y);
            }
            surface.flush();
            self.drawn = true;
            log::info!("[calibration] {} along the guide", kind.label());
        }

        self.elapsed += dt;
        let sample = sample.filter(|s| s.touching);

        match (self.step, sample) {
            (SwipeStep::AwaitRelease, None) => {
                self.step = SwipeStep::AwaitTouch;
                self.elapsed = Duration::ZERO;
                self.drawn = false;
            }
            (SwipeStep::AwaitRelease, Some(_)) | (SwipeStep::AwaitTouch, None) => {}
            (SwipeStep::AwaitTouch, Some(s)) => {
                self.samples.clear();
                self.samples.push(s);
                self.capture_elapsed = Duration::ZERO;
                self.step = SwipeStep::Capturing;
            }
            (SwipeStep::Capturing, Some(s)) => {
                self.samples.push(s);
                self.capture_elapsed += dt;
                if self.capture_elapsed >= self.settings.swipe_window {
                    return self.finish_swipe(kind, true);
                }
            }
            (SwipeStep::Capturing, None) => return self.finish_swipe(kind, false),
        }

        if self.step != SwipeStep::Capturing && self.elapsed >= self.settings.step_timeout {
            log::warn!("[calibration] {} timed out", kind.label());
            return self.fail(CalibrationError::Timeout { step: kind.label() });
        }
        Progress::Pending
    }
}
