//! Four-corner touch collection shared by the corner and affine strategies.

use std::time::Duration;

use super::{median_point, CalibrationSettings, MarkerSurface};
use crate::error::CalibrationError;
use crate::mapper::ScreenPoint;
use crate::sample::RawSample;

/// Corner targets inset by `margin`: top-left, top-right, bottom-right, bottom-left.
pub fn corner_targets(screen: (u32, u32), margin: u32) -> [ScreenPoint; 4] {
    let w = screen.0.max(1) as i32 - 1;
    let h = screen.1.max(1) as i32 - 1;
    let mx = (margin as i32).min(w / 2);
    let my = (margin as i32).min(h / 2);
    [
        ScreenPoint::new(mx, my),
        ScreenPoint::new(w - mx, my),
        ScreenPoint::new(w - mx, h - my),
        ScreenPoint::new(mx, h - my),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerStep {
    AwaitTouch,
    Sampling,
    AwaitRelease,
    /// All four corners captured; further input is ignored.
    Done,
}

#[derive(Debug)]
pub enum Collect {
    Pending,
    Complete([(f64, f64); 4]),
    Failed(CalibrationError),
}

/// Walks the user through the four corner targets, one contiguous touch each.
#[derive(Debug)]
pub struct CornerCollector {
    targets: [ScreenPoint; 4],
    timeout: Duration,
    per_corner: usize,
    min_samples: usize,
    index: usize,
    step: CornerStep,
    elapsed: Duration,
    drawn: bool,
    samples: Vec<RawSample>,
    captured: Vec<(f64, f64)>,
}

impl CornerCollector {
    pub fn new(settings: &CalibrationSettings) -> Self {
        let per_corner = settings.samples_per_corner.max(1);
        Self {
            targets: corner_targets(settings.screen, settings.target_margin),
            timeout: settings.step_timeout,
            per_corner,
            min_samples: settings.min_corner_samples.clamp(1, per_corner),
            index: 0,
            step: CornerStep::AwaitTouch,
            elapsed: Duration::ZERO,
            drawn: false,
            samples: Vec::with_capacity(per_corner),
            captured: Vec::with_capacity(4),
        }
    }

    pub fn targets(&self) -> &[ScreenPoint; 4] {
        &self.targets
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn step(&self) -> CornerStep {
        self.step
    }

    pub fn advance(
        &mut self,
        dt: Duration,
        sample: Option<RawSample>,
        surface: &mut dyn MarkerSurface,
    ) -> Collect {
        if self.step == CornerStep::Done {
            return Collect::Pending;
        }
        if !self.drawn && self.step != CornerStep::AwaitRelease {
            let t = self.targets[self.index];
            surface.draw_marker(t.x, t.y);
            surface.flush();
            self.drawn = true;
            log::info!("[calibration] touch target {} at ({}, {})", self.index + 1, t.x, t.y);
        }

        self.elapsed += dt;
        let sample = sample.filter(|s| s.touching);

        match (self.step, sample) {
            (CornerStep::AwaitRelease, None) => {
                self.step = CornerStep::AwaitTouch;
                self.elapsed = Duration::ZERO;
                self.drawn = false;
            }
            (CornerStep::AwaitRelease, Some(_)) | (CornerStep::Done, _) => {}
            (CornerStep::AwaitTouch, Some(s)) => {
                self.samples.push(s);
                self.step = CornerStep::Sampling;
                if self.samples.len() >= self.per_corner {
                    return self.finish_corner(true);
                }
            }
            (CornerStep::AwaitTouch, None) => {}
            (CornerStep::Sampling, Some(s)) => {
                self.samples.push(s);
                if self.samples.len() >= self.per_corner {
                    return self.finish_corner(true);
                }
            }
            (CornerStep::Sampling, None) => {
                if self.samples.len() >= self.min_samples {
                    return self.finish_corner(false);
                }
                log::debug!(
                    "[calibration] touch too short ({} samples), waiting again",
                    self.samples.len()
                );
                self.samples.clear();
                self.step = CornerStep::AwaitTouch;
            }
        }

        if self.elapsed >= self.timeout {
            log::warn!(
                "[calibration] no usable touch for target {} within {:?}",
                self.index + 1,
                self.timeout
            );
            return Collect::Failed(CalibrationError::Timeout {
                step: if self.step == CornerStep::AwaitRelease {
                    "corner release"
                } else {
                    "corner touch"
                },
            });
        }
        Collect::Pending
    }

    fn finish_corner(&mut self, still_touching: bool) -> Collect {
        let Some(point) = median_point(&self.samples) else {
            return Collect::Pending;
        };
        log::info!(
            "[calibration] target {} raw median ({:.0}, {:.0}) from {} samples",
            self.index + 1,
            point.0,
            point.1,
            self.samples.len()
        );
        self.captured.push(point);
        self.samples.clear();
        self.elapsed = Duration::ZERO;
        self.index += 1;

        if self.index == self.targets.len() {
            self.step = CornerStep::Done;
            let mut out = [(0.0, 0.0); 4];
            out.copy_from_slice(&self.captured);
            return Collect::Complete(out);
        }

        self.drawn = false;
        self.step = if still_touching {
            CornerStep::AwaitRelease
        } else {
            CornerStep::AwaitTouch
        };
        Collect::Pending
    }
}
