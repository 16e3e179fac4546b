//! Least-squares affine calibration over the four corner touches.
//!
//! Fits `x = a·rx + b·ry + c` and `y = d·rx + e·ry + f` independently via the
//! normal equations, which also absorbs mild rotation and skew that the
//! discrete swap/invert model cannot express.

use std::time::Duration;

use super::collect::{Collect, CornerCollector};
use super::linalg::{solve3, Mat3};
use super::{padded_bounds, CalibrationSettings, Calibrator, MarkerSurface, Progress};
use crate::error::CalibrationError;
use crate::profile::CalibrationProfile;
use crate::sample::RawSample;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineFit {
    pub coeffs: [f64; 6],
    /// Sum of distances between fitted and intended screen points.
    pub residual: f64,
    pub det: f64,
    pub regularized: bool,
}

impl AffineFit {
    pub fn apply(&self, rx: f64, ry: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.coeffs;
        (a * rx + b * ry + c, d * rx + e * ry + f)
    }
}

/// Fit raw → screen from at least three correspondences.
///
/// Raw points are centred on their mean before forming `AᵗA` so the system
/// stays well scaled for 12-bit inputs.
pub fn fit_affine(raw: &[(f64, f64)], screen: &[(f64, f64)]) -> Option<AffineFit> {
    if raw.len() < 3 || raw.len() != screen.len() {
        return None;
    }
    let n = raw.len() as f64;
    let mx = raw.iter().map(|p| p.0).sum::<f64>() / n;
    let my = raw.iter().map(|p| p.1).sum::<f64>() / n;

    let mut ata: Mat3 = [[0.0; 3]; 3];
    let mut atx = [0.0; 3];
    let mut aty = [0.0; 3];
    for (&(rx, ry), &(sx, sy)) in raw.iter().zip(screen) {
        let row = [rx - mx, ry - my, 1.0];
        for j in 0..3 {
            for k in 0..3 {
                ata[j][k] += row[j] * row[k];
            }
            atx[j] += row[j] * sx;
            aty[j] += row[j] * sy;
        }
    }

    let sx = solve3(&ata, &atx);
    let sy = solve3(&ata, &aty);
    let [a, b, c0] = sx.x;
    let [d, e, f0] = sy.x;

    let mut fit = AffineFit {
        coeffs: [a, b, c0 - a * mx - b * my, d, e, f0 - d * mx - e * my],
        residual: 0.0,
        det: sx.det,
        regularized: sx.regularized,
    };
    fit.residual = raw
        .iter()
        .zip(screen)
        .map(|(&(rx, ry), &(tx, ty))| {
            let (px, py) = fit.apply(rx, ry);
            (px - tx).hypot(py - ty)
        })
        .sum();
    Some(fit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Collecting,
    Finished,
}

/// Four-target calibration producing a full affine transform.
pub struct AffineCalibrator {
    settings: CalibrationSettings,
    base: CalibrationProfile,
    collector: CornerCollector,
    phase: Phase,
}

impl AffineCalibrator {
    pub fn new(settings: CalibrationSettings, base: CalibrationProfile) -> Self {
        let collector = CornerCollector::new(&settings);
        Self {
            settings,
            base,
            collector,
            phase: Phase::Collecting,
        }
    }

    pub fn solve(&self, raw: &[(f64, f64); 4]) -> Result<CalibrationProfile, CalibrationError> {
        let targets = self.collector.targets().map(|t| (t.x as f64, t.y as f64));
        let fit = fit_affine(raw, &targets).ok_or(CalibrationError::InsufficientSamples {
            step: "affine fit",
            got: raw.len(),
            need: 3,
        })?;

        if fit.regularized {
            // still usable: the clamp in the mapper bounds whatever comes out
            log::warn!(
                "[calibration] {}; using regularized solve",
                CalibrationError::SingularFit { det: fit.det }
            );
        }

        let limit = self.settings.reject_limit();
        if !fit.residual.is_finite() || fit.residual > limit {
            log::warn!(
                "[calibration] affine residual {:.1} > {:.1}, rejecting",
                fit.residual,
                limit
            );
            return Err(CalibrationError::Rejected {
                error: fit.residual,
                limit,
            });
        }

        let pad = self.settings.raw_pad;
        let to_raw = |v: f64| v.round().clamp(0.0, u16::MAX as f64) as u16;
        let mut profile = self.base.clone();
        if let Some((lo, hi)) = padded_bounds(raw.iter().map(|p| to_raw(p.0)), pad) {
            profile.raw_x_min = lo;
            profile.raw_x_max = hi;
        }
        if let Some((lo, hi)) = padded_bounds(raw.iter().map(|p| to_raw(p.1)), pad) {
            profile.raw_y_min = lo;
            profile.raw_y_max = hi;
        }
        profile.affine = Some(fit.coeffs);
        profile.calibrated = true;

        log::info!(
            "[calibration] affine fit residual {:.2}px coeffs {:?}",
            fit.residual,
            fit.coeffs
        );
        Ok(profile)
    }
}

impl Calibrator for AffineCalibrator {
    fn name(&self) -> &'static str {
        "affine"
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
